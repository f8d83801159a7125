use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use kcal_core::lookup::{ExerciseQuery, FileExerciseCatalog, FileFoodCatalog};
use kcal_core::*;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kcal")]
#[command(about = "Nutrition and exercise tracking system", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage exercise definitions
    Exercise {
        #[command(subcommand)]
        action: ExerciseAction,
    },

    /// Manage meal definitions
    Meal {
        #[command(subcommand)]
        action: MealAction,
    },

    /// Log a performed exercise
    Log {
        /// Exercise name or id
        exercise: String,

        #[arg(long)]
        weight: Option<f64>,

        #[arg(long)]
        reps: Option<u32>,

        #[arg(long)]
        sets: Option<u32>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Check in a consumed meal
    Eat {
        /// Meal name or id
        meal: String,

        /// Serving multiplier (minimum 0.1)
        #[arg(long, default_value = "1")]
        servings: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Show or set the daily goal
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },

    /// Manage generic tracked pieces
    Piece {
        #[command(subcommand)]
        action: PieceAction,
    },

    /// Progress against the daily goal
    Progress {
        /// Number of days to look back (including today)
        #[arg(long, default_value_t = 7)]
        days: u32,

        /// Bucket granularity: day, week or month
        #[arg(long, default_value = "day")]
        period: String,
    },

    /// Export all data to a bundle directory
    Export { dir: PathBuf },

    /// Import a bundle directory
    Import { dir: PathBuf },

    /// Search the food catalog by text or barcode
    Food {
        query: String,

        /// Treat the query as a barcode
        #[arg(long)]
        barcode: bool,

        /// Add the first match to the meal library
        #[arg(long)]
        add: bool,
    },

    /// Search the exercise catalog
    FindExercise {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        muscle: Option<String>,

        #[arg(long)]
        equipment: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Add the first match to the exercise library
        #[arg(long)]
        add: bool,
    },
}

#[derive(Subcommand)]
enum ExerciseAction {
    /// Add a new exercise definition
    Add {
        #[arg(long)]
        name: String,

        /// strength, cardio or bodyweight
        #[arg(long)]
        category: String,

        /// kcal per set (strength) or per rep/minute (cardio/bodyweight)
        #[arg(long)]
        kcal_rate: Option<f64>,

        #[arg(long, default_value_t = 0.0)]
        weight: f64,

        #[arg(long, default_value_t = 10)]
        reps: u32,

        #[arg(long, default_value_t = 3)]
        sets: u32,

        #[arg(long)]
        equipment: Option<String>,

        #[arg(long)]
        muscle: Option<String>,
    },
    /// List exercise definitions
    List,
    /// Remove an exercise (cascades to its check-ins)
    Remove { exercise: String },
}

#[derive(Subcommand)]
enum MealAction {
    /// Add a new meal definition
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        calories: String,

        #[arg(long, default_value = "0")]
        protein: String,

        #[arg(long, default_value = "0")]
        carbs: String,

        #[arg(long, default_value = "0")]
        fat: String,

        #[arg(long, default_value = "0")]
        fiber: String,

        #[arg(long, default_value = "0")]
        sodium: String,

        #[arg(long, default_value = "100")]
        serving_size: String,

        #[arg(long, default_value = "g")]
        serving_unit: String,
    },
    /// List meal definitions
    List,
    /// Remove a meal (cascades to its check-ins)
    Remove { meal: String },
}

#[derive(Subcommand)]
enum GoalAction {
    /// Show the current daily goal
    Show,
    /// Set daily goal fields (unset fields keep their current value)
    Set {
        #[arg(long)]
        calories: Option<f64>,

        #[arg(long)]
        carbs: Option<f64>,

        #[arg(long)]
        protein: Option<f64>,

        #[arg(long)]
        fat: Option<f64>,

        #[arg(long)]
        fiber: Option<f64>,

        #[arg(long)]
        sodium: Option<f64>,
    },
}

#[derive(Subcommand)]
enum PieceAction {
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        value: String,
    },
    List,
    Remove { piece: String },
}

fn main() {
    kcal_core::logging::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let store = Store::open(&data_dir)?;

    debug_assert!(kcal_core::catalog::validate_builtin().is_empty());
    store.seed_builtin_exercises()?;

    match cli.command {
        Commands::Exercise { action } => cmd_exercise(&store, action),
        Commands::Meal { action } => cmd_meal(&store, action),
        Commands::Log {
            exercise,
            weight,
            reps,
            sets,
            notes,
        } => cmd_log(&store, &exercise, weight, reps, sets, notes),
        Commands::Eat {
            meal,
            servings,
            notes,
        } => cmd_eat(&store, &meal, &servings, notes),
        Commands::Goal { action } => cmd_goal(&store, action),
        Commands::Piece { action } => cmd_piece(&store, action),
        Commands::Progress { days, period } => cmd_progress(&store, &config, days, &period),
        Commands::Export { dir } => cmd_export(&store, &dir),
        Commands::Import { dir } => cmd_import(&store, &config, &dir),
        Commands::Food {
            query,
            barcode,
            add,
        } => cmd_food(&store, &query, barcode, add),
        Commands::FindExercise {
            name,
            muscle,
            equipment,
            category,
            add,
        } => cmd_find_exercise(&store, name, muscle, equipment, category, add),
    }
}

/// Resolve an exercise by exact (case-insensitive) name or by id
fn resolve_exercise(store: &Store, key: &str) -> Result<Exercise> {
    if let Ok(id) = Uuid::parse_str(key) {
        return store.get_exercise(id);
    }
    store
        .list_exercises()?
        .into_iter()
        .find(|e| e.name.eq_ignore_ascii_case(key))
        .ok_or_else(|| Error::Store(format!("no exercise named '{}'", key)))
}

fn resolve_meal(store: &Store, key: &str) -> Result<Meal> {
    if let Ok(id) = Uuid::parse_str(key) {
        return store.get_meal(id);
    }
    store
        .list_meals()?
        .into_iter()
        .find(|m| m.name.eq_ignore_ascii_case(key))
        .ok_or_else(|| Error::Store(format!("no meal named '{}'", key)))
}

fn resolve_piece(store: &Store, key: &str) -> Result<Piece> {
    if let Ok(id) = Uuid::parse_str(key) {
        if let Some(piece) = store.list_pieces()?.into_iter().find(|p| p.id == id) {
            return Ok(piece);
        }
    }
    store
        .list_pieces()?
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(key))
        .ok_or_else(|| Error::Store(format!("no piece named '{}'", key)))
}

fn cmd_exercise(store: &Store, action: ExerciseAction) -> Result<()> {
    match action {
        ExerciseAction::Add {
            name,
            category,
            kcal_rate,
            weight,
            reps,
            sets,
            equipment,
            muscle,
        } => {
            let exercise = Exercise {
                id: Uuid::new_v4(),
                name,
                category: ExerciseCategory::parse(&category)?,
                kcal_burned_per_unit: kcal_rate,
                default_weight: weight,
                default_reps: reps,
                default_sets: sets,
                equipment,
                muscle,
            };
            let id = store.add_exercise(exercise.clone())?;
            println!("✓ Added exercise '{}' ({})", exercise.name, id);
            Ok(())
        }
        ExerciseAction::List => {
            let exercises = store.list_exercises()?;
            if exercises.is_empty() {
                println!("No exercises yet. Seed some with the built-in catalog or 'exercise add'.");
                return Ok(());
            }
            for exercise in exercises {
                let rate = exercise
                    .kcal_burned_per_unit
                    .map(|r| format!("{} kcal/unit", r))
                    .unwrap_or_else(|| "rate unknown".into());
                println!(
                    "  {}  {:<24} {:<10} {}",
                    exercise.id,
                    exercise.name,
                    exercise.category.as_str(),
                    rate
                );
            }
            Ok(())
        }
        ExerciseAction::Remove { exercise } => {
            let found = resolve_exercise(store, &exercise)?;
            let removed = store.remove_exercise(found.id)?;
            println!(
                "✓ Removed '{}' and {} dependent check-in(s)",
                found.name, removed
            );
            Ok(())
        }
    }
}

fn cmd_meal(store: &Store, action: MealAction) -> Result<()> {
    match action {
        MealAction::Add {
            name,
            calories,
            protein,
            carbs,
            fat,
            fiber,
            sodium,
            serving_size,
            serving_unit,
        } => {
            let meal = Meal {
                id: Uuid::new_v4(),
                name,
                nutrition: Nutrition {
                    calories: parse_non_negative("calories", &calories)?,
                    protein_g: parse_non_negative("protein", &protein)?,
                    carbs_g: parse_non_negative("carbs", &carbs)?,
                    fat_g: parse_non_negative("fat", &fat)?,
                    fiber_g: parse_non_negative("fiber", &fiber)?,
                    sodium_mg: parse_non_negative("sodium", &sodium)?,
                    sugar_g: None,
                    cholesterol_mg: None,
                },
                serving_size: parse_positive("serving size", &serving_size)?,
                serving_unit,
                score: None,
            };
            let id = store.add_meal(meal.clone())?;
            println!("✓ Added meal '{}' ({})", meal.name, id);
            Ok(())
        }
        MealAction::List => {
            let meals = store.list_meals()?;
            if meals.is_empty() {
                println!("No meals yet. Add one with 'meal add'.");
                return Ok(());
            }
            for meal in meals {
                println!(
                    "  {}  {:<24} {} kcal / {}{}",
                    meal.id,
                    meal.name,
                    meal.nutrition.calories,
                    meal.serving_size,
                    meal.serving_unit
                );
            }
            Ok(())
        }
        MealAction::Remove { meal } => {
            let found = resolve_meal(store, &meal)?;
            let removed = store.remove_meal(found.id)?;
            println!(
                "✓ Removed '{}' and {} dependent check-in(s)",
                found.name, removed
            );
            Ok(())
        }
    }
}

fn cmd_log(
    store: &Store,
    exercise: &str,
    weight: Option<f64>,
    reps: Option<u32>,
    sets: Option<u32>,
    notes: Option<String>,
) -> Result<()> {
    let found = resolve_exercise(store, exercise)?;
    let log = store.log_exercise(
        found.id,
        weight.unwrap_or(found.default_weight),
        reps.unwrap_or(found.default_reps),
        sets.unwrap_or(found.default_sets),
        Utc::now(),
        notes,
    )?;
    println!(
        "✓ Logged {}: {} sets x {} reps @ {} ({} kcal burned)",
        found.name, log.sets, log.reps, log.weight, log.calories_burned
    );
    Ok(())
}

fn cmd_eat(store: &Store, meal: &str, servings: &str, notes: Option<String>) -> Result<()> {
    let found = resolve_meal(store, meal)?;
    let multiplier = parse_positive("servings", servings)?;
    let check_in = store.check_in_meal(found.id, multiplier, Utc::now(), notes)?;
    println!(
        "✓ Checked in {} x{} ({} kcal)",
        found.name, check_in.multiplier, check_in.total_calories
    );
    Ok(())
}

fn cmd_goal(store: &Store, action: GoalAction) -> Result<()> {
    match action {
        GoalAction::Show => {
            let goal = store.goal()?;
            println!("Daily goal:");
            println!("  calories: {} kcal", goal.calories_goal);
            println!("  carbs:    {} g", goal.carbs_goal_g);
            println!("  protein:  {} g", goal.protein_goal_g);
            println!("  fat:      {} g", goal.fat_goal_g);
            println!("  fiber:    {} g", goal.fiber_goal_g);
            println!("  sodium:   {} mg", goal.sodium_goal_mg);
            Ok(())
        }
        GoalAction::Set {
            calories,
            carbs,
            protein,
            fat,
            fiber,
            sodium,
        } => {
            let mut goal = store.goal()?;
            if let Some(v) = calories {
                goal.calories_goal = v;
            }
            if let Some(v) = carbs {
                goal.carbs_goal_g = v;
            }
            if let Some(v) = protein {
                goal.protein_goal_g = v;
            }
            if let Some(v) = fat {
                goal.fat_goal_g = v;
            }
            if let Some(v) = fiber {
                goal.fiber_goal_g = v;
            }
            if let Some(v) = sodium {
                goal.sodium_goal_mg = v;
            }
            store.set_goal(goal)?;
            println!("✓ Goal updated");
            Ok(())
        }
    }
}

fn cmd_piece(store: &Store, action: PieceAction) -> Result<()> {
    match action {
        PieceAction::Add { name, value } => {
            let value: u32 = value.trim().parse().map_err(|_| {
                Error::Validation(format!("value must be a positive integer, got '{}'", value))
            })?;
            let piece = Piece {
                id: Uuid::new_v4(),
                name,
                value,
            };
            let id = store.add_piece(piece.clone())?;
            println!("✓ Added piece '{}' = {} ({})", piece.name, piece.value, id);
            Ok(())
        }
        PieceAction::List => {
            for piece in store.list_pieces()? {
                println!("  {}  {:<24} {}", piece.id, piece.name, piece.value);
            }
            Ok(())
        }
        PieceAction::Remove { piece } => {
            let found = resolve_piece(store, &piece)?;
            store.remove_piece(found.id)?;
            println!("✓ Removed piece '{}'", found.name);
            Ok(())
        }
    }
}

fn cmd_progress(store: &Store, config: &Config, days: u32, period: &str) -> Result<()> {
    let period = match period.to_lowercase().as_str() {
        "day" => Period::Day,
        "week" => Period::Week,
        "month" => Period::Month,
        other => {
            return Err(Error::Validation(format!(
                "unknown period '{}' (expected day, week or month)",
                other
            )))
        }
    };

    let end = Utc::now().date_naive();
    let start = end - Duration::days(days.saturating_sub(1) as i64);
    let check_ins = store.check_ins_between(start, end)?;
    let goal = store.goal()?;

    // TEF bonus from the macros actually consumed in the range
    let tef_bonus = if config.tracking.apply_tef {
        let library = store.library()?;
        let (mut protein, mut carbs, mut fat) = (0.0, 0.0, 0.0);
        for ci in check_ins.iter().filter_map(|c| c.as_meal()) {
            if let Some(meal) = library.meals.get(&ci.meal_id) {
                protein += meal.nutrition.protein_g * ci.multiplier;
                carbs += meal.nutrition.carbs_g * ci.multiplier;
                fat += meal.nutrition.fat_g * ci.multiplier;
            }
        }
        Some(thermic_effect(protein, carbs, fat))
    } else {
        None
    };

    let options = ProgressOptions {
        include_exercise: config.tracking.include_exercise,
        tef_bonus,
    };
    let summary = summarize(&check_ins, &goal, start, end, &options);

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  PROGRESS {} to {}", start, end);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Consumed: {:.0} kcal", summary.consumed);
    println!("  Burned:   {:.0} kcal", summary.burned);
    if let Some(tef) = options.tef_bonus {
        println!("  TEF:      {:.0} kcal", tef);
    }
    println!("  Net:      {:.0} kcal", summary.net_consumed);
    println!(
        "  Goal:     {:.0} kcal over {} day(s)",
        summary.period_goal, summary.days
    );
    if summary.balance >= 0.0 {
        println!("  Balance:  {:.0} kcal under goal", summary.balance);
    } else {
        println!("  Balance:  {:.0} kcal over goal", -summary.balance);
    }

    let buckets = bucket(&check_ins, period);
    if !buckets.is_empty() {
        println!();
        for b in buckets {
            println!(
                "  {}  consumed {:.0}  burned {:.0}",
                b.start, b.consumed, b.burned
            );
        }
    }
    println!();
    Ok(())
}

fn cmd_export(store: &Store, dir: &std::path::Path) -> Result<()> {
    let report = export_bundle(store, dir)?;
    println!("✓ Exported {} records to {}", report.total(), dir.display());
    for (table, count) in &report.tables {
        println!("  {:<12} {}", table, count);
    }
    Ok(())
}

fn cmd_import(store: &Store, config: &Config, dir: &std::path::Path) -> Result<()> {
    let mut last_table = String::new();
    let report = import_bundle(store, dir, |p| {
        if p.table != last_table {
            println!("  importing {} ...", p.table);
            last_table = p.table.clone();
        }
    })?;

    print!("{}", report.format_summary(&config.import));

    if !report.is_success {
        return Err(Error::Bundle("import failed during setup".into()));
    }
    Ok(())
}

fn cmd_food(store: &Store, query: &str, barcode: bool, add: bool) -> Result<()> {
    let catalog_path = store.data_dir().join("catalogs").join("foods.json");
    let catalog = FileFoodCatalog::load(&catalog_path);

    let records = if barcode {
        catalog.by_barcode(query)?.into_iter().collect()
    } else {
        catalog.search(query)?
    };

    if records.is_empty() {
        println!("No matches for '{}'", query);
        return Ok(());
    }

    for record in &records {
        println!(
            "  {:<28} {} kcal / {}{}",
            record.name,
            record.calories,
            record.serving_size.unwrap_or(100.0),
            record.serving_unit.as_deref().unwrap_or("g")
        );
    }

    if add {
        let meal = records[0].clone().into_meal();
        let id = store.add_meal(meal.clone())?;
        println!("✓ Added meal '{}' ({})", meal.name, id);
    }
    Ok(())
}

fn cmd_find_exercise(
    store: &Store,
    name: Option<String>,
    muscle: Option<String>,
    equipment: Option<String>,
    category: Option<String>,
    add: bool,
) -> Result<()> {
    let catalog_path = store.data_dir().join("catalogs").join("exercises.json");
    let catalog = FileExerciseCatalog::load(&catalog_path);

    let query = ExerciseQuery {
        name,
        muscle,
        equipment,
        category: category.as_deref().map(ExerciseCategory::parse).transpose()?,
    };
    let records = catalog.search(&query)?;

    if records.is_empty() {
        println!("No matches");
        return Ok(());
    }

    for record in &records {
        println!(
            "  {:<28} {:<10} {}",
            record.name,
            record.category.as_str(),
            record
                .kcal_burned_per_unit
                .map(|r| format!("{} kcal/unit", r))
                .unwrap_or_else(|| "rate unknown".into())
        );
    }

    if add {
        let exercise = records[0].clone().into_exercise();
        let id = store.add_exercise(exercise.clone())?;
        println!("✓ Added exercise '{}' ({})", exercise.name, id);
    }
    Ok(())
}
