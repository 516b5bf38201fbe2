mod commands;
mod config;
mod logging;
mod server;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    cmd_add, cmd_eligible, cmd_equivalences, cmd_evaluate, cmd_finalize, cmd_import,
    cmd_ingredients, cmd_project, cmd_remove, cmd_reset, cmd_show, cmd_suggest, cmd_swap,
};
use crate::config::Config;
use crate::session::SessionFile;
use ecoswap_core::FootprintService;

#[derive(Parser)]
#[command(
    name = "ecoswap",
    version,
    about = "Estimate a recipe's carbon footprint and find lower-emission swaps",
    long_about = "Build a recipe line by line, see how its CO2e compares with an average \
                  meal, and swap high-emission ingredients for nutritionally similar ones.\n\n\
                  Reference tables (ingredients.csv, nutrients.csv, footprints.csv and an \
                  optional units.csv) are read from the data directory."
)]
struct Cli {
    /// Directory holding the reference CSVs and the session recipe
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Per-meal baseline in kg CO2e (default: national household average)
    #[arg(long, global = true, value_name = "KG")]
    baseline: Option<f64>,
    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an ingredient line to the recipe
    Add {
        /// Ingredient description (case-insensitive)
        ingredient: String,
        /// Quantity (e.g. "200g", "1.5 kg", "2 tbsp"; a bare number is grams)
        quantity: String,
        /// Category to file the line under (default: the ingredient's food group)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Remove recipe lines by number
    Remove {
        /// Line numbers as shown by `show`
        #[arg(required = true)]
        lines: Vec<usize>,
    },
    /// Clear the recipe
    Reset,
    /// Show the recipe lines and total
    Show,
    /// Classify the recipe against the baseline
    Evaluate,
    /// List food groups with a lower footprint than an ingredient
    Eligible {
        /// Ingredient description
        ingredient: String,
    },
    /// Suggest a lower-emission substitute for a recipe line
    Suggest {
        /// Line number as shown by `show`
        line: usize,
        /// Food group to search (default: the first eligible one)
        #[arg(short, long)]
        category: Option<String>,
        /// Skip to the Nth-closest candidate (0 = closest)
        #[arg(short, long, default_value = "0")]
        attempt: usize,
        /// List every candidate in the category instead of one suggestion
        #[arg(long)]
        ranked: bool,
    },
    /// Replace a recipe line with another ingredient
    Swap {
        /// Line number as shown by `show`
        line: usize,
        /// Replacement ingredient description
        ingredient: String,
        /// Quantity of the replacement (e.g. "150g")
        quantity: String,
    },
    /// Translate kg CO2e into driving distance and trees
    Equivalences {
        /// Amount of CO2e in kg
        #[arg(allow_negative_numbers = true)]
        kg: f64,
    },
    /// Compare the recipe with its total before substitutions
    Finalize {
        /// Also write the report as JSON to this file
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
    },
    /// Project savings from eating the lower-emission meal over time
    Project {
        /// Emissions of the usual meal in kg (default: recipe total before swaps)
        #[arg(long, value_name = "KG")]
        current: Option<f64>,
        /// Emissions of the new meal in kg (default: current recipe total)
        #[arg(long, value_name = "KG")]
        new: Option<f64>,
        /// Meals per week (1-21)
        #[arg(short, long, default_value = "7")]
        meals: u32,
        /// Weeks to project (4-104)
        #[arg(short, long, default_value = "52")]
        weeks: u32,
    },
    /// Import ingredient lines from a Cooklang (.cook) file
    Import {
        /// Path to the .cook file
        file: PathBuf,
        /// Clear the recipe before importing
        #[arg(long)]
        replace: bool,
    },
    /// Browse the ingredient table
    Ingredients {
        /// Filter by description substring
        #[arg(short, long)]
        search: Option<String>,
        /// Filter by food group
        #[arg(short, long)]
        group: Option<String>,
        /// List food groups instead of ingredients
        #[arg(long, conflicts_with_all = ["search", "group"])]
        groups: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.data_dir, cli.baseline)?;
    let svc = FootprintService::from_dir(&config.data_dir, config.baseline)?;
    let session = SessionFile::new(&config.session_path);
    let json = cli.json;

    match cli.command {
        Commands::Add {
            ingredient,
            quantity,
            category,
        } => cmd_add(&svc, &session, &ingredient, &quantity, category.as_deref(), json),
        Commands::Remove { lines } => cmd_remove(&svc, &session, &lines, json),
        Commands::Reset => cmd_reset(&svc, &session, json),
        Commands::Show => cmd_show(&svc, &session, json),
        Commands::Evaluate => cmd_evaluate(&svc, &session, json),
        Commands::Eligible { ingredient } => cmd_eligible(&svc, &ingredient, json),
        Commands::Suggest {
            line,
            category,
            attempt,
            ranked,
        } => cmd_suggest(
            &svc,
            &session,
            line,
            category.as_deref(),
            attempt,
            ranked,
            json,
        ),
        Commands::Swap {
            line,
            ingredient,
            quantity,
        } => cmd_swap(&svc, &session, line, &ingredient, &quantity, json),
        Commands::Equivalences { kg } => cmd_equivalences(&svc, kg, json),
        Commands::Finalize { export } => cmd_finalize(&svc, &session, export.as_deref(), json),
        Commands::Project {
            current,
            new,
            meals,
            weeks,
        } => cmd_project(&svc, &session, current, new, meals, weeks, json),
        Commands::Import { file, replace } => cmd_import(&svc, &session, &file, replace, json),
        Commands::Ingredients {
            search,
            group,
            groups,
        } => cmd_ingredients(&svc, search.as_deref(), group.as_deref(), groups, json),
        Commands::Serve { port, bind } => server::start_server(svc, port, &bind).await,
    }
}
