//! # convkit CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `convkit units [category]` | List categories and units |
//! | `convkit convert <value> <from> <to>` | Convert a value between units |
//! | `convkit ask "<question>"` | Ask the chatbot about the site |
//! | `convkit bmi --weight-kg W --height-m H` | Compute body-mass index |
//!
//! ## Examples
//!
//! ```bash
//! convkit convert 1000 meter km
//! convkit convert -40 C F
//! convkit ask "what can this website do?"
//! convkit bmi --weight-kg 70 --height-cm 175 --curve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use convkit::{bmi, chat, config, convert};

/// convkit: unit converter, reference chatbot and BMI calculator.
#[derive(Parser)]
#[command(name = "convkit", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/convkit.toml` when that file exists, otherwise
    /// built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List unit categories and their units.
    Units {
        /// Only list this category (Length, Mass, Temperature, Time).
        category: Option<String>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Convert a value between two units of the same category.
    ///
    /// Units are matched by name or symbol, case-insensitively.
    Convert {
        /// The value to convert.
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Source unit (e.g. `Meter`, `km`, `F`).
        from: String,

        /// Target unit.
        to: String,

        /// Category; inferred from the source unit when omitted.
        #[arg(long)]
        category: Option<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Ask the chatbot a question about the site.
    ///
    /// Questions that look like unit conversions are redirected to
    /// `convkit convert` without loading the embedding model.
    Ask {
        question: String,

        /// Minimum similarity for an answer (overrides `chat.threshold`).
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f32>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Compute body-mass index.
    Bmi {
        /// Weight in kilograms.
        #[arg(long)]
        weight_kg: f64,

        /// Height in meters.
        #[arg(long, conflicts_with = "height_cm", required_unless_present = "height_cm")]
        height_m: Option<f64>,

        /// Height in centimeters.
        #[arg(long)]
        height_cm: Option<f64>,

        /// Also print BMI across a range of heights.
        #[arg(long)]
        curve: bool,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::resolve_config(cli.config.as_deref())?;
    init_logging(&cfg.logging.filter);

    match cli.command {
        Commands::Units { category, json } => {
            convert::run_units(category.as_deref(), json)?;
        }
        Commands::Convert {
            value,
            from,
            to,
            category,
            json,
        } => {
            convert::run_convert(&value, &from, &to, category.as_deref(), json)?;
        }
        Commands::Ask {
            question,
            threshold,
            json,
        } => {
            chat::run_ask(&cfg, &question, threshold, json).await?;
        }
        Commands::Bmi {
            weight_kg,
            height_m,
            height_cm,
            curve,
            json,
        } => {
            bmi::run_bmi(weight_kg, height_m, height_cm, curve, json)?;
        }
    }

    Ok(())
}
