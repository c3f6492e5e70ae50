//! Bloomwatch CLI - Command-line access to NDVI predictions and observations

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bloomwatch::predictor::Prediction;
use bloomwatch::{
    AppConfig, FixtureSource, JsonlObservationStore, ObservationFilter, ObservationStore,
    PredictRequest, PredictionService,
};

#[derive(Parser)]
#[command(name = "bloomwatch")]
#[command(author, version, about = "NDVI prediction CLI for Kenyan counties", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Forecasting service base URL (overrides PYTHON_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Path to the mock predictions file (overrides MOCK_PREDICTIONS_PATH)
    #[arg(long)]
    fixture_path: Option<PathBuf>,

    /// Path to the observation archive (overrides OBSERVATIONS_PATH)
    #[arg(long)]
    observations_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict NDVI for a city on a date
    Predict {
        /// City or county name
        #[arg(short, long)]
        city: String,

        /// Target date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Skip the forecasting service and answer from fixtures
        #[arg(long)]
        offline: bool,
    },

    /// List archived observations
    Blooms {
        /// Only this county
        #[arg(short, long)]
        county: Option<String>,

        /// Only this year
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// List mock prediction fixtures
    Fixtures,
}

struct CliContext {
    service: PredictionService,
    observations: Arc<dyn ObservationStore>,
}

impl CliContext {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = AppConfig::from_env().context("Invalid configuration")?;
        if let Some(ref url) = cli.api_url {
            config.forecast_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ref path) = cli.fixture_path {
            config.fixture_path = path.clone();
        }
        if let Some(ref path) = cli.observations_path {
            config.observations_path = path.clone();
        }

        let observations: Arc<dyn ObservationStore> =
            Arc::new(JsonlObservationStore::new(&config.observations_path));
        let service = PredictionService::from_config(&config, observations.clone())
            .context("Failed to build forecast client")?;

        Ok(Self {
            service,
            observations,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    println!(
        "{}",
        format!("Bloomwatch CLI v{}", env!("CARGO_PKG_VERSION")).cyan().bold()
    );
    println!();

    let ctx = CliContext::from_cli(&cli)?;

    if cli.interactive {
        run_interactive(&ctx).await?;
    } else if let Some(command) = cli.command {
        match command {
            Commands::Predict {
                city,
                date,
                offline,
            } => {
                predict(&ctx, &city, &date, offline).await?;
            }
            Commands::Blooms { county, year } => {
                list_blooms(&ctx, ObservationFilter { county, year })?;
            }
            Commands::Fixtures => {
                list_fixtures(ctx.service.resolver().fixtures())?;
            }
        }
    } else {
        println!("Use --help for usage information or --interactive for interactive mode.");
    }

    Ok(())
}

async fn predict(ctx: &CliContext, city: &str, date: &str, offline: bool) -> Result<()> {
    println!("{}: {} / {}", "Predicting".green(), city, date);
    println!();

    let request = PredictRequest::new(city, date);

    let prediction = if offline {
        ctx.service.predict_offline(&request)?
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.set_message(format!("Asking {}...", ctx.service.forecast_url()));
        pb.enable_steady_tick(Duration::from_millis(100));

        let result = ctx.service.predict(&request).await;
        pb.finish_and_clear();
        result?
    };

    print_prediction(&prediction);
    Ok(())
}

fn print_prediction(prediction: &Prediction) {
    let json = prediction.to_json();
    let field = |key: &str| match json.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    };

    let source = if prediction.is_fallback() {
        prediction.source().yellow()
    } else {
        prediction.source().green()
    };

    println!("{}", "Prediction:".yellow().bold());
    println!("{:<16} {}", "Source", source);
    println!("{:<16} {}", "City", field("city"));
    println!("{:<16} {}", "Date", field("date"));
    println!("{:<16} {}", "NDVI", field("predicted_ndvi"));
    println!("{:<16} {}", "Interpretation", field("interpretation"));
    println!(
        "{:<16} {}, {}",
        "Coordinates",
        field("latitude"),
        field("longitude")
    );

    let anomaly = json.get("anomaly").and_then(|v| v.as_bool()).unwrap_or(false);
    println!(
        "{:<16} {}",
        "Anomaly",
        if anomaly { "yes".red().bold() } else { "no".normal() }
    );
}

fn list_blooms(ctx: &CliContext, filter: ObservationFilter) -> Result<()> {
    let observations = ctx
        .observations
        .query(&filter)
        .context("Failed to read observations")?;

    if observations.is_empty() {
        println!("{}", "No observations found.".red());
        return Ok(());
    }

    println!("{}", "Observations:".yellow().bold());
    println!(
        "{:<12} {:<16} {:>6} {:>9} {:>9} {:<9} {}",
        "Date", "County", "NDVI", "Lat", "Lon", "Status", "Anomaly"
    );
    println!("{}", "-".repeat(76));

    for obs in &observations {
        let status = match obs.status {
            bloomwatch::VegetationStatus::Healthy => obs.status.as_str().green(),
            bloomwatch::VegetationStatus::Moderate => obs.status.as_str().yellow(),
            bloomwatch::VegetationStatus::Stressed => obs.status.as_str().red(),
        };
        println!(
            "{:<12} {:<16} {:>6.3} {:>9.4} {:>9.4} {:<9} {}",
            obs.date,
            obs.county,
            obs.ndvi,
            obs.lat,
            obs.lon,
            status,
            if obs.anomaly { "!" } else { "" }
        );
    }

    println!();
    println!("{} observation(s)", observations.len());
    Ok(())
}

fn list_fixtures(store: &dyn FixtureSource) -> Result<()> {
    let table = store
        .load()
        .with_context(|| format!("Failed to load fixtures from {}", store.location()))?;

    if table.is_empty() {
        println!("{}", "Fixture file has no entries.".red());
        return Ok(());
    }

    println!("{}", "Fixtures:".yellow().bold());
    for key in table.keys() {
        let desc = table
            .get(key)
            .map(|entry| entry.describe())
            .unwrap_or_else(|| "unusable entry".to_string());
        println!("  {:<20} {}", key, desc);
    }

    Ok(())
}

async fn run_interactive(ctx: &CliContext) -> Result<()> {
    println!("{}", "Interactive mode".green().bold());
    println!();

    let theme = ColorfulTheme::default();

    loop {
        let options = vec!["Predict NDVI", "List observations", "List fixtures", "Quit"];

        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 => {
                let city: String = Input::with_theme(&theme)
                    .with_prompt("City")
                    .interact_text()?;

                let date: String = Input::with_theme(&theme)
                    .with_prompt("Date (YYYY-MM-DD)")
                    .interact_text()?;

                let offline = Select::with_theme(&theme)
                    .with_prompt("Use the forecasting service?")
                    .items(&["Yes", "No, fixtures only"])
                    .default(0)
                    .interact()?
                    == 1;

                println!();
                if let Err(e) = predict(ctx, &city, &date, offline).await {
                    println!("{} {:#}", "Error:".red().bold(), e);
                }
                println!();
            }
            1 => {
                let county: String = Input::with_theme(&theme)
                    .with_prompt("County (empty for all)")
                    .allow_empty(true)
                    .interact_text()?;

                let county = Some(county.trim().to_string()).filter(|c| !c.is_empty());

                println!();
                list_blooms(ctx, ObservationFilter { county, year: None })?;
                println!();
            }
            2 => {
                println!();
                if let Err(e) = list_fixtures(ctx.service.resolver().fixtures()) {
                    println!("{} {:#}", "Error:".red().bold(), e);
                }
                println!();
            }
            _ => break,
        }
    }

    Ok(())
}
