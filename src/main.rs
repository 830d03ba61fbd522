use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use sieve::classifier::ClassifierHandle;
use sieve::config::Config;
use sieve::db::models::{ContentKind, Disposition};
use sieve::db::sqlite::SqliteDatabase;
use sieve::db::Database;
use sieve::error::ModerationError;
use sieve::metrics::MetricsAggregator;
use sieve::output::terminal;
use sieve::pipeline::{ContentProcessor, ModerateRequest};
use sieve::training::{dataset, Trainer};

/// Sieve: content moderation pipeline.
///
/// Scores submissions per policy category, decides a disposition, and keeps
/// an auditable trail of automated and human decisions.
#[derive(Parser)]
#[command(name = "sieve", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Moderate a single piece of content
    Moderate {
        /// The content to moderate
        content: String,

        /// Content type: text, image, or video
        #[arg(long, default_value = "text")]
        content_type: String,

        /// Submitting user id
        #[arg(long)]
        user_id: Option<i64>,

        /// JSON metadata, e.g. '{"filename":"photo.png"}'
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Moderate a batch of items from a JSON file
    Batch {
        /// JSON array of {content, content_type?, user_id?, metadata?}
        file: PathBuf,
    },

    /// Show a content item with its flags and audit history
    Show { content_id: i64 },

    /// Apply a human decision to one content item
    Decide {
        content_id: i64,

        /// approved or rejected
        status: String,

        /// Reviewing user id
        #[arg(long)]
        user_id: Option<i64>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Apply the same decision to many content items
    BatchDecide {
        /// approved or rejected
        status: String,

        /// Content ids to update
        content_ids: Vec<i64>,

        /// Reviewing user id
        #[arg(long)]
        user_id: Option<i64>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Classify and explain a text without persisting it
    Evaluate { text: String },

    /// Train per-category models from a CSV dataset
    Train {
        /// CSV with text,category,label columns (or one column per category)
        file: PathBuf,

        /// Fraction of data held out for evaluation
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        /// Random seed for the reproducible split
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Generate a labeled sample dataset
    SampleData {
        /// Number of rows to generate
        #[arg(long, default_value = "100")]
        count: usize,

        /// Fraction of intentionally mislabeled rows
        #[arg(long, default_value = "0.15")]
        noise: f64,

        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output path (defaults to <data dir>/sample_training_data.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show model artifact info (categories, thresholds, age)
    ModelInfo,

    /// Show metric series over a trailing window
    Metrics {
        #[arg(long, default_value = "7")]
        days: i64,
    },

    /// Run the daily metrics aggregation for today
    Aggregate,

    /// Get, set, or list moderation settings
    Setting {
        name: Option<String>,
        value: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Show system status (queue, DB stats, model age)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sieve=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Init => {
            let db = init_database(&config).await?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nSieve is ready. Try:");
            println!("  sieve moderate \"some text to score\"");
            println!("  sieve sample-data && sieve train data/sample_training_data.csv");
        }

        Commands::Moderate {
            content,
            content_type,
            user_id,
            metadata,
        } => {
            let db = open_database(&config).await?;
            let classifier = Arc::new(ClassifierHandle::open(&config.model_path));
            let processor = ContentProcessor::new(db, classifier);

            let metadata = metadata
                .map(|m| serde_json::from_str::<serde_json::Value>(&m))
                .transpose()
                .context("Invalid metadata JSON")?;

            let record = processor
                .process(
                    &content,
                    ContentKind::parse_or_text(&content_type),
                    user_id,
                    metadata,
                )
                .await?;
            terminal::display_moderation_result(&record);
        }

        Commands::Batch { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read batch file {}", file.display()))?;
            let items: Vec<ModerateRequest> =
                serde_json::from_str(&raw).context("Batch file must be a JSON array of items")?;
            let submitted = items.len();

            let db = open_database(&config).await?;
            let classifier = Arc::new(ClassifierHandle::open(&config.model_path));
            let processor = ContentProcessor::new(db, classifier);

            let results = processor.batch_process(items).await;
            terminal::display_batch_summary(&results, submitted);
        }

        Commands::Show { content_id } => {
            let db = open_database(&config).await?;
            let classifier = Arc::new(ClassifierHandle::new(Default::default()));
            let processor = ContentProcessor::new(db.clone(), classifier);

            let view = processor.get_content(content_id).await?;
            let actions = db.get_actions(content_id).await?;
            terminal::display_content_detail(&view, &actions);
        }

        Commands::Decide {
            content_id,
            status,
            user_id,
            notes,
        } => {
            let disposition = Disposition::parse(&status)
                .ok_or_else(|| ModerationError::InvalidStatus(status.clone()))?;

            let db = open_database(&config).await?;
            let classifier = Arc::new(ClassifierHandle::new(Default::default()));
            let processor = ContentProcessor::new(db, classifier);

            let updated = processor
                .update_status(content_id, disposition, user_id, notes)
                .await?;
            println!(
                "Content #{} is now {} (updated {})",
                content_id, updated.disposition, updated.last_updated
            );
        }

        Commands::BatchDecide {
            status,
            content_ids,
            user_id,
            notes,
        } => {
            let disposition = Disposition::parse(&status)
                .ok_or_else(|| ModerationError::InvalidStatus(status.clone()))?;

            let db = open_database(&config).await?;
            let classifier = Arc::new(ClassifierHandle::new(Default::default()));
            let processor = ContentProcessor::new(db, classifier);

            let updated = processor
                .batch_update_status(&content_ids, disposition, user_id, notes)
                .await;
            println!("Updated {updated}/{} content item(s)", content_ids.len());
        }

        Commands::Evaluate { text } => {
            let classifier = Arc::new(ClassifierHandle::open(&config.model_path));
            let trainer = Trainer::new(classifier, config.model_path.clone());
            let evaluations = trainer.evaluate_text(&text);
            terminal::display_evaluation(&evaluations);
        }

        Commands::Train {
            file,
            test_fraction,
            seed,
        } => {
            let classifier = Arc::new(ClassifierHandle::open(&config.model_path));
            let trainer = Trainer::new(classifier, config.model_path.clone());
            let report = trainer.train_from_file(&file, test_fraction, seed)?;
            terminal::display_training_report(&report);
        }

        Commands::SampleData {
            count,
            noise,
            seed,
            output,
        } => {
            let path = output
                .unwrap_or_else(|| config.data_dir.join("sample_training_data.csv"));
            dataset::generate_sample(&path, count, noise, seed)?;
            println!("Sample training data written to {}", path.display());
        }

        Commands::ModelInfo => {
            let classifier = Arc::new(ClassifierHandle::open(&config.model_path));
            let trainer = Trainer::new(classifier, config.model_path.clone());
            terminal::display_model_info(&trainer.model_info());
        }

        Commands::Metrics { days } => {
            let db = open_database(&config).await?;
            let aggregator = MetricsAggregator::new(db);
            let series = aggregator.get_metrics(days).await?;
            terminal::display_metrics(&series);
        }

        Commands::Aggregate => {
            let db = open_database(&config).await?;
            let aggregator = MetricsAggregator::new(db);
            let written = aggregator.generate_daily(Utc::now().date_naive()).await?;
            if written.is_empty() {
                println!("All metrics for today were already recorded.");
            } else {
                println!("Recorded metrics: {}", written.join(", "));
            }
        }

        Commands::Setting {
            name,
            value,
            description,
        } => {
            let db = open_database(&config).await?;
            match (name, value) {
                (Some(name), Some(value)) => {
                    db.set_setting(&name, &value, description.as_deref()).await?;
                    println!("{name} = {value}");
                }
                (Some(name), None) => match db.get_setting(&name).await? {
                    Some(setting) => println!("{} = {}", setting.name, setting.value),
                    None => println!("{name} is not set"),
                },
                (None, _) => {
                    terminal::display_settings(&db.list_settings().await?);
                }
            }
        }

        Commands::Status => {
            if !std::path::Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `sieve init` to set up the database.");
                return Ok(());
            }
            let db = open_database(&config).await?;
            sieve::status::show(&db, &config.db_path, &config.model_path).await?;
        }
    }

    Ok(())
}

async fn init_database(config: &Config) -> Result<Arc<dyn Database>> {
    let conn = sieve::db::initialize(&config.db_path)?;
    Ok(Arc::new(SqliteDatabase::new(conn)))
}

async fn open_database(config: &Config) -> Result<Arc<dyn Database>> {
    let conn = sieve::db::open(&config.db_path)?;
    Ok(Arc::new(SqliteDatabase::new(conn)))
}
