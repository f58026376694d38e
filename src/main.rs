use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

mod attendance;
mod collaborator;
mod config;
mod db;
mod error;
mod insights;
mod models;
mod prompt;
mod report;
mod slot;

use config::Config;
use error::InsightError;
use slot::InsightSlot;

#[derive(Parser)]
#[command(name = "attendance-insights")]
#[command(about = "Attendance tracking with generated truancy insights", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo class with two weeks of attendance
    Seed,
    /// Import attendance marks from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Summarize attendance per student
    Summary {
        #[arg(long)]
        class: String,
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Request generated attendance insights for a class
    Insights {
        #[arg(long)]
        class: String,
        /// Overrides the stored class descriptor
        #[arg(long)]
        descriptor: Option<String>,
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Also write a markdown report
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&cli.config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&cli.config).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&cli.config).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} attendance marks from {}.", csv.display());
        }
        Commands::Summary {
            class,
            since_days,
            limit,
        } => {
            let pool = connect(&cli.config).await?;
            let class = db::fetch_class(&pool, &class).await?;
            let since_date = attendance::cutoff_date(since_days)?;
            let records = db::fetch_attendance(&pool, &class.name, since_date).await?;

            if records.is_empty() {
                println!("No attendance found for this window.");
                return Ok(());
            }

            println!(
                "{} ({}) attendance rate {:.1}% since {}",
                class.name,
                class.descriptor,
                attendance::attendance_rate(&records),
                since_date
            );
            for summary in attendance::summarize_students(&records).iter().take(limit) {
                println!(
                    "- {}: {} absences in {} school days ({:.1}% present)",
                    summary.student_id,
                    summary.absences,
                    summary.school_days,
                    summary.attendance_rate
                );
            }
        }
        Commands::Insights {
            class,
            descriptor,
            since_days,
            format,
            out,
        } => {
            let collaborator = cli.config.collaborator()?;
            let pool = connect(&cli.config).await?;
            let mut class = db::fetch_class(&pool, &class).await?;
            if let Some(descriptor) = descriptor {
                class.descriptor = descriptor;
            }
            let since_date = attendance::cutoff_date(since_days)?;
            let records = db::fetch_attendance(&pool, &class.name, since_date).await?;

            let slot = InsightSlot::new();
            let _busy = slot
                .begin()
                .context("an insight request is already in flight")?;

            slot.refresh(&collaborator, &records, &class.descriptor)
                .await
                .map_err(failure_context)?;
            let result = slot
                .current()
                .await
                .context("insight slot is empty after a successful request")?;

            match format {
                Format::Text => print!("{}", report::render_insight(&result)),
                Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            }

            if let Some(out) = out {
                let markdown = report::build_report(&class, since_date, &records, &result);
                std::fs::write(&out, markdown)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                info!(path = %out.display(), "report written");
            }
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

/// Tags a failed request with its kind; anyhow prints the cause once on exit.
fn failure_context(err: InsightError) -> anyhow::Error {
    let context = if !err.is_generation_failure() {
        "insight request rejected"
    } else if matches!(err, InsightError::Transport(_)) {
        "insight generation failed (transport)"
    } else {
        "insight generation failed (validation)"
    };
    anyhow::Error::new(err).context(context)
}
