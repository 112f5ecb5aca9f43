use std::io::{self, BufWriter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod aggregate;
mod committee;
mod config;
mod db;
mod error;
mod http;
mod models;
mod pdf;
mod report;
mod service;
mod store;
mod sweeper;
mod window;

use committee::CommitteeTable;
use config::Config;
use db::PgComplaintStore;
use report::{MarkdownSink, RenderOutcome};
use service::ReportService;
use store::ComplaintStore;
use sweeper::RetentionSweeper;
use window::{Clock, FixedClock, SystemClock};

#[derive(Parser)]
#[command(name = "campus-complaint-reports")]
#[command(about = "Monthly complaint reports and retention for the campus complaint portal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed complaints
    Seed,
    /// Import complaints from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Serve the report API and run the retention sweeper
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run one retention sweep now
    Sweep,
    /// List the committees reports can be requested for
    Committees,
    /// Generate a committee report, or the admin report when no committee is given
    Report {
        #[arg(long)]
        committee: Option<String>,
        /// Output path, `-` for stdout with markdown. Defaults to report.pdf or report.md
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Pdf)]
        format: ReportFormat,
        /// Build the report as of this RFC 3339 instant instead of now
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Pdf,
    Markdown,
}

impl ReportFormat {
    fn default_out(self) -> PathBuf {
        match self {
            ReportFormat::Pdf => PathBuf::from("report.pdf"),
            ReportFormat::Markdown => PathBuf::from("report.md"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let committees = Arc::new(CommitteeTable::campus());

    match cli.command {
        Commands::Committees => {
            for committee in committees.committees() {
                println!("- {} ({})", committee.name, committee.category);
            }
        }
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            let inserted = db::seed(&pool).await?;
            println!("Inserted {inserted} seed complaints.");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} complaints from {}.", csv.display());
        }
        Commands::Sweep => {
            let store = open_store(&config).await?;
            let sweeper = RetentionSweeper::new(store, Arc::new(SystemClock), config.retention_days);
            let deleted = sweeper.sweep_once().await?;
            println!("Deleted {deleted} settled complaints.");
        }
        Commands::Serve { bind } => {
            let store = open_store(&config).await?;
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);

            let sweeper = RetentionSweeper::new(store.clone(), clock.clone(), config.retention_days);
            tokio::spawn(sweeper.run(config.sweep_schedule.clone()));

            let state = Arc::new(http::AppState {
                reports: ReportService::new(store, clock, committees, config.report.clone()),
                api_token: config.api_token.clone(),
            });
            if state.api_token.is_none() {
                info!("API_TOKEN not set, report endpoints rely on upstream authentication");
            }

            let address = bind.unwrap_or(config.bind);
            let listener = TcpListener::bind(address)
                .await
                .with_context(|| format!("failed to bind {address}"))?;
            info!("Server running on {address}");

            axum::serve(listener, http::router(state))
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            info!("Server shut down");
        }
        Commands::Report {
            committee,
            out,
            format,
            as_of,
        } => {
            let store = open_store(&config).await?;
            let clock: Arc<dyn Clock> = match as_of {
                Some(instant) => Arc::new(FixedClock(instant)),
                None => Arc::new(SystemClock),
            };
            let service = ReportService::new(store, clock, committees, config.report.clone());
            let out = out.unwrap_or_else(|| format.default_out());

            let report = match committee.as_deref() {
                Some(label) => match service.committee_report(label).await? {
                    Some(report) => report,
                    None => {
                        println!("Invalid committee type: {label}");
                        return Ok(());
                    }
                },
                None => service.admin_report().await?,
            };

            match format {
                ReportFormat::Pdf => {
                    let bytes = report.to_pdf()?;
                    std::fs::write(&out, bytes)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    println!("Report written to {}.", out.display());
                }
                ReportFormat::Markdown if out.as_os_str() == "-" => {
                    let mut sink = MarkdownSink::new(BufWriter::new(io::stdout().lock()));
                    if report.render_into(&mut sink)? == RenderOutcome::Aborted {
                        info!("stdout closed before the report finished");
                    }
                }
                ReportFormat::Markdown => {
                    let file = std::fs::File::create(&out)
                        .with_context(|| format!("failed to create {}", out.display()))?;
                    let mut sink = MarkdownSink::new(BufWriter::new(file));
                    report.render_into(&mut sink)?;
                    println!("Report written to {}.", out.display());
                }
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

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn ComplaintStore>> {
    Ok(Arc::new(PgComplaintStore::new(connect(config).await?)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::warn!("failed to install terminate handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
