use std::env;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cmm_indexer::{load_repositories, Dependencies, IndexingError, Settings};
use cmm_indexer_repository::ALL_LANGUAGES;

#[derive(Parser)]
#[command(name = "cmm-indexer")]
#[command(about = "Harvests study metadata over OAI-PMH into per-language search indices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest every configured repository and index its studies
    Harvest {
        /// Only harvest records modified after the newest indexed study
        #[arg(long)]
        incremental: bool,
        /// Rebuild the theme indices once harvesting is done
        #[arg(long)]
        reindex_themes: bool,
    },
    /// Rebuild the theme indices from the study indices
    ReindexThemes,
    /// Print the number of indexed studies
    Count {
        /// Language to count, all languages when omitted
        #[arg(long, default_value = ALL_LANGUAGES)]
        lang: String,
    },
}

/// Initialize tracing; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(cli: Cli) -> Result<ExitCode, IndexingError> {
    let mut settings = Settings::from_env()?;

    match cli.command {
        Commands::Harvest {
            incremental,
            reindex_themes,
        } => {
            settings.incremental |= incremental;
            settings.reindex_themes = reindex_themes;

            let repositories = load_repositories(&settings.repositories_file).await?;
            let deps = Dependencies::new(&settings).await?;
            let summary = deps.orchestrator.run(repositories).await?;

            for report in summary.incomplete() {
                warn!(
                    repository = %report.code,
                    cancelled = report.cancelled,
                    error = report.error.as_deref().unwrap_or_default(),
                    "Repository did not complete"
                );
            }
            if let Some(themes) = &summary.themes {
                info!(
                    themes = themes.themes,
                    written = themes.written,
                    deleted = themes.deleted,
                    failed = ?themes.failed,
                    "Themes reindexed"
                );
            }

            Ok(if summary.incomplete().count() == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::ReindexThemes => {
            let deps = Dependencies::new(&settings).await?;
            for lang in &settings.languages {
                deps.index.refresh(lang).await?;
            }
            let summary = deps.index.reindex_all_themes().await?;
            info!(
                themes = summary.themes,
                written = summary.written,
                missing_siblings = summary.missing_siblings,
                deleted = summary.deleted,
                failed = ?summary.failed,
                "Themes reindexed"
            );
            Ok(if summary.failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Count { lang } => {
            let deps = Dependencies::new(&settings).await?;
            let count = deps.index.get_total_hit_count(&lang).await?;
            println!("{}", count);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Indexer failed");
            ExitCode::FAILURE
        }
    }
}
