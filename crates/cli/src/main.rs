//! `vidstats` -- frequency statistics for a video annotation project.
//!
//! Scans every annotation of a locally stored project and prints per-class
//! and per-tag tables to stdout. Logs go to stderr. `Ctrl-C` stops the run
//! at the next dataset boundary and prints a partial report.
//!
//! # Environment variables
//!
//! | Variable                 | Required | Default    | Description                          |
//! |--------------------------|----------|------------|--------------------------------------|
//! | `VIDSTATS_PROJECT_ID`    | yes      | --         | Project directory name under the root |
//! | `VIDSTATS_DATASET_ID`    | no       | --         | Only scan this dataset (id or name)  |
//! | `VIDSTATS_PROJECTS_ROOT` | no       | `.`        | Root of the local project store      |
//! | `VIDSTATS_STATS`         | no       | `both`     | `classes`, `tags` or `both`          |
//! | `VIDSTATS_OUTPUT`        | no       | `markdown` | `markdown` or `json`                 |
//! | `VIDSTATS_ON_MALFORMED`  | no       | `abort`    | `abort` or `skip`                    |
//! | `VIDSTATS_BATCH_SIZE`    | no       | `10`       | Annotations downloaded concurrently  |

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidstats_cli::config::StatsConfig;
use vidstats_cli::output;
use vidstats_pipeline::local::LocalProjectSource;
use vidstats_pipeline::progress::TracingProgress;
use vidstats_pipeline::runner;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vidstats=info,vidstats_cli=info,vidstats_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = StatsConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        project_id = %config.project_id,
        dataset = config.dataset_id.as_deref().unwrap_or("all"),
        root = %config.projects_root.display(),
        stats = config.families.as_str(),
        on_malformed = config.on_malformed.as_str(),
        batch_size = config.batch_size,
        "Starting vidstats",
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current dataset");
            interrupt.cancel();
        }
    });

    let source = LocalProjectSource::new(config.projects_root.clone());
    let outcome = runner::run(&source, &config.run_options(), &TracingProgress, &cancel)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Statistics run failed");
            std::process::exit(1);
        });

    match output::render(&outcome, config.output) {
        Ok(text) => print!("{text}"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render report");
            std::process::exit(1);
        }
    }
}
