//! The run driver.
//!
//! Resolves the project, narrows the requested statistic families to what
//! the metadata supports, then scans datasets one after another in listing
//! order. Within a dataset, annotations are downloaded in concurrent batches
//! and scanned sequentially in listing order, so results never depend on
//! download timing.
//!
//! Cancellation is checked before each dataset. A cancelled run still
//! returns a report over the datasets finished so far.

use std::str::FromStr;

use futures::future::try_join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use vidstats_core::accumulator::{DatasetPass, StatsAccumulator};
use vidstats_core::assembler::check_dataset_columns;
use vidstats_core::counters::DatasetSnapshot;
use vidstats_core::error::CoreError;
use vidstats_core::meta::{ProjectInfo, ProjectMeta, PROJECT_TYPE_VIDEOS};
use vidstats_core::report::{ReportSet, SkippedVideo, StatFamilies};

use crate::error::{PipelineError, SourceError};
use crate::progress::ProgressSink;
use crate::source::{load_meta, DatasetInfo, ProjectSource, VideoInfo};

/// Annotations downloaded concurrently when no batch size is configured.
pub const DEFAULT_BATCH_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What to do with a video whose annotation cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Stop the run with [`PipelineError::MalformedAnnotation`].
    #[default]
    Abort,
    /// Leave the video out and list it in [`ReportSet::skipped`].
    Skip,
}

impl MalformedPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Skip => "skip",
        }
    }
}

impl FromStr for MalformedPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => Err(CoreError::Validation(format!(
                "Invalid malformed-annotation policy '{other}'. Must be one of: abort, skip"
            ))),
        }
    }
}

/// Inputs of one run. Built once and not modified while the run is going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub project_id: String,
    /// Restrict the run to the dataset with this id or name.
    pub dataset: Option<String>,
    pub families: StatFamilies,
    pub on_malformed: MalformedPolicy,
    pub batch_size: usize,
}

impl RunOptions {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: None,
            families: StatFamilies::default(),
            on_malformed: MalformedPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Result of a run that did not fail.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(ReportSet),
    /// The metadata defines nothing the requested families could count.
    /// Nothing was scanned.
    EmptyUniverse { project: ProjectInfo },
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Compute the Report Set for `options.project_id`.
pub async fn run<S, P>(
    source: &S,
    options: &RunOptions,
    progress: &P,
    cancel: &CancellationToken,
) -> Result<RunOutcome, PipelineError>
where
    S: ProjectSource,
    P: ProgressSink,
{
    let project = source
        .get_project(&options.project_id)
        .await
        .map_err(|e| match e {
            SourceError::NotFound { entity, id } => {
                PipelineError::Core(CoreError::NotFound { entity, id })
            }
            other => other.into(),
        })?;
    project.ensure_videos()?;

    let meta = load_meta(source, &options.project_id).await?;
    if let Some(declared) = meta.project_type.as_deref() {
        if declared != PROJECT_TYPE_VIDEOS {
            return Err(CoreError::TypeMismatch {
                expected: PROJECT_TYPE_VIDEOS,
                actual: declared.to_string(),
            }
            .into());
        }
    }

    tracing::info!(
        project_id = %project.id,
        project = %project.name,
        classes = meta.obj_classes.len(),
        tags = meta.tag_metas.len(),
        families = options.families.as_str(),
        "Starting statistics run",
    );

    let Some(families) = narrow_families(options.families, &meta) else {
        tracing::warn!(project_id = %project.id, "Nothing to count for the requested statistics");
        return Ok(RunOutcome::EmptyUniverse { project });
    };

    let datasets = select_datasets(source, options).await?;
    let with_totals = options.dataset.is_none();
    let names: Vec<&str> = datasets.iter().map(|d| d.name.as_str()).collect();
    check_dataset_columns(&names, with_totals)?;
    let batch_size = options.batch_size.max(1);

    let mut acc = StatsAccumulator::new(project, meta, families, with_totals);
    let mut complete = true;

    for (position, dataset) in datasets.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(
                finished = position,
                remaining = datasets.len() - position,
                "Run cancelled, building partial report",
            );
            complete = false;
            break;
        }

        let snapshot = scan_dataset(
            source,
            &mut acc,
            position,
            dataset,
            batch_size,
            options.on_malformed,
            progress,
        )
        .await?;
        acc.push(snapshot);
    }

    let report = acc.into_report(complete);
    tracing::info!(
        run_id = %report.run_id,
        datasets = report.datasets.len(),
        skipped = report.skipped.len(),
        complete = report.complete,
        "Statistics run finished",
    );
    Ok(RunOutcome::Completed(report))
}

/// Narrow `requested` to what `meta` supports, logging each dropped family.
fn narrow_families(requested: StatFamilies, meta: &ProjectMeta) -> Option<StatFamilies> {
    let narrowed = requested.narrow(meta);
    let kept = narrowed.unwrap_or(requested);
    if requested.includes_classes() && (narrowed.is_none() || !kept.includes_classes()) {
        tracing::warn!("Project has no object classes, skipping class statistics");
    }
    if requested.includes_tags() && (narrowed.is_none() || !kept.includes_tags()) {
        tracing::warn!("Project has no tag definitions, skipping tag statistics");
    }
    narrowed
}

/// Datasets to scan, in listing order, after applying the dataset filter.
async fn select_datasets<S: ProjectSource>(
    source: &S,
    options: &RunOptions,
) -> Result<Vec<DatasetInfo>, PipelineError> {
    let mut datasets = source.list_datasets(&options.project_id).await?;

    if let Some(filter) = &options.dataset {
        datasets.retain(|d| &d.id == filter || &d.name == filter);
        if datasets.is_empty() {
            return Err(CoreError::NotFound {
                entity: "dataset",
                id: filter.clone(),
            }
            .into());
        }
    }
    Ok(datasets)
}

/// Download, decode and count every video of one dataset.
async fn scan_dataset<S, P>(
    source: &S,
    acc: &mut StatsAccumulator,
    position: usize,
    dataset: &DatasetInfo,
    batch_size: usize,
    policy: MalformedPolicy,
    progress: &P,
) -> Result<DatasetSnapshot, PipelineError>
where
    S: ProjectSource,
    P: ProgressSink,
{
    let videos = source.list_videos(&dataset.id).await?;
    let total = videos.len();
    tracing::info!(dataset = %dataset.name, videos = total, "Scanning dataset");

    let mut pass = acc.begin_dataset(position, dataset.name.clone());
    let mut done = 0;

    for batch in videos.chunks(batch_size) {
        let payloads = try_join_all(batch.iter().map(|video| download(source, video))).await?;

        for (video, payload) in batch.iter().zip(payloads) {
            let decoded = match payload {
                Ok(payload) => decode_and_scan(&mut pass, &payload, acc.meta(), video),
                Err(reason) => Err(reason),
            };
            if let Err(reason) = decoded {
                match policy {
                    MalformedPolicy::Abort => {
                        return Err(PipelineError::MalformedAnnotation {
                            video: video.name.clone(),
                            reason,
                        })
                    }
                    MalformedPolicy::Skip => {
                        tracing::warn!(
                            dataset = %dataset.name,
                            video = %video.name,
                            reason = %reason,
                            "Skipping malformed annotation",
                        );
                        acc.record_skipped(SkippedVideo {
                            dataset: dataset.name.clone(),
                            video: video.name.clone(),
                            reason,
                        });
                    }
                }
            }
            done += 1;
            progress.report(&dataset.name, done, total);
        }
    }

    tracing::info!(
        dataset = %dataset.name,
        videos_scanned = pass.videos_scanned(),
        "Dataset scanned",
    );
    Ok(pass.finish())
}

/// Fetch one payload. Unparsable JSON is returned as a per-video failure
/// reason so the malformed policy applies to it; other source errors fail
/// the batch.
async fn download<S: ProjectSource>(
    source: &S,
    video: &VideoInfo,
) -> Result<Result<serde_json::Value, String>, SourceError> {
    match source.download_annotation(&video.id).await {
        Ok(payload) => Ok(Ok(payload)),
        Err(SourceError::Json { source, .. }) => Ok(Err(format!("invalid JSON: {source}"))),
        Err(other) => Err(other),
    }
}

fn decode_and_scan(
    pass: &mut DatasetPass,
    payload: &serde_json::Value,
    meta: &ProjectMeta,
    video: &VideoInfo,
) -> Result<(), String> {
    pass.scan_json(payload, meta, &video.name).map_err(|e| match e {
        CoreError::MalformedAnnotation(reason) => reason,
        other => other.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
