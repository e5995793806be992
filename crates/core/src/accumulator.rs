//! Run-level accumulation of dataset snapshots.
//!
//! The driver opens one [`DatasetPass`] per dataset, feeds it annotations,
//! and hands the finished snapshot back to the [`StatsAccumulator`]. Once
//! every dataset is done (or the run is stopped at a dataset boundary), the
//! accumulator turns the snapshots into a [`ReportSet`].

use crate::annotation::VideoAnnotation;
use crate::counters::{CounterSet, DatasetSnapshot};
use crate::error::CoreError;
use crate::meta::{ProjectInfo, ProjectMeta};
use crate::report::{build_report, ReportContext, ReportSet, SkippedVideo, StatFamilies};
use crate::scanner::scan;

/// Counters of the dataset currently being scanned.
///
/// Owned by the scan loop of that dataset; nothing else holds a reference.
#[derive(Debug)]
pub struct DatasetPass {
    position: usize,
    name: String,
    families: StatFamilies,
    counters: CounterSet,
    videos: usize,
}

impl DatasetPass {
    /// Scan one decoded annotation.
    pub fn scan(&mut self, ann: &VideoAnnotation, video: &str) {
        scan(ann, video, self.families, &mut self.counters);
        self.videos += 1;
    }

    /// Decode `payload` against `meta` and scan it.
    pub fn scan_json(
        &mut self,
        payload: &serde_json::Value,
        meta: &ProjectMeta,
        video: &str,
    ) -> Result<(), CoreError> {
        let ann = VideoAnnotation::from_json(payload, meta)?;
        self.scan(&ann, video);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn videos_scanned(&self) -> usize {
        self.videos
    }

    /// Freeze the counters.
    pub fn finish(self) -> DatasetSnapshot {
        self.counters
            .snapshot(self.position, self.name)
            .with_videos_scanned(self.videos)
    }
}

/// Append-only collection of finished dataset snapshots.
#[derive(Debug)]
pub struct StatsAccumulator {
    project: ProjectInfo,
    meta: ProjectMeta,
    families: StatFamilies,
    with_totals: bool,
    snapshots: Vec<DatasetSnapshot>,
    skipped: Vec<SkippedVideo>,
}

impl StatsAccumulator {
    pub fn new(
        project: ProjectInfo,
        meta: ProjectMeta,
        families: StatFamilies,
        with_totals: bool,
    ) -> Self {
        Self {
            project,
            meta,
            families,
            with_totals,
            snapshots: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn meta(&self) -> &ProjectMeta {
        &self.meta
    }

    /// Open a fresh pass for the dataset listed at `position`.
    pub fn begin_dataset(&self, position: usize, name: impl Into<String>) -> DatasetPass {
        DatasetPass {
            position,
            name: name.into(),
            families: self.families,
            counters: CounterSet::new(&self.meta),
            videos: 0,
        }
    }

    /// Append a finished snapshot. Any completion order is accepted.
    pub fn push(&mut self, snapshot: DatasetSnapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn record_skipped(&mut self, skipped: SkippedVideo) {
        self.skipped.push(skipped);
    }

    pub fn snapshots(&self) -> &[DatasetSnapshot] {
        &self.snapshots
    }

    /// Build the report. `complete` is `false` for a run stopped early.
    pub fn into_report(self, complete: bool) -> ReportSet {
        let ctx = ReportContext {
            project: self.project,
            meta: self.meta,
            families: self.families,
            with_totals: self.with_totals,
            complete,
            skipped: self.skipped,
        };
        build_report(ctx, self.snapshots)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
