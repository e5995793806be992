//! Report Set: the ordered tables produced by one run.

use std::str::FromStr;

use serde::Serialize;

use crate::assembler::{
    assemble_named, assemble_values, CLASS_COLUMN, CLASS_METRICS, FRAME_TAG_METRICS,
    FRAME_TAG_VALUE_METRICS, OBJECT_TAG_METRICS, OBJECT_TAG_VALUE_METRICS, PROPERTY_TAG_METRICS,
    PROPERTY_TAG_VALUE_METRICS, TAG_COLUMN,
};
use crate::counters::DatasetSnapshot;
use crate::error::CoreError;
use crate::meta::{ProjectInfo, ProjectMeta};
use crate::table::Table;
use crate::types::Timestamp;
use crate::video_index::VideoIndexEntry;

// ---------------------------------------------------------------------------
// Statistic families
// ---------------------------------------------------------------------------

/// Which statistic families a run computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatFamilies {
    Classes,
    Tags,
    #[default]
    Both,
}

impl StatFamilies {
    pub fn includes_classes(self) -> bool {
        matches!(self, Self::Classes | Self::Both)
    }

    pub fn includes_tags(self) -> bool {
        matches!(self, Self::Tags | Self::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classes => "classes",
            Self::Tags => "tags",
            Self::Both => "both",
        }
    }

    /// Narrow the requested families to those `meta` can support.
    ///
    /// Classes need at least one object class and tags need at least one tag
    /// definition. Returns `None` when nothing is left to compute.
    pub fn narrow(self, meta: &ProjectMeta) -> Option<Self> {
        let classes = self.includes_classes() && !meta.obj_classes.is_empty();
        let tags = self.includes_tags() && !meta.tag_metas.is_empty();
        match (classes, tags) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Classes),
            (false, true) => Some(Self::Tags),
            (false, false) => None,
        }
    }
}

impl FromStr for StatFamilies {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classes" => Ok(Self::Classes),
            "tags" => Ok(Self::Tags),
            "both" => Ok(Self::Both),
            other => Err(CoreError::Validation(format!(
                "Invalid statistic family '{other}'. Must be one of: classes, tags, both"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Report tables
// ---------------------------------------------------------------------------

/// The tables a report can contain, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Classes,
    PropertyTags,
    PropertyTagValues,
    FrameTags,
    FrameTagValues,
    ObjectTags,
    ObjectTagValues,
}

impl ReportKind {
    pub const ALL: [ReportKind; 7] = [
        Self::Classes,
        Self::PropertyTags,
        Self::PropertyTagValues,
        Self::FrameTags,
        Self::FrameTagValues,
        Self::ObjectTags,
        Self::ObjectTagValues,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Classes => "Classes",
            Self::PropertyTags => "Video tags",
            Self::PropertyTagValues => "Video tag values",
            Self::FrameTags => "Frame-range tags",
            Self::FrameTagValues => "Frame-range tag values",
            Self::ObjectTags => "Object tags",
            Self::ObjectTagValues => "Object tag values",
        }
    }

    /// Family the table belongs to.
    pub fn family(self) -> StatFamilies {
        match self {
            Self::Classes => StatFamilies::Classes,
            _ => StatFamilies::Tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub kind: ReportKind,
    pub title: &'static str,
    #[serde(flatten)]
    pub table: Table,
}

/// Build the table of `kind` from snapshots already in dataset order.
pub fn assemble(
    kind: ReportKind,
    meta: &ProjectMeta,
    snapshots: &[DatasetSnapshot],
    with_totals: bool,
) -> Table {
    let tags = &meta.tag_metas;
    match kind {
        ReportKind::Classes => assemble_named(
            CLASS_COLUMN,
            &meta.obj_classes,
            snapshots,
            &CLASS_METRICS,
            with_totals,
        ),
        ReportKind::PropertyTags => {
            assemble_named(TAG_COLUMN, tags, snapshots, &PROPERTY_TAG_METRICS, with_totals)
        }
        ReportKind::PropertyTagValues => {
            assemble_values(tags, snapshots, &PROPERTY_TAG_VALUE_METRICS, with_totals)
        }
        ReportKind::FrameTags => {
            assemble_named(TAG_COLUMN, tags, snapshots, &FRAME_TAG_METRICS, with_totals)
        }
        ReportKind::FrameTagValues => {
            assemble_values(tags, snapshots, &FRAME_TAG_VALUE_METRICS, with_totals)
        }
        ReportKind::ObjectTags => {
            assemble_named(TAG_COLUMN, tags, snapshots, &OBJECT_TAG_METRICS, with_totals)
        }
        ReportKind::ObjectTagValues => {
            assemble_values(tags, snapshots, &OBJECT_TAG_VALUE_METRICS, with_totals)
        }
    }
}

// ---------------------------------------------------------------------------
// Report set
// ---------------------------------------------------------------------------

/// A video left out of the counts because its annotation failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedVideo {
    pub dataset: String,
    pub video: String,
    pub reason: String,
}

/// Everything one run hands to the rendering side.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSet {
    pub run_id: uuid::Uuid,
    pub generated_at: Timestamp,
    pub project: ProjectInfo,
    pub families: StatFamilies,
    /// Dataset names in column order.
    pub datasets: Vec<String>,
    /// `false` when the run was cancelled before every dataset was scanned.
    pub complete: bool,
    pub skipped: Vec<SkippedVideo>,
    pub tables: Vec<ReportTable>,
    pub video_index: Vec<VideoIndexEntry>,
}

impl ReportSet {
    pub fn table(&self, kind: ReportKind) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| &t.table)
    }
}

/// Inputs of [`build_report`] other than the snapshots themselves.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub project: ProjectInfo,
    pub meta: ProjectMeta,
    pub families: StatFamilies,
    /// Emit the cross-dataset total columns.
    pub with_totals: bool,
    pub complete: bool,
    pub skipped: Vec<SkippedVideo>,
}

/// Assemble the Report Set from per-dataset snapshots.
///
/// Snapshots may arrive in any order; they are laid out by their position in
/// the project's dataset listing.
pub fn build_report(ctx: ReportContext, mut snapshots: Vec<DatasetSnapshot>) -> ReportSet {
    snapshots.sort_by_key(DatasetSnapshot::position);

    let tables = ReportKind::ALL
        .into_iter()
        .filter(|kind| match kind.family() {
            StatFamilies::Classes => ctx.families.includes_classes(),
            _ => ctx.families.includes_tags(),
        })
        .map(|kind| ReportTable {
            kind,
            title: kind.title(),
            table: assemble(kind, &ctx.meta, &snapshots, ctx.with_totals),
        })
        .collect();

    let video_index = snapshots
        .iter()
        .flat_map(|s| s.counters().videos.entries(s.name()))
        .collect();

    ReportSet {
        run_id: uuid::Uuid::now_v7(),
        generated_at: chrono::Utc::now(),
        project: ctx.project,
        families: ctx.families,
        datasets: snapshots.iter().map(|s| s.name().to_string()).collect(),
        complete: ctx.complete,
        skipped: ctx.skipped,
        tables,
        video_index,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
