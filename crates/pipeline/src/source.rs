//! Contracts for reaching a project's metadata, datasets and annotations.
//!
//! [`ProjectSource`] is the seam between the run driver and whatever store
//! holds the project. [`LocalProjectSource`](crate::local::LocalProjectSource)
//! is the filesystem implementation.

use serde::Serialize;
use vidstats_core::meta::{ProjectInfo, ProjectMeta};
use vidstats_core::types::EntityId;

use crate::error::SourceError;

/// A dataset as listed by the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetInfo {
    pub id: EntityId,
    pub name: String,
}

/// A video reference within a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    pub id: EntityId,
    pub name: String,
}

/// Read access to one project store.
///
/// Listings are returned in a stable order; the driver lays out dataset
/// columns in the order of [`list_datasets`](Self::list_datasets).
pub trait ProjectSource: Send + Sync {
    /// Project identity. Fails with `NotFound` for an unknown id.
    fn get_project(
        &self,
        project_id: &str,
    ) -> impl std::future::Future<Output = Result<ProjectInfo, SourceError>> + Send;

    /// Raw project metadata JSON (classes and tag definitions).
    fn get_project_meta(
        &self,
        project_id: &str,
    ) -> impl std::future::Future<Output = Result<serde_json::Value, SourceError>> + Send;

    fn list_datasets(
        &self,
        project_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<DatasetInfo>, SourceError>> + Send;

    fn list_videos(
        &self,
        dataset_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<VideoInfo>, SourceError>> + Send;

    /// Raw annotation payload of one video.
    fn download_annotation(
        &self,
        video_id: &str,
    ) -> impl std::future::Future<Output = Result<serde_json::Value, SourceError>> + Send;
}

/// Fetch project metadata and decode it.
pub async fn load_meta<S: ProjectSource>(
    source: &S,
    project_id: &str,
) -> Result<ProjectMeta, crate::error::PipelineError> {
    let json = source.get_project_meta(project_id).await?;
    Ok(ProjectMeta::from_json(&json)?)
}
