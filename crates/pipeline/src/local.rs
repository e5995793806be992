//! Filesystem-backed [`ProjectSource`].
//!
//! Reads projects stored in the Supervisely directory layout:
//!
//! ```text
//! <root>/<project>/meta.json
//! <root>/<project>/<dataset>/ann/<video>.json
//! ```
//!
//! Ids are paths relative to `root`: a project id is its directory name, a
//! dataset id is `<project>/<dataset>` and a video id is
//! `<project>/<dataset>/<video>`. Datasets are the sub-directories holding
//! an `ann/` directory; both listings are sorted by name.

use std::path::{Component, Path, PathBuf};

use vidstats_core::meta::{ProjectInfo, PROJECT_TYPE_VIDEOS};

use crate::error::SourceError;
use crate::source::{DatasetInfo, ProjectSource, VideoInfo};

const META_FILE: &str = "meta.json";
const ANN_DIR: &str = "ann";
const ANN_EXT: &str = ".json";

#[derive(Debug, Clone)]
pub struct LocalProjectSource {
    root: PathBuf,
}

impl LocalProjectSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join a relative id onto the root, refusing ids that would escape it.
    fn resolve(&self, entity: &'static str, id: &str) -> Result<PathBuf, SourceError> {
        let rel = Path::new(id);
        let plain = !id.is_empty() && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(SourceError::NotFound {
                entity,
                id: id.to_string(),
            });
        }
        Ok(self.root.join(rel))
    }

    fn video_path(&self, video_id: &str) -> Result<PathBuf, SourceError> {
        let (dataset_id, video) = video_id.rsplit_once('/').ok_or_else(|| SourceError::NotFound {
            entity: "video",
            id: video_id.to_string(),
        })?;
        let dataset_dir = self.resolve("video", dataset_id)?;
        Ok(dataset_dir.join(ANN_DIR).join(format!("{video}{ANN_EXT}")))
    }
}

async fn read_json(path: &Path) -> Result<serde_json::Value, SourceError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| SourceError::Json {
        path: path.to_path_buf(),
        source,
    })
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Sorted names of the entries of `dir` accepted by `keep`.
async fn sorted_entries<F>(dir: &Path, mut keep: F) -> Result<Vec<String>, SourceError>
where
    F: FnMut(&std::fs::FileType, &str) -> bool,
{
    let io_err = |source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let file_type = entry.file_type().await.map_err(io_err)?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if keep(&file_type, &name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

impl ProjectSource for LocalProjectSource {
    async fn get_project(&self, project_id: &str) -> Result<ProjectInfo, SourceError> {
        let dir = self.resolve("project", project_id)?;
        let meta_path = dir.join(META_FILE);
        if !tokio::fs::try_exists(&meta_path).await.unwrap_or(false) {
            return Err(SourceError::NotFound {
                entity: "project",
                id: project_id.to_string(),
            });
        }

        let meta = read_json(&meta_path).await?;
        let project_type = meta
            .get("projectType")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(PROJECT_TYPE_VIDEOS)
            .to_string();
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(project_id)
            .to_string();

        Ok(ProjectInfo {
            id: project_id.to_string(),
            name,
            project_type,
        })
    }

    async fn get_project_meta(&self, project_id: &str) -> Result<serde_json::Value, SourceError> {
        let dir = self.resolve("project", project_id)?;
        read_json(&dir.join(META_FILE)).await
    }

    async fn list_datasets(&self, project_id: &str) -> Result<Vec<DatasetInfo>, SourceError> {
        let dir = self.resolve("project", project_id)?;
        let candidates = sorted_entries(&dir, |ft, _| ft.is_dir()).await?;

        let mut datasets = Vec::new();
        for name in candidates {
            if is_dir(&dir.join(&name).join(ANN_DIR)).await {
                datasets.push(DatasetInfo {
                    id: format!("{project_id}/{name}"),
                    name,
                });
            }
        }
        Ok(datasets)
    }

    async fn list_videos(&self, dataset_id: &str) -> Result<Vec<VideoInfo>, SourceError> {
        let ann_dir = self.resolve("dataset", dataset_id)?.join(ANN_DIR);
        if !is_dir(&ann_dir).await {
            return Err(SourceError::NotFound {
                entity: "dataset",
                id: dataset_id.to_string(),
            });
        }

        let files = sorted_entries(&ann_dir, |ft, name| {
            ft.is_file() && name.len() > ANN_EXT.len() && name.ends_with(ANN_EXT)
        })
        .await?;

        Ok(files
            .into_iter()
            .map(|file| {
                let name = file[..file.len() - ANN_EXT.len()].to_string();
                VideoInfo {
                    id: format!("{dataset_id}/{name}"),
                    name,
                }
            })
            .collect())
    }

    async fn download_annotation(&self, video_id: &str) -> Result<serde_json::Value, SourceError> {
        let path = self.video_path(video_id)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(SourceError::NotFound {
                entity: "video",
                id: video_id.to_string(),
            });
        }
        read_json(&path).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
