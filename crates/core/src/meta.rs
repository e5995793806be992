//! Project descriptors and the class/tag universe.
//!
//! [`ProjectMeta`] holds the names of every object class and tag definition
//! known to a project. It is loaded once before scanning and fixes the row
//! set of every name-keyed report table.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Project type string for video projects.
pub const PROJECT_TYPE_VIDEOS: &str = "videos";

// ---------------------------------------------------------------------------
// Project info
// ---------------------------------------------------------------------------

/// Identity and kind of a project, as reported by the project source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: EntityId,
    pub name: String,
    pub project_type: String,
}

impl ProjectInfo {
    /// Fail with [`CoreError::TypeMismatch`] unless this is a video project.
    pub fn ensure_videos(&self) -> Result<(), CoreError> {
        if self.project_type == PROJECT_TYPE_VIDEOS {
            Ok(())
        } else {
            Err(CoreError::TypeMismatch {
                expected: PROJECT_TYPE_VIDEOS,
                actual: self.project_type.clone(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Project meta
// ---------------------------------------------------------------------------

/// Names of the object classes and tag definitions of one project, in
/// metadata order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectMeta {
    pub obj_classes: Vec<String>,
    pub tag_metas: Vec<String>,
    /// `projectType` declared in the metadata file, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMeta {
    #[serde(default)]
    classes: Vec<RawClass>,
    #[serde(default)]
    tags: Vec<RawTagMeta>,
    #[serde(default)]
    project_type: Option<String>,
}

#[derive(Deserialize)]
struct RawClass {
    title: String,
}

#[derive(Deserialize)]
struct RawTagMeta {
    name: String,
}

impl ProjectMeta {
    pub fn new(obj_classes: Vec<String>, tag_metas: Vec<String>) -> Self {
        Self {
            obj_classes,
            tag_metas,
            project_type: None,
        }
    }

    /// Decode a `meta.json` document (`classes[].title`, `tags[].name`,
    /// optional `projectType`).
    ///
    /// Duplicate class or tag names are rejected since names key every
    /// counter.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CoreError> {
        let raw = RawMeta::deserialize(json)
            .map_err(|e| CoreError::Validation(format!("invalid project meta: {e}")))?;

        let obj_classes: Vec<String> = raw.classes.into_iter().map(|c| c.title).collect();
        let tag_metas: Vec<String> = raw.tags.into_iter().map(|t| t.name).collect();

        ensure_unique("class", &obj_classes)?;
        ensure_unique("tag", &tag_metas)?;

        Ok(Self {
            obj_classes,
            tag_metas,
            project_type: raw.project_type,
        })
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.obj_classes.iter().any(|c| c == name)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tag_metas.iter().any(|t| t == name)
    }
}

fn ensure_unique(kind: &str, names: &[String]) -> Result<(), CoreError> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(CoreError::Validation(format!(
                "duplicate {kind} name '{name}' in project meta"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
