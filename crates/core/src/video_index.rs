//! Which videos contain which tags.
//!
//! Property tags and frame-range tags are indexed both by name and by
//! `(name, value)`. Each key lists the distinct videos it was seen in, in
//! scan order. Object tags are not indexed.

use std::collections::HashMap;

use serde::Serialize;

/// Tag family an index entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagFamily {
    Property,
    FrameRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IndexKey {
    family: TagFamily,
    tag: String,
    /// `None` for the by-name key, `Some(value)` for the by-value key.
    value: Option<String>,
}

/// Per-dataset video index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoIndex {
    order: Vec<IndexKey>,
    videos: HashMap<IndexKey, Vec<String>>,
}

impl VideoIndex {
    /// Record that `video` contains tag `tag` with value key `value`.
    ///
    /// Updates both the by-name and the by-value entry. A video is listed at
    /// most once per entry.
    pub fn record(&mut self, family: TagFamily, tag: &str, value: &str, video: &str) {
        self.push(
            IndexKey {
                family,
                tag: tag.to_string(),
                value: None,
            },
            video,
        );
        self.push(
            IndexKey {
                family,
                tag: tag.to_string(),
                value: Some(value.to_string()),
            },
            video,
        );
    }

    fn push(&mut self, key: IndexKey, video: &str) {
        if !self.videos.contains_key(&key) {
            self.order.push(key.clone());
        }
        let list = self.videos.entry(key).or_default();
        if !list.iter().any(|v| v == video) {
            list.push(video.to_string());
        }
    }

    /// Videos containing `tag` (any value when `value` is `None`).
    pub fn videos(&self, family: TagFamily, tag: &str, value: Option<&str>) -> &[String] {
        let key = IndexKey {
            family,
            tag: tag.to_string(),
            value: value.map(str::to_string),
        };
        self.videos.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Flatten into report entries labelled with `dataset`.
    pub fn entries(&self, dataset: &str) -> Vec<VideoIndexEntry> {
        self.order
            .iter()
            .map(|key| VideoIndexEntry {
                family: key.family,
                tag: key.tag.clone(),
                value: key.value.clone(),
                dataset: dataset.to_string(),
                videos: self.videos[key].clone(),
            })
            .collect()
    }
}

/// One line of the video index as it appears in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoIndexEntry {
    pub family: TagFamily,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub dataset: String,
    pub videos: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
