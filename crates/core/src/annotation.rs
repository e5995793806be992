//! Decoded video annotations.
//!
//! Decodes the Supervisely video annotation format into [`VideoAnnotation`]
//! and resolves every figure to the class of the object it belongs to, so
//! the scanner never has to chase object keys.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Deserialize;

use crate::error::CoreError;
use crate::meta::ProjectMeta;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Value key used for tags that carry no value.
pub const NONE_VALUE_KEY: &str = "None";

// ---------------------------------------------------------------------------
// Tag values and ranges
// ---------------------------------------------------------------------------

/// Scalar value carried by a tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagValue {
    /// The tag has no value (`null` or missing).
    Absent,
    Text(String),
    /// JSON number or boolean, kept in its textual form.
    Scalar(String),
}

impl TagValue {
    /// Key used for value-keyed counters and table cells.
    ///
    /// Distinct values always get distinct keys. Text that would read as
    /// [`NONE_VALUE_KEY`] or as a JSON literal is written JSON-quoted, so
    /// `"None"` never merges with an absent value and `"4"` never merges
    /// with the number `4`.
    pub fn key(&self) -> Cow<'_, str> {
        match self {
            Self::Absent => Cow::Borrowed(NONE_VALUE_KEY),
            Self::Scalar(s) => Cow::Borrowed(s),
            Self::Text(s) if s == NONE_VALUE_KEY || reads_as_json(s) => {
                Cow::Owned(serde_json::Value::String(s.clone()).to_string())
            }
            Self::Text(s) => Cow::Borrowed(s),
        }
    }

    fn from_json(value: Option<serde_json::Value>, tag: &str) -> Result<Self, CoreError> {
        match value {
            None | Some(serde_json::Value::Null) => Ok(Self::Absent),
            Some(serde_json::Value::String(s)) => Ok(Self::Text(s)),
            Some(serde_json::Value::Number(n)) => Ok(Self::Scalar(n.to_string())),
            Some(serde_json::Value::Bool(b)) => Ok(Self::Scalar(b.to_string())),
            Some(other) => Err(CoreError::MalformedAnnotation(format!(
                "tag '{tag}' has a non-scalar value: {other}"
            ))),
        }
    }
}

fn reads_as_json(s: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(s).is_ok()
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Closed frame interval `[start, end]`.
///
/// Only built through [`FrameRange::new`], so its length always fits a `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    start: u64,
    end: u64,
}

impl FrameRange {
    pub fn new(start: u64, end: u64) -> Result<Self, CoreError> {
        if end < start {
            return Err(CoreError::MalformedAnnotation(format!(
                "frame range [{start}, {end}] ends before it starts"
            )));
        }
        if (end - start).checked_add(1).is_none() {
            return Err(CoreError::MalformedAnnotation(format!(
                "frame range [{start}, {end}] is too long to count"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of frames covered, both ends included.
    pub fn frame_count(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }
}

// ---------------------------------------------------------------------------
// Annotation model
// ---------------------------------------------------------------------------

/// Annotation-level tag, either instantaneous or spanning a frame range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTag {
    pub name: String,
    pub value: TagValue,
    pub frame_range: Option<FrameRange>,
}

/// Tag attached to an object. Never frame-range aware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTag {
    pub name: String,
    pub value: TagValue,
}

/// A tracked entity of one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoObject {
    pub key: String,
    pub class_name: String,
    pub tags: Vec<ObjectTag>,
}

/// Geometric instance of an object on one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Figure {
    pub object_key: String,
    pub class_name: String,
    pub frame_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: u64,
    pub figures: Vec<Figure>,
}

/// One decoded video annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoAnnotation {
    pub objects: Vec<VideoObject>,
    pub frames: Vec<Frame>,
    pub tags: Vec<VideoTag>,
    /// Declared length of the video. Every frame range ends before it.
    pub frames_count: Option<u64>,
}

impl VideoAnnotation {
    /// Every figure of the annotation, frame by frame.
    pub fn figures(&self) -> impl Iterator<Item = &Figure> {
        self.frames.iter().flat_map(|frame| frame.figures.iter())
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnnotation {
    #[serde(default)]
    tags: Vec<RawTag>,
    #[serde(default)]
    objects: Vec<RawObject>,
    #[serde(default)]
    frames: Vec<RawFrame>,
    #[serde(default)]
    frames_count: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTag {
    name: String,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    frame_range: Option<Vec<u64>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawObject {
    key: String,
    class_title: String,
    #[serde(default)]
    tags: Vec<RawTag>,
}

#[derive(Deserialize)]
struct RawFrame {
    index: u64,
    #[serde(default)]
    figures: Vec<RawFigure>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFigure {
    object_key: String,
}

impl VideoAnnotation {
    /// Decode an annotation payload against the project's metadata.
    ///
    /// Fails with [`CoreError::MalformedAnnotation`] when the payload does
    /// not have the expected shape, names a class or tag missing from
    /// `meta`, points a figure at an unknown object, repeats a frame index,
    /// or carries an invalid frame range. When `framesCount` is present, a
    /// frame range reaching past the last frame is invalid.
    pub fn from_json(json: &serde_json::Value, meta: &ProjectMeta) -> Result<Self, CoreError> {
        let raw = RawAnnotation::deserialize(json)
            .map_err(|e| CoreError::MalformedAnnotation(e.to_string()))?;
        let frames_count = raw.frames_count;

        let tags = raw
            .tags
            .into_iter()
            .map(|tag| decode_video_tag(tag, meta, frames_count))
            .collect::<Result<Vec<_>, _>>()?;

        let mut objects = Vec::with_capacity(raw.objects.len());
        let mut class_by_key: HashMap<String, String> = HashMap::new();
        for obj in raw.objects {
            if !meta.has_class(&obj.class_title) {
                return Err(CoreError::MalformedAnnotation(format!(
                    "object '{}' has class '{}' which is not defined in the project meta",
                    obj.key, obj.class_title
                )));
            }
            if class_by_key.contains_key(&obj.key) {
                return Err(CoreError::MalformedAnnotation(format!(
                    "duplicate object key '{}'",
                    obj.key
                )));
            }
            let tags = obj
                .tags
                .into_iter()
                .map(|tag| decode_object_tag(tag, meta))
                .collect::<Result<Vec<_>, _>>()?;
            class_by_key.insert(obj.key.clone(), obj.class_title.clone());
            objects.push(VideoObject {
                key: obj.key,
                class_name: obj.class_title,
                tags,
            });
        }

        let mut frames: Vec<Frame> = Vec::with_capacity(raw.frames.len());
        let mut seen_frames: HashSet<u64> = HashSet::with_capacity(raw.frames.len());
        for raw_frame in raw.frames {
            if !seen_frames.insert(raw_frame.index) {
                return Err(CoreError::MalformedAnnotation(format!(
                    "frame {} is listed more than once",
                    raw_frame.index
                )));
            }
            let figures = raw_frame
                .figures
                .into_iter()
                .map(|fig| -> Result<Figure, CoreError> {
                    let class_name = class_by_key.get(&fig.object_key).ok_or_else(|| {
                        CoreError::MalformedAnnotation(format!(
                            "figure on frame {} references unknown object '{}'",
                            raw_frame.index, fig.object_key
                        ))
                    })?;
                    Ok(Figure {
                        class_name: class_name.clone(),
                        object_key: fig.object_key,
                        frame_index: raw_frame.index,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            frames.push(Frame {
                index: raw_frame.index,
                figures,
            });
        }

        Ok(Self {
            objects,
            frames,
            tags,
            frames_count,
        })
    }
}

fn ensure_known_tag(name: &str, meta: &ProjectMeta) -> Result<(), CoreError> {
    if meta.has_tag(name) {
        Ok(())
    } else {
        Err(CoreError::MalformedAnnotation(format!(
            "tag '{name}' is not defined in the project meta"
        )))
    }
}

fn decode_video_tag(
    raw: RawTag,
    meta: &ProjectMeta,
    frames_count: Option<u64>,
) -> Result<VideoTag, CoreError> {
    ensure_known_tag(&raw.name, meta)?;
    let frame_range = match raw.frame_range.as_deref() {
        None => None,
        Some([start, end]) => {
            let range = FrameRange::new(*start, *end)?;
            if let Some(count) = frames_count {
                if range.end() >= count {
                    return Err(CoreError::MalformedAnnotation(format!(
                        "tag '{}' has frame range [{start}, {end}] past the last frame of a {count}-frame video",
                        raw.name
                    )));
                }
            }
            Some(range)
        }
        Some(other) => {
            return Err(CoreError::MalformedAnnotation(format!(
                "tag '{}' has a frame range with {} bounds, expected 2",
                raw.name,
                other.len()
            )))
        }
    };
    let value = TagValue::from_json(raw.value, &raw.name)?;
    Ok(VideoTag {
        name: raw.name,
        value,
        frame_range,
    })
}

fn decode_object_tag(raw: RawTag, meta: &ProjectMeta) -> Result<ObjectTag, CoreError> {
    ensure_known_tag(&raw.name, meta)?;
    let value = TagValue::from_json(raw.value, &raw.name)?;
    Ok(ObjectTag {
        name: raw.name,
        value,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
