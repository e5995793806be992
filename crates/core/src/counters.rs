//! Per-dataset counters.
//!
//! [`NameCounter`] counts by entity name and is pre-seeded with zero for every
//! known name. [`ValueCounter`] counts by `(name, value)` and grows as values
//! are observed. Both keep first-insertion order so table rows come out in a
//! reproducible order. Counts saturate at `Count::MAX` rather than wrap.
//!
//! [`CounterSet`] bundles every counter one dataset pass needs. It is owned
//! by the scan loop of that dataset and frozen into a [`DatasetSnapshot`]
//! when the pass ends.

use std::collections::HashMap;

use crate::meta::ProjectMeta;
use crate::types::Count;
use crate::video_index::VideoIndex;

// ---------------------------------------------------------------------------
// NameCounter
// ---------------------------------------------------------------------------

/// Count per entity name.
///
/// `known` is the universe fixed at construction; names outside it can still
/// be counted and read back with [`NameCounter::get`], but they never add
/// rows to name-keyed tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameCounter {
    known: Vec<String>,
    counts: HashMap<String, Count>,
}

impl NameCounter {
    /// Create a counter holding zero for every name in `names`.
    pub fn seeded<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut counter = Self::default();
        for name in names {
            let name = name.into();
            if !counter.counts.contains_key(&name) {
                counter.counts.insert(name.clone(), 0);
                counter.known.push(name);
            }
        }
        counter
    }

    pub fn increment(&mut self, name: &str) {
        self.add(name, 1);
    }

    /// Add `by` to `name`, creating an explicit zero entry first if the name
    /// has not been seen yet.
    pub fn add(&mut self, name: &str, by: Count) {
        let count = self.counts.entry(name.to_string()).or_insert(0);
        *count = count.saturating_add(by);
    }

    /// Count for `name`; zero when it was never seen.
    pub fn get(&self, name: &str) -> Count {
        self.counts.get(name).copied().unwrap_or(0)
    }

    /// Known names in construction order.
    pub fn known(&self) -> &[String] {
        &self.known
    }

    /// Sum over every counted name, known or not.
    pub fn total(&self) -> Count {
        self.counts.values().copied().fold(0, Count::saturating_add)
    }
}

// ---------------------------------------------------------------------------
// ValueCounter
// ---------------------------------------------------------------------------

/// Counts for every value observed under one name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueCounts {
    order: Vec<String>,
    counts: HashMap<String, Count>,
}

impl ValueCounts {
    fn add(&mut self, value: &str, by: Count) {
        if !self.counts.contains_key(value) {
            self.order.push(value.to_string());
        }
        let count = self.counts.entry(value.to_string()).or_insert(0);
        *count = count.saturating_add(by);
    }

    pub fn get(&self, value: &str) -> Count {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// `(value, count)` pairs in first-observation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Count)> + '_ {
        self.order
            .iter()
            .map(move |value| (value.as_str(), self.counts[value]))
    }
}

/// Two-level count: name → value → count.
///
/// The per-name level is created lazily on the first increment of that name,
/// and each value starts from an explicit zero before it is incremented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueCounter {
    order: Vec<String>,
    by_name: HashMap<String, ValueCounts>,
}

impl ValueCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, name: &str, value: &str) {
        self.add(name, value, 1);
    }

    pub fn add(&mut self, name: &str, value: &str, by: Count) {
        if !self.by_name.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.by_name
            .entry(name.to_string())
            .or_default()
            .add(value, by);
    }

    /// Count for `(name, value)`; zero when the pair was never seen.
    pub fn get(&self, name: &str, value: &str) -> Count {
        self.by_name.get(name).map_or(0, |values| values.get(value))
    }

    pub fn values(&self, name: &str) -> Option<&ValueCounts> {
        self.by_name.get(name)
    }

    /// Names in first-observation order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// `(name, value, count)` triples, name-major, value-minor.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Count)> + '_ {
        self.order.iter().flat_map(move |name| {
            self.by_name[name]
                .iter()
                .map(move |(value, count)| (name.as_str(), value, count))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CounterSet
// ---------------------------------------------------------------------------

/// Every counter accumulated during one dataset pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSet {
    /// Objects per class.
    pub objects: NameCounter,
    /// Figures per class.
    pub figures: NameCounter,
    /// Distinct frames per class.
    pub frames: NameCounter,

    /// Instantaneous property tag occurrences.
    pub property_tags: NameCounter,
    pub property_tag_values: ValueCounter,

    /// Frames covered by frame-range tags.
    pub frame_tag_frames: NameCounter,
    /// Frame-range tag instances.
    pub frame_tag_ranges: NameCounter,
    pub frame_tag_value_frames: ValueCounter,
    pub frame_tag_value_ranges: ValueCounter,

    pub object_tags: NameCounter,
    pub object_tag_values: ValueCounter,

    /// Videos containing each property and frame-range tag.
    pub videos: VideoIndex,
}

impl CounterSet {
    /// Fresh counters, seeded with the project's classes and tags.
    pub fn new(meta: &ProjectMeta) -> Self {
        let classes = || NameCounter::seeded(meta.obj_classes.iter().cloned());
        let tags = || NameCounter::seeded(meta.tag_metas.iter().cloned());
        Self {
            objects: classes(),
            figures: classes(),
            frames: classes(),
            property_tags: tags(),
            property_tag_values: ValueCounter::new(),
            frame_tag_frames: tags(),
            frame_tag_ranges: tags(),
            frame_tag_value_frames: ValueCounter::new(),
            frame_tag_value_ranges: ValueCounter::new(),
            object_tags: tags(),
            object_tag_values: ValueCounter::new(),
            videos: VideoIndex::default(),
        }
    }

    /// Freeze the counters of dataset `name`, listed at `position` in the
    /// project's dataset order.
    pub fn snapshot(self, position: usize, name: impl Into<String>) -> DatasetSnapshot {
        DatasetSnapshot {
            position,
            name: name.into(),
            counters: self,
            videos_scanned: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// DatasetSnapshot
// ---------------------------------------------------------------------------

/// Immutable counters of one fully scanned dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSnapshot {
    position: usize,
    name: String,
    counters: CounterSet,
    videos_scanned: usize,
}

impl DatasetSnapshot {
    /// Position of the dataset in the project's listing order.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn counters(&self) -> &CounterSet {
        &self.counters
    }

    pub fn videos_scanned(&self) -> usize {
        self.videos_scanned
    }

    pub fn with_videos_scanned(mut self, videos: usize) -> Self {
        self.videos_scanned = videos;
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
