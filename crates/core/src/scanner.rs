//! Annotation scanner.
//!
//! Turns one decoded annotation into counter updates. Pure function of its
//! input: no I/O, no state beyond the [`CounterSet`] it is handed.

use std::collections::HashSet;

use crate::annotation::VideoAnnotation;
use crate::counters::CounterSet;
use crate::report::StatFamilies;
use crate::video_index::TagFamily;

/// Scan `ann` (from video `video`) into `counters`, limited to `families`.
pub fn scan(ann: &VideoAnnotation, video: &str, families: StatFamilies, counters: &mut CounterSet) {
    if families.includes_classes() {
        scan_classes(ann, counters);
    }
    if families.includes_tags() {
        scan_property_tags(ann, video, counters);
        scan_frame_range_tags(ann, video, counters);
        scan_object_tags(ann, counters);
    }
}

/// Objects, figures, and distinct frames per class.
pub fn scan_classes(ann: &VideoAnnotation, counters: &mut CounterSet) {
    for obj in &ann.objects {
        counters.objects.increment(&obj.class_name);
    }
    for figure in ann.figures() {
        counters.figures.increment(&figure.class_name);
    }
    for frame in &ann.frames {
        let mut seen: HashSet<&str> = HashSet::new();
        for figure in &frame.figures {
            if seen.insert(figure.class_name.as_str()) {
                counters.frames.increment(&figure.class_name);
            }
        }
    }
}

/// Annotation-level tags without a frame range.
pub fn scan_property_tags(ann: &VideoAnnotation, video: &str, counters: &mut CounterSet) {
    for tag in ann.tags.iter().filter(|t| t.frame_range.is_none()) {
        let value = tag.value.key();
        counters.property_tags.increment(&tag.name);
        counters.property_tag_values.increment(&tag.name, &value);
        counters
            .videos
            .record(TagFamily::Property, &tag.name, &value, video);
    }
}

/// Annotation-level tags spanning a frame range.
pub fn scan_frame_range_tags(ann: &VideoAnnotation, video: &str, counters: &mut CounterSet) {
    for tag in &ann.tags {
        let Some(range) = tag.frame_range else {
            continue;
        };
        let value = tag.value.key();
        let frames = range.frame_count();

        counters.frame_tag_frames.add(&tag.name, frames);
        counters.frame_tag_ranges.increment(&tag.name);
        counters
            .frame_tag_value_frames
            .add(&tag.name, &value, frames);
        counters.frame_tag_value_ranges.increment(&tag.name, &value);
        counters
            .videos
            .record(TagFamily::FrameRange, &tag.name, &value, video);
    }
}

/// Tags attached to objects.
pub fn scan_object_tags(ann: &VideoAnnotation, counters: &mut CounterSet) {
    for obj in &ann.objects {
        for tag in &obj.tags {
            counters.object_tags.increment(&tag.name);
            counters
                .object_tag_values
                .increment(&tag.name, &tag.value.key());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::ProjectMeta;
    use serde_json::json;

    fn meta() -> ProjectMeta {
        ProjectMeta::new(
            vec!["cat".into(), "dog".into()],
            vec!["verified".into(), "occluded".into(), "color".into()],
        )
    }

    fn decode(json: serde_json::Value) -> VideoAnnotation {
        VideoAnnotation::from_json(&json, &meta()).unwrap()
    }

    fn scan_one(json: serde_json::Value) -> CounterSet {
        let mut counters = CounterSet::new(&meta());
        scan(&decode(json), "clip.mp4", StatFamilies::Both, &mut counters);
        counters
    }

    // -- classes -------------------------------------------------------------

    #[test]
    fn cat_scenario_counts() {
        let counters = scan_one(json!({
            "tags": [
                {"name": "verified"},
                {"name": "occluded", "frameRange": [10, 12]}
            ],
            "objects": [{"key": "o1", "classTitle": "cat"}],
            "frames": [
                {"index": 1, "figures": [{"objectKey": "o1"}]},
                {"index": 2, "figures": [{"objectKey": "o1"}, {"objectKey": "o1"}]}
            ]
        }));

        assert_eq!(counters.objects.get("cat"), 1);
        assert_eq!(counters.figures.get("cat"), 3);
        assert_eq!(counters.frames.get("cat"), 2);
        assert_eq!(counters.objects.get("dog"), 0);

        assert_eq!(counters.property_tags.get("verified"), 1);
        assert_eq!(counters.property_tag_values.get("verified", "None"), 1);
        assert_eq!(counters.frame_tag_frames.get("occluded"), 3);
        assert_eq!(counters.frame_tag_ranges.get("occluded"), 1);
    }

    #[test]
    fn frame_counted_once_per_class() {
        let counters = scan_one(json!({
            "objects": [
                {"key": "c1", "classTitle": "cat"},
                {"key": "c2", "classTitle": "cat"},
                {"key": "d1", "classTitle": "dog"}
            ],
            "frames": [
                {"index": 0, "figures": [
                    {"objectKey": "c1"}, {"objectKey": "c2"}, {"objectKey": "c1"}, {"objectKey": "d1"}
                ]}
            ]
        }));
        assert_eq!(counters.frames.get("cat"), 1);
        assert_eq!(counters.frames.get("dog"), 1);
        assert_eq!(counters.figures.get("cat"), 3);
        assert_eq!(counters.objects.get("cat"), 2);
    }

    #[test]
    fn classes_only_leaves_tag_counters_untouched() {
        let mut counters = CounterSet::new(&meta());
        let ann = decode(json!({
            "tags": [{"name": "verified"}],
            "objects": [{"key": "o1", "classTitle": "cat", "tags": [{"name": "color", "value": "red"}]}]
        }));
        scan(&ann, "clip.mp4", StatFamilies::Classes, &mut counters);
        assert_eq!(counters.objects.get("cat"), 1);
        assert_eq!(counters.property_tags.get("verified"), 0);
        assert_eq!(counters.object_tags.get("color"), 0);
        assert!(counters.videos.is_empty());
    }

    // -- property and frame-range tags --------------------------------------

    #[test]
    fn range_and_instant_tags_are_exclusive() {
        let counters = scan_one(json!({
            "tags": [
                {"name": "occluded", "frameRange": [3, 7]},
                {"name": "occluded"}
            ]
        }));
        assert_eq!(counters.property_tags.get("occluded"), 1);
        assert_eq!(counters.property_tag_values.get("occluded", "None"), 1);
        assert_eq!(counters.frame_tag_frames.get("occluded"), 5);
        assert_eq!(counters.frame_tag_ranges.get("occluded"), 1);
    }

    #[test]
    fn duration_independent_of_other_tags() {
        let counters = scan_one(json!({
            "tags": [
                {"name": "occluded", "frameRange": [3, 7]},
                {"name": "verified", "frameRange": [0, 99]},
                {"name": "color", "value": "red"}
            ]
        }));
        assert_eq!(counters.frame_tag_frames.get("occluded"), 5);
        assert_eq!(counters.frame_tag_ranges.get("occluded"), 1);
        assert_eq!(counters.frame_tag_value_frames.get("occluded", "None"), 5);
        assert_eq!(counters.frame_tag_value_ranges.get("occluded", "None"), 1);
    }

    #[test]
    fn values_split_into_distinct_keys() {
        let counters = scan_one(json!({
            "tags": [
                {"name": "color", "value": "red"},
                {"name": "color", "value": "blue"},
                {"name": "color", "value": "red"},
                {"name": "color", "value": "green", "frameRange": [1, 2]},
                {"name": "color", "value": "green", "frameRange": [5, 5]}
            ]
        }));
        assert_eq!(counters.property_tags.get("color"), 3);
        assert_eq!(counters.property_tag_values.get("color", "red"), 2);
        assert_eq!(counters.property_tag_values.get("color", "blue"), 1);
        assert_eq!(counters.frame_tag_value_frames.get("color", "green"), 3);
        assert_eq!(counters.frame_tag_value_ranges.get("color", "green"), 2);
        assert_eq!(counters.frame_tag_ranges.get("color"), 2);
    }

    #[test]
    fn absent_and_none_text_are_separate_values() {
        let counters = scan_one(json!({
            "tags": [
                {"name": "color"},
                {"name": "color", "value": "None"},
                {"name": "color", "value": 4},
                {"name": "color", "value": "4"}
            ]
        }));
        let rows: Vec<_> = counters.property_tag_values.iter().collect();
        assert_eq!(
            rows,
            vec![
                ("color", "None", 1),
                ("color", "\"None\"", 1),
                ("color", "4", 1),
                ("color", "\"4\"", 1),
            ]
        );
        assert_eq!(counters.property_tags.get("color"), 4);
    }

    #[test]
    fn tags_indexed_by_video() {
        let counters = scan_one(json!({
            "tags": [
                {"name": "verified"},
                {"name": "occluded", "frameRange": [1, 4]}
            ]
        }));
        assert_eq!(
            counters.videos.videos(TagFamily::Property, "verified", None),
            ["clip.mp4"]
        );
        assert_eq!(
            counters
                .videos
                .videos(TagFamily::FrameRange, "occluded", Some("None")),
            ["clip.mp4"]
        );
    }

    // -- object tags ---------------------------------------------------------

    #[test]
    fn object_tags_counted_per_object() {
        let counters = scan_one(json!({
            "objects": [
                {"key": "o1", "classTitle": "cat", "tags": [{"name": "color", "value": "black"}]},
                {"key": "o2", "classTitle": "dog", "tags": [
                    {"name": "color", "value": "black"}, {"name": "verified"}
                ]}
            ]
        }));
        assert_eq!(counters.object_tags.get("color"), 2);
        assert_eq!(counters.object_tags.get("verified"), 1);
        assert_eq!(counters.object_tag_values.get("color", "black"), 2);
        assert_eq!(counters.object_tag_values.get("verified", "None"), 1);
        // Object tags stay out of the annotation-level counters.
        assert_eq!(counters.property_tags.get("color"), 0);
    }
}
