//! Table assembly.
//!
//! Merges per-dataset snapshots into one wide table per statistic family.
//! Datasets contribute columns in the order they are given; total columns
//! accumulate across datasets, and the final `Total` row is the column-wise
//! sum over the entity rows above it.
//!
//! Name-keyed tables have one row per known name, zero rows included.
//! Value-keyed tables have one row per observed `(name, value)` pair.

use std::collections::HashSet;

use crate::counters::{CounterSet, DatasetSnapshot, NameCounter, ValueCounter};
use crate::error::CoreError;
use crate::table::{Cell, Table, TOTAL_LABEL};
use crate::types::Count;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const INDEX_COLUMN: &str = "#";
pub const CLASS_COLUMN: &str = "class";
pub const TAG_COLUMN: &str = "tag";
pub const TAG_VALUE_COLUMN: &str = "tag_value";

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Name-keyed counter of a [`CounterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStat {
    Objects,
    Figures,
    Frames,
    PropertyTags,
    FrameTagFrames,
    FrameTagRanges,
    ObjectTags,
}

impl NameStat {
    pub fn counter(self, counters: &CounterSet) -> &NameCounter {
        match self {
            Self::Objects => &counters.objects,
            Self::Figures => &counters.figures,
            Self::Frames => &counters.frames,
            Self::PropertyTags => &counters.property_tags,
            Self::FrameTagFrames => &counters.frame_tag_frames,
            Self::FrameTagRanges => &counters.frame_tag_ranges,
            Self::ObjectTags => &counters.object_tags,
        }
    }
}

/// Value-keyed counter of a [`CounterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueStat {
    PropertyTagValues,
    FrameTagValueFrames,
    FrameTagValueRanges,
    ObjectTagValues,
}

impl ValueStat {
    pub fn counter(self, counters: &CounterSet) -> &ValueCounter {
        match self {
            Self::PropertyTagValues => &counters.property_tag_values,
            Self::FrameTagValueFrames => &counters.frame_tag_value_frames,
            Self::FrameTagValueRanges => &counters.frame_tag_value_ranges,
            Self::ObjectTagValues => &counters.object_tag_values,
        }
    }
}

/// One statistic column group of a table.
#[derive(Debug, Clone, Copy)]
pub struct Metric<S> {
    /// Header of the cross-dataset total column.
    pub total_column: &'static str,
    /// Appended to the dataset name to form the per-dataset header.
    pub suffix: &'static str,
    pub stat: S,
}

pub type NameMetric = Metric<NameStat>;
pub type ValueMetric = Metric<ValueStat>;

pub const CLASS_METRICS: [NameMetric; 3] = [
    Metric {
        total_column: "total_objects",
        suffix: "_objects",
        stat: NameStat::Objects,
    },
    Metric {
        total_column: "total_figures",
        suffix: "_figures",
        stat: NameStat::Figures,
    },
    Metric {
        total_column: "total_frames",
        suffix: "_frames",
        stat: NameStat::Frames,
    },
];

pub const PROPERTY_TAG_METRICS: [NameMetric; 1] = [Metric {
    total_column: "total",
    suffix: "",
    stat: NameStat::PropertyTags,
}];

pub const PROPERTY_TAG_VALUE_METRICS: [ValueMetric; 1] = [Metric {
    total_column: "total",
    suffix: "",
    stat: ValueStat::PropertyTagValues,
}];

pub const FRAME_TAG_METRICS: [NameMetric; 2] = [
    Metric {
        total_column: "total",
        suffix: "",
        stat: NameStat::FrameTagFrames,
    },
    Metric {
        total_column: "total_cnt",
        suffix: "_cnt",
        stat: NameStat::FrameTagRanges,
    },
];

pub const FRAME_TAG_VALUE_METRICS: [ValueMetric; 2] = [
    Metric {
        total_column: "total",
        suffix: "",
        stat: ValueStat::FrameTagValueFrames,
    },
    Metric {
        total_column: "total_cnt",
        suffix: "_cnt",
        stat: ValueStat::FrameTagValueRanges,
    },
];

pub const OBJECT_TAG_METRICS: [NameMetric; 1] = [Metric {
    total_column: "total",
    suffix: "",
    stat: NameStat::ObjectTags,
}];

pub const OBJECT_TAG_VALUE_METRICS: [ValueMetric; 1] = [Metric {
    total_column: "total",
    suffix: "",
    stat: ValueStat::ObjectTagValues,
}];

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

fn headers<S>(
    labels: &[&str],
    metrics: &[Metric<S>],
    snapshots: &[DatasetSnapshot],
    with_totals: bool,
) -> Vec<String> {
    let datasets: Vec<&str> = snapshots.iter().map(DatasetSnapshot::name).collect();
    column_names(labels, metrics, &datasets, with_totals)
}

fn column_names<S>(
    labels: &[&str],
    metrics: &[Metric<S>],
    datasets: &[&str],
    with_totals: bool,
) -> Vec<String> {
    let mut columns: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
    if with_totals {
        columns.extend(metrics.iter().map(|m| m.total_column.to_string()));
    }
    for dataset in datasets {
        columns.extend(metrics.iter().map(|m| format!("{dataset}{}", m.suffix)));
    }
    columns
}

/// Reject dataset names that would give some table two columns with the
/// same header, such as a dataset called `total` next to the total column.
pub fn check_dataset_columns(datasets: &[&str], with_totals: bool) -> Result<(), CoreError> {
    let named = [INDEX_COLUMN, TAG_COLUMN];
    let valued = [INDEX_COLUMN, TAG_COLUMN, TAG_VALUE_COLUMN];
    let layouts = [
        column_names(&[INDEX_COLUMN, CLASS_COLUMN], &CLASS_METRICS, datasets, with_totals),
        column_names(&named, &PROPERTY_TAG_METRICS, datasets, with_totals),
        column_names(&valued, &PROPERTY_TAG_VALUE_METRICS, datasets, with_totals),
        column_names(&named, &FRAME_TAG_METRICS, datasets, with_totals),
        column_names(&valued, &FRAME_TAG_VALUE_METRICS, datasets, with_totals),
        column_names(&named, &OBJECT_TAG_METRICS, datasets, with_totals),
        column_names(&valued, &OBJECT_TAG_VALUE_METRICS, datasets, with_totals),
    ];
    for columns in &layouts {
        let mut seen: HashSet<&str> = HashSet::with_capacity(columns.len());
        for column in columns {
            if !seen.insert(column.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Dataset names produce the column '{column}' twice; rename the dataset"
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Name-keyed tables
// ---------------------------------------------------------------------------

/// Build a name-keyed table with one row per entry of `names`.
///
/// Columns: `#`, `label_column`, one total column per metric (when
/// `with_totals`), then one column per metric for every dataset.
pub fn assemble_named(
    label_column: &str,
    names: &[String],
    snapshots: &[DatasetSnapshot],
    metrics: &[NameMetric],
    with_totals: bool,
) -> Table {
    let columns = headers(
        &[INDEX_COLUMN, label_column],
        metrics,
        snapshots,
        with_totals,
    );
    let mut table = Table::new(columns);

    for (idx, name) in names.iter().enumerate() {
        let mut totals: Vec<Count> = vec![0; metrics.len()];
        let mut per_dataset: Vec<Cell> = Vec::with_capacity(snapshots.len() * metrics.len());
        for snapshot in snapshots {
            for (slot, metric) in totals.iter_mut().zip(metrics) {
                let count = metric.stat.counter(snapshot.counters()).get(name);
                *slot = slot.saturating_add(count);
                per_dataset.push(Cell::Count(count));
            }
        }

        let mut row = vec![Cell::Count(idx as Count), Cell::from(name.as_str())];
        if with_totals {
            row.extend(totals.into_iter().map(Cell::Count));
        }
        row.extend(per_dataset);
        table.rows.push(row);
    }

    push_total_row(&mut table, 1);
    table
}

// ---------------------------------------------------------------------------
// Value-keyed tables
// ---------------------------------------------------------------------------

/// Distinct `(name, value)` keys across all datasets and metrics.
///
/// Names listed in `name_order` come first, in that order; any other name
/// follows in first-observation order. Values keep first-observation order
/// across datasets.
fn value_keys(
    name_order: &[String],
    snapshots: &[DatasetSnapshot],
    metrics: &[ValueMetric],
) -> Vec<(String, Vec<String>)> {
    let mut keys: Vec<(String, Vec<String>)> = Vec::new();
    let mut observe = |name: &str, value: &str| {
        let pos = match keys.iter().position(|(n, _)| n == name) {
            Some(pos) => pos,
            None => {
                keys.push((name.to_string(), Vec::new()));
                keys.len() - 1
            }
        };
        let values = &mut keys[pos].1;
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    };

    for snapshot in snapshots {
        for metric in metrics {
            for (name, value, count) in metric.stat.counter(snapshot.counters()).iter() {
                if count > 0 {
                    observe(name, value);
                }
            }
        }
    }

    let rank = |name: &str| {
        name_order
            .iter()
            .position(|n| n == name)
            .unwrap_or(name_order.len())
    };
    // Stable sort keeps first-observation order among unranked names.
    keys.sort_by_key(|(name, _)| rank(name));
    keys
}

/// Build a value-keyed table with one row per observed `(name, value)`.
///
/// Columns: `#`, `tag`, `tag_value`, then totals and per-dataset columns as
/// in [`assemble_named`]. The total row carries `Total` in both label cells.
pub fn assemble_values(
    name_order: &[String],
    snapshots: &[DatasetSnapshot],
    metrics: &[ValueMetric],
    with_totals: bool,
) -> Table {
    let columns = headers(
        &[INDEX_COLUMN, TAG_COLUMN, TAG_VALUE_COLUMN],
        metrics,
        snapshots,
        with_totals,
    );
    let mut table = Table::new(columns);

    let mut idx: Count = 0;
    for (name, values) in value_keys(name_order, snapshots, metrics) {
        for value in values {
            let mut totals: Vec<Count> = vec![0; metrics.len()];
            let mut per_dataset: Vec<Cell> = Vec::with_capacity(snapshots.len() * metrics.len());
            for snapshot in snapshots {
                for (slot, metric) in totals.iter_mut().zip(metrics) {
                    let count = metric.stat.counter(snapshot.counters()).get(&name, &value);
                    *slot = slot.saturating_add(count);
                    per_dataset.push(Cell::Count(count));
                }
            }

            let mut row = vec![
                Cell::Count(idx),
                Cell::from(name.as_str()),
                Cell::from(value),
            ];
            if with_totals {
                row.extend(totals.into_iter().map(Cell::Count));
            }
            row.extend(per_dataset);
            table.rows.push(row);
            idx += 1;
        }
    }

    push_total_row(&mut table, 2);
    table
}

// ---------------------------------------------------------------------------
// Total row
// ---------------------------------------------------------------------------

/// Append the `Total` row.
///
/// The index cell holds the number of entity rows, the next `label_cells`
/// cells hold [`TOTAL_LABEL`], and every other cell is the sum of its column
/// over the entity rows.
fn push_total_row(table: &mut Table, label_cells: usize) {
    let first_numeric = 1 + label_cells;
    let mut total = Vec::with_capacity(table.columns.len());
    total.push(Cell::Count(table.rows.len() as Count));
    total.extend((0..label_cells).map(|_| Cell::from(TOTAL_LABEL)));
    for col in first_numeric..table.columns.len() {
        let sum: Count = table
            .rows
            .iter()
            .filter_map(|row| row.get(col).and_then(Cell::as_count))
            .fold(0, Count::saturating_add);
        total.push(Cell::Count(sum));
    }
    table.rows.push(total);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::ProjectMeta;

    fn meta() -> ProjectMeta {
        ProjectMeta::new(
            vec!["cat".into(), "dog".into(), "bird".into()],
            vec!["verified".into(), "occluded".into(), "color".into()],
        )
    }

    fn dataset(position: usize, name: &str, fill: impl FnOnce(&mut CounterSet)) -> DatasetSnapshot {
        let mut counters = CounterSet::new(&meta());
        fill(&mut counters);
        counters.snapshot(position, name)
    }

    /// Every numeric column of the total row equals the sum of the rows above.
    fn assert_total_row_consistent(table: &Table, first_numeric: usize) {
        let (total, rows) = table.rows.split_last().unwrap();
        for col in first_numeric..table.columns.len() {
            let sum: Count = rows.iter().map(|r| r[col].as_count().unwrap()).sum();
            assert_eq!(total[col], Cell::Count(sum), "column {}", table.columns[col]);
        }
    }

    // -- assemble_named ------------------------------------------------------

    #[test]
    fn classes_columns_and_totals() {
        let snapshots = vec![
            dataset(0, "train", |c| {
                c.objects.add("cat", 2);
                c.figures.add("cat", 10);
                c.frames.add("cat", 8);
                c.objects.add("dog", 1);
            }),
            dataset(1, "val", |c| {
                c.objects.add("cat", 3);
                c.figures.add("dog", 4);
            }),
        ];
        let table = assemble_named(
            CLASS_COLUMN,
            &meta().obj_classes,
            &snapshots,
            &CLASS_METRICS,
            true,
        );

        assert_eq!(
            table.columns,
            vec![
                "#", "class", "total_objects", "total_figures", "total_frames",
                "train_objects", "train_figures", "train_frames",
                "val_objects", "val_figures", "val_frames",
            ]
        );
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.count("class", "cat", "total_objects"), Some(5));
        assert_eq!(table.count("class", "cat", "val_objects"), Some(3));
        assert_eq!(table.count("class", "dog", "total_figures"), Some(4));
        assert_eq!(table.count("class", "Total", "total_objects"), Some(6));
        assert_eq!(table.count("class", "Total", "train_figures"), Some(10));
        assert_eq!(table.count("class", "Total", "#"), Some(3));
        assert_total_row_consistent(&table, 2);
    }

    #[test]
    fn zero_rows_are_kept() {
        let snapshots = vec![dataset(0, "train", |_| {})];
        let table = assemble_named(
            CLASS_COLUMN,
            &meta().obj_classes,
            &snapshots,
            &CLASS_METRICS,
            true,
        );
        for name in ["cat", "dog", "bird"] {
            for column in ["total_objects", "train_frames"] {
                assert_eq!(table.count("class", name, column), Some(0));
            }
        }
    }

    #[test]
    fn no_datasets_still_has_rows_and_total() {
        let table = assemble_named(TAG_COLUMN, &meta().tag_metas, &[], &PROPERTY_TAG_METRICS, true);
        assert_eq!(table.columns, vec!["#", "tag", "total"]);
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.count("tag", "Total", "total"), Some(0));
    }

    #[test]
    fn unknown_names_never_become_rows() {
        let snapshots = vec![dataset(0, "train", |c| c.property_tags.increment("stray"))];
        let table = assemble_named(
            TAG_COLUMN,
            &meta().tag_metas,
            &snapshots,
            &PROPERTY_TAG_METRICS,
            true,
        );
        assert_eq!(table.find_row("tag", "stray"), None);
        assert_eq!(table.count("tag", "Total", "total"), Some(0));
    }

    #[test]
    fn frame_tags_carry_two_columns_per_dataset() {
        let snapshots = vec![
            dataset(0, "a", |c| {
                c.frame_tag_frames.add("occluded", 5);
                c.frame_tag_ranges.add("occluded", 1);
            }),
            dataset(1, "b", |c| {
                c.frame_tag_frames.add("occluded", 3);
                c.frame_tag_ranges.add("occluded", 2);
                c.frame_tag_frames.add("verified", 7);
                c.frame_tag_ranges.add("verified", 1);
            }),
        ];
        let table = assemble_named(TAG_COLUMN, &meta().tag_metas, &snapshots, &FRAME_TAG_METRICS, true);

        assert_eq!(
            table.columns,
            vec!["#", "tag", "total", "total_cnt", "a", "a_cnt", "b", "b_cnt"]
        );
        assert_eq!(table.count("tag", "occluded", "total"), Some(8));
        assert_eq!(table.count("tag", "occluded", "total_cnt"), Some(3));
        assert_eq!(table.count("tag", "Total", "total"), Some(15));
        assert_eq!(table.count("tag", "Total", "total_cnt"), Some(4));
        assert_eq!(table.count("tag", "Total", "b_cnt"), Some(3));
        assert_total_row_consistent(&table, 2);
    }

    #[test]
    fn single_dataset_layout_drops_total_columns() {
        let snapshots = vec![dataset(0, "only", |c| c.object_tags.add("color", 2))];
        let table = assemble_named(TAG_COLUMN, &meta().tag_metas, &snapshots, &OBJECT_TAG_METRICS, false);
        assert_eq!(table.columns, vec!["#", "tag", "only"]);
        assert_eq!(table.count("tag", "color", "only"), Some(2));
        assert_eq!(table.count("tag", "Total", "only"), Some(2));
    }

    // -- assemble_values -----------------------------------------------------

    #[test]
    fn value_rows_merge_across_datasets() {
        let snapshots = vec![
            dataset(0, "a", |c| {
                c.property_tag_values.add("color", "red", 2);
                c.property_tag_values.add("verified", "None", 1);
            }),
            dataset(1, "b", |c| {
                c.property_tag_values.add("color", "blue", 4);
                c.property_tag_values.add("color", "red", 1);
            }),
        ];
        let table = assemble_values(
            &meta().tag_metas,
            &snapshots,
            &PROPERTY_TAG_VALUE_METRICS,
            true,
        );

        assert_eq!(table.columns, vec!["#", "tag", "tag_value", "total", "a", "b"]);
        let labels: Vec<(String, String)> = table
            .rows
            .iter()
            .map(|r| (r[1].to_string(), r[2].to_string()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("verified".to_string(), "None".to_string()),
                ("color".to_string(), "red".to_string()),
                ("color".to_string(), "blue".to_string()),
                ("Total".to_string(), "Total".to_string()),
            ]
        );
        assert_eq!(table.count("tag_value", "red", "total"), Some(3));
        assert_eq!(table.count("tag_value", "red", "b"), Some(1));
        assert_eq!(table.count("tag_value", "blue", "a"), Some(0));
        assert_eq!(table.count("tag_value", "Total", "total"), Some(8));
        assert_eq!(table.count("tag_value", "Total", "#"), Some(3));
        assert_total_row_consistent(&table, 3);
    }

    #[test]
    fn same_name_different_values_are_independent_rows() {
        let snapshots = vec![dataset(0, "a", |c| {
            c.object_tag_values.add("color", "red", 1);
            c.object_tag_values.add("color", "black", 5);
        })];
        let table = assemble_values(&meta().tag_metas, &snapshots, &OBJECT_TAG_VALUE_METRICS, true);
        assert_eq!(table.count("tag_value", "red", "a"), Some(1));
        assert_eq!(table.count("tag_value", "black", "a"), Some(5));
    }

    #[test]
    fn frame_tag_values_have_duration_and_count() {
        let snapshots = vec![dataset(0, "a", |c| {
            c.frame_tag_value_frames.add("occluded", "None", 5);
            c.frame_tag_value_ranges.add("occluded", "None", 1);
        })];
        let table = assemble_values(&meta().tag_metas, &snapshots, &FRAME_TAG_VALUE_METRICS, true);
        assert_eq!(
            table.columns,
            vec!["#", "tag", "tag_value", "total", "total_cnt", "a", "a_cnt"]
        );
        assert_eq!(table.count("tag_value", "None", "a"), Some(5));
        assert_eq!(table.count("tag_value", "None", "a_cnt"), Some(1));
        assert_total_row_consistent(&table, 3);
    }

    #[test]
    fn empty_value_table_has_only_total_row() {
        let snapshots = vec![dataset(0, "a", |_| {})];
        let table = assemble_values(&meta().tag_metas, &snapshots, &PROPERTY_TAG_VALUE_METRICS, true);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(
            table.rows[0],
            vec![
                Cell::Count(0),
                Cell::from("Total"),
                Cell::from("Total"),
                Cell::Count(0),
                Cell::Count(0),
            ]
        );
    }

    #[test]
    fn unlisted_names_follow_known_names() {
        let snapshots = vec![dataset(0, "a", |c| {
            c.object_tag_values.add("stray", "x", 1);
            c.object_tag_values.add("color", "red", 1);
        })];
        let table = assemble_values(&meta().tag_metas, &snapshots, &OBJECT_TAG_VALUE_METRICS, true);
        assert_eq!(table.rows[0][1], Cell::from("color"));
        assert_eq!(table.rows[1][1], Cell::from("stray"));
    }

    // -- check_dataset_columns -----------------------------------------------

    #[test]
    fn distinct_dataset_names_pass() {
        assert!(check_dataset_columns(&["train", "val"], true).is_ok());
        assert!(check_dataset_columns(&[], true).is_ok());
    }

    #[test]
    fn dataset_named_like_a_total_column_rejected() {
        for name in ["total", "total_cnt"] {
            let err = check_dataset_columns(&["train", name], true).unwrap_err();
            assert!(err.to_string().contains("'total"), "{err}");
        }
        // `total` + `_objects` lands on the class table's total column.
        assert!(check_dataset_columns(&["total"], true).is_err());
    }

    #[test]
    fn single_dataset_only_clashes_with_label_columns() {
        assert!(check_dataset_columns(&["total"], false).is_ok());
        assert!(check_dataset_columns(&["tag"], false).is_err());
        assert!(check_dataset_columns(&["#"], false).is_err());
    }

    #[test]
    fn dataset_names_clashing_with_each_other_rejected() {
        assert!(check_dataset_columns(&["a", "a"], true).is_err());
        // `a` + `_cnt` and the dataset `a_cnt` share a frame tag column.
        assert!(check_dataset_columns(&["a", "a_cnt"], true).is_err());
    }

    #[test]
    fn totals_saturate_instead_of_wrapping() {
        let snapshots = vec![
            dataset(0, "a", |c| c.frame_tag_frames.add("occluded", u64::MAX)),
            dataset(1, "b", |c| c.frame_tag_frames.add("occluded", 2)),
        ];
        let table = assemble_named(TAG_COLUMN, &meta().tag_metas, &snapshots, &FRAME_TAG_METRICS, true);
        assert_eq!(table.count("tag", "occluded", "total"), Some(u64::MAX));
        assert_eq!(table.count("tag", "Total", "total"), Some(u64::MAX));
    }
}
