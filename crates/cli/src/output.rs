//! Rendering of run outcomes for stdout.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::Serialize;
use vidstats_core::meta::ProjectInfo;
use vidstats_core::report::ReportSet;
use vidstats_core::video_index::TagFamily;
use vidstats_pipeline::runner::RunOutcome;

/// Output encoding of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One GitHub-flavored markdown table per statistic.
    #[default]
    Markdown,
    /// The whole Report Set as pretty-printed JSON.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "Invalid output format '{other}'. Must be one of: markdown, json"
            )),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum JsonOutcome<'a> {
    Completed { report: &'a ReportSet },
    EmptyUniverse { project: &'a ProjectInfo },
}

/// Render `outcome` in `format`.
pub fn render(outcome: &RunOutcome, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Markdown => Ok(match outcome {
            RunOutcome::Completed(report) => render_markdown(report),
            RunOutcome::EmptyUniverse { project } => format!(
                "Project '{}' ({}) defines nothing to count for the requested statistics.\n",
                project.name, project.id
            ),
        }),
        OutputFormat::Json => {
            let json = match outcome {
                RunOutcome::Completed(report) => JsonOutcome::Completed { report },
                RunOutcome::EmptyUniverse { project } => JsonOutcome::EmptyUniverse { project },
            };
            serde_json::to_string_pretty(&json)
        }
    }
}

/// Markdown report: a heading per table followed by the table itself.
pub fn render_markdown(report: &ReportSet) -> String {
    let mut md = String::new();

    let _ = writeln!(
        md,
        "# Statistics for project '{}' ({})\n",
        report.project.name, report.project.id
    );
    if !report.complete {
        md.push_str(
            "_Partial report: the run was cancelled before every dataset was scanned._\n\n",
        );
    }

    for table in &report.tables {
        let _ = writeln!(md, "## {}\n", table.title);
        md.push_str(&table.table.to_markdown());
        md.push('\n');
    }

    if !report.video_index.is_empty() {
        md.push_str("## Videos by tag\n\n");
        for entry in &report.video_index {
            let family = match entry.family {
                TagFamily::Property => "video tag",
                TagFamily::FrameRange => "frame-range tag",
            };
            let _ = write!(md, "- {family} `{}`", entry.tag);
            if let Some(value) = &entry.value {
                let _ = write!(md, " = `{value}`");
            }
            let _ = writeln!(md, " in {}: {}", entry.dataset, entry.videos.join(", "));
        }
        md.push('\n');
    }

    if !report.skipped.is_empty() {
        md.push_str("## Skipped videos\n\n");
        for skipped in &report.skipped {
            let _ = writeln!(
                md,
                "- {}/{}: {}",
                skipped.dataset, skipped.video, skipped.reason
            );
        }
        md.push('\n');
    }

    md
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use vidstats_core::counters::CounterSet;
    use vidstats_core::meta::ProjectMeta;
    use vidstats_core::report::{build_report, ReportContext, SkippedVideo, StatFamilies};

    fn project() -> ProjectInfo {
        ProjectInfo {
            id: "pets".into(),
            name: "Pets".into(),
            project_type: "videos".into(),
        }
    }

    fn report(complete: bool, skipped: Vec<SkippedVideo>) -> ReportSet {
        let meta = ProjectMeta::new(vec!["cat".into()], vec!["verified".into()]);
        let mut counters = CounterSet::new(&meta);
        counters.objects.add("cat", 2);
        counters.property_tags.add("verified", 1);
        counters.property_tag_values.add("verified", "None", 1);
        counters
            .videos
            .record(TagFamily::Property, "verified", "None", "a.mp4");
        let ctx = ReportContext {
            project: project(),
            meta,
            families: StatFamilies::Both,
            with_totals: true,
            complete,
            skipped,
        };
        build_report(ctx, vec![counters.snapshot(0, "train")])
    }

    // -- OutputFormat --------------------------------------------------------

    #[test]
    fn format_parse() {
        assert_eq!("markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("MD".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_matches!(
            "csv".parse::<OutputFormat>(),
            Err(reason) if reason.contains("'csv'")
        );
    }

    // -- markdown ------------------------------------------------------------

    #[test]
    fn markdown_has_heading_per_table() {
        let md = render_markdown(&report(true, Vec::new()));
        assert!(md.starts_with("# Statistics for project 'Pets' (pets)"));
        assert!(md.contains("## Classes\n\n| # | class | total_objects |"));
        assert!(md.contains("## Object tag values"));
        assert!(md.contains("- video tag `verified` = `None` in train: a.mp4"));
        assert!(!md.contains("Partial report"));
        assert!(!md.contains("Skipped videos"));
    }

    #[test]
    fn markdown_flags_partial_and_skipped() {
        let skipped = vec![SkippedVideo {
            dataset: "train".into(),
            video: "bad.mp4".into(),
            reason: "unknown class".into(),
        }];
        let md = render_markdown(&report(false, skipped));
        assert!(md.contains("Partial report"));
        assert!(md.contains("- train/bad.mp4: unknown class"));
    }

    #[test]
    fn empty_universe_markdown() {
        let out = render(
            &RunOutcome::EmptyUniverse { project: project() },
            OutputFormat::Markdown,
        )
        .unwrap();
        assert!(out.contains("defines nothing to count"));
    }

    // -- json ----------------------------------------------------------------

    #[test]
    fn json_wraps_report_with_status() {
        let out = render(
            &RunOutcome::Completed(report(true, Vec::new())),
            OutputFormat::Json,
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["report"]["project"]["id"], "pets");
        assert_eq!(json["report"]["tables"][0]["columns"][2], "total_objects");
        assert_eq!(json["report"]["tables"][0]["rows"][0][2], 2);
        assert_eq!(json["report"]["video_index"][0]["videos"][0], "a.mp4");
    }

    #[test]
    fn json_empty_universe() {
        let out = render(
            &RunOutcome::EmptyUniverse { project: project() },
            OutputFormat::Json,
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["status"], "empty_universe");
        assert_eq!(json["project"]["name"], "Pets");
    }
}
