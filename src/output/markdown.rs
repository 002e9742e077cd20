//! Markdown summary generation
//!
//! This module generates human-readable markdown summaries of a mirror run,
//! including timings, status counts and the resource tree of every seed.

use crate::output::{CrawlSummary, OutputResult, ResourceReport};
use crate::state::{ResourceKind, ResourceStatus};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Trees deeper than this are cut in the report
const MAX_TREE_DEPTH: usize = 8;

/// Generates a markdown summary of a finished crawl
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Mirror Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Finished**: {}\n",
        summary.finished_at.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        summary.duration_seconds()
    ));
    md.push_str(&format!(
        "- **Output Directory**: {}\n",
        summary.output_directory
    ));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Overall statistics
    let stats = &summary.statistics;
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!(
        "- **Total Resources**: {}\n",
        stats.total_resources
    ));
    md.push_str(&format!("- **Bytes Saved**: {}\n", stats.bytes_saved));
    md.push_str(&format!("- **Max Depth**: {}\n\n", stats.max_depth));

    md.push_str("## Status Breakdown\n\n");
    md.push_str("| Status | Count |\n");
    md.push_str("|--------|-------|\n");
    for status in ResourceStatus::all_states() {
        let count = stats.count(status);
        if count > 0 {
            md.push_str(&format!("| {} | {} |\n", status, count));
        }
    }
    md.push('\n');

    if !stats.resources_by_kind.is_empty() {
        md.push_str("## Kind Breakdown\n\n");
        md.push_str("| Kind | Count |\n");
        md.push_str("|------|-------|\n");
        for kind in [ResourceKind::Html, ResourceKind::Css, ResourceKind::Opaque] {
            if let Some(count) = stats.resources_by_kind.get(&kind) {
                md.push_str(&format!("| {} | {} |\n", kind, count));
            }
        }
        md.push('\n');
    }

    // Per-seed trees
    md.push_str("## Seeds\n\n");
    for root in &summary.roots {
        md.push_str(&format!("### {}\n\n", root.url));
        push_tree(&mut md, root, 0);
        md.push('\n');
    }

    md
}

fn push_tree(md: &mut String, report: &ResourceReport, depth: usize) {
    let indent = "  ".repeat(depth);
    let target = match &report.filename {
        Some(filename) => format!(" -> `{}`", filename),
        None => String::new(),
    };
    md.push_str(&format!(
        "{}- [{}] {}{}\n",
        indent, report.status, report.url, target
    ));

    if depth + 1 >= MAX_TREE_DEPTH {
        if !report.children.is_empty() {
            md.push_str(&format!(
                "{}  - ... {} more\n",
                indent,
                report.children.len()
            ));
        }
        return;
    }

    for child in &report.children {
        push_tree(md, child, depth + 1);
    }
}
