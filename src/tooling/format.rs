//! Format sync, relink, tree and status output as text or JSON.

use crate::sync::{NodeFailure, RelinkResult, SyncSummary};
use crate::tree::TreeNode;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn failure_rows(failures: &[NodeFailure]) -> Vec<serde_json::Value> {
    failures
        .iter()
        .map(|f| {
            json!({
                "external_id": f.external_id,
                "error": f.error.to_string(),
            })
        })
        .collect()
}

fn push_failures(out: &mut String, failures: &[NodeFailure], orphaned: &[String]) {
    if !failures.is_empty() {
        out.push_str(&format!("\n{}\n\n", format_section_heading("Failures")));
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Node", "Error"]);
        for failure in failures {
            table.add_row(vec![
                failure
                    .external_id
                    .clone()
                    .unwrap_or_else(|| "-".to_string()),
                failure.error.to_string(),
            ]);
        }
        out.push_str(&format!("{}\n", table));
    }
    if !orphaned.is_empty() {
        out.push_str(&format!(
            "\n{} {}\n",
            "Orphaned:".yellow(),
            orphaned.join(", ")
        ));
    }
}

pub fn sync_summary_json(summary: &SyncSummary) -> serde_json::Value {
    json!({
        "scope": summary.scope,
        "started_at": summary.started_at.to_rfc3339(),
        "duration_ms": summary.duration_ms,
        "created": summary.created,
        "updated": summary.updated,
        "unchanged": summary.unchanged,
        "failed": summary.failed,
        "linked": summary.linked,
        "orphaned": summary.orphaned,
        "failures": failure_rows(&summary.failures),
    })
}

pub fn format_sync_summary_text(summary: &SyncSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Sync")));
    out.push_str(&format!("  Scope: {}\n", summary.scope));
    out.push_str(&format!("  Started: {}\n", summary.started_at.to_rfc3339()));
    out.push_str(&format!("  Duration: {} ms\n\n", summary.duration_ms));

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "Created",
        "Updated",
        "Unchanged",
        "Failed",
        "Linked",
        "Orphaned",
    ]);
    table.add_row(vec![
        summary.created.to_string(),
        summary.updated.to_string(),
        summary.unchanged.to_string(),
        summary.failed.to_string(),
        summary.linked.to_string(),
        summary.orphaned.len().to_string(),
    ]);
    out.push_str(&format!("{}\n", table));
    push_failures(&mut out, &summary.failures, &summary.orphaned);
    out
}

pub fn relink_json(result: &RelinkResult) -> serde_json::Value {
    json!({
        "examined": result.examined,
        "linked": result.linked,
        "unlinked": result.unlinked,
        "orphaned": result.orphaned,
        "failures": failure_rows(&result.failures),
    })
}

pub fn format_relink_text(result: &RelinkResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Relink")));
    out.push_str(&format!("  Examined: {}\n", result.examined));
    out.push_str(&format!("  Linked: {}\n", result.linked));
    out.push_str(&format!("  Unlinked: {}\n", result.unlinked));
    push_failures(&mut out, &result.failures, &result.orphaned);
    out
}

/// Indented outline, one node per line.
pub fn format_tree_text(roots: &[TreeNode]) -> String {
    if roots.is_empty() {
        return "No nodes to show.\n".to_string();
    }
    let mut out = String::new();
    for root in roots {
        for (depth, node) in root.walk() {
            let stored = &node.node;
            let kind = if stored.node_type.is_empty() {
                stored.type_id.clone()
            } else {
                format!("{} {}", stored.node_type, stored.type_id)
            };
            out.push_str(&format!(
                "{}{} {}",
                "  ".repeat(depth),
                stored.name,
                format!("[{}]", stored.external_id).dimmed()
            ));
            if !kind.trim().is_empty() {
                out.push_str(&format!(" {}", kind.trim().cyan()));
            }
            out.push('\n');
        }
    }
    out
}

/// Node counts for one scope
#[derive(Debug, Clone, Serialize)]
pub struct ScopeStatus {
    pub scope: String,
    pub store_path: String,
    pub total_nodes: usize,
    pub top_level: usize,
    pub linked: usize,
    pub orphaned: usize,
    pub remote_configured: bool,
}

pub fn format_status_text(status: &ScopeStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Org Tree Status")));
    out.push_str(&format!("  Scope: {}\n", status.scope));
    out.push_str(&format!("  Store path: {}\n", status.store_path));
    let remote = if status.remote_configured {
        "configured".green().to_string()
    } else {
        "not configured".red().to_string()
    };
    out.push_str(&format!("  Remote: {}\n\n", remote));

    if status.total_nodes == 0 {
        out.push_str("No nodes imported yet. Run `orgtree sync` to import the org chart.\n");
        return out;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Total", "Top-level", "Linked", "Orphaned"]);
    table.add_row(vec![
        status.total_nodes.to_string(),
        status.top_level.to_string(),
        status.linked.to_string(),
        status.orphaned.to_string(),
    ]);
    out.push_str(&format!("{}\n", table));
    out
}
