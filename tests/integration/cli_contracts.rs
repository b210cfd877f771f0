use crate::integration::support::{serve_json, workspace, CHART, CHART_NODES};
use orgtree::error::ApiError;
use orgtree::tooling::cli::{CliContext, Commands};
use std::fs;
use tempfile::TempDir;

fn import(cli: &CliContext, temp: &TempDir, format: &str) -> String {
    let file = temp.path().join("chart.json");
    fs::write(&file, CHART).unwrap();
    cli.execute(&Commands::Import {
        file,
        format: format.to_string(),
    })
    .unwrap()
}

fn tree(cli: &CliContext, root: Option<&str>, exclude: &[&str], max_depth: Option<usize>) -> serde_json::Value {
    let out = cli
        .execute(&Commands::Tree {
            root: root.map(str::to_string),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            max_depth,
            format: "json".to_string(),
        })
        .unwrap();
    serde_json::from_str(&out).unwrap()
}

fn count(nodes: &serde_json::Value) -> usize {
    nodes
        .as_array()
        .unwrap()
        .iter()
        .map(|n| 1 + count(&n["children"]))
        .sum()
}

#[test]
fn import_reports_counts_as_json() {
    let temp = TempDir::new().unwrap();
    let cli = CliContext::new(workspace(temp.path(), ""), None).unwrap();

    let out: serde_json::Value = serde_json::from_str(&import(&cli, &temp, "json")).unwrap();
    assert_eq!(out["created"], CHART_NODES);
    assert_eq!(out["failed"], 0);
    assert_eq!(out["scope"], "org_section");

    let again: serde_json::Value = serde_json::from_str(&import(&cli, &temp, "json")).unwrap();
    assert_eq!(again["created"], 0);
    assert_eq!(again["unchanged"], CHART_NODES);
}

#[test]
fn tree_uses_configured_depth_and_exclusions() {
    let temp = TempDir::new().unwrap();
    let ws = workspace(
        temp.path(),
        "[tree]\nmax_depth = 2\nexcluded_type_ids = [\"X\"]\n",
    );
    let cli = CliContext::new(ws, None).unwrap();
    import(&cli, &temp, "text");

    // Depth 2 from the root: City plus Education; Board is excluded.
    let view = tree(&cli, Some("1"), &[], None);
    assert_eq!(count(&view), 2);
    assert_eq!(view[0]["external_id"], "1");
    assert_eq!(view[0]["children"][0]["external_id"], "3");

    // Hiding the department too leaves City plus the detached office and units.
    let full = tree(&cli, Some("1"), &["12"], Some(0));
    assert_eq!(count(&full), 4);
    let tops: Vec<&str> = full
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["external_id"].as_str().unwrap())
        .collect();
    assert_eq!(tops, vec!["1", "21", "31", "32"]);
}

#[test]
fn tree_with_unknown_root_is_not_found() {
    let temp = TempDir::new().unwrap();
    let cli = CliContext::new(workspace(temp.path(), ""), None).unwrap();
    import(&cli, &temp, "text");

    let err = cli
        .execute(&Commands::Tree {
            root: Some("999".to_string()),
            exclude: Vec::new(),
            max_depth: None,
            format: "text".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::NodeNotFound(id) if id == "999"));
}

#[test]
fn status_counts_nodes() {
    let temp = TempDir::new().unwrap();
    let cli = CliContext::new(workspace(temp.path(), ""), None).unwrap();
    import(&cli, &temp, "text");

    let out = cli
        .execute(&Commands::Status {
            format: "json".to_string(),
        })
        .unwrap();
    let status: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(status["total_nodes"], CHART_NODES);
    assert_eq!(status["top_level"], 1);
    assert_eq!(status["linked"], CHART_NODES - 1);
    assert_eq!(status["orphaned"], 0);
    assert_eq!(status["remote_configured"], false);
}

#[test]
fn purge_requires_confirmation() {
    let temp = TempDir::new().unwrap();
    let cli = CliContext::new(workspace(temp.path(), ""), None).unwrap();
    import(&cli, &temp, "text");

    assert!(matches!(
        cli.execute(&Commands::Purge { yes: false }),
        Err(ApiError::InvalidArgument(_))
    ));
    let out = cli.execute(&Commands::Purge { yes: true }).unwrap();
    assert!(out.contains(&CHART_NODES.to_string()));

    let relink = cli
        .execute(&Commands::Relink {
            format: "json".to_string(),
        })
        .unwrap();
    let relink: serde_json::Value = serde_json::from_str(&relink).unwrap();
    assert_eq!(relink["examined"], 0);
}

#[test]
fn sync_without_remote_is_config_error() {
    let temp = TempDir::new().unwrap();
    let cli = CliContext::new(workspace(temp.path(), ""), None).unwrap();
    let err = cli
        .execute(&Commands::Sync {
            org_id: None,
            max_depth: None,
            deferred: false,
            format: "text".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::ConfigError(_)));
}

#[test]
fn sync_fetches_from_configured_remote() {
    let temp = TempDir::new().unwrap();
    let base_url = serve_json(CHART, 2);
    let ws = workspace(
        temp.path(),
        &format!("[remote]\nbase_url = \"{}\"\napi_key = \"test-key\"\n", base_url),
    );
    let cli = CliContext::new(ws, None).unwrap();

    let out = cli
        .execute(&Commands::Sync {
            org_id: Some("1".to_string()),
            max_depth: None,
            deferred: false,
            format: "json".to_string(),
        })
        .unwrap();
    let summary: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(summary["created"], CHART_NODES);
    assert_eq!(summary["orphaned"].as_array().unwrap().len(), 0);

    let out = cli
        .execute(&Commands::Sync {
            org_id: Some("1".to_string()),
            max_depth: None,
            deferred: true,
            format: "json".to_string(),
        })
        .unwrap();
    let summary: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(summary["created"], 0);
    assert_eq!(summary["unchanged"], CHART_NODES);
}

#[test]
fn invalid_org_id_is_rejected_before_fetch() {
    let temp = TempDir::new().unwrap();
    let cli = CliContext::new(workspace(temp.path(), ""), None).unwrap();
    let err = cli
        .execute(&Commands::Sync {
            org_id: Some("12a".to_string()),
            max_depth: None,
            deferred: false,
            format: "text".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));
}
