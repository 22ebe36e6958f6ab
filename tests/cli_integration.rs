//! Integration tests for the `scopes` CLI.
//!
//! Each test creates a temp workspace, runs `scopes` as a subprocess, and
//! checks stdout, exit status, or the stored forest.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::Value;

/// Get the path to the built `scopes` binary.
fn scopes_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("scopes");
    path
}

/// Run `scopes` with the given args and stdin, returning (stdout, stderr, success).
fn run_scopes_with_input(dir: &Path, args: &[&str], input: &str) -> (String, String, bool) {
    let mut child = Command::new(scopes_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("SCOPES_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run scopes");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_scopes(dir: &Path, args: &[&str]) -> (String, String, bool) {
    run_scopes_with_input(dir, args, "")
}

/// Run `scopes` expecting success, return stdout.
fn run_ok_with_input(dir: &Path, args: &[&str], input: &str) -> String {
    let (stdout, stderr, success) = run_scopes_with_input(dir, args, input);
    if !success {
        panic!(
            "scopes {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

fn run_ok(dir: &Path, args: &[&str]) -> String {
    run_ok_with_input(dir, args, "")
}

/// Run a command whose stdout is a single id
fn run_id(dir: &Path, args: &[&str]) -> String {
    run_ok(dir, args).trim().to_string()
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let mut all = args.to_vec();
    all.push("--json");
    serde_json::from_str(&run_ok(dir, &all)).unwrap()
}

fn init_workspace() -> tempfile::TempDir {
    let tmp = tempfile::TempDir::new().unwrap();
    run_ok(tmp.path(), &["init"]);
    tmp
}

fn show(dir: &Path, id: &str) -> Value {
    run_json(dir, &["show", id])
}

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

#[test]
fn test_init_creates_workspace() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_ok(tmp.path(), &["init"]);
    assert!(out.contains("Initialized scopes workspace"));
    assert!(tmp.path().join(".scopes/scopes.toml").is_file());
    assert!(tmp.path().join(".scopes/forest.json").is_file());

    let (_, stderr, success) = run_scopes(tmp.path(), &["init"]);
    assert!(!success);
    assert!(stderr.contains("already exists"));
}

#[test]
fn test_commands_need_a_workspace() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_scopes(tmp.path(), &["list"]);
    assert!(!success);
    assert!(stderr.contains("scopes init"));
}

#[test]
fn test_workspace_found_from_subdirectory_and_with_dir_flag() {
    let tmp = init_workspace();
    let nested = tmp.path().join("src").join("deep");
    fs::create_dir_all(&nested).unwrap();

    run_ok(&nested, &["add", "From below"]);
    let elsewhere = tempfile::TempDir::new().unwrap();
    let dir = tmp.path().to_str().unwrap();
    let out = run_ok(elsewhere.path(), &["-C", dir, "list", "Unassigned"]);
    assert!(out.contains("From below"));
}

// ---------------------------------------------------------------------------
// Projects and tasks
// ---------------------------------------------------------------------------

#[test]
fn test_project_and_task_listing() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let project = run_id(dir, &["project", "add", "Work"]);
    run_ok(dir, &["add", "Write report", "-p", "work"]);
    run_ok(dir, &["add", "Loose end"]);

    let out = run_ok(dir, &["list", "Work"]);
    assert!(out.contains("== Work ("));
    assert!(out.contains("[ ] "));
    assert!(out.contains("Write report"));
    assert!(!out.contains("Loose end"));

    let projects = run_json(dir, &["projects"]);
    let names: Vec<&str> = projects
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Work", "Unassigned"]);

    let listing = run_json(dir, &["list", &project]);
    assert_eq!(listing[0]["roots"][0]["text"], "Write report");
    assert_eq!(listing[0]["roots"][0]["provenance"], "manual");
}

#[test]
fn test_status_rolls_up_and_undo_restores_it() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let root = run_id(dir, &["add", "Dinner"]);
    let kids = run_ok(dir, &["sub", &root, "Shop", "Cook"]);
    let kids: Vec<&str> = kids.lines().collect();
    assert_eq!(kids.len(), 2);

    run_ok(dir, &["edit", kids[0], "--status", "done"]);
    assert_eq!(show(dir, &root)["status"], "inprogress");

    run_ok(dir, &["edit", kids[1], "--status", "done"]);
    assert_eq!(show(dir, &root)["status"], "done");

    let out = run_ok(dir, &["undo"]);
    assert!(out.contains("edit task"));
    assert_eq!(show(dir, &root)["status"], "inprogress");

    run_ok(dir, &["redo"]);
    assert_eq!(show(dir, &root)["status"], "done");

    let check = run_json(dir, &["check"]);
    assert_eq!(check["valid"], true);
}

#[test]
fn test_edit_rejects_unknown_status() {
    let tmp = init_workspace();
    let id = run_id(tmp.path(), &["add", "Thing"]);
    let (_, stderr, success) = run_scopes(tmp.path(), &["edit", &id, "--status", "blocked"]);
    assert!(!success);
    assert!(stderr.contains("unknown status"));
}

#[test]
fn test_short_id_prefix_resolves() {
    let tmp = init_workspace();
    let id = run_id(tmp.path(), &["add", "Prefixed"]);
    let detail = show(tmp.path(), &id[..8]);
    assert_eq!(detail["id"], id.as_str());
}

#[test]
fn test_rm_then_undo() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let root = run_id(dir, &["add", "Trip"]);
    run_ok(dir, &["sub", &root, "Book", "Pack"]);

    let out = run_ok(dir, &["rm", &root]);
    assert!(out.contains("deleted 3 tasks"));
    assert!(!run_ok(dir, &["list"]).contains("Trip"));

    run_ok(dir, &["undo"]);
    assert_eq!(show(dir, &root)["children"].as_array().unwrap().len(), 2);
}

#[test]
fn test_deleting_project_moves_tasks_to_unassigned() {
    let tmp = init_workspace();
    let dir = tmp.path();
    run_ok(dir, &["project", "add", "Side"]);
    let id = run_id(dir, &["add", "Keep me", "--project", "Side"]);
    run_ok(dir, &["project", "rm", "Side"]);

    let detail = show(dir, &id);
    assert_eq!(detail["projectId"], "unassigned");
}

#[test]
fn test_promote_and_move() {
    let tmp = init_workspace();
    let dir = tmp.path();
    run_ok(dir, &["project", "add", "Home"]);
    let root = run_id(dir, &["add", "Chores"]);
    let kid = run_id(dir, &["sub", &root, "Laundry"]);

    let other = run_id(dir, &["sub", &root, "Dishes"]);

    run_ok(dir, &["promote", &kid]);
    assert!(show(dir, &kid)["path"].as_array().unwrap().is_empty());
    let (_, stderr, success) = run_scopes(dir, &["promote", &kid]);
    assert!(!success);
    assert!(stderr.contains("already a root"));

    run_ok(dir, &["mv", &other, "Home"]);
    assert!(run_ok(dir, &["list", "Home"]).contains("Dishes"));
    assert!(show(dir, &root)["children"].is_null());

    let (_, _, success) = run_scopes(dir, &["mv", &other, "Home"]);
    assert!(!success);
}

#[test]
fn test_comments_results_and_summaries() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let id = run_id(dir, &["add", "Deploy"]);
    let comment = run_id(dir, &["comment", "add", &id, "Needs a rollback plan"]);
    run_ok(dir, &["comment", "reply", &id, &comment, "Added one"]);
    run_ok(dir, &["comment", "resolve", &id, &comment, "accepted"]);
    run_ok_with_input(dir, &["result", &id, "-"], "deployed v2\n");
    run_ok(dir, &["summary", &id, "Shipped"]);

    let detail = show(dir, &id);
    assert_eq!(detail["comments"][0]["status"], "accepted");
    assert_eq!(detail["comments"][0]["replies"][0]["text"], "Added one");
    assert_eq!(detail["results"][0]["output"], "deployed v2\n");
    assert_eq!(detail["summaries"][0]["text"], "Shipped");
}

#[test]
fn test_search_finds_text_and_descriptions() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let id = run_id(dir, &["add", "Paint fence"]);
    run_ok(dir, &["edit", &id, "--description", "white primer first"]);
    run_ok(dir, &["add", "Mow lawn"]);

    let out = run_ok(dir, &["search", "primer"]);
    assert!(out.contains("Paint fence"));
    assert!(!out.contains("Mow lawn"));

    let hits = run_json(dir, &["search", "(?i)paint|primer"]);
    let fields: Vec<&str> = hits
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["text", "description"]);
}

#[test]
fn test_select_round_trip() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let id = run_id(dir, &["add", "Focus"]);
    run_ok(dir, &["select", "--clear"]);
    assert!(run_json(dir, &["select"])["taskId"].is_null());

    run_ok(dir, &["select", &id]);
    let selection = run_json(dir, &["select"]);
    assert_eq!(selection["taskId"], id.as_str());
    assert_eq!(selection["projectId"], "unassigned");
}

// ---------------------------------------------------------------------------
// Generated content
// ---------------------------------------------------------------------------

#[test]
fn test_ingest_json_outline_from_stdin() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let root = run_id(dir, &["add", "Dinner"]);

    let reply = "Sure! Here you go:\n```json\n{\"Menu\": {\"Shop\": [\"eggs\", \"milk\"], \"Cook\": \"pasta\"}}\n```";
    let out = run_ok_with_input(dir, &["ingest", "-", "--parent", &root, "--json"], reply);
    let result: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(result["totalCount"], 5);

    let detail = show(dir, &root);
    let menu = &detail["children"][0];
    assert_eq!(menu["text"], "Menu");
    assert_eq!(menu["provenance"], "ai");
    assert_eq!(menu["children"][0]["children"][1]["text"], "milk");
    assert_eq!(menu["children"][1]["text"], "Cook");
    assert_eq!(menu["children"][1]["description"], "pasta");

    let exported = run_ok(dir, &["export", &root]);
    assert_eq!(
        exported,
        "- Dinner\n  - Menu\n    - Shop\n      - eggs\n      - milk\n    - Cook: pasta\n"
    );
}

#[test]
fn test_ingest_indented_text_into_project() {
    let tmp = init_workspace();
    let dir = tmp.path();
    run_ok(dir, &["project", "add", "Garden"]);

    let outline = "- Prepare beds\n  - Weed\n  - Compost\n- Plant\n";
    run_ok_with_input(dir, &["ingest", "-", "--project", "Garden"], outline);
    let out = run_ok(dir, &["list", "Garden"]);
    assert!(out.contains("Prepare beds ~"));
    assert!(out.contains("Compost ~"));
    let listing = run_json(dir, &["list", "Garden"]);
    let roots = listing[0]["roots"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["children"][1]["text"], "Compost");
}

#[test]
fn test_ingest_of_empty_reply_changes_nothing() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let root = run_id(dir, &["add", "Anchor"]);
    let before = run_json(dir, &["history"])["undo"].as_array().unwrap().len();

    let (_, stderr, success) =
        run_scopes_with_input(dir, &["ingest", "-", "--parent", &root], "```\n```");
    assert!(!success);
    assert!(stderr.contains("no outline nodes"));
    let after = run_json(dir, &["history"])["undo"].as_array().unwrap().len();
    assert_eq!(before, after);
}

#[test]
fn test_patch_replaces_subtree_and_filters_updates() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let target = run_id(dir, &["add", "Trip"]);
    run_ok(dir, &["sub", &target, "Old step"]);
    let other = run_id(dir, &["add", "Budget"]);

    let proposal = format!(
        r#"{{"replacement": {{"Weekend trip": ["Book train", "Pack"]}},
            "updates": [{{"id": "{other}", "changes": [
                {{"op": "replace", "path": "/text", "value": "Trip budget"}},
                {{"op": "replace", "path": "/status", "value": "done"}}
            ]}}, {{"id": "ghost", "changes": []}}]}}"#
    );
    let out = run_ok_with_input(dir, &["patch", &target, "-", "--json"], &proposal);
    let outcome: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(outcome["newChildIds"].as_array().unwrap().len(), 2);
    assert_eq!(outcome["skippedUpdates"], 1);
    assert_eq!(outcome["droppedChanges"], 1);

    let detail = show(dir, &target);
    assert_eq!(detail["id"], target.as_str());
    assert_eq!(detail["text"], "Weekend trip");
    assert_eq!(detail["children"][0]["text"], "Book train");

    let budget = show(dir, &other);
    assert_eq!(budget["text"], "Trip budget");
    assert_eq!(budget["status"], "todo");
}

/// Point the generator at `cat <file>` so replies are canned
fn use_canned_generator(dir: &Path, reply: &str) {
    let reply_path = dir.join("reply.txt");
    fs::write(&reply_path, reply).unwrap();
    let config = format!(
        "[generator]\ncommand = \"cat\"\nargs = [{:?}]\n",
        reply_path.to_str().unwrap()
    );
    fs::write(dir.join(".scopes/scopes.toml"), config).unwrap();
}

#[test]
fn test_expand_ingests_generated_outline() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let root = run_id(dir, &["add", "Launch"]);
    use_canned_generator(dir, "{\"Launch\": [\"Write notes\", \"Tag release\"]}");

    run_ok(dir, &["expand", &root]);
    let detail = show(dir, &root);
    let launch = &detail["children"][0];
    assert_eq!(launch["text"], "Launch");
    assert_eq!(launch["children"][1]["text"], "Tag release");
}

#[test]
fn test_regenerate_applies_proposal() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let root = run_id(dir, &["add", "Launch"]);
    run_ok(dir, &["sub", &root, "Stale"]);
    use_canned_generator(dir, r#"{"replacement": {"Launch v2": ["Fresh"]}, "updates": []}"#);

    run_ok(dir, &["regenerate", &root]);
    let detail = show(dir, &root);
    assert_eq!(detail["text"], "Launch v2");
    assert_eq!(detail["children"][0]["text"], "Fresh");
    assert_eq!(detail["children"].as_array().unwrap().len(), 1);
}

#[test]
fn test_generator_failure_leaves_forest_untouched() {
    let tmp = init_workspace();
    let dir = tmp.path();
    let root = run_id(dir, &["add", "Launch"]);
    fs::write(
        dir.join(".scopes/scopes.toml"),
        "[generator]\ncommand = \"scopes-no-such-generator\"\n",
    )
    .unwrap();

    let (_, stderr, success) = run_scopes(dir, &["expand", &root]);
    assert!(!success);
    assert!(stderr.contains("could not start generator"));
    assert!(show(dir, &root)["children"].is_null());
}
