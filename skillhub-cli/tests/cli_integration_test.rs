//! End-to-end tests for the skill-hub binary
//!
//! Every run gets its own hub, home and project directories, and the catalog
//! URLs point at a closed local port so nothing reaches the network.

use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Output;
use tempfile::TempDir;

struct Sandbox {
    hub: TempDir,
    home: TempDir,
    project: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            hub: TempDir::new().unwrap(),
            home: TempDir::new().unwrap(),
            project: TempDir::new().unwrap(),
        }
    }

    fn run(&self, args: &[&str]) -> Output {
        std::process::Command::new(env!("CARGO_BIN_EXE_skill-hub"))
            .current_dir(self.project.path())
            .args(args)
            .env("HOME", self.home.path())
            .env("SKILL_HUB_HOME", self.hub.path())
            .env("SKILL_HUB_SKILLS_URL", "http://127.0.0.1:9/skill.list")
            .env("SKILL_HUB_REPOS_URL", "http://127.0.0.1:9/repo.sort")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run skill-hub")
    }

    fn cached_bundle(&self, owner: &str, repo: &str, skill: &str) {
        let dir = self.hub.path().join(owner).join(repo).join(skill);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("SKILL.md"), format!("# {skill}\n")).unwrap();
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command failed\nstdout: {}\nstderr: {}",
        stdout(output),
        stderr(output)
    );
}

#[test]
fn test_list_empty_hub() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["list"]);

    assert_success(&output);
    assert!(stdout(&output).contains("No skills installed."));
}

#[test]
fn test_list_json() {
    let sandbox = Sandbox::new();
    sandbox.cached_bundle("acme", "tools", "demo");
    sandbox.cached_bundle("acme", "tools", "lint");

    let output = sandbox.run(&["list", "--json"]);
    assert_success(&output);

    let rows: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let skills: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["skill"].as_str().unwrap())
        .collect();
    assert_eq!(skills, vec!["demo", "lint"]);
    assert_eq!(rows[0]["owner"], "acme");
    assert_eq!(rows[0]["legacy"], false);
}

#[test]
fn test_tools_lists_known_tools() {
    let sandbox = Sandbox::new();
    fs::create_dir_all(sandbox.home.path().join(".claude")).unwrap();

    let output = sandbox.run(&["tools"]);
    assert_success(&output);

    let out = stdout(&output);
    assert!(out.contains("ClaudeCode"));
    assert!(out.contains("Cursor"));
    assert!(out.contains("global"));
}

#[test]
fn test_install_existing_bundle_is_skipped() {
    let sandbox = Sandbox::new();
    sandbox.cached_bundle("acme", "tools", "demo");

    let output = sandbox.run(&["install", "demo@acme/tools"]);
    assert_success(&output);
    assert!(stdout(&output).contains("already installed"));
}

#[test]
fn test_install_invalid_target() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["install", "demo@acme"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid repository"));
}

#[test]
fn test_install_missing_target_file() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["install", "team-skills.txt"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Target file not found"));
}

#[test]
fn test_install_from_file_reports_each_line() {
    let sandbox = Sandbox::new();
    sandbox.cached_bundle("acme", "tools", "demo");
    fs::write(
        sandbox.project.path().join("skills.txt"),
        "# team skills\ndemo@acme/tools\nnot a target\n",
    )
    .unwrap();

    let output = sandbox.run(&["install", "skills.txt"]);
    assert_success(&output);

    let out = stdout(&output);
    assert!(out.contains("already installed"));
    assert!(out.contains("not a target"));
    assert!(out.contains("0 succeeded, 1 skipped, 1 failed"));
}

#[test]
fn test_uninstall_missing_bundle_fails() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["uninstall", "demo@acme/tools"]);

    assert!(!output.status.success());
    assert!(stdout(&output).contains("not found"));
}

#[test]
fn test_uninstall_removes_bundle() {
    let sandbox = Sandbox::new();
    sandbox.cached_bundle("acme", "tools", "demo");

    let output = sandbox.run(&["uninstall", "demo@acme/tools"]);
    assert_success(&output);
    assert!(!sandbox.hub.path().join("acme").exists());
}

#[test]
fn test_sync_missing_source() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["sync", "ClaudeCode", "demo@acme/tools"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("skill-hub install demo@acme/tools"));
}

#[test]
fn test_sync_unknown_tool() {
    let sandbox = Sandbox::new();
    sandbox.cached_bundle("acme", "tools", "demo");

    let output = sandbox.run(&["sync", "Notepad", "demo@acme/tools"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown tool"));
}

#[cfg(unix)]
#[test]
fn test_sync_links_into_project_and_global() {
    let sandbox = Sandbox::new();
    sandbox.cached_bundle("acme", "tools", "demo");

    let output = sandbox.run(&["sync", "claudecode", "demo@acme/tools"]);
    assert_success(&output);
    let project_link = sandbox.project.path().join(".claude/skills/demo");
    assert!(fs::symlink_metadata(&project_link)
        .unwrap()
        .file_type()
        .is_symlink());

    let output = sandbox.run(&["sync", "ClaudeCode", "demo@acme/tools", "-g"]);
    assert_success(&output);
    assert!(sandbox
        .home
        .path()
        .join(".claude/skills/demo/SKILL.md")
        .exists());
}

#[test]
fn test_search_plain_offline_without_mirror() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["search", "--plain", "demo"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to load the skills catalog"));
}

#[test]
fn test_search_plain_uses_fresh_mirror() {
    let sandbox = Sandbox::new();
    write_mirror(
        sandbox.hub.path(),
        "skill.list",
        "demo@acme/tools\tA demo skill\nlint@acme/tools\tLinting\n",
    );

    let output = sandbox.run(&["search", "--plain", "DEMO"]);
    assert_success(&output);

    let out = stdout(&output);
    assert!(out.contains("demo@acme/tools"));
    assert!(!out.contains("lint@acme/tools"));
    assert!(out.contains("Page 1/1 (1 match(es))"));
}

#[test]
fn test_repo_add_offline_keeps_entry() {
    let sandbox = Sandbox::new();

    let output = sandbox.run(&["repo", "add", "https://github.com/acme/tools"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Added repository 'acme/tools'"));
    assert!(stdout(&output).contains("was not refreshed"));

    let output = sandbox.run(&["repo", "list"]);
    assert_success(&output);
    assert!(stdout(&output).contains("acme/tools"));

    let output = sandbox.run(&["repo", "rm", "acme/tools"]);
    assert_success(&output);

    let output = sandbox.run(&["repo", "list"]);
    assert!(stdout(&output).contains("No custom repositories."));
}

fn write_mirror(hub: &Path, name: &str, content: &str) {
    fs::write(hub.join(name), content).unwrap();
}
