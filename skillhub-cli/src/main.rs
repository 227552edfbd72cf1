//! Skill Hub - install, update and sync SKILL.md bundles for coding agents

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use skillhub_core::catalog::{CatalogEntry, CatalogKind};
use skillhub_core::tools::Scope;
use skillhub_core::{HubError, OperationReport, Outcome, Target};

#[cfg(feature = "tui")]
mod browser;
mod context;
mod repo_cli;

use context::HubContext;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "skill-hub",
    about = "Install, update and sync agent skills (SKILL.md bundles) across coding tools",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Override the hub directory (defaults to $SKILL_HUB_HOME or ~/.skill-hub)
    #[clap(long, global = true)]
    hub_root: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Install a skill (skill@owner/repo), a whole repository (owner/repo) or every target in a file
    Install {
        /// Target or path to a newline-delimited target file
        target: String,

        /// Reinstall even if already present
        #[clap(short = 'u', long = "update")]
        update: bool,
    },

    /// Re-fetch installed skills
    Update {
        /// Target or path to a newline-delimited target file
        target: String,
    },

    /// Remove a skill or a whole repository from the hub
    Uninstall {
        /// skill@owner/repo or owner/repo
        target: String,
    },

    /// List installed skills
    List {
        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Search the skill catalog
    Search {
        /// Case-insensitive substring to match
        query: Option<String>,

        /// Print one page of results instead of opening the browser
        #[clap(long)]
        plain: bool,

        /// Page to print with --plain (1-indexed)
        #[clap(long, default_value = "1")]
        page: usize,

        /// Search the repositories catalog instead of skills (with --plain)
        #[clap(long)]
        repos: bool,
    },

    /// Browse installed skills and tool links interactively
    Manage,

    /// Link installed skills into a coding tool's skill directory
    Sync {
        /// Tool name, e.g. ClaudeCode (see `skill-hub tools`)
        tool: String,

        /// Target or path to a newline-delimited target file
        target: String,

        /// Link into the project directory (default)
        #[clap(short = 'p', long)]
        project: bool,

        /// Link into the tool's global directory
        #[clap(short = 'g', long)]
        global: bool,

        /// Replace existing entries
        #[clap(short = 'f', long)]
        force: bool,
    },

    /// Manage custom catalog repositories
    Repo {
        #[clap(subcommand)]
        command: repo_cli::RepoCommand,
    },

    /// Show known tools, their skill directories and whether they are present
    Tools,
}

/// Initialize tracing from --log-level
///
/// Logs go to stderr; command results are printed to stdout.
fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::new(log_level.to_filter_directive());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level);

    let ctx = HubContext::load(cli.hub_root)?;
    debug!("Using hub root {}", ctx.config.hub_root.display());

    match cli.command {
        Command::Install { target, update } => install_command(&ctx, &target, update).await,
        Command::Update { target } => update_command(&ctx, &target).await,
        Command::Uninstall { target } => uninstall_command(&ctx, &target).await,
        Command::List { json } => list_command(&ctx, json),
        Command::Search {
            query,
            plain,
            page,
            repos,
        } => {
            if plain {
                let kind = if repos {
                    CatalogKind::Repos
                } else {
                    CatalogKind::Skills
                };
                search_command(&ctx, kind, query.as_deref().unwrap_or(""), page).await
            } else {
                browser::run_search(Arc::new(ctx), query.unwrap_or_default()).await
            }
        }
        Command::Manage => browser::run_manage(Arc::new(ctx)).await,
        Command::Sync {
            tool,
            target,
            project: _,
            global,
            force,
        } => {
            // Project is the default; -g wins when both are given
            let scope = if global { Scope::Global } else { Scope::Project };
            sync_command(&ctx, &tool, &target, scope, force)
        }
        Command::Repo { command } => command.execute(&ctx).await,
        Command::Tools => tools_command(&ctx),
    }
}

#[cfg(not(feature = "tui"))]
mod browser {
    use super::HubContext;
    use anyhow::{bail, Result};
    use std::sync::Arc;

    pub async fn run_search(_ctx: Arc<HubContext>, _query: String) -> Result<()> {
        bail!("Interactive browser not built (enable the `tui` feature); use `skill-hub search --plain`")
    }

    pub async fn run_manage(_ctx: Arc<HubContext>) -> Result<()> {
        bail!("Interactive browser not built (enable the `tui` feature); use `skill-hub list`")
    }
}

/// A command argument naming either a target or a target file
#[derive(Debug)]
enum Input {
    Target(Target),
    File(PathBuf),
}

fn classify(arg: &str) -> Result<Input, HubError> {
    let path = Path::new(arg);
    if path.is_file() {
        return Ok(Input::File(path.to_path_buf()));
    }

    match Target::parse(arg) {
        Ok(target) => Ok(Input::Target(target)),
        // Looks like a file name rather than a malformed target
        Err(_) if !arg.contains('/') && !arg.contains('@') => Err(HubError::TargetFileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e),
    }
}

async fn install_command(ctx: &HubContext, arg: &str, force: bool) -> Result<()> {
    let report = match classify(arg)? {
        Input::File(path) => ctx.cache.install_from_file(&path, force).await?,
        Input::Target(target) => ctx
            .cache
            .install(&target, force)
            .await
            .with_context(|| format!("Failed to install {target}"))?,
    };
    finish(&report)
}

async fn update_command(ctx: &HubContext, arg: &str) -> Result<()> {
    let report = match classify(arg)? {
        Input::File(path) => ctx.cache.update_from_file(&path, &ctx.catalog).await?,
        Input::Target(target) => ctx
            .cache
            .update(&target, &ctx.catalog)
            .await
            .with_context(|| format!("Failed to update {target}"))?,
    };
    finish(&report)
}

async fn uninstall_command(ctx: &HubContext, arg: &str) -> Result<()> {
    let target = Target::parse(arg)?;
    let report = ctx
        .cache
        .uninstall(&target)
        .await
        .with_context(|| format!("Failed to uninstall {target}"))?;
    finish(&report)
}

fn sync_command(ctx: &HubContext, tool: &str, arg: &str, scope: Scope, force: bool) -> Result<()> {
    let report = match classify(arg)? {
        Input::File(path) => ctx.sync.sync_from_file(tool, &path, scope, force)?,
        Input::Target(target) => ctx.sync.sync(tool, &target, scope, force)?,
    };
    finish(&report)
}

/// Print a report; the command fails only when nothing succeeded or was skipped
fn finish(report: &OperationReport) -> Result<()> {
    print_report(report);

    let failed = report.failures().count();
    if failed > 0 && failed == report.entries.len() {
        bail!("{} of {} target(s) failed", failed, report.entries.len());
    }
    Ok(())
}

fn print_report(report: &OperationReport) {
    for entry in &report.entries {
        let mark = match &entry.outcome {
            outcome if outcome.is_success() => "✓",
            Outcome::Skipped(_) => "-",
            _ => "✗",
        };
        println!("{mark} {}: {}", entry.label, entry.outcome);
    }

    if report.entries.len() > 1 {
        println!("\n{}", report.summary());
    }
}

#[derive(Tabled)]
struct InstalledRow {
    #[tabled(rename = "Skill")]
    skill: String,
    #[tabled(rename = "Repository")]
    repository: String,
    #[tabled(rename = "Path")]
    path: String,
}

#[derive(Serialize)]
struct InstalledJson {
    skill: String,
    owner: String,
    repo: String,
    path: PathBuf,
    legacy: bool,
}

fn list_command(ctx: &HubContext, json: bool) -> Result<()> {
    let bundles = ctx.cache.list()?;

    if json {
        let rows: Vec<InstalledJson> = bundles
            .into_iter()
            .map(|b| InstalledJson {
                skill: b.id.skill,
                owner: b.id.repo.owner,
                repo: b.id.repo.name,
                path: b.path,
                legacy: b.legacy,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if bundles.is_empty() {
        println!("No skills installed.");
        println!("\nRun 'skill-hub search' to find skills.");
        return Ok(());
    }

    let rows: Vec<InstalledRow> = bundles
        .iter()
        .map(|b| InstalledRow {
            skill: b.id.skill.clone(),
            repository: b.id.repo.to_string(),
            path: b.path.display().to_string(),
        })
        .collect();

    println!("Installed skills:\n");
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");

    Ok(())
}

#[derive(Tabled)]
struct SearchRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Entry")]
    entry: String,
    #[tabled(rename = "Details")]
    details: String,
}

async fn search_command(ctx: &HubContext, kind: CatalogKind, query: &str, page: usize) -> Result<()> {
    ctx.catalog
        .ensure_fresh(kind)
        .await
        .with_context(|| format!("Failed to load the {kind} catalog"))?;

    let results = ctx
        .catalog
        .search(kind, query, page, ctx.config.page_size)?;

    if results.items.is_empty() {
        println!("No {kind} found.");
        return Ok(());
    }

    let first = (results.page - 1) * results.page_size + 1;
    let rows: Vec<SearchRow> = results
        .items
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let (entry, details) = match CatalogEntry::parse(line) {
                Ok(parsed) => (parsed.target.to_string(), parsed.metadata.join("  ")),
                Err(_) => (line.clone(), String::new()),
            };
            SearchRow {
                index: first + i,
                entry,
                details,
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");
    println!(
        "\nPage {}/{} ({} match(es))",
        results.page,
        results.page_count(),
        results.total
    );

    Ok(())
}

#[derive(Tabled)]
struct ToolRow {
    #[tabled(rename = "Tool")]
    name: String,
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Global")]
    global: String,
    #[tabled(rename = "Present")]
    present: String,
}

fn tools_command(ctx: &HubContext) -> Result<()> {
    let display = |p: Option<&Path>| p.map(|p| p.display().to_string()).unwrap_or_else(|| "-".to_string());

    let rows: Vec<ToolRow> = ctx
        .sync
        .tools()
        .all()
        .iter()
        .map(|tool| {
            let present: Vec<&str> = [Scope::Project, Scope::Global]
                .into_iter()
                .filter(|scope| tool.is_present_in(*scope))
                .map(|scope| match scope {
                    Scope::Project => "project",
                    Scope::Global => "global",
                })
                .collect();

            ToolRow {
                name: tool.name.clone(),
                project: display(tool.get(Scope::Project)),
                global: display(tool.get(Scope::Global)),
                present: if present.is_empty() {
                    "no".to_string()
                } else {
                    present.join(", ")
                },
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();
    println!("{table}");

    Ok(())
}
