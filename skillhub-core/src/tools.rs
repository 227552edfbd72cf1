//! Assistant tool registry
//!
//! Maps each assistant tool (Claude Code, Cursor, ...) to its project and
//! global skill directories, and probes the filesystem to decide which
//! tools are present on this machine.
//!
//! A tool is *present* at a scope when the parent of the resolved skill
//! directory exists (e.g. `~/.claude` exists even if `~/.claude/skills`
//! does not). Probes run on every call so the answer tracks live state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{HubError, Result};

/// Where a skill is linked for a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Relative to the current project directory
    Project,
    /// Relative to the user's home directory
    Global,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Project => f.write_str("project"),
            Scope::Global => f.write_str("global"),
        }
    }
}

/// One row of the tool table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name, e.g. "ClaudeCode"
    pub name: String,
    /// Skill directory relative to the project root
    #[serde(default)]
    pub project: Option<String>,
    /// Skill directory under the home directory (`~/` prefix allowed)
    #[serde(default)]
    pub global: Option<String>,
}

impl ToolSpec {
    pub fn new(name: &str, project: &str, global: &str) -> Self {
        Self {
            name: name.to_string(),
            project: Some(project.to_string()),
            global: Some(global.to_string()),
        }
    }
}

/// Ordered table of known tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolTable {
    tools: Vec<ToolSpec>,
}

impl Default for ToolTable {
    fn default() -> Self {
        let tools = [
            ("ClaudeCode", ".claude/skills", "~/.claude/skills"),
            ("Gemini", ".gemini/skills", "~/.gemini/skills"),
            ("Codex", ".codex/skills", "~/.codex/skills"),
            ("OpenCode", ".opencode/skill", "~/.config/opencode/skill"),
            ("Cursor", ".cursor/skills", "~/.cursor/skills"),
            ("Antigravity", ".agent/skills", "~/.gemini/antigravity/skills"),
            ("Windsurf", ".windsurf/skills", "~/.codeium/windsurf/skills"),
            ("Amp", ".agents/skills", "~/.config/agents/skills"),
            ("Qwen", ".qwen/skills", "~/.qwen/skills"),
            ("Qoder", ".qoder/skills", "~/.qoder/skills"),
            ("KiloCode", ".kilocode/skills", "~/.kilocode/skills"),
            ("RooCode", ".roo/skills", "~/.roo/skills"),
            ("Goose", ".goose/skills", "~/.config/goose/skills"),
        ]
        .into_iter()
        .map(|(name, project, global)| ToolSpec::new(name, project, global))
        .collect();

        Self { tools }
    }
}

impl ToolTable {
    pub fn new(tools: Vec<ToolSpec>) -> Self {
        Self { tools }
    }

    /// Add tools, replacing any existing entry with the same name
    pub fn extend(&mut self, overrides: impl IntoIterator<Item = ToolSpec>) {
        for spec in overrides {
            match self
                .tools
                .iter_mut()
                .find(|t| t.name.eq_ignore_ascii_case(&spec.name))
            {
                Some(existing) => *existing = spec,
                None => self.tools.push(spec),
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Resolved absolute skill directories of one tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub name: String,
    pub project: Option<PathBuf>,
    pub global: Option<PathBuf>,
}

impl ToolPaths {
    pub fn get(&self, scope: Scope) -> Option<&Path> {
        match scope {
            Scope::Project => self.project.as_deref(),
            Scope::Global => self.global.as_deref(),
        }
    }

    /// The tool's own config directory exists for this scope
    pub fn is_present_in(&self, scope: Scope) -> bool {
        self.get(scope)
            .and_then(Path::parent)
            .map(Path::exists)
            .unwrap_or(false)
    }

    pub fn is_present(&self) -> bool {
        self.is_present_in(Scope::Project) || self.is_present_in(Scope::Global)
    }
}

/// Tool table bound to a project directory and a home directory
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    table: ToolTable,
    project_root: PathBuf,
    home: PathBuf,
}

impl ToolRegistry {
    /// Registry rooted at the current directory and the user's home
    pub fn from_env(table: ToolTable) -> Result<Self> {
        let project_root =
            std::env::current_dir().map_err(|e| HubError::io(PathBuf::from("."), e))?;
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        Ok(Self::with_roots(table, project_root, home))
    }

    pub fn with_roots(table: ToolTable, project_root: PathBuf, home: PathBuf) -> Self {
        Self {
            table,
            project_root,
            home,
        }
    }

    pub fn table(&self) -> &ToolTable {
        &self.table
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Resolved paths for every tool in table order
    pub fn all(&self) -> Vec<ToolPaths> {
        self.table.iter().map(|spec| self.resolve(spec)).collect()
    }

    /// Resolved paths for one tool (case-insensitive name)
    pub fn paths(&self, name: &str) -> Option<ToolPaths> {
        self.table.get(name).map(|spec| self.resolve(spec))
    }

    /// Skill directory of a tool at a scope
    pub fn scope_path(&self, name: &str, scope: Scope) -> Result<PathBuf> {
        let paths = self.paths(name).ok_or_else(|| HubError::UnknownTool {
            name: name.to_string(),
        })?;
        paths
            .get(scope)
            .map(Path::to_path_buf)
            .ok_or_else(|| HubError::ScopeNotConfigured {
                tool: paths.name.clone(),
                scope: scope.to_string(),
            })
    }

    /// Names of tools present at either scope
    pub fn present(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(ToolPaths::is_present)
            .map(|p| p.name)
            .collect()
    }

    /// Names of tools present at one scope
    pub fn present_in(&self, scope: Scope) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|p| p.is_present_in(scope))
            .map(|p| p.name)
            .collect()
    }

    fn resolve(&self, spec: &ToolSpec) -> ToolPaths {
        ToolPaths {
            name: spec.name.clone(),
            project: spec.project.as_deref().map(|p| self.project_root.join(p)),
            global: spec.global.as_deref().map(|p| expand_home(p, &self.home)),
        }
    }
}

/// Expand a leading `~` against `home`; absolute paths pass through
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        home.to_path_buf()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        home.join(path)
    }
}
