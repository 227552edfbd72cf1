//! `skill-hub repo` commands
//!
//! Maintains the user's custom repository list, which is merged into the
//! repositories catalog on every refresh.

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::context::HubContext;

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Add a repository (owner/repo or https://github.com/owner/repo/...)
    Add {
        /// Repository identifier or GitHub URL
        repo: String,
    },

    /// Remove a repository from the custom list
    #[clap(alias = "remove")]
    Rm {
        /// Repository identifier (owner/repo)
        repo: String,
    },

    /// Show the custom repository list
    List,
}

impl RepoCommand {
    pub async fn execute(&self, ctx: &HubContext) -> Result<()> {
        match self {
            RepoCommand::Add { repo } => {
                let change = ctx
                    .catalog
                    .add_custom_repo(repo)
                    .await
                    .with_context(|| format!("Failed to add repository '{repo}'"))?;

                if change.changed {
                    println!("Added repository '{}'", change.repo);
                } else {
                    println!("Repository '{}' is already in the custom list", change.repo);
                }
                if let Some(err) = change.refresh_error {
                    println!("Warning: list saved, but the repository catalog was not refreshed: {err}");
                }
            }
            RepoCommand::Rm { repo } => {
                let change = ctx
                    .catalog
                    .remove_custom_repo(repo)
                    .await
                    .with_context(|| format!("Failed to remove repository '{repo}'"))?;

                if change.changed {
                    println!("Removed repository '{}'", change.repo);
                } else {
                    println!("Repository '{}' is not in the custom list", change.repo);
                }
                if let Some(err) = change.refresh_error {
                    println!("Warning: list saved, but the repository catalog was not refreshed: {err}");
                }
            }
            RepoCommand::List => {
                let repos = ctx.catalog.custom_repos()?;
                if repos.is_empty() {
                    println!("No custom repositories.");
                    println!("\nRun 'skill-hub repo add <owner/repo>' to add one.");
                    return Ok(());
                }

                println!("Custom repositories:\n");
                for repo in repos {
                    println!("  {repo}");
                }
            }
        }

        Ok(())
    }
}
