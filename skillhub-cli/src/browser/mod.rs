//! Interactive terminal browser for `search` and `manage`

mod bars;
mod events;
mod list;
mod manage;
mod modal;
mod search;
mod task;
mod theme;

use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use crate::context::HubContext;
use skillhub_core::catalog::CatalogKind;

/// Browse the catalog; Enter installs the selected entry
pub async fn run_search(ctx: Arc<HubContext>, query: String) -> Result<()> {
    println!("Loading catalog...");
    let mut notice = None;
    for kind in [CatalogKind::Skills, CatalogKind::Repos] {
        if let Err(e) = ctx.catalog.ensure_fresh(kind).await {
            warn!("Could not load the {} catalog: {}", kind, e);
            notice = Some(format!("Could not load the {kind} catalog: {e}"));
        }
    }

    let mut app = search::SearchApp::new(ctx, query, notice)?;
    let result = events::run(&mut app).await;
    finish_tasks(app.into_desk()).await;
    result
}

/// Browse installed bundles and tool links
pub async fn run_manage(ctx: Arc<HubContext>) -> Result<()> {
    let mut app = manage::ManageApp::new(ctx)?;
    let result = events::run(&mut app).await;
    finish_tasks(app.into_desk()).await;
    result
}

/// Quitting only closes the screen; hub operations still run to completion
async fn finish_tasks(desk: task::TaskDesk) {
    let pending = desk.pending_count();
    if pending == 0 {
        return;
    }

    println!("Waiting for {pending} background task(s)...");
    for (label, result) in desk.finish().await {
        let (text, _) = task::describe(&label, &result);
        println!("{text}");
    }
}
