//! `MailPager` - demo driver for the mailbox cache
//!
//! Seeds an in-memory gateway and walks a session through opening a
//! mailbox, paging, scrolling, new mail and bulk selection.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod walkthrough;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use mailpager_core::{HeaderCache, MailboxSession, MemoryGateway, Pager, PagerConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpager=debug,mailpager_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(PagerConfig::default_path, PathBuf::from);
    let config = PagerConfig::load(&config_path)
        .await
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    info!(page_size = config.page_size, push_merge = ?config.push_merge, "Starting MailPager");

    let gateway = Arc::new(MemoryGateway::new());
    walkthrough::seed(&gateway, config.page_size);

    let pager = Arc::new(Pager::new(
        Arc::clone(&gateway),
        Arc::new(HeaderCache::new()),
        config,
    ));
    let mut session = MailboxSession::new(pager);
    session.start_push();

    walkthrough::run(&gateway, &mut session).await;

    session.stop_push();
    Ok(())
}
