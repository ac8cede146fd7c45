use std::collections::BTreeMap;
use std::sync::Arc;
use anyhow::{Context, Result};
use crate::cache_store::CacheStore;
use crate::config::{apply_site_config, load_config};
use crate::mention_cache::MentionCache;
use crate::webmention::WebmentionApiClient;
use futures::future::join_all;
use tracing_subscriber::EnvFilter;
use tracing::info;

mod cache_store;
mod config;
mod mention_cache;
mod mention_filter;
mod models;
mod webmention;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first so its log level can act as the default filter
    let mut app_settings = load_config()
        .with_context(|| "Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&app_settings.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // After logging is up, so a broken default site file is reported
    apply_site_config(&mut app_settings)
        .with_context(|| "Failed to load site config")?;

    info!("Configuration loaded successfully.");

    let client = WebmentionApiClient::new(&app_settings)
        .with_context(|| "Failed to create webmention client")?;
    info!("Webmention client initialized for domain {:?}", client.domain());

    let store = CacheStore::new(&app_settings.cache_dir);
    let mentions = MentionCache::new(Arc::new(client), store, app_settings.per_page);

    let output = if app_settings.urls.is_empty() {
        serde_json::to_string_pretty(mentions.snapshot().await.as_ref())?
    } else {
        // Pages render concurrently; they all share one fetch cycle
        let pages = join_all(app_settings.urls.iter().map(|url| {
            let mentions = mentions.clone();
            async move { (url.clone(), mentions.mentions_for_url(url).await) }
        }))
        .await;
        let by_url: BTreeMap<String, _> = pages.into_iter().collect();
        serde_json::to_string_pretty(&by_url)?
    };

    println!("{}", output);
    Ok(())
}
