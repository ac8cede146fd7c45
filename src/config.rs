use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_API_URL: &str = "https://webmention.io/api/mentions.jf2";
pub const DEFAULT_CACHE_DIR: &str = ".data";
pub const DEFAULT_PER_PAGE: u32 = 1000;
pub const DEFAULT_SITE_CONFIG: &str = "site.toml";

#[derive(Debug, Clone, Parser)]
#[command(
    author,
    version,
    about = "Fetches webmentions for a site and serves them per page from a local cache"
)]
pub struct AppSettings {
    /// Public URL of the site, e.g. https://example.com (its host name is the webmention domain)
    #[arg(long, env = "WEBMENTIONS_SITE_URL")]
    pub site_url: Option<String>,

    /// TOML file with site metadata (default: site.toml); its `site` key is used when --site-url is not given
    #[arg(long, env = "WEBMENTIONS_SITE_CONFIG")]
    pub site_config: Option<String>,

    /// webmention.io API token
    #[arg(long, env = "WEBMENTION_API_KEY", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Mentions feed endpoint
    #[arg(long, env = "WEBMENTIONS_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Maximum number of mentions requested per fetch
    #[arg(long, env = "WEBMENTIONS_PER_PAGE", default_value_t = DEFAULT_PER_PAGE, value_parser = validate_per_page)]
    pub per_page: u32,

    /// Directory holding webmentions.json
    #[arg(long, env = "WEBMENTIONS_CACHE_DIR", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WEBMENTIONS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Page URLs to resolve; prints the whole cache when empty
    pub urls: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            site_url: None,
            site_config: None,
            api_token: None,
            api_url: DEFAULT_API_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
            cache_dir: DEFAULT_CACHE_DIR.to_string(),
            log_level: "info".to_string(),
            urls: Vec::new(),
        }
    }
}

/// Site metadata file. Only the site URL matters here; other keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: Option<String>,
}

/// Validate that per_page is a usable page size
fn validate_per_page(value: &str) -> Result<u32, String> {
    let per_page = value
        .parse::<u32>()
        .map_err(|e| format!("per_page must be a positive integer, got '{}': {}", value, e))?;
    if per_page == 0 {
        Err("per_page must be at least 1, got 0".to_string())
    } else {
        Ok(per_page)
    }
}

/// Reads the site metadata file. A missing file yields an empty `SiteConfig`.
pub fn load_site_config(path: &Path) -> anyhow::Result<SiteConfig> {
    let site_config = ::config::Config::builder()
        .add_source(::config::File::from(path).required(false))
        .build()
        .with_context(|| format!("Failed to read site config {}", path.display()))?
        .try_deserialize::<SiteConfig>()
        .with_context(|| format!("Invalid site config {}", path.display()))?;
    Ok(site_config)
}

/// Fills `site_url` from the site metadata file when it was not given directly.
///
/// Only an explicitly given file can fail the run; a broken default file is
/// logged and treated as having no site URL.
pub fn apply_site_config(settings: &mut AppSettings) -> anyhow::Result<()> {
    apply_site_config_with_default(settings, Path::new(DEFAULT_SITE_CONFIG))
}

pub(crate) fn apply_site_config_with_default(
    settings: &mut AppSettings,
    default_path: &Path,
) -> anyhow::Result<()> {
    if settings.site_url.is_some() {
        return Ok(());
    }
    let site_config = match settings.site_config.as_deref() {
        Some(path) => load_site_config(Path::new(path))?,
        None => load_site_config(default_path).unwrap_or_else(|e| {
            warn!("Ignoring site config {}: {:#}", default_path.display(), e);
            SiteConfig::default()
        }),
    };
    settings.site_url = site_config.site.filter(|s| !s.trim().is_empty());
    Ok(())
}

pub fn load_config() -> anyhow::Result<AppSettings> {
    // Parse command line arguments and environment variables
    let mut app_settings = AppSettings::parse();

    // Blank tokens from an empty .env entry count as unset
    app_settings.api_token = app_settings.api_token.filter(|t| !t.trim().is_empty());

    Ok(app_settings)
}
