use crate::batch::BatchConfig;
use crate::feeds::{FeedProfile, PROFILE_NAMES};
use crate::filter::FilterMode;
use crate::state::PaginationMode;
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// scoutfeed - live explorer listing follower
///
/// Loads one listing page, joins its live channel and prints the list as it changes.
/// Configuration priority: CLI args > Environment variables > Config file > Defaults
#[derive(Parser, Debug, Default)]
#[command(name = "scoutfeed")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live explorer listing follower", long_about = None)]
pub struct CliArgs {
    /// Explorer base URL for page fetches
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Phoenix socket URL (defaults to <base>/socket on ws/wss)
    #[arg(long, env = "WS_URL")]
    pub ws_url: Option<String>,

    /// Listing to follow: blocks, chain-blocks, transactions, address-transactions,
    /// internal-transactions, token-transfers, validations
    #[arg(short, long, env = "FEED")]
    pub feed: Option<String>,

    /// Address the page belongs to (address feeds)
    #[arg(long, env = "ADDRESS_HASH")]
    pub address_hash: Option<String>,

    /// Role filter: to, from (anything else disables filtering)
    #[arg(long, env = "FILTER")]
    pub filter: Option<String>,

    /// Pagination mode override: cursor, indexed
    #[arg(long, env = "PAGINATION")]
    pub pagination: Option<String>,

    /// Listing path override (e.g., "/blocks?block_type=uncle")
    #[arg(long, env = "LISTING_PATH")]
    pub listing_path: Option<String>,

    /// Next page path rendered with the first page, if already known
    #[arg(long, env = "NEXT_PAGE_PATH")]
    pub next_page_path: Option<String>,

    /// Maximum visible items (1-1000)
    #[arg(long, env = "WINDOW")]
    pub window: Option<usize>,

    /// Quiet period before a live batch flushes, in milliseconds (50-10000)
    #[arg(long, env = "BATCH_DELAY_MS")]
    pub batch_delay_ms: Option<u64>,

    /// Longest a live batch may be held, in milliseconds (delay-60000)
    #[arg(long, env = "BATCH_MAX_WAIT_MS")]
    pub batch_max_wait_ms: Option<u64>,

    /// Batches at or above this size go to the overflow banner (1-100)
    #[arg(long, env = "BATCH_THRESHOLD")]
    pub batch_threshold: Option<usize>,

    /// Page fetch timeout in milliseconds (1000-60000)
    #[arg(long, env = "HTTP_TIMEOUT_MS")]
    pub http_timeout_ms: Option<u64>,

    /// Retry attempts for transient page fetch failures (0-10)
    #[arg(long, env = "HTTP_RETRIES")]
    pub http_retries: Option<u8>,

    /// Animate insertions that land in the viewport
    #[arg(long, env = "ANIMATE")]
    pub animate: Option<bool>,

    /// Optional config file path (TOML format)
    #[arg(long, env = "SCOUTFEED_CONFIG")]
    pub config_file: Option<PathBuf>,
}

/// Configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub batch: BatchFileConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EndpointsConfig {
    pub base_url: Option<String>,
    pub ws_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeedConfig {
    pub name: Option<String>,
    pub address_hash: Option<String>,
    pub filter: Option<String>,
    pub pagination: Option<PaginationMode>,
    pub listing_path: Option<String>,
    pub window: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchFileConfig {
    pub delay_ms: Option<u64>,
    pub max_wait_ms: Option<u64>,
    pub threshold: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HttpConfig {
    pub timeout_ms: Option<u64>,
    pub retries: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenderConfig {
    pub animate: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub ws_url: String,
    pub profile: FeedProfile,
    pub address_hash: Option<String>,
    pub filter: FilterMode,
    pub listing_path: String,
    pub next_page_path: Option<String>,
    pub batch_delay_ms: u64,
    pub batch_max_wait_ms: u64,
    pub http_timeout_ms: u64,
    pub http_retries: u8,
    pub animate: bool,
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

fn validate_url(url: &str, name: &str, schemes: &[&str]) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if schemes
        .iter()
        .any(|scheme| url.starts_with(&format!("{scheme}://")))
    {
        Ok(())
    } else {
        let expected: Vec<String> = schemes.iter().map(|s| format!("{s}://")).collect();
        Err(anyhow!("{name} must start with {}", expected.join(" or ")))
    }
}

fn parse_pagination(value: &str) -> Result<PaginationMode> {
    match value.trim().to_lowercase().as_str() {
        "cursor" => Ok(PaginationMode::Cursor),
        "indexed" | "index" => Ok(PaginationMode::Indexed),
        other => bail!("Invalid pagination '{other}'. Valid options: cursor, indexed"),
    }
}

/// `http://host` -> `ws://host/socket`, `https://host` -> `wss://host/socket`.
fn default_ws_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let socket = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{socket}/socket")
}

/// Load configuration from CLI args, environment variables and the optional config file
pub fn load() -> Result<Config> {
    let args = CliArgs::parse();
    let file = match &args.config_file {
        Some(path) => {
            log::info!("📄 Loading configuration from {}", path.display());
            load_from_file(path)?
        }
        None => ConfigFile::default(),
    };
    resolve(args, file)
}

/// Load configuration from TOML file
pub fn load_from_file(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
}

/// Merge parsed args (CLI and env) over the file, then apply defaults and validate.
pub fn resolve(args: CliArgs, file: ConfigFile) -> Result<Config> {
    let base_url = args
        .base_url
        .or(file.endpoints.base_url)
        .unwrap_or_else(|| "http://localhost:4000".to_string());
    validate_url(&base_url, "BASE_URL", &["http", "https"])?;

    let ws_url = args
        .ws_url
        .or(file.endpoints.ws_url)
        .unwrap_or_else(|| default_ws_url(&base_url));
    validate_url(&ws_url, "WS_URL", &["ws", "wss"])?;

    let feed = args
        .feed
        .or(file.feed.name)
        .unwrap_or_else(|| "blocks".to_string());
    let mut profile: FeedProfile = feed.parse().map_err(|e: String| anyhow!(e))?;

    let address_hash = args
        .address_hash
        .or(file.feed.address_hash)
        .filter(|a| !a.trim().is_empty());
    if profile.needs_address() && address_hash.is_none() {
        bail!(
            "ADDRESS_HASH is required for the {} feed (feeds: {})",
            profile.name,
            PROFILE_NAMES.join(", ")
        );
    }

    let filter = FilterMode::from_query(args.filter.or(file.feed.filter).as_deref());
    if filter.is_filtered() && !profile.filtered {
        log::warn!("FILTER={filter} has no effect on the {} feed", profile.name);
    }

    if let Some(mode) = args.pagination.as_deref() {
        profile.pagination = parse_pagination(mode)?;
    } else if let Some(mode) = file.feed.pagination {
        profile.pagination = mode;
    }

    if let Some(window) = args.window.or(file.feed.window) {
        profile.settings.window = validate_in_range(window, 1, 1000, "WINDOW")?;
    }

    if let Some(threshold) = args.batch_threshold.or(file.batch.threshold) {
        profile.settings.batch_threshold =
            Some(validate_in_range(threshold, 1, 100, "BATCH_THRESHOLD")?);
    }

    let listing_path = args
        .listing_path
        .or(file.feed.listing_path)
        .unwrap_or_else(|| profile.listing_path_for(address_hash.as_deref()));

    let defaults = BatchConfig::default();
    let batch_delay_ms = args
        .batch_delay_ms
        .or(file.batch.delay_ms)
        .unwrap_or(defaults.delay.as_millis() as u64);
    let batch_delay_ms = validate_in_range(batch_delay_ms, 50, 10_000, "BATCH_DELAY_MS")?;

    let batch_max_wait_ms = args
        .batch_max_wait_ms
        .or(file.batch.max_wait_ms)
        .unwrap_or((defaults.max_wait.as_millis() as u64).max(batch_delay_ms));
    let batch_max_wait_ms = validate_in_range(
        batch_max_wait_ms,
        batch_delay_ms,
        60_000,
        "BATCH_MAX_WAIT_MS",
    )?;

    let http_timeout_ms = args
        .http_timeout_ms
        .or(file.http.timeout_ms)
        .unwrap_or(10_000);
    let http_timeout_ms = validate_in_range(http_timeout_ms, 1000, 60_000, "HTTP_TIMEOUT_MS")?;

    let http_retries = args.http_retries.or(file.http.retries).unwrap_or(3);
    let http_retries = validate_in_range(http_retries, 0, 10, "HTTP_RETRIES")?;

    let animate = args.animate.or(file.render.animate).unwrap_or(false);

    Ok(Config {
        base_url,
        ws_url,
        profile,
        address_hash,
        filter,
        listing_path,
        next_page_path: args.next_page_path,
        batch_delay_ms,
        batch_max_wait_ms,
        http_timeout_ms,
        http_retries,
        animate,
    })
}

impl Config {
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::from_millis(self.batch_delay_ms, self.batch_max_wait_ms)
    }

    pub fn topic(&self) -> String {
        self.profile.topic_for(self.address_hash.as_deref())
    }

    pub fn log_summary(&self) {
        log::info!("scoutfeed configuration:");
        log::info!("  Feed: {} ({:?})", self.profile.name, self.profile.pagination);
        log::info!("  Listing: {}{}", self.base_url, self.listing_path);
        log::info!("  Socket: {} topic={}", self.ws_url, self.topic());
        if let Some(address) = &self.address_hash {
            log::info!("  Address: {} filter={}", address, self.filter);
        }
        log::info!(
            "  Window: {} threshold: {:?}",
            self.profile.settings.window,
            self.profile.settings.batch_threshold
        );
        log::info!(
            "  Batch: delay {}ms max wait {}ms",
            self.batch_delay_ms,
            self.batch_max_wait_ms
        );
        log::info!(
            "  HTTP: timeout {}ms retries {}",
            self.http_timeout_ms,
            self.http_retries
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CliArgs {
        CliArgs::default()
    }

    #[test]
    fn defaults_follow_the_blocks_feed() {
        let config = resolve(args(), ConfigFile::default()).unwrap();
        assert_eq!(config.profile.name, "blocks");
        assert_eq!(config.listing_path, "/blocks");
        assert_eq!(config.ws_url, "ws://localhost:4000/socket");
        assert_eq!(config.batch_delay_ms, 1000);
        assert_eq!(config.batch_max_wait_ms, 5000);
        assert_eq!(config.http_retries, 3);
    }

    #[test]
    fn cli_beats_file_and_file_beats_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [endpoints]
            base_url = "https://scan.example"

            [feed]
            name = "transactions"
            window = 20

            [batch]
            delay_ms = 200
            threshold = 4
            "#,
        )
        .unwrap();
        let cli = CliArgs {
            batch_delay_ms: Some(300),
            ..args()
        };
        let config = resolve(cli, file).unwrap();
        assert_eq!(config.base_url, "https://scan.example");
        assert_eq!(config.ws_url, "wss://scan.example/socket");
        assert_eq!(config.profile.name, "transactions");
        assert_eq!(config.profile.settings.window, 20);
        assert_eq!(config.profile.settings.batch_threshold, Some(4));
        assert_eq!(config.batch_delay_ms, 300);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = resolve(
            CliArgs {
                batch_delay_ms: Some(10),
                ..args()
            },
            ConfigFile::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("BATCH_DELAY_MS must be in range"));

        let err = resolve(
            CliArgs {
                batch_delay_ms: Some(2000),
                batch_max_wait_ms: Some(1000),
                ..args()
            },
            ConfigFile::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("BATCH_MAX_WAIT_MS"));

        assert!(resolve(
            CliArgs {
                window: Some(0),
                ..args()
            },
            ConfigFile::default()
        )
        .is_err());
    }

    #[test]
    fn address_feeds_need_an_address() {
        let err = resolve(
            CliArgs {
                feed: Some("address-transactions".into()),
                ..args()
            },
            ConfigFile::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("ADDRESS_HASH"));

        let config = resolve(
            CliArgs {
                feed: Some("address-transactions".into()),
                address_hash: Some("0xabc".into()),
                filter: Some("to".into()),
                ..args()
            },
            ConfigFile::default(),
        )
        .unwrap();
        assert_eq!(config.topic(), "addresses_old:0xabc");
        assert_eq!(config.filter, FilterMode::To);
    }

    #[test]
    fn urls_need_the_right_scheme() {
        assert!(resolve(
            CliArgs {
                base_url: Some("ftp://scan".into()),
                ..args()
            },
            ConfigFile::default()
        )
        .is_err());
        assert!(resolve(
            CliArgs {
                ws_url: Some("http://scan/socket".into()),
                ..args()
            },
            ConfigFile::default()
        )
        .is_err());
    }

    #[test]
    fn pagination_override() {
        let config = resolve(
            CliArgs {
                pagination: Some("indexed".into()),
                ..args()
            },
            ConfigFile::default(),
        )
        .unwrap();
        assert_eq!(config.profile.pagination, PaginationMode::Indexed);
        assert!(resolve(
            CliArgs {
                pagination: Some("pages".into()),
                ..args()
            },
            ConfigFile::default()
        )
        .is_err());
    }
}
