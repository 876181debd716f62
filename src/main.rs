use anyhow::{bail, Context, Result};
use clap::Parser;
use paywall_filter::{FilterConfig, FilterService, MinifluxClient};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Marks paywalled Substack entries in a Miniflux instance as read.
#[derive(Parser, Debug)]
#[command(name = "miniflux-paywall-filter", version)]
struct Args {
    /// Base URL of the Miniflux instance
    #[arg(long, env = "MF_API_ENDPOINT", default_value = "https://rss.notmyhostna.me")]
    api_endpoint: String,

    /// API key used for authentication (preferred over username/password)
    #[arg(long, env = "MF_API_KEY")]
    api_key: Option<String>,

    /// Username used to log into Miniflux
    #[arg(long, env = "MF_USERNAME")]
    username: Option<String>,

    /// Password used to log into Miniflux
    #[arg(long, env = "MF_PASSWORD")]
    password: Option<String>,

    /// Seconds between filter runs
    #[arg(long, env = "MF_REFRESH_INTERVAL", default_value_t = 300)]
    refresh_interval: u64,

    /// Compute and log the entries that would be marked read, without writing
    #[arg(long, env = "MF_DRY_RUN")]
    dry_run: bool,

    /// Log level filter, e.g. debug, info, warn, error
    #[arg(long, env = "MF_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Substring identifying the target platform in a feed URL
    #[arg(long, env = "MF_PLATFORM_PATTERN", default_value = "substack")]
    platform_pattern: String,

    /// Rewrite-rule tag that opts a feed into filtering regardless of URL
    #[arg(long, env = "MF_OPT_IN_TAG", default_value = "paywall-filter")]
    opt_in_tag: String,

    /// Acceptable paywall-notice wording (repeatable); overrides the defaults
    #[arg(long = "paywall-notice", env = "MF_PAYWALL_NOTICE", value_delimiter = ',')]
    paywall_notices: Vec<String>,

    /// Capacity of the classified-entry cache
    #[arg(long, env = "MF_CACHE_CAPACITY", default_value_t = 1024)]
    cache_capacity: usize,
}

impl Args {
    fn client(&self) -> Result<MinifluxClient> {
        if let Some(api_key) = &self.api_key {
            return MinifluxClient::with_api_key(&self.api_endpoint, api_key)
                .context("failed to build Miniflux client");
        }
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return MinifluxClient::with_password(&self.api_endpoint, username, password)
                .context("failed to build Miniflux client");
        }
        bail!("api endpoint, username and password or api key need to be provided");
    }

    fn filter_config(&self) -> FilterConfig {
        let mut config = FilterConfig {
            platform_pattern: self.platform_pattern.clone(),
            opt_in_tag: self.opt_in_tag.clone(),
            dry_run: self.dry_run,
            cache_capacity: self.cache_capacity,
            ..FilterConfig::default()
        };
        if !self.paywall_notices.is_empty() {
            config.notice_texts = self.paywall_notices.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = args.client()?;
    let user = client.me().await.context("unable to log into Miniflux")?;
    info!("Logged in successfully as {} (id {})", user.username, user.id);

    let mut service = FilterService::new(client, args.filter_config())
        .context("unable to create filter service")?;

    info!("Running filter job every {}s", args.refresh_interval);
    let mut ticker = tokio::time::interval(Duration::from_secs(args.refresh_interval.max(1)));
    // A run that overshoots the interval delays the next tick instead of
    // stacking overlapping runs.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        info!("Running filter job");
        match service.run_filter_job().await {
            Ok(summary) => info!(
                "Filter job done: {} unread scanned, {} candidates, {} fetched, {} paywalled, {} marked",
                summary.scanned, summary.candidates, summary.fetched, summary.paywalled, summary.marked
            ),
            Err(e) => error!("Filter job failed: {}", e),
        }
    }
}
