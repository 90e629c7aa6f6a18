//! Runtime settings, read from `LOCATOR_*` environment variables and
//! overridden by command-line flags.

use std::str::FromStr;
use std::time::Duration;

use locator_feature_service::PageDelay;
use locator_feature_service::retry::RetryPolicy;
use locator_resolver::ResolverOptions;

/// Effective settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub page_delay_ms: u64,
    pub batch_size: u32,
    pub max_records: usize,
    pub http_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let options = ResolverOptions::default();
        Self {
            page_delay_ms: 0,
            batch_size: options.batch_size,
            max_records: options.max_records,
            http_timeout_secs: 30,
            max_retries: RetryPolicy::default().max_retries,
        }
    }
}

/// Flag values that take precedence over the environment.
#[derive(Debug, Clone, Copy, Default, clap::Args)]
pub struct Overrides {
    /// Pause between page requests, in milliseconds [env: `LOCATOR_PAGE_DELAY_MS`].
    #[arg(long)]
    pub page_delay_ms: Option<u64>,

    /// Records per page [env: `LOCATOR_BATCH_SIZE`].
    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Safety ceiling on records per strategy [env: `LOCATOR_MAX_RECORDS`].
    #[arg(long)]
    pub max_records: Option<usize>,

    /// HTTP request timeout in seconds [env: `LOCATOR_HTTP_TIMEOUT_SECS`].
    #[arg(long)]
    pub http_timeout_secs: Option<u64>,

    /// Retries for transient HTTP failures [env: `LOCATOR_MAX_RETRIES`].
    #[arg(long)]
    pub max_retries: Option<u32>,
}

impl Settings {
    /// Reads settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`; unset or unparseable values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            page_delay_ms: parsed(&lookup, "LOCATOR_PAGE_DELAY_MS", defaults.page_delay_ms),
            batch_size: parsed(&lookup, "LOCATOR_BATCH_SIZE", defaults.batch_size),
            max_records: parsed(&lookup, "LOCATOR_MAX_RECORDS", defaults.max_records),
            http_timeout_secs: parsed(
                &lookup,
                "LOCATOR_HTTP_TIMEOUT_SECS",
                defaults.http_timeout_secs,
            ),
            max_retries: parsed(&lookup, "LOCATOR_MAX_RETRIES", defaults.max_retries),
        }
    }

    /// Applies command-line overrides.
    #[must_use]
    pub fn with_overrides(self, overrides: Overrides) -> Self {
        Self {
            page_delay_ms: overrides.page_delay_ms.unwrap_or(self.page_delay_ms),
            batch_size: overrides.batch_size.unwrap_or(self.batch_size),
            max_records: overrides.max_records.unwrap_or(self.max_records),
            http_timeout_secs: overrides.http_timeout_secs.unwrap_or(self.http_timeout_secs),
            max_retries: overrides.max_retries.unwrap_or(self.max_retries),
        }
    }

    #[must_use]
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            batch_size: self.batch_size.max(1),
            page_delay: PageDelay::from_millis(self.page_delay_ms),
            max_records: self.max_records,
        }
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {name}={raw}");
            default
        }),
        None => default,
    }
}
