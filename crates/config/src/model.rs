use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use ipgeo_fetch::{DEFAULT_PAGE_URL, HttpOptions, RetryPolicy, Url};
use ipgeo_storage::{DEFAULT_EXTENSION, DEFAULT_PREFIX, NamingScheme};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Where database files are kept. Defaults to the directory holding the
    /// executable; relative paths are taken from the working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub http: HttpConfig,
    pub schedule: ScheduleConfig,
}

/// Database file naming: `<prefix>-YYYY-MM.<extension>`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub prefix: String,
    pub extension: String,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Fixed artifact URL. When unset, the download link is scraped from
    /// `page` on every update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub page: String,
    pub user_agent: String,
}
impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            page: DEFAULT_PAGE_URL.to_string(),
            user_agent: HttpOptions::default().user_agent,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub page_timeout_secs: u64,
    pub download_timeout_secs: u64,
    /// Extra attempts after a transient failure.
    pub retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}
impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            page_timeout_secs: 30,
            download_timeout_secs: 600,
            retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
}
impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 24 * 60 * 60 }
    }
}
impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Reject values that would only fail later, at the first update.
    pub fn validate(&self) -> Result<()> {
        self.naming_scheme()?;
        self.page_url()?;
        if let Some(url) = &self.source.url {
            Url::parse(url).or_raise(|| ErrorKind::invalid("source.url", format!("not a URL: {url}")))?;
        }
        if self.source.user_agent.trim().is_empty() {
            exn::bail!(ErrorKind::invalid("source.user_agent", "must not be empty"));
        }
        let positive = [
            ("http.connect_timeout_secs", self.http.connect_timeout_secs),
            ("http.page_timeout_secs", self.http.page_timeout_secs),
            ("http.download_timeout_secs", self.http.download_timeout_secs),
            ("schedule.interval_secs", self.schedule.interval_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                exn::bail!(ErrorKind::invalid(field, "must be greater than zero"));
            }
        }
        if self.http.initial_backoff_ms > self.http.max_backoff_ms {
            exn::bail!(ErrorKind::invalid("http.initial_backoff_ms", "must not exceed http.max_backoff_ms"));
        }
        Ok(())
    }

    pub fn naming_scheme(&self) -> Result<NamingScheme> {
        NamingScheme::new(&self.database.prefix, &self.database.extension).or_raise(|| {
            ErrorKind::invalid(
                "database",
                format!("unusable prefix/extension {:?}/{:?}", self.database.prefix, self.database.extension),
            )
        })
    }

    pub fn page_url(&self) -> Result<Url> {
        Url::parse(&self.source.page)
            .or_raise(|| ErrorKind::invalid("source.page", format!("not a URL: {}", self.source.page)))
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            user_agent: self.source.user_agent.clone(),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            page_timeout: Duration::from_secs(self.http.page_timeout_secs),
            download_timeout: Duration::from_secs(self.http.download_timeout_secs),
            retry: RetryPolicy {
                attempts: self.http.retries.saturating_add(1),
                initial_backoff: Duration::from_millis(self.http.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.http.max_backoff_ms),
            },
        }
    }

    /// Absolute path of the runtime directory.
    pub fn directory(&self) -> Result<PathBuf> {
        match &self.directory {
            Some(directory) => std::path::absolute(directory).or_raise(|| ErrorKind::Directory),
            None => {
                let exe = std::env::current_exe().or_raise(|| ErrorKind::Directory)?;
                exe.parent().map(Path::to_path_buf).ok_or_raise(|| ErrorKind::Directory)
            },
        }
    }
}
