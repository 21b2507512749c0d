use crate::consts::{ANCHOR_SELECTOR, ARTIFACT_SUFFIX, DOWNLOAD_LINK_TEXT_REGEX};
use crate::error::{ErrorKind, Result};
use crate::transport::Transport;
use exn::{OptionExt, ResultExt};
use ipgeo_compress::Compression;
use ipgeo_storage::{DatabaseFile, NamingScheme};
use reqwest::Url;
use scraper::Html;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;
use tracing::instrument;

/// A downloadable, compressed database and the local file it becomes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteArtifact {
    url: Url,
    file_name: String,
    compression: Compression,
    target: DatabaseFile,
}
impl RemoteArtifact {
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Last path segment of the URL, e.g. `dbip-city-lite-2022-07.mmdb.gz`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// The installed file this artifact decompresses to.
    pub fn target(&self) -> &DatabaseFile {
        &self.target
    }

    /// Whether `file` is exactly what this artifact would install.
    pub fn installs(&self, file: &DatabaseFile) -> bool {
        self.target == *file
    }
}
impl Display for RemoteArtifact {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.url)
    }
}

/// Find the city database download link in the publisher's page.
///
/// The first `<a href>` whose text reads "Download IP to City Lite MMDB" and
/// whose target ends in `.gz` wins. The href is returned as written, which
/// may be relative.
///
/// # Examples
///
/// ```
/// use ipgeo_fetch::find_download_link;
///
/// let html = r#"<a href='https://download.db-ip.com/free/dbip-city-lite-2022-07.mmdb.gz'
///     class='btn'>Download IP to City Lite MMDB</a>"#;
/// assert_eq!(
///     find_download_link(html).as_deref(),
///     Some("https://download.db-ip.com/free/dbip-city-lite-2022-07.mmdb.gz"),
/// );
/// ```
pub fn find_download_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document.select(&ANCHOR_SELECTOR).find_map(|anchor| {
        let text = anchor.text().collect::<String>();
        if !DOWNLOAD_LINK_TEXT_REGEX.is_match(text.trim()) {
            return None;
        }
        let href = anchor.value().attr("href")?.trim();
        href.ends_with(ARTIFACT_SUFFIX).then(|| href.to_string())
    })
}

/// Works out which artifact is the current upstream version.
pub struct Resolver {
    transport: Arc<dyn Transport>,
    page: Url,
    scheme: NamingScheme,
}
impl Resolver {
    pub fn new(transport: Arc<dyn Transport>, page: Url, scheme: NamingScheme) -> Self {
        Self {
            transport,
            page,
            scheme,
        }
    }

    /// Resolve the artifact to download.
    ///
    /// An explicit URL is used as is, without checking that it exists.
    /// Otherwise the publisher page is fetched (one logical request) and
    /// scraped for the download link.
    #[instrument(skip(self), fields(page = %self.page))]
    pub async fn resolve(&self, explicit: Option<&str>) -> Result<RemoteArtifact> {
        let url = match explicit {
            Some(url) => Url::parse(url).or_raise(|| ErrorKind::InvalidUrl(url.to_string()))?,
            None => self.scrape().await?,
        };
        let artifact = self.artifact(url)?;
        tracing::debug!(url = %artifact.url, target = %artifact.target, "Resolved remote database");
        Ok(artifact)
    }

    async fn scrape(&self) -> Result<Url> {
        tracing::debug!("Looking up the current download link");
        let body = self.transport.get_text(&self.page).await?;
        let href = find_download_link(&body).ok_or_raise(|| ErrorKind::NoMatchingLink(self.page.to_string()))?;
        self.page.join(&href).or_raise(|| ErrorKind::InvalidUrl(href.clone()))
    }

    /// Describe the artifact at `url` without contacting it.
    pub fn artifact(&self, url: Url) -> Result<RemoteArtifact> {
        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .ok_or_raise(|| ErrorKind::UnsupportedArtifact(url.to_string()))?
            .to_string();
        let compression = Compression::from_path(&file_name);
        if compression != Compression::Gzip {
            exn::bail!(ErrorKind::UnsupportedArtifact(url.to_string()));
        }
        let name = compression
            .strip_extension(&file_name)
            .ok_or_raise(|| ErrorKind::UnsupportedArtifact(url.to_string()))?;
        let target = self.scheme.parse(name).ok_or_raise(|| ErrorKind::InvalidName(name.to_string()))?;
        Ok(RemoteArtifact {
            url,
            file_name,
            compression,
            target,
        })
    }
}
