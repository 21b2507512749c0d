use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Publisher page listing the current free city database.
pub const DEFAULT_PAGE_URL: &str = "https://db-ip.com/db/download/ip-to-city-lite";

/// Suffix every downloadable artifact must carry.
pub(crate) const ARTIFACT_SUFFIX: &str = ".gz";

selector!(ANCHOR_SELECTOR, "a[href]");
regex!(DOWNLOAD_LINK_TEXT_REGEX, r"^Download\s+IP\s+to\s+City\s+Lite\s+MMDB$");
