use crate::error::{ErrorKind, Result};
use crate::model::Config;
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Prefix of environment variables that override configuration values.
pub const ENV_PREFIX: &str = "IPGEO_";
const CONFIG_FILE_NAME: &str = "config.toml";

/// `config.toml` inside the platform's config directory for ipgeo, e.g.
/// `~/.config/ipgeo/config.toml` on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ipgeo").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        None | Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        Some(other) => exn::bail!(ErrorKind::UnsupportedFormat(other.to_string())),
    })
}

impl Config {
    /// Build the layered sources without extracting them.
    ///
    /// An explicit `file` must exist; the default config file is used only
    /// if present.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                figment = merge_file(figment, path)?;
            },
            None => {
                if let Some(path) = default_config_file().filter(|path| path.is_file()) {
                    tracing::debug!(path = %path.display(), "Using default config file");
                    figment = merge_file(figment, &path)?;
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate the configuration.
    #[instrument]
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Config = Self::figment(file)?.extract().or_raise(|| ErrorKind::Malformed)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_load_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "ipgeo.toml",
                r#"
                directory = "/srv/ipgeo"

                [source]
                url = "https://mirror.example/dbip-city-lite-2022-07.mmdb.gz"

                [http]
                retries = 5
                "#,
            )?;
            let config = Config::load(Some(Path::new("ipgeo.toml"))).unwrap();
            assert_eq!(config.directory, Some(PathBuf::from("/srv/ipgeo")));
            assert_eq!(
                config.source.url.as_deref(),
                Some("https://mirror.example/dbip-city-lite-2022-07.mmdb.gz")
            );
            assert_eq!(config.http.retries, 5);
            // Untouched values keep their defaults.
            assert_eq!(config.http.page_timeout_secs, 30);
            assert_eq!(config.database.prefix, "dbip-city-lite");
            Ok(())
        });
    }

    #[test]
    fn test_load_yaml_and_json() {
        Jail::expect_with(|jail| {
            jail.create_file("ipgeo.yaml", "schedule:\n  interval_secs: 3600\n")?;
            jail.create_file("ipgeo.json", r#"{"database": {"prefix": "dbip-country-lite"}}"#)?;
            let yaml = Config::load(Some(Path::new("ipgeo.yaml"))).unwrap();
            assert_eq!(yaml.schedule.interval(), Duration::from_secs(3600));
            let json = Config::load(Some(Path::new("ipgeo.json"))).unwrap();
            assert_eq!(json.database.prefix, "dbip-country-lite");
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("ipgeo.toml", "[http]\nretries = 5\n")?;
            jail.set_env("IPGEO_HTTP__RETRIES", "7");
            jail.set_env("IPGEO_SCHEDULE__INTERVAL_SECS", "60");
            let config = Config::load(Some(Path::new("ipgeo.toml"))).unwrap();
            assert_eq!(config.http.retries, 7);
            assert_eq!(config.schedule.interval_secs, 60);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound(PathBuf::from("/definitely/not/here.toml")));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ipgeo.ini");
        std::fs::write(&path, "retries=1").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFormat("ini".to_string()));
    }

    #[test]
    fn test_malformed_and_invalid_values() {
        Jail::expect_with(|jail| {
            jail.create_file("wrong-type.toml", "[http]\nretries = \"lots\"\n")?;
            jail.create_file("zero.toml", "[schedule]\ninterval_secs = 0\n")?;
            let err = Config::load(Some(Path::new("wrong-type.toml"))).unwrap_err();
            assert_eq!(*err, ErrorKind::Malformed);
            let err = Config::load(Some(Path::new("zero.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid { field: "schedule.interval_secs", .. }));
            Ok(())
        });
    }
}
