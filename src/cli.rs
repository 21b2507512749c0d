use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Keeps a db-ip city database current and answers IP geolocation lookups.
#[derive(Parser, Debug)]
#[command(name = "ipgeo", version)]
pub struct Args {
    /// Config file (TOML, YAML or JSON)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Update the database once, then exit
    Update {
        /// Download this artifact instead of the published one
        #[arg(long, value_name = "URL")]
        url: Option<String>,
    },
    /// Look up IP addresses
    Lookup {
        /// Download this artifact instead of the published one
        #[arg(long, value_name = "URL", conflicts_with = "offline")]
        url: Option<String>,
        /// Use the installed database without checking for updates
        #[arg(long)]
        offline: bool,
        /// One JSON object per address instead of CSV lines
        #[arg(long)]
        json: bool,
        #[arg(required = true, value_name = "IP")]
        ips: Vec<IpAddr>,
    },
    /// Show installed databases and the loaded one, as JSON
    Status,
    /// Update now and then periodically, until interrupted
    Run {
        /// Download this artifact instead of the published one
        #[arg(long, value_name = "URL")]
        url: Option<String>,
    },
}
impl Command {
    /// Artifact URL given on the command line, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Update { url } | Self::Lookup { url, .. } | Self::Run { url } => url.as_deref(),
            Self::Status => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_command_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_lookup() {
        let args = Args::try_parse_from(["ipgeo", "lookup", "--json", "8.8.8.8", "2001:4860:4860::8888"]).unwrap();
        assert_eq!(
            args.command,
            Command::Lookup {
                url: None,
                offline: false,
                json: true,
                ips: vec!["8.8.8.8".parse().unwrap(), "2001:4860:4860::8888".parse().unwrap()],
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["ipgeo", "status", "-v", "--config", "/etc/ipgeo.toml"]).unwrap();
        assert!(args.verbose);
        assert_eq!(args.config, Some(PathBuf::from("/etc/ipgeo.toml")));
        assert_eq!(args.command, Command::Status);
    }

    const MIRROR: &str = "https://x.example/dbip-city-lite-2022-07.mmdb.gz";

    #[rstest]
    #[case(&["ipgeo", "update", "--url", MIRROR], Some(MIRROR))]
    #[case(&["ipgeo", "lookup", "--url", MIRROR, "8.8.8.8"], Some(MIRROR))]
    #[case(&["ipgeo", "run"], None)]
    #[case(&["ipgeo", "status"], None)]
    fn test_url(#[case] argv: &[&str], #[case] expected: Option<&str>) {
        let args = Args::try_parse_from(argv).unwrap();
        assert_eq!(args.command.url(), expected);
    }

    #[rstest]
    #[case::no_addresses(&["ipgeo", "lookup"])]
    #[case::not_an_address(&["ipgeo", "lookup", "example.com"])]
    #[case::offline_with_url(&["ipgeo", "lookup", "--offline", "--url", "https://x.example/a.gz", "8.8.8.8"])]
    #[case::no_command(&["ipgeo"])]
    fn test_rejected(#[case] argv: &[&str]) {
        assert!(Args::try_parse_from(argv).is_err());
    }
}
