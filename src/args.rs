use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Dynamic DNS update client", long_about = None)]
pub struct Args {
    /// Configuration file (default: <user config dir>/dnsupdate.toml)
    pub config: Option<PathBuf>,

    /// Update every address even if it has not changed; also re-enables
    /// services disabled by a previous client error
    #[arg(short = 'f', long, default_value = "false")]
    pub force_update: bool,

    /// Debug output
    #[arg(long, default_value = "false")]
    pub debug: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(long, default_value = "false", conflicts_with = "debug")]
    pub quiet: bool,
}

impl Args {
    pub fn new() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["dnsupdate"]).unwrap();
        assert!(args.config.is_none());
        assert!(!args.force_update);
        assert!(!args.debug);
        assert!(!args.quiet);
    }

    #[test]
    fn test_config_and_force() {
        let args = Args::try_parse_from(["dnsupdate", "-f", "/etc/dnsupdate.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/dnsupdate.toml")));
        assert!(args.force_update);

        let args = Args::try_parse_from(["dnsupdate", "--force-update"]).unwrap();
        assert!(args.force_update);
    }

    #[test]
    fn test_version_flag() {
        let err = Args::try_parse_from(["dnsupdate", "-V"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_debug_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["dnsupdate", "--debug", "--quiet"]).is_err());
    }
}
