mod args;
mod clients;
mod config;
mod error;
mod http;
mod ip;
mod providers;
mod shorthand;
mod state;
mod updater;

use error::ExitStatus;
use std::error::Error;
use std::process::ExitCode;

/// User-Agent header value for HTTP requests
pub const USER_AGENT: &str = concat!("dnsupdate/", env!("CARGO_PKG_VERSION"));

fn init_logger(debug: bool, quiet: bool) {
    let log_level = if quiet {
        log::LevelFilter::Error
    } else if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::builder()
        .filter(None, log_level)
        .init();
}

fn run(args: &args::Args) -> Result<ExitStatus, Box<dyn Error>> {
    let config_path = match &args.config {
        Some(path) => config::expand_tilde(&path.to_string_lossy()),
        None => config::default_config_path().ok_or("Failed to determine config file location")?,
    };

    log::debug!("Loading configuration from {}", config_path.display());
    let config = config::Config::from_file(&config_path)?;
    let fingerprint = config::fingerprint(&config_path)?;

    let cache_path = match &config.cache_file {
        Some(path) => path.clone(),
        None => state::StateManager::default_cache_path()?,
    };
    let mut state_manager = state::StateManager::new(cache_path)?;
    log::debug!("Using cache file {}", state_manager.cache_file().display());

    let http = http::HttpClient::default();
    let updater = updater::Updater::from_config(&config, &http);

    let status = updater.run(
        state_manager.data_mut(),
        updater::RunOptions {
            force_update: args.force_update,
            config_mtime: Some(fingerprint),
        },
    );

    // Save state to cache file
    state_manager.save()?;

    Ok(status)
}

fn main() -> ExitCode {
    let args = args::Args::new();
    init_logger(args.debug, args.quiet);

    match run(&args) {
        Ok(status) => status.into(),
        Err(e) => {
            log::error!("{}", e);
            ExitStatus::OtherError.into()
        }
    }
}
