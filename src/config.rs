/// TOML configuration parser
///
/// This module parses the dnsupdate configuration file:
/// - `dns_services`: ordered list of services, each a shorthand string or a
///   `{type, args, address_provider}` table
/// - `address_provider`: global default provider (`Web()` when absent)
/// - `cache_file`: optional override of the state cache location
///
/// Example:
/// ```toml
/// address_provider = { ipv4 = "Web()", ipv6 = 'Local("eth0")' }
/// dns_services = [
///     'NSUpdate("host.example.com", "secret")',
///     { type = "FreeDNS", args = { ipv4_key = "abc" } },
/// ]
/// ```
use crate::clients::ServiceSpec;
use crate::error::ConfigError;
#[cfg(test)]
use crate::ip::Protocol;
use crate::providers::ProviderSpec;
use crate::shorthand::Shorthand;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Which provider answers for each protocol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderChoice {
    pub ipv4: Option<ProviderSpec>,
    pub ipv6: Option<ProviderSpec>,
}

impl ProviderChoice {
    /// One provider covering both protocols.
    pub fn both(spec: ProviderSpec) -> Self {
        Self {
            ipv4: Some(spec.clone()),
            ipv6: Some(spec),
        }
    }

    #[cfg(test)]
    pub fn get(&self, protocol: Protocol) -> Option<&ProviderSpec> {
        match protocol {
            Protocol::Ipv4 => self.ipv4.as_ref(),
            Protocol::Ipv6 => self.ipv6.as_ref(),
        }
    }
}

/// One configured DNS service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub spec: ServiceSpec,
    /// Service-specific providers; protocols left empty use the global default
    pub address_provider: ProviderChoice,
}

/// Main Config struct used throughout the codebase
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub dns_services: Vec<ServiceConfig>,
    pub address_provider: ProviderChoice,
    pub cache_file: Option<PathBuf>,
}

#[derive(Deserialize)]
struct RawConfig {
    dns_services: Option<Vec<toml::Value>>,
    address_provider: Option<toml::Value>,
    cache_file: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderTable {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    args: toml::Table,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceTable {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    args: toml::Table,
    address_provider: Option<toml::Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PerProtocolTable {
    ipv4: Option<toml::Value>,
    ipv6: Option<toml::Value>,
}

impl Config {
    /// Load and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;

        let dns_services = raw
            .dns_services
            .ok_or(ConfigError::MissingServices)?
            .into_iter()
            .map(parse_service)
            .collect::<Result<Vec<_>, _>>()?;

        let address_provider = match raw.address_provider {
            Some(value) => parse_provider_choice(value)?,
            None => ProviderChoice::both(ProviderSpec::Web(Default::default())),
        };

        Ok(Config {
            dns_services,
            address_provider,
            cache_file: raw.cache_file.as_deref().map(expand_tilde),
        })
    }
}

/// Fingerprint of a config file: its modification time in seconds.
pub fn fingerprint(path: &Path) -> Result<f64, ConfigError> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0))
}

/// Config file used when none is given on the command line.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dnsupdate.toml"))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = match dirs::home_dir() {
        Some(home) => home,
        None => return PathBuf::from(path),
    };

    if path == "~" {
        home
    } else if let Some(rest) = path.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(path)
    }
}

fn parse_service(value: toml::Value) -> Result<ServiceConfig, ConfigError> {
    match value {
        toml::Value::String(expr) => {
            let (tag, args) = shorthand_args(&expr, ServiceSpec::params, "DNS service")?;
            Ok(ServiceConfig {
                spec: ServiceSpec::from_args(&tag, args)?,
                address_provider: ProviderChoice::default(),
            })
        }
        value @ toml::Value::Table(_) => {
            let table: ServiceTable = value.try_into()?;
            let address_provider = match table.address_provider {
                Some(value) => parse_provider_choice(value)?,
                None => ProviderChoice::default(),
            };
            Ok(ServiceConfig {
                spec: ServiceSpec::from_args(&table.kind, table.args)?,
                address_provider,
            })
        }
        _ => Err(ConfigError::Shape("DNS service")),
    }
}

fn parse_provider(value: toml::Value) -> Result<ProviderSpec, ConfigError> {
    match value {
        toml::Value::String(expr) => {
            let (tag, args) = shorthand_args(&expr, ProviderSpec::params, "address provider")?;
            ProviderSpec::from_args(&tag, args)
        }
        value @ toml::Value::Table(_) => {
            let table: ProviderTable = value.try_into()?;
            ProviderSpec::from_args(&table.kind, table.args)
        }
        _ => Err(ConfigError::Shape("address provider")),
    }
}

/// A single provider, or a `{ipv4, ipv6}` table with one per protocol.
fn parse_provider_choice(value: toml::Value) -> Result<ProviderChoice, ConfigError> {
    let per_protocol = matches!(&value, toml::Value::Table(t) if !t.contains_key("type"));
    if !per_protocol {
        return parse_provider(value).map(ProviderChoice::both);
    }

    let table: PerProtocolTable = value.try_into()?;
    Ok(ProviderChoice {
        ipv4: table.ipv4.map(parse_provider).transpose()?,
        ipv6: table.ipv6.map(parse_provider).transpose()?,
    })
}

fn shorthand_args(
    expr: &str,
    params: fn(&str) -> Option<&'static [&'static str]>,
    kind: &'static str,
) -> Result<(String, toml::Table), ConfigError> {
    let parsed = Shorthand::parse(expr)?;
    let tag = parsed.tag.clone();
    let params = params(&tag).ok_or_else(|| ConfigError::UnknownType {
        kind,
        tag: tag.clone(),
    })?;
    let args = parsed.into_args(params)?;
    Ok((tag, args))
}
