use crate::error::{AddressProviderError, ConfigError};
use crate::http::HttpClient;
use crate::ip::Protocol;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

pub mod comcast;
pub mod local;
pub mod web;

/// Source of the address that should be published for a domain.
///
/// A provider that has no notion of a protocol keeps the default and
/// returns `Ok(None)`; an error is only for a resolution that was attempted
/// and failed.
pub trait AddressProvider {
    fn ipv4(&self) -> Result<Option<Ipv4Addr>, AddressProviderError> {
        Ok(None)
    }

    fn ipv6(&self) -> Result<Option<Ipv6Addr>, AddressProviderError> {
        Ok(None)
    }

    /// Get the provider name for logging purposes
    fn provider_name(&self) -> &str;
}

/// Resolve the address for one protocol.
pub fn resolve(
    provider: &dyn AddressProvider,
    protocol: Protocol,
) -> Result<Option<IpAddr>, AddressProviderError> {
    Ok(match protocol {
        Protocol::Ipv4 => provider.ipv4()?.map(IpAddr::V4),
        Protocol::Ipv6 => provider.ipv6()?.map(IpAddr::V6),
    })
}

/// Parsed description of an address provider.
///
/// Equality is structural: two config entries describing the same provider
/// compare equal and end up sharing one instance (and one lookup per run).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderSpec {
    Web(web::WebArgs),
    Local(local::LocalArgs),
    ComcastRouter(comcast::ComcastArgs),
}

impl ProviderSpec {
    /// Positional parameter order used by the shorthand syntax.
    pub fn params(tag: &str) -> Option<&'static [&'static str]> {
        match tag {
            "Web" => Some(&["ipv4_url", "ipv6_url"]),
            "Local" => Some(&["interface", "allow_private"]),
            "ComcastRouter" => Some(&["ip", "username", "password"]),
            _ => None,
        }
    }

    /// Build a spec from a type tag and its named arguments.
    pub fn from_args(tag: &str, args: toml::Table) -> Result<Self, ConfigError> {
        match tag {
            "Web" => Ok(Self::Web(deserialize_args(tag, args)?)),
            "Local" => Ok(Self::Local(deserialize_args(tag, args)?)),
            "ComcastRouter" => Ok(Self::ComcastRouter(deserialize_args(tag, args)?)),
            _ => Err(ConfigError::UnknownType {
                kind: "address provider",
                tag: tag.to_string(),
            }),
        }
    }

    pub fn build(&self, http: &HttpClient) -> Box<dyn AddressProvider> {
        match self {
            Self::Web(args) => Box::new(web::WebProvider::new(args.clone(), http.clone())),
            Self::Local(args) => Box::new(local::LocalProvider::new(args.clone())),
            Self::ComcastRouter(args) => {
                Box::new(comcast::ComcastRouter::new(args.clone(), http.clone()))
            }
        }
    }
}

/// Deserialize a type's argument table into its typed argument struct.
pub fn deserialize_args<T>(tag: &str, args: toml::Table) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    toml::Value::Table(args)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidArgs {
            tag: tag.to_string(),
            reason: e.message().to_string(),
        })
}
