use crate::error::{ConfigError, UpdateError};
use crate::http::HttpClient;
use crate::ip::Protocol;
use crate::providers::deserialize_args;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

pub mod dyndns2;
pub mod freedns;
pub mod nsupdate;
pub mod ovh;
pub mod static_url;

/// Common trait that all DNS client implementations must implement
///
/// The update methods return `Ok(true)` when the service changed the record,
/// `Ok(false)` when it reports that nothing needed changing. Failures are
/// classified through [`UpdateError`]; a protocol the client cannot handle at
/// all fails with [`UpdateError::Unsupported`] (the default implementation).
pub trait DnsClient {
    fn update_ipv4(&self, _address: Ipv4Addr) -> Result<bool, UpdateError> {
        Err(UpdateError::unsupported(self.provider_name(), Protocol::Ipv4))
    }

    fn update_ipv6(&self, _address: Ipv6Addr) -> Result<bool, UpdateError> {
        Err(UpdateError::unsupported(self.provider_name(), Protocol::Ipv6))
    }

    /// Whether the client is configured to update this protocol at all
    fn supports(&self, protocol: Protocol) -> bool;

    /// Get the provider name for logging purposes
    fn provider_name(&self) -> &str;

    /// Longer description used in progress messages, e.g. `NSUpdate [host.example.com]`
    fn describe(&self) -> String {
        self.provider_name().to_string()
    }
}

/// Dispatch an address to the matching update method.
pub fn update_record(client: &dyn DnsClient, address: IpAddr) -> Result<bool, UpdateError> {
    match address {
        IpAddr::V4(ip) => client.update_ipv4(ip),
        IpAddr::V6(ip) => client.update_ipv6(ip),
    }
}

/// Parsed description of a DNS service, one variant per supported type.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceSpec {
    StaticUrl(static_url::StaticUrlArgs),
    FreeDns(freedns::FreeDnsArgs),
    Standard(dyndns2::StandardArgs),
    NsUpdate(nsupdate::NsupdateArgs),
    OvhDynDns(ovh::OvhArgs),
}

impl ServiceSpec {
    /// Positional parameter order used by the shorthand syntax.
    pub fn params(tag: &str) -> Option<&'static [&'static str]> {
        match tag {
            "StaticURL" => Some(&["ipv4_url", "ipv6_url"]),
            "FreeDNS" => Some(&["ipv4_key", "ipv6_key"]),
            "StandardService" => Some(&[
                "service_ipv4",
                "service_ipv6",
                "username",
                "password",
                "hostname",
            ]),
            "NSUpdate" => Some(&["hostname", "secret_key"]),
            "OVHDynDNS" => Some(&["username", "password", "hostname", "system"]),
            _ => None,
        }
    }

    /// Build a spec from a type tag and its named arguments.
    pub fn from_args(tag: &str, args: toml::Table) -> Result<Self, ConfigError> {
        match tag {
            "StaticURL" => Ok(Self::StaticUrl(deserialize_args(tag, args)?)),
            "FreeDNS" => Ok(Self::FreeDns(deserialize_args(tag, args)?)),
            "StandardService" => Ok(Self::Standard(deserialize_args(tag, args)?)),
            "NSUpdate" => Ok(Self::NsUpdate(deserialize_args(tag, args)?)),
            "OVHDynDNS" => Ok(Self::OvhDynDns(deserialize_args(tag, args)?)),
            _ => Err(ConfigError::UnknownType {
                kind: "DNS service",
                tag: tag.to_string(),
            }),
        }
    }

    pub fn build(&self, http: &HttpClient) -> Box<dyn DnsClient> {
        let http = http.clone();
        match self {
            Self::StaticUrl(args) => Box::new(static_url::StaticUrlClient::new(args.clone(), http)),
            Self::FreeDns(args) => Box::new(freedns::FreednsClient::new(args.clone(), http)),
            Self::Standard(args) => Box::new(dyndns2::StandardService::new(args.clone(), http)),
            Self::NsUpdate(args) => Box::new(nsupdate::NsupdateClient::new(args.clone(), http)),
            Self::OvhDynDns(args) => Box::new(ovh::OvhClient::new(args.clone(), http)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, &str)]) -> toml::Table {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), toml::Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn test_static_url_from_args() {
        let spec = ServiceSpec::from_args(
            "StaticURL",
            table(&[("ipv4_url", "ipv4_test_url"), ("ipv6_url", "ipv6_test_url")]),
        )
        .unwrap();
        let client = spec.build(&HttpClient::default());
        assert_eq!(client.provider_name(), "StaticURL");
        assert!(client.supports(Protocol::Ipv4));
        assert!(client.supports(Protocol::Ipv6));
    }

    #[test]
    fn test_unknown_service_type() {
        let err = ServiceSpec::from_args("Bogus", toml::Table::new()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown DNS service type 'Bogus'");
    }

    #[test]
    fn test_missing_argument() {
        let err = ServiceSpec::from_args("NSUpdate", table(&[("hostname", "a.example.com")]))
            .unwrap_err();
        assert!(err.to_string().contains("secret_key"));
    }

    #[test]
    fn test_unexpected_argument() {
        let err = ServiceSpec::from_args(
            "FreeDNS",
            table(&[("ipv4_key", "k"), ("hostname", "a.example.com")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("hostname"));
    }

    #[test]
    fn test_params_cover_every_tag() {
        for tag in ["StaticURL", "FreeDNS", "StandardService", "NSUpdate", "OVHDynDNS"] {
            assert!(ServiceSpec::params(tag).is_some(), "{} has no params", tag);
        }
        assert!(ServiceSpec::params("Web").is_none());
    }

    struct Ipv4Only;

    impl DnsClient for Ipv4Only {
        fn update_ipv4(&self, _address: Ipv4Addr) -> Result<bool, UpdateError> {
            Ok(true)
        }

        fn supports(&self, protocol: Protocol) -> bool {
            protocol == Protocol::Ipv4
        }

        fn provider_name(&self) -> &str {
            "Ipv4Only"
        }
    }

    #[test]
    fn test_update_record_dispatch() {
        let client = Ipv4Only;
        assert!(update_record(&client, "1.2.3.4".parse().unwrap()).unwrap());
        let err = update_record(&client, "2001:db8::1".parse().unwrap()).unwrap_err();
        assert!(matches!(err, UpdateError::Unsupported { protocol: Protocol::Ipv6, .. }));
    }
}
