use crate::clients::dyndns2::{StandardArgs, StandardService};
use crate::clients::DnsClient;
use crate::error::UpdateError;
use crate::http::HttpClient;
use crate::ip::Protocol;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OvhArgs {
    pub username: String,
    pub password: String,
    pub hostname: String,
    /// Type of update (`system` query parameter)
    #[serde(default = "default_system")]
    pub system: String,
}

fn default_system() -> String {
    "dyndns".to_string()
}

/// OVH DynHost client - https://docs.ovh.com/gb/en/domains/hosting_dynhost/
///
/// Speaks dyndns2 against www.ovh.com. IPv4 only; an IPv6 update fails as
/// unsupported.
pub struct OvhClient {
    inner: StandardService,
}

impl OvhClient {
    pub fn new(args: OvhArgs, http: HttpClient) -> Self {
        Self::with_server("www.ovh.com", args, http)
    }

    fn with_server(server: &str, args: OvhArgs, http: HttpClient) -> Self {
        let mut extra_params = BTreeMap::new();
        extra_params.insert("system".to_string(), args.system);

        let standard = StandardArgs {
            service_ipv4: server.to_string(),
            service_ipv6: None,
            username: args.username,
            password: args.password,
            hostname: args.hostname,
            extra_params,
        };

        Self {
            inner: StandardService::named("OVHDynDNS", standard, http),
        }
    }
}

impl DnsClient for OvhClient {
    fn update_ipv4(&self, address: Ipv4Addr) -> Result<bool, UpdateError> {
        self.inner.update_ipv4(address)
    }

    // update_ipv6 keeps the trait's unsupported default

    fn supports(&self, protocol: Protocol) -> bool {
        protocol == Protocol::Ipv4
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}
