use crate::clients::dyndns2::{StandardArgs, StandardService};
use crate::clients::DnsClient;
use crate::error::UpdateError;
use crate::http::HttpClient;
use crate::ip::Protocol;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NsupdateArgs {
    pub hostname: String,
    pub secret_key: String,
}

/// nsupdate.info client - https://nsupdate.info/
///
/// Speaks dyndns2; the hostname doubles as the username and the per-host
/// update secret is the password.
pub struct NsupdateClient {
    inner: StandardService,
}

impl NsupdateClient {
    pub fn new(args: NsupdateArgs, http: HttpClient) -> Self {
        let standard = StandardArgs {
            service_ipv4: "ipv4.nsupdate.info".to_string(),
            service_ipv6: Some("ipv6.nsupdate.info".to_string()),
            username: args.hostname.clone(),
            password: args.secret_key,
            hostname: args.hostname,
            extra_params: BTreeMap::new(),
        };

        Self {
            inner: StandardService::named("NSUpdate", standard, http),
        }
    }
}

impl DnsClient for NsupdateClient {
    fn update_ipv4(&self, address: Ipv4Addr) -> Result<bool, UpdateError> {
        self.inner.update_ipv4(address)
    }

    fn update_ipv6(&self, address: Ipv6Addr) -> Result<bool, UpdateError> {
        self.inner.update_ipv6(address)
    }

    fn supports(&self, protocol: Protocol) -> bool {
        self.inner.supports(protocol)
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}
