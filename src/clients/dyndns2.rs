use crate::clients::DnsClient;
use crate::error::UpdateError;
use crate::http::{basic_auth, with_query, HttpClient};
use crate::ip::Protocol;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Arguments of the dyndns2 protocol client.
///
/// Any argument beyond the named ones is appended to the update request's
/// query string (e.g. `system = "dyndns"` or `wildcard = "NOCHG"`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardArgs {
    /// Host of the IPv4 update endpoint; may also be a full base URL
    pub service_ipv4: String,
    #[serde(default)]
    pub service_ipv6: Option<String>,
    pub username: String,
    pub password: String,
    /// Fully qualified domain name to update
    pub hostname: String,
    #[serde(flatten)]
    pub extra_params: BTreeMap<String, String>,
}

/// DynDNS2 protocol client
/// This protocol is supported by many providers including:
/// - DynDNS
/// - No-IP
/// - nsupdate.info
/// - OVH DynHost
/// - Many others
///
/// Client configuration errors reported by the service (bad credentials,
/// foreign hostname, ...) are returned as [`UpdateError::Client`] so the
/// updater can stop retrying until the configuration is edited.
pub struct StandardService {
    name: &'static str,
    args: StandardArgs,
    http: HttpClient,
}

impl StandardService {
    pub fn new(args: StandardArgs, http: HttpClient) -> Self {
        Self::named("StandardService", args, http)
    }

    /// Same protocol under another provider name (used by the fixed-host services).
    pub fn named(name: &'static str, args: StandardArgs, http: HttpClient) -> Self {
        Self { name, args, http }
    }

    fn update(&self, service_host: &str, address: IpAddr) -> Result<bool, UpdateError> {
        let address = address.to_string();
        let mut params = vec![
            ("myip", address.as_str()),
            ("hostname", self.args.hostname.as_str()),
        ];
        params.extend(
            self.args
                .extra_params
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        let url = with_query(&update_url(service_host), params);

        log::debug!("Updating {} with DynDNS2 protocol via {}", self.args.hostname, service_host);

        let response = self
            .http
            .get(&url)
            .with_header("Authorization", basic_auth(&self.args.username, &self.args.password))
            .send()?;

        let status_code = response.status_code;
        let body = response.as_str()?.trim();

        log::debug!("Response status: {}, body: {}", status_code, body);

        interpret_response(status_code, body)
    }
}

impl DnsClient for StandardService {
    fn update_ipv4(&self, address: Ipv4Addr) -> Result<bool, UpdateError> {
        self.update(&self.args.service_ipv4, IpAddr::V4(address))
    }

    fn update_ipv6(&self, address: Ipv6Addr) -> Result<bool, UpdateError> {
        match &self.args.service_ipv6 {
            Some(service_host) => self.update(service_host, IpAddr::V6(address)),
            None => Err(UpdateError::unsupported(self.name, Protocol::Ipv6)),
        }
    }

    fn supports(&self, protocol: Protocol) -> bool {
        match protocol {
            Protocol::Ipv4 => true,
            Protocol::Ipv6 => self.args.service_ipv6.is_some(),
        }
    }

    fn provider_name(&self) -> &str {
        self.name
    }

    fn describe(&self) -> String {
        format!("{} [{}]", self.name, self.args.hostname)
    }
}

/// `https://<host>/nic/update`, unless the host is already a base URL.
fn update_url(service_host: &str) -> String {
    if service_host.contains("://") {
        format!("{}/nic/update", service_host.trim_end_matches('/'))
    } else {
        format!("https://{}/nic/update", service_host)
    }
}

/// Map a dyndns2 response to an update outcome.
///
/// The first whitespace-separated token of the body is the status, e.g.
/// `good 1.2.3.4` or `nochg 1.2.3.4`. A 401 means the same as `badauth`.
pub fn interpret_response(status_code: i32, body: &str) -> Result<bool, UpdateError> {
    let status = body.split_whitespace().next().unwrap_or("");

    match status {
        "good" => Ok(true),
        "nochg" => Ok(false),
        _ if status == "badauth" || status_code == 401 => {
            Err(UpdateError::client("Incorrect login credentials"))
        }
        "!donator" => Err(UpdateError::client("Feature is only available to paying users")),
        "notfqdn" => Err(UpdateError::client("Incorrect hostname format")),
        "nohost" => Err(UpdateError::client("Hostname does not belong to this account")),
        "abuse" => Err(UpdateError::client("Hostname has been blocked for abuse")),
        "badagent" => Err(UpdateError::client("User agent or HTTP method was rejected")),
        "dnserr" => Err(UpdateError::service("Server DNS error encountered")),
        "911" => Err(UpdateError::service("Server is not currently functioning correctly")),
        _ if !(200..300).contains(&status_code) => {
            Err(UpdateError::service(format!("HTTP error: {}", status_code)))
        }
        _ => Err(UpdateError::unknown(format!("Unknown response: {}", body))),
    }
}
