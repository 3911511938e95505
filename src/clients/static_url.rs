use crate::clients::DnsClient;
use crate::error::UpdateError;
use crate::http::HttpClient;
use crate::ip::Protocol;
use serde::Deserialize;
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticUrlArgs {
    pub ipv4_url: String,
    #[serde(default)]
    pub ipv6_url: Option<String>,
}

/// Fires a GET at a fixed update URL.
///
/// The remote end detects the caller's address by itself, so the address
/// handed in is only used to decide *whether* to call, and the response is
/// not inspected.
pub struct StaticUrlClient {
    args: StaticUrlArgs,
    http: HttpClient,
}

impl StaticUrlClient {
    pub fn new(args: StaticUrlArgs, http: HttpClient) -> Self {
        Self { args, http }
    }

    fn fire(&self, url: &str) -> Result<bool, UpdateError> {
        let response = self.http.get(url).send()?;
        log::debug!("{} answered HTTP {}", url, response.status_code);
        Ok(true)
    }
}

impl DnsClient for StaticUrlClient {
    fn update_ipv4(&self, _address: Ipv4Addr) -> Result<bool, UpdateError> {
        self.fire(&self.args.ipv4_url)
    }

    fn update_ipv6(&self, _address: Ipv6Addr) -> Result<bool, UpdateError> {
        match &self.args.ipv6_url {
            Some(url) => self.fire(url),
            None => Err(UpdateError::unsupported(self.provider_name(), Protocol::Ipv6)),
        }
    }

    fn supports(&self, protocol: Protocol) -> bool {
        match protocol {
            Protocol::Ipv4 => true,
            Protocol::Ipv6 => self.args.ipv6_url.is_some(),
        }
    }

    fn provider_name(&self) -> &str {
        "StaticURL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_url_fires_get() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/update/abc")
            .match_header("user-agent", crate::USER_AGENT)
            .with_status(200)
            .with_body("whatever the service says")
            .create();

        let client = StaticUrlClient::new(
            StaticUrlArgs {
                ipv4_url: format!("{}/update/abc", server.url()),
                ipv6_url: None,
            },
            HttpClient::default(),
        );

        assert!(client.update_ipv4(Ipv4Addr::new(1, 2, 3, 4)).unwrap());
        mock.assert();
    }

    #[test]
    fn test_static_url_ipv6_optional() {
        let client = StaticUrlClient::new(
            StaticUrlArgs {
                ipv4_url: "http://127.0.0.1:9/".to_string(),
                ipv6_url: None,
            },
            HttpClient::default(),
        );

        assert!(client.supports(Protocol::Ipv4));
        assert!(!client.supports(Protocol::Ipv6));
        assert!(matches!(
            client.update_ipv6("2001:db8::1".parse().unwrap()),
            Err(UpdateError::Unsupported { .. })
        ));
    }
}
