use crate::error::AddressProviderError;
use crate::http::HttpClient;
use crate::ip::{parse_ip, Protocol};
use crate::providers::AddressProvider;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Web provider arguments. Defaults point at icanhazip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebArgs {
    #[serde(default = "default_ipv4_url")]
    pub ipv4_url: String,
    #[serde(default = "default_ipv6_url")]
    pub ipv6_url: String,
}

fn default_ipv4_url() -> String {
    "https://ipv4.icanhazip.com/".to_string()
}

fn default_ipv6_url() -> String {
    "https://ipv6.icanhazip.com/".to_string()
}

impl Default for WebArgs {
    fn default() -> Self {
        Self {
            ipv4_url: default_ipv4_url(),
            ipv6_url: default_ipv6_url(),
        }
    }
}

/// Asks an echo service for the caller's address. The response body must
/// be the bare address in plain text.
pub struct WebProvider {
    args: WebArgs,
    http: HttpClient,
}

impl WebProvider {
    pub fn new(args: WebArgs, http: HttpClient) -> Self {
        Self { args, http }
    }

    fn fetch(&self, url: &str, protocol: Protocol) -> Result<IpAddr, AddressProviderError> {
        let response = self.http.get(url).send()?;

        if !(200..300).contains(&response.status_code) {
            return Err(AddressProviderError::Status {
                url: url.to_string(),
                status: response.status_code,
            });
        }

        let body = response.as_str()?.trim();
        log::debug!("{} answered '{}'", url, body);
        parse_ip(body, protocol)
    }
}

impl AddressProvider for WebProvider {
    fn ipv4(&self) -> Result<Option<Ipv4Addr>, AddressProviderError> {
        match self.fetch(&self.args.ipv4_url, Protocol::Ipv4)? {
            IpAddr::V4(ip) => Ok(Some(ip)),
            IpAddr::V6(ip) => Err(AddressProviderError::Malformed(ip.to_string(), Protocol::Ipv4)),
        }
    }

    fn ipv6(&self) -> Result<Option<Ipv6Addr>, AddressProviderError> {
        match self.fetch(&self.args.ipv6_url, Protocol::Ipv6)? {
            IpAddr::V6(ip) => Ok(Some(ip)),
            IpAddr::V4(ip) => Err(AddressProviderError::Malformed(ip.to_string(), Protocol::Ipv6)),
        }
    }

    fn provider_name(&self) -> &str {
        "Web"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_for(server: &mockito::ServerGuard) -> WebProvider {
        WebProvider::new(
            WebArgs {
                ipv4_url: format!("{}/v4", server.url()),
                ipv6_url: format!("{}/v6", server.url()),
            },
            HttpClient::default(),
        )
    }

    #[test]
    fn test_web_ipv4() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/v4")
            .match_header("user-agent", crate::USER_AGENT)
            .with_status(200)
            .with_body("203.0.113.7\n")
            .create();

        let provider = provider_for(&server);
        assert_eq!(provider.ipv4().unwrap(), Some(Ipv4Addr::new(203, 0, 113, 7)));
        mock.assert();
    }

    #[test]
    fn test_web_ipv6() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/v6")
            .with_status(200)
            .with_body("2001:db8::42\n")
            .create();

        let provider = provider_for(&server);
        assert_eq!(
            provider.ipv6().unwrap(),
            Some("2001:db8::42".parse::<Ipv6Addr>().unwrap())
        );
    }

    #[test]
    fn test_web_wrong_family_rejected() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/v4")
            .with_status(200)
            .with_body("2001:db8::42")
            .create();

        let provider = provider_for(&server);
        assert!(matches!(
            provider.ipv4(),
            Err(AddressProviderError::Malformed(_, Protocol::Ipv4))
        ));
    }

    #[test]
    fn test_web_malformed_body() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/v4")
            .with_status(200)
            .with_body("<html>nope</html>")
            .create();

        let provider = provider_for(&server);
        assert!(provider.ipv4().is_err());
    }

    #[test]
    fn test_web_http_error_status() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/v4").with_status(503).create();

        let provider = provider_for(&server);
        let err = provider.ipv4().unwrap_err();
        assert!(matches!(err, AddressProviderError::Status { status: 503, .. }));
    }
}
