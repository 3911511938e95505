use crate::clients::DnsClient;
use crate::error::UpdateError;
use crate::http::{with_query, HttpClient};
use crate::ip::Protocol;
use serde::Deserialize;
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const IPV4_ENDPOINT: &str = "https://sync.afraid.org/u/";
const IPV6_ENDPOINT: &str = "https://v6.sync.afraid.org/u/";

/// Update keys are the last path segment of the FreeDNS v2 update URL,
/// e.g. `VWZIcQnBScVv8yv8DhJxDbnt` for
/// `http://sync.afraid.org/u/VWZIcQnBScVv8yv8DhJxDbnt/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FreeDnsArgs {
    pub ipv4_key: String,
    #[serde(default)]
    pub ipv6_key: Option<String>,
}

/// Freedns (afraid.org) client - https://freedns.afraid.org/
///
/// Uses the keyed v2 interface, one key per record and protocol, and asks for
/// a JSON answer.
pub struct FreednsClient {
    args: FreeDnsArgs,
    ipv4_endpoint: String,
    ipv6_endpoint: String,
    http: HttpClient,
}

impl FreednsClient {
    pub fn new(args: FreeDnsArgs, http: HttpClient) -> Self {
        Self {
            args,
            ipv4_endpoint: IPV4_ENDPOINT.to_string(),
            ipv6_endpoint: IPV6_ENDPOINT.to_string(),
            http,
        }
    }

    /// Point both protocols at other endpoints (each must end with `/`).
    #[cfg(test)]
    fn with_endpoints(mut self, ipv4: impl Into<String>, ipv6: impl Into<String>) -> Self {
        self.ipv4_endpoint = ipv4.into();
        self.ipv6_endpoint = ipv6.into();
        self
    }

    fn update(&self, endpoint: &str, key: &str, address: IpAddr) -> Result<bool, UpdateError> {
        let address = address.to_string();
        let url = with_query(
            &format!("{}{}/", endpoint, key),
            [("content-type", "json"), ("ip", address.as_str())],
        );

        let response = self.http.get(&url).send()?;
        let status_code = response.status_code;
        let body = response.as_str()?;

        log::debug!("Response status: {}, body: {}", status_code, body);

        if !(200..300).contains(&status_code) {
            return Err(UpdateError::service(format!("HTTP error: {}", status_code)));
        }

        let json: Value = serde_json::from_str(body)
            .map_err(|e| UpdateError::unknown(format!("Malformed response from FreeDNS: {}", e)))?;
        interpret_response(&json)
    }
}

impl DnsClient for FreednsClient {
    fn update_ipv4(&self, address: Ipv4Addr) -> Result<bool, UpdateError> {
        self.update(&self.ipv4_endpoint, &self.args.ipv4_key, IpAddr::V4(address))
    }

    fn update_ipv6(&self, address: Ipv6Addr) -> Result<bool, UpdateError> {
        match &self.args.ipv6_key {
            Some(key) => self.update(&self.ipv6_endpoint, key, IpAddr::V6(address)),
            None => Err(UpdateError::unsupported(self.provider_name(), Protocol::Ipv6)),
        }
    }

    fn supports(&self, protocol: Protocol) -> bool {
        match protocol {
            Protocol::Ipv4 => true,
            Protocol::Ipv6 => self.args.ipv6_key.is_some(),
        }
    }

    fn provider_name(&self) -> &str {
        "FreeDNS"
    }
}

/// Map a FreeDNS JSON answer to an update outcome.
///
/// Any `errorno` is a failure. Otherwise the first target's `statuscode`
/// tells whether the record changed (0) or was already current (100).
pub fn interpret_response(json: &Value) -> Result<bool, UpdateError> {
    if json.get("errorno").is_some() {
        let summary = json
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        return Err(UpdateError::service(summary));
    }

    match json
        .get("targets")
        .and_then(Value::as_array)
        .and_then(|targets| targets.first())
    {
        Some(target) => Ok(target.get("statuscode").and_then(Value::as_i64) == Some(0)),
        None => Err(UpdateError::unknown("Response did not include status.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn test_statuscode_zero_is_changed() {
        let body = json!({"targets": [{"statuscode": 0, "host": "a.example.com"}]});
        assert!(interpret_response(&body).unwrap());
    }

    #[test]
    fn test_statuscode_100_is_unchanged() {
        let body = json!({"targets": [{"statuscode": 100}]});
        assert!(!interpret_response(&body).unwrap());
        let body = json!({"targets": [{"statuscode": 7}, {"statuscode": 0}]});
        assert!(!interpret_response(&body).unwrap());
    }

    #[test]
    fn test_errorno_always_fails() {
        let body = json!({"errorno": 2, "summary": "Invalid update key", "targets": [{"statuscode": 0}]});
        let err = interpret_response(&body).unwrap_err();
        assert_eq!(err.to_string(), "Invalid update key");

        let body = json!({"errorno": 1});
        assert_eq!(interpret_response(&body).unwrap_err().to_string(), "Unknown error");
    }

    #[test]
    fn test_missing_targets() {
        let err = interpret_response(&json!({"something": "else"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(interpret_response(&json!({"targets": []})).is_err());
    }

    fn client_for(server: &mockito::ServerGuard, ipv6_key: Option<&str>) -> FreednsClient {
        FreednsClient::new(
            FreeDnsArgs {
                ipv4_key: "v4key".to_string(),
                ipv6_key: ipv6_key.map(str::to_string),
            },
            HttpClient::default(),
        )
        .with_endpoints(format!("{}/u/", server.url()), format!("{}/v6/u/", server.url()))
    }

    #[test]
    fn test_update_ipv4_request() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/u/v4key/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("content-type".into(), "json".into()),
                Matcher::UrlEncoded("ip".into(), "203.0.113.9".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"targets":[{"statuscode":0}]}"#)
            .create();

        let client = client_for(&server, None);
        assert!(client.update_ipv4(Ipv4Addr::new(203, 0, 113, 9)).unwrap());
        mock.assert();
    }

    #[test]
    fn test_update_ipv6_request() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/v6/u/v6key/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"targets":[{"statuscode":100}]}"#)
            .create();

        let client = client_for(&server, Some("v6key"));
        assert!(client.supports(Protocol::Ipv6));
        assert!(!client.update_ipv6("2001:db8::9".parse().unwrap()).unwrap());
    }

    #[test]
    fn test_ipv6_without_key_unsupported() {
        let server = mockito::Server::new();
        let client = client_for(&server, None);
        assert!(!client.supports(Protocol::Ipv6));
        let err = client.update_ipv6("2001:db8::9".parse().unwrap()).unwrap_err();
        assert!(matches!(err, UpdateError::Unsupported { .. }));
    }

    #[test]
    fn test_malformed_body() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/u/v4key/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("ERROR: Address 203.0.113.9 has not changed.")
            .create();

        let client = client_for(&server, None);
        let err = client.update_ipv4(Ipv4Addr::new(203, 0, 113, 9)).unwrap_err();
        assert!(matches!(err, UpdateError::Unknown(_)));
    }

    #[test]
    fn test_http_error_is_service_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/u/v4key/")
            .match_query(Matcher::Any)
            .with_status(500)
            .create();

        let client = client_for(&server, None);
        let err = client.update_ipv4(Ipv4Addr::new(203, 0, 113, 9)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Service);
    }
}
