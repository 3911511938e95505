use crate::error::AddressProviderError;
use crate::http::{encode_pairs, HttpClient};
use crate::ip::{parse_ip, Protocol};
use crate::providers::AddressProvider;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};

const WAN_LABEL: &str = "WAN IP Address (IPv4):";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComcastArgs {
    /// Internal address of the router (host, optionally with port)
    pub ip: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

/// Scrapes the external IPv4 address from the admin pages of a
/// Comcast/XFINITY router (tested against an Arris TG1682G).
///
/// IPv6 is not offered: the router's own IPv6 address is rarely the one
/// worth publishing.
pub struct ComcastRouter {
    args: ComcastArgs,
    http: HttpClient,
}

impl ComcastRouter {
    pub fn new(args: ComcastArgs, http: HttpClient) -> Self {
        Self { args, http }
    }

    /// Log in and return the session cookie (`name=value`).
    fn login(&self) -> Result<Option<String>, AddressProviderError> {
        let url = format!("http://{}/check.php", self.args.ip);
        let body = encode_pairs([
            ("username", self.args.username.as_str()),
            ("password", self.args.password.as_str()),
        ]);

        let response = self
            .http
            .post(&url)
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body(body)
            // the cookie arrives with the redirect
            .with_follow_redirects(false)
            .send()?;

        if !(200..400).contains(&response.status_code) {
            return Err(AddressProviderError::Status {
                url,
                status: response.status_code,
            });
        }

        Ok(response.headers.get("set-cookie").and_then(|raw| session_cookie(raw)))
    }
}

impl AddressProvider for ComcastRouter {
    fn ipv4(&self) -> Result<Option<Ipv4Addr>, AddressProviderError> {
        let cookie = self.login()?;
        if cookie.is_none() {
            log::debug!("Router at {} did not set a session cookie", self.args.ip);
        }

        let url = format!("http://{}/comcast_network.php", self.args.ip);
        let mut request = self.http.get(&url);
        if let Some(cookie) = cookie {
            request = request.with_header("Cookie", cookie);
        }
        let response = request.send()?;
        if !(200..300).contains(&response.status_code) {
            return Err(AddressProviderError::Status {
                url,
                status: response.status_code,
            });
        }

        match scrape_wan_address(response.as_str()?)? {
            IpAddr::V4(ip) => Ok(Some(ip)),
            IpAddr::V6(ip) => Err(AddressProviderError::Malformed(ip.to_string(), Protocol::Ipv4)),
        }
    }

    fn provider_name(&self) -> &str {
        "ComcastRouter"
    }
}

/// Reduce a `Set-Cookie` header to the `name=value` pairs to send back.
fn session_cookie(raw: &str) -> Option<String> {
    let pairs: Vec<&str> = raw
        .split(',')
        .filter_map(|part| part.split(';').next())
        .map(str::trim)
        .filter(|pair| {
            pair.split_once('=')
                .map(|(name, _)| !name.is_empty() && !name.contains(' '))
                .unwrap_or(false)
        })
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// Find the WAN label and read the text of the next `class="value"` span.
fn scrape_wan_address(html: &str) -> Result<IpAddr, AddressProviderError> {
    let missing = || AddressProviderError::ScrapeTarget(format!("'{}'", WAN_LABEL));

    let after_label = &html[html.find(WAN_LABEL).ok_or_else(missing)? + WAN_LABEL.len()..];

    let mut rest = after_label;
    loop {
        let start = rest.find("<span").ok_or_else(missing)?;
        let tag_end = rest[start..].find('>').ok_or_else(missing)? + start;
        let tag = &rest[start..tag_end];
        let content = &rest[tag_end + 1..];

        if tag.contains("class=\"value\"") || tag.contains("class='value'") {
            let end = content.find("</span>").ok_or_else(missing)?;
            return parse_ip(content[..end].trim(), Protocol::Ipv4);
        }
        rest = content;
    }
}
