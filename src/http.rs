use base64::{engine::general_purpose, Engine as _};

/// Default request timeout in seconds
const DEFAULT_TIMEOUT: u64 = 30;

/// Shared HTTP settings handed to every address provider and DNS client,
/// so all outbound requests carry the same identifying User-Agent.
#[derive(Debug, Clone)]
pub struct HttpClient {
    user_agent: String,
    timeout: u64,
}

impl HttpClient {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn get(&self, url: &str) -> minreq::Request {
        self.prepare(minreq::get(url))
    }

    pub fn post(&self, url: &str) -> minreq::Request {
        self.prepare(minreq::post(url))
    }

    fn prepare(&self, request: minreq::Request) -> minreq::Request {
        request
            .with_header("User-Agent", self.user_agent.as_str())
            .with_timeout(self.timeout)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(crate::USER_AGENT)
    }
}

/// Value for an `Authorization: Basic` header.
pub fn basic_auth(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", username, password))
    )
}

/// Append url-encoded `key=value` pairs to a URL.
pub fn with_query<'a, I>(url: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let query = encode_pairs(params);
    if query.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query)
    } else {
        format!("{}?{}", url, query)
    }
}

/// `application/x-www-form-urlencoded` body (same encoding as a query string).
pub fn encode_pairs<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    params
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
