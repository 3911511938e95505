/// Error taxonomy shared by address providers, DNS clients and the updater.
///
/// The updater only cares about the *class* of an update failure: client
/// errors disable a protocol until the configuration changes, service errors
/// are reported and retried on the next run, everything else is surfaced as
/// an "other" error.
use crate::ip::Protocol;
use std::process::ExitCode;
use thiserror::Error;

/// Failure while resolving the current address of a provider.
#[derive(Error, Debug)]
pub enum AddressProviderError {
    #[error("Interface {interface} has no valid {protocol} address")]
    NoAddress { interface: String, protocol: Protocol },

    #[error("'{0}' is not a valid {1} address")]
    Malformed(String, Protocol),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: i32 },

    #[error("Could not find {0} on the router status page")]
    ScrapeTarget(String),

    #[error("Failed to inspect interface '{0}': {1}")]
    Command(String, String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] minreq::Error),
}

/// Failure reported by a DNS client while pushing an address.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Misconfiguration on our side; retrying without a config change is futile.
    #[error("{0}")]
    Client(String),

    #[error("{service} does not support {protocol}")]
    Unsupported { service: String, protocol: Protocol },

    /// The remote service is failing.
    #[error("{0}")]
    Service(String),

    /// Response could not be mapped to a known outcome.
    #[error("{0}")]
    Unknown(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] minreq::Error),
}

/// Coarse classification of an [`UpdateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Client,
    Service,
    Other,
}

impl UpdateError {
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    pub fn unsupported(service: impl Into<String>, protocol: Protocol) -> Self {
        Self::Unsupported {
            service: service.into(),
            protocol,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Client(_) | Self::Unsupported { .. } => ErrorKind::Client,
            Self::Service(_) => ErrorKind::Service,
            Self::Unknown(_) | Self::Http(_) => ErrorKind::Other,
        }
    }
}

/// Errors raised while reading and interpreting the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Syntax(#[from] toml::de::Error),

    #[error("Config file does not define any dns_services")]
    MissingServices,

    #[error("Unknown {kind} type '{tag}'")]
    UnknownType { kind: &'static str, tag: String },

    #[error("Invalid arguments for {tag}: {reason}")]
    InvalidArgs { tag: String, reason: String },

    #[error("Invalid shorthand expression '{expr}': {reason}")]
    Shorthand { expr: String, reason: String },

    #[error("Invalid {0} description: expected a string or a table")]
    Shape(&'static str),
}

/// Process exit status, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ExitStatus {
    #[default]
    Success = 0,
    ServiceError = 1,
    ClientError = 2,
    OtherError = 3,
}

impl ExitStatus {
    /// Keep whichever of the two statuses is more severe.
    pub fn escalate(&mut self, other: ExitStatus) {
        if other > *self {
            *self = other;
        }
    }
}

impl From<ErrorKind> for ExitStatus {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Client => ExitStatus::ClientError,
            ErrorKind::Service => ExitStatus::ServiceError,
            ErrorKind::Other => ExitStatus::OtherError,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}
