use crate::error::AddressProviderError;
use crate::ip::{extract_ips_from_output, is_global, is_private, Protocol};
use crate::providers::AddressProvider;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalArgs {
    pub interface: String,
    #[serde(default)]
    pub allow_private: bool,
}

/// Reads addresses bound to a local network interface.
///
/// Behind NAT the interface usually only carries a private IPv4 address,
/// which is rejected unless `allow_private` is set.
pub struct LocalProvider {
    args: LocalArgs,
}

impl LocalProvider {
    pub fn new(args: LocalArgs) -> Self {
        Self { args }
    }

    fn address(&self, protocol: Protocol) -> Result<IpAddr, AddressProviderError> {
        let ips = interface_addresses(&self.args.interface)?;
        select_address(&ips, protocol, self.args.allow_private).ok_or_else(|| {
            AddressProviderError::NoAddress {
                interface: self.args.interface.clone(),
                protocol,
            }
        })
    }
}

impl AddressProvider for LocalProvider {
    fn ipv4(&self) -> Result<Option<Ipv4Addr>, AddressProviderError> {
        match self.address(Protocol::Ipv4)? {
            IpAddr::V4(ip) => Ok(Some(ip)),
            IpAddr::V6(_) => Ok(None),
        }
    }

    fn ipv6(&self) -> Result<Option<Ipv6Addr>, AddressProviderError> {
        match self.address(Protocol::Ipv6)? {
            IpAddr::V6(ip) => Ok(Some(ip)),
            IpAddr::V4(_) => Ok(None),
        }
    }

    fn provider_name(&self) -> &str {
        "Local"
    }
}

/// First address of the requested family that is globally routable, or
/// private when that is allowed.
pub fn select_address(ips: &[IpAddr], protocol: Protocol, allow_private: bool) -> Option<IpAddr> {
    ips.iter()
        .copied()
        .filter(|ip| protocol.matches(ip))
        .find(|ip| is_global(ip) || (allow_private && is_private(ip)))
}

/// Commands tried in order; the interface name is appended as last argument.
const LINUX_TOOLS: &[(&str, &[&str])] = &[("ip", &["-o", "addr", "show", "dev"]), ("ifconfig", &[])];
const BSD_TOOLS: &[(&str, &[&str])] = &[("ifconfig", &[])];

/// List the addresses of an interface using the platform's tooling.
fn interface_addresses(interface: &str) -> Result<Vec<IpAddr>, AddressProviderError> {
    let attempts = if cfg!(target_os = "linux") {
        LINUX_TOOLS
    } else {
        BSD_TOOLS
    };

    let mut last_error = String::from("no tool available");
    for (program, args) in attempts {
        match Command::new(program).args(*args).arg(interface).output() {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                return Ok(extract_ips_from_output(&stdout));
            }
            Ok(output) => {
                last_error = format!(
                    "{} exited with {}: {}",
                    program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => {
                log::debug!("Failed to run {}: {}", program, e);
                last_error = format!("failed to run {}: {}", program, e);
            }
        }
    }

    Err(AddressProviderError::Command(interface.to_string(), last_error))
}
