/// State management for tracking published addresses between runs
///
/// This module handles persistent state storage to enable:
/// - Address change detection (only update when the address changes)
/// - Disabling a service protocol after a client configuration error
/// - Re-enabling everything once the config file has been edited
///
/// Services are identified by their position in the config file. The state
/// file is JSON:
///
/// ```json
/// {
///   "dns_services": [
///     { "ipv4": { "address": "203.0.113.1", "enabled": true } }
///   ],
///   "mtime": 1704067200.25
/// }
/// ```
use crate::ip::Protocol;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::io::Write;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// State for one protocol of one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolState {
    /// Last address successfully pushed, in textual form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// False after a client configuration error
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for ProtocolState {
    fn default() -> Self {
        Self {
            address: None,
            enabled: true,
        }
    }
}

impl ProtocolState {
    /// `true` if there is no cached address or it differs textually from `new_ip`.
    pub fn address_changed(&self, new_ip: &IpAddr) -> bool {
        self.address.as_deref() != Some(new_ip.to_string().as_str())
    }

    /// Record a successful update (also clears a previous disable).
    pub fn update_success(&mut self, ip: IpAddr) {
        self.address = Some(ip.to_string());
        self.enabled = true;
    }

    /// Record a client configuration error; the address is left untouched.
    pub fn disable(&mut self) {
        self.enabled = false;
    }
}

/// State for one configured service, keyed by protocol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<ProtocolState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<ProtocolState>,
}

impl ServiceState {
    #[cfg(test)]
    pub fn protocol(&self, protocol: Protocol) -> Option<&ProtocolState> {
        match protocol {
            Protocol::Ipv4 => self.ipv4.as_ref(),
            Protocol::Ipv6 => self.ipv6.as_ref(),
        }
    }

    /// Get the state for a protocol, creating an enabled one on first use.
    pub fn protocol_mut(&mut self, protocol: Protocol) -> &mut ProtocolState {
        match protocol {
            Protocol::Ipv4 => self.ipv4.get_or_insert_with(ProtocolState::default),
            Protocol::Ipv6 => self.ipv6.get_or_insert_with(ProtocolState::default),
        }
    }
}

/// Everything persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheData {
    #[serde(default)]
    pub dns_services: Vec<ServiceState>,

    /// Modification time of the config file seen by the last run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<f64>,
}

impl CacheData {
    #[cfg(test)]
    pub fn service(&self, index: usize) -> Option<&ServiceState> {
        self.dns_services.get(index)
    }

    /// Get the state of the service at `index`, growing the list as needed.
    pub fn service_mut(&mut self, index: usize) -> &mut ServiceState {
        if index >= self.dns_services.len() {
            self.dns_services.resize_with(index + 1, ServiceState::default);
        }
        &mut self.dns_services[index]
    }

    /// Drop state of services that are no longer configured.
    pub fn truncate(&mut self, service_count: usize) {
        self.dns_services.truncate(service_count);
    }
}

/// State manager - handles reading/writing cache file
pub struct StateManager {
    cache_file: PathBuf,
    data: CacheData,
}

impl StateManager {
    /// Creates a new `StateManager` for `cache_file`, loading any existing state.
    ///
    /// A missing file gives empty state. A file that cannot be parsed is
    /// logged and replaced by empty state on the next save.
    pub fn new(cache_file: PathBuf) -> Result<Self, Box<dyn Error>> {
        let data = if cache_file.exists() {
            Self::load(&cache_file)?
        } else {
            CacheData::default()
        };

        Ok(Self { cache_file, data })
    }

    /// Per-user default location of the state cache.
    pub fn default_cache_path() -> Result<PathBuf, Box<dyn Error>> {
        dirs::cache_dir()
            .map(|dir| dir.join("dnsupdate.cache"))
            .ok_or_else(|| "Failed to determine cache file location".into())
    }

    fn load(path: &Path) -> Result<CacheData, Box<dyn Error>> {
        let content = fs::read_to_string(path)?;

        match serde_json::from_str(&content) {
            Ok(data) => Ok(data),
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable cache file {}: {}",
                    path.display(),
                    e
                );
                Ok(CacheData::default())
            }
        }
    }

    #[cfg(test)]
    pub fn data(&self) -> &CacheData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut CacheData {
        &mut self.data
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Write the whole state to the cache file.
    ///
    /// The content goes to a temporary sibling first and is renamed over the
    /// cache file, so a crash never leaves a half-written cache behind.
    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = self.cache_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.data)?;

        let mut tmp_name = self.cache_file.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.cache_file)?;

        log::debug!("Saved state to {}", self.cache_file.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    #[test]
    fn test_protocol_state_address_changed() {
        let mut state = ProtocolState::default();
        let ip1 = IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4));
        let ip2 = IpAddr::V4(Ipv4Addr::new(1, 2, 3, 5));

        // No cached address = changed
        assert!(state.address_changed(&ip1));

        state.update_success(ip1);
        assert!(!state.address_changed(&ip1));
        assert!(state.address_changed(&ip2));
    }

    #[test]
    fn test_textual_comparison_ipv6() {
        let state = ProtocolState {
            address: Some("2001:db8::1".to_string()),
            enabled: true,
        };
        let ip: IpAddr = "2001:0db8:0:0::1".parse().unwrap();
        assert!(!state.address_changed(&ip));
    }

    #[test]
    fn test_disable_keeps_address() {
        let mut state = ProtocolState::default();
        state.update_success(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)));
        state.disable();
        assert!(!state.enabled);
        assert_eq!(state.address.as_deref(), Some("1.2.3.4"));

        state.update_success(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 5)));
        assert!(state.enabled);
    }

    #[test]
    fn test_service_mut_grows_and_truncate() {
        let mut data = CacheData::default();
        data.service_mut(2).protocol_mut(Protocol::Ipv4).disable();
        assert_eq!(data.dns_services.len(), 3);
        assert!(data.service(0).unwrap().protocol(Protocol::Ipv4).is_none());
        assert!(!data.service(2).unwrap().protocol(Protocol::Ipv4).unwrap().enabled);

        data.truncate(1);
        assert_eq!(data.dns_services.len(), 1);
        data.truncate(5);
        assert_eq!(data.dns_services.len(), 1);
    }

    #[test]
    fn test_state_manager_save_load() {
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("nested").join("dnsupdate.cache");

        // Create and populate state
        {
            let mut manager = StateManager::new(cache_path.clone()).unwrap();
            let data = manager.data_mut();
            data.mtime = Some(1704067200.25);
            data.service_mut(0)
                .protocol_mut(Protocol::Ipv4)
                .update_success(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4)));
            data.service_mut(1).protocol_mut(Protocol::Ipv6).disable();
            manager.save().unwrap();
        }

        // Load state in new manager and save again unchanged
        let manager = StateManager::new(cache_path.clone()).unwrap();
        let data = manager.data();
        assert_eq!(data.mtime, Some(1704067200.25));
        assert_eq!(
            data.service(0).unwrap().protocol(Protocol::Ipv4).unwrap().address.as_deref(),
            Some("1.2.3.4")
        );
        assert!(!data.service(1).unwrap().protocol(Protocol::Ipv6).unwrap().enabled);

        let before = fs::read_to_string(&cache_path).unwrap();
        manager.save().unwrap();
        let after = fs::read_to_string(&cache_path).unwrap();
        assert_eq!(before, after);
        assert!(!cache_path.with_extension("cache.tmp").exists());
    }

    #[test]
    fn test_parse_cache_format() {
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("dnsupdate.cache");
        let content = r#"{
  "dns_services": [
    {"ipv4": {"address": "1.2.3.4", "enabled": true}, "ipv6": {"enabled": false}},
    {}
  ],
  "mtime": 1704067200.0
}"#;
        fs::write(&cache_path, content).unwrap();

        let manager = StateManager::new(cache_path).unwrap();
        let data = manager.data();
        assert_eq!(data.dns_services.len(), 2);
        let first = data.service(0).unwrap();
        assert_eq!(first.protocol(Protocol::Ipv4).unwrap().address.as_deref(), Some("1.2.3.4"));
        assert!(!first.protocol(Protocol::Ipv6).unwrap().enabled);
        assert_eq!(data.service(1).unwrap(), &ServiceState::default());
    }

    #[test]
    fn test_missing_enabled_defaults_to_true() {
        let state: ProtocolState = serde_json::from_str(r#"{"address": "1.2.3.4"}"#).unwrap();
        assert!(state.enabled);
    }

    #[test]
    fn test_missing_cache_is_empty() {
        let manager = StateManager::new(PathBuf::from("/invalid_dir/invalid_file.cache")).unwrap();
        assert_eq!(manager.data(), &CacheData::default());
    }

    #[test]
    fn test_corrupt_cache_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("dnsupdate.cache");
        fs::write(&cache_path, "- not: json\n").unwrap();

        let manager = StateManager::new(cache_path).unwrap();
        assert!(manager.data().dns_services.is_empty());
        assert!(manager.data().mtime.is_none());
    }
}
