/// One reconciliation pass over every configured service.
///
/// For each service and protocol the updater picks the effective address
/// provider (service-specific first, then the global default), resolves the
/// current address at most once per provider and protocol, compares it with
/// the cached state and pushes it to the DNS service when it changed.
use crate::clients::{update_record, DnsClient};
use crate::config::{Config, ProviderChoice};
use crate::error::{ErrorKind, ExitStatus};
use crate::http::HttpClient;
use crate::ip::Protocol;
use crate::providers::{resolve, AddressProvider, ProviderSpec};
use crate::state::{CacheData, ProtocolState};
use std::collections::HashMap;
use std::net::IpAddr;

/// Handle of an interned address provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(usize);

/// Provider handle per protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderSet {
    pub ipv4: Option<ProviderId>,
    pub ipv6: Option<ProviderId>,
}

impl ProviderSet {
    pub fn get(&self, protocol: Protocol) -> Option<ProviderId> {
        match protocol {
            Protocol::Ipv4 => self.ipv4,
            Protocol::Ipv6 => self.ipv6,
        }
    }
}

pub struct ServiceEntry {
    pub client: Box<dyn DnsClient>,
    /// Service-specific providers only
    pub providers: ProviderSet,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Push addresses even when they match the cache; also re-enables
    pub force_update: bool,
    /// Fingerprint of the config file used for this run
    pub config_mtime: Option<f64>,
}

/// Provider failures are kept as text so they can be replayed from the memo.
type Resolution = Result<Option<IpAddr>, String>;

#[derive(Default)]
pub struct Updater {
    providers: Vec<Box<dyn AddressProvider>>,
    defaults: ProviderSet,
    services: Vec<ServiceEntry>,
}

impl Updater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build clients and providers from a parsed configuration.
    ///
    /// Providers whose descriptions are equal are created once and shared by
    /// every service (and protocol) that uses them.
    pub fn from_config(config: &Config, http: &HttpClient) -> Self {
        let mut updater = Self::new();
        let mut interned = HashMap::new();

        let defaults = updater.intern(&mut interned, &config.address_provider, http);
        updater.set_defaults(defaults);

        for service in &config.dns_services {
            let providers = updater.intern(&mut interned, &service.address_provider, http);
            updater.add_service(service.spec.build(http), providers);
        }

        log::debug!(
            "Configured {} services with {} distinct address providers",
            updater.services.len(),
            updater.providers.len()
        );
        updater
    }

    fn intern(
        &mut self,
        interned: &mut HashMap<ProviderSpec, ProviderId>,
        choice: &ProviderChoice,
        http: &HttpClient,
    ) -> ProviderSet {
        let mut lookup = |spec: &ProviderSpec| {
            *interned
                .entry(spec.clone())
                .or_insert_with(|| self.add_provider(spec.build(http)))
        };

        ProviderSet {
            ipv4: choice.ipv4.as_ref().map(&mut lookup),
            ipv6: choice.ipv6.as_ref().map(&mut lookup),
        }
    }

    pub fn add_provider(&mut self, provider: Box<dyn AddressProvider>) -> ProviderId {
        self.providers.push(provider);
        ProviderId(self.providers.len() - 1)
    }

    pub fn set_defaults(&mut self, defaults: ProviderSet) {
        self.defaults = defaults;
    }

    pub fn add_service(&mut self, client: Box<dyn DnsClient>, providers: ProviderSet) {
        self.services.push(ServiceEntry { client, providers });
    }

    /// Run one pass and return the most severe status encountered.
    ///
    /// `cache` is updated in place; persisting it is up to the caller.
    pub fn run(&self, cache: &mut CacheData, options: RunOptions) -> ExitStatus {
        let mut status = ExitStatus::Success;
        let mut resolved: HashMap<(ProviderId, Protocol), Resolution> = HashMap::new();

        let force_enable = options.force_update || cache.mtime != options.config_mtime;
        if force_enable && cache.mtime.is_some() && !options.force_update {
            log::debug!("Configuration changed since the last run, re-enabling all services");
        }

        for (index, service) in self.services.iter().enumerate() {
            for protocol in Protocol::ALL {
                let provider = match self.effective_provider(service, protocol) {
                    Some(provider) => provider,
                    None => continue,
                };

                log::info!(
                    "Updating {} address of service {} ({})...",
                    protocol,
                    index,
                    service.client.describe()
                );

                let state = cache.service_mut(index).protocol_mut(protocol);
                if force_enable {
                    state.enabled = true;
                }

                let outcome = self.update_protocol(
                    service.client.as_ref(),
                    protocol,
                    provider,
                    state,
                    &mut resolved,
                    options.force_update,
                );
                status.escalate(outcome);
            }
        }

        cache.truncate(self.services.len());
        cache.mtime = options.config_mtime;
        status
    }

    /// Service-specific providers are always used. The global default only
    /// covers protocols the client can update.
    fn effective_provider(&self, service: &ServiceEntry, protocol: Protocol) -> Option<ProviderId> {
        if let Some(provider) = service.providers.get(protocol) {
            return Some(provider);
        }

        let provider = self.defaults.get(protocol)?;
        if service.client.supports(protocol) {
            Some(provider)
        } else {
            log::debug!(
                "{} does not handle {}, skipping",
                service.client.describe(),
                protocol
            );
            None
        }
    }

    fn lookup(
        &self,
        provider: ProviderId,
        protocol: Protocol,
        resolved: &mut HashMap<(ProviderId, Protocol), Resolution>,
    ) -> Resolution {
        resolved
            .entry((provider, protocol))
            .or_insert_with(|| {
                let source = self.providers[provider.0].as_ref();
                resolve(source, protocol)
                    .map_err(|e| format!("{} failed: {}", source.provider_name(), e))
            })
            .clone()
    }

    fn update_protocol(
        &self,
        client: &dyn DnsClient,
        protocol: Protocol,
        provider: ProviderId,
        state: &mut ProtocolState,
        resolved: &mut HashMap<(ProviderId, Protocol), Resolution>,
        force_update: bool,
    ) -> ExitStatus {
        if !state.enabled {
            log::error!(
                "Service has been disabled due to a previous client error. \
                 Please fix your configuration and try again."
            );
            return ExitStatus::ClientError;
        }

        let address = match self.lookup(provider, protocol, resolved) {
            Ok(Some(address)) => address,
            Ok(None) => {
                log::info!("No {} address available, skipping", protocol);
                return ExitStatus::Success;
            }
            Err(e) => {
                log::error!("Could not determine {} address: {}", protocol, e);
                return ExitStatus::OtherError;
            }
        };

        if !force_update && !state.address_changed(&address) {
            log::info!("Address {} has not changed, no update needed.", address);
            return ExitStatus::Success;
        }

        match update_record(client, address) {
            Ok(true) => {
                log::info!("Update to {} successful.", address);
                state.update_success(address);
                ExitStatus::Success
            }
            Ok(false) => {
                log::info!("Service already had {}, nothing changed.", address);
                state.update_success(address);
                ExitStatus::Success
            }
            Err(e) => {
                let kind = e.kind();
                match kind {
                    ErrorKind::Client => {
                        log::error!("Client error: {}", e);
                        log::error!(
                            "Update failed due to a configuration error. Service will be \
                             disabled until the configuration has been fixed."
                        );
                        state.disable();
                    }
                    ErrorKind::Service => {
                        log::error!("Service error: {}", e);
                        log::error!("The update will be retried on the next run.");
                    }
                    ErrorKind::Other => {
                        log::error!("Update failed: {}", e);
                    }
                }
                ExitStatus::from(kind)
            }
        }
    }
}
