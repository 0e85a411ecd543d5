//! Network scan for the station
//!
//! The station advertises itself over mDNS. [`MdnsDiscovery`] browses one
//! service type for a fixed window and returns the first IPv4 address whose
//! instance or host name contains the configured filter.

use crate::error::{ClimaVisError, Result};
use crossbeam_channel::Sender;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Finds the station address on the local network
pub trait ServiceDiscovery: Send + Sync {
    /// Scan for at most `window`; `None` when nothing matched in time
    fn discover(&self, window: Duration) -> Option<String>;
}

/// [`ServiceDiscovery`] backed by an mDNS browse
#[derive(Debug, Clone)]
pub struct MdnsDiscovery {
    service_type: String,
    name_filter: String,
}

impl MdnsDiscovery {
    pub fn new(service_type: impl Into<String>, name_filter: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            name_filter: name_filter.into(),
        }
    }

    fn matching_address(&self, info: &ServiceInfo) -> Option<String> {
        let matches = name_matches(info.get_fullname(), &self.name_filter)
            || name_matches(info.get_hostname(), &self.name_filter);
        if !matches {
            return None;
        }

        let mut addresses: Vec<Ipv4Addr> = info.get_addresses_v4().into_iter().copied().collect();
        addresses.sort();
        addresses
            .first()
            .map(|ip| format_address(*ip, info.get_port()))
    }
}

impl MdnsDiscovery {
    fn browse(&self, window: Duration) -> Result<Option<String>> {
        let daemon = ServiceDaemon::new()?;
        let receiver = match daemon.browse(&self.service_type) {
            Ok(r) => r,
            Err(e) => {
                let _ = daemon.shutdown();
                return Err(ClimaVisError::from(e)
                    .with_context(format!("Browsing {}", self.service_type)));
            }
        };

        tracing::info!(
            service_type = %self.service_type,
            filter = %self.name_filter,
            "Scanning network for {:?}",
            window
        );

        let deadline = Instant::now() + window;
        let mut found = None;

        while found.is_none() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match receiver.recv_timeout(remaining) {
                Ok(ServiceEvent::ServiceResolved(info)) => {
                    tracing::debug!(name = info.get_fullname(), "Service resolved");
                    found = self.matching_address(&info);
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }

        let _ = daemon.stop_browse(&self.service_type);
        let _ = daemon.shutdown();
        Ok(found)
    }
}

impl ServiceDiscovery for MdnsDiscovery {
    fn discover(&self, window: Duration) -> Option<String> {
        match self.browse(window) {
            Ok(Some(address)) => {
                tracing::info!(address = %address, "Station found by scan");
                Some(address)
            }
            Ok(None) => {
                tracing::info!("Scan finished without a match");
                None
            }
            Err(e) => {
                tracing::warn!("Network scan failed: {}", e);
                None
            }
        }
    }
}

/// Case-insensitive substring match of a service name against the filter
pub fn name_matches(name: &str, filter: &str) -> bool {
    name.to_lowercase().contains(&filter.to_lowercase())
}

/// Render a discovered address, keeping the port only when it is not 80
pub fn format_address(ip: Ipv4Addr, port: u16) -> String {
    if port == 80 || port == 0 {
        ip.to_string()
    } else {
        format!("{}:{}", ip, port)
    }
}

/// Run one scan on a background thread and deliver its result over `results`
pub fn spawn_scan(
    discovery: Arc<dyn ServiceDiscovery>,
    window: Duration,
    results: Sender<Option<String>>,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("station-discovery".to_string())
        .spawn(move || {
            let found = discovery.discover(window);
            let _ = results.send(found);
        })
        .map(|_| ())
}
