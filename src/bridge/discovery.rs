// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local network discovery of the bridge.
//!
//! Bridges advertise the `_hue._tcp` service over mDNS. A service record can
//! first arrive without any address and receive one in a later update, so
//! discovery keeps listening until a record carries an IPv4 address or the
//! timeout fires, whichever happens first.
//!
//! # Examples
//!
//! ```no_run
//! # #[cfg(feature = "mdns")]
//! # async fn example() -> lampy::Result<()> {
//! use lampy::bridge::discovery::{resolve, DiscoveryOptions, MdnsBrowser};
//!
//! let browser = MdnsBrowser::new()?;
//! let endpoint = resolve(&browser, &DiscoveryOptions::new()).await?;
//! println!("bridge at {}", endpoint.address());
//! # Ok(())
//! # }
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::{Error, Result};

use super::BridgeEndpoint;

/// Default discovery timeout.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Service type advertised by Hue bridges.
pub const BRIDGE_SERVICE: &str = "_hue._tcp.local.";

/// One update for a discovered service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Full service instance name.
    pub instance_name: String,
    /// Advertised host name.
    pub host_name: String,
    /// Addresses known for the instance so far. May be empty.
    pub addresses: Vec<IpAddr>,
}

impl ServiceRecord {
    /// Returns the first IPv4 address of the record, if any.
    #[must_use]
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        self.addresses.iter().find_map(|addr| match addr {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
    }
}

/// A source of service records for a service type.
///
/// Implemented with mDNS by [`MdnsBrowser`]; tests feed records through a
/// channel directly.
pub trait ServiceBrowser {
    /// Starts browsing and returns the stream of records.
    ///
    /// # Errors
    ///
    /// Returns error if browsing cannot be started.
    fn browse(&self, service_type: &str) -> Result<mpsc::UnboundedReceiver<ServiceRecord>>;

    /// Stops browsing started by [`browse`](Self::browse).
    fn stop_browse(&self, service_type: &str);
}

/// Options for bridge discovery.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    timeout: Option<Duration>,
    service_type: Option<String>,
}

impl DiscoveryOptions {
    /// Creates options with a 5 second timeout for `_hue._tcp`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long to listen before giving up.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Browses a different service type.
    #[must_use]
    pub fn with_service_type(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = Some(service_type.into());
        self
    }

    /// Returns the discovery timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_DISCOVERY_TIMEOUT)
    }

    /// Returns the browsed service type.
    #[must_use]
    pub fn service_type(&self) -> &str {
        self.service_type.as_deref().unwrap_or(BRIDGE_SERVICE)
    }
}

/// Resolves the bridge address by listening for service records.
///
/// The first record carrying an IPv4 address wins; only one bridge is
/// expected on the network. The listener runs as its own task racing the
/// timeout and is aborted when the timeout wins. Browsing is stopped before
/// returning in every case.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if no addressed record arrived in time, or
/// the browser's error if browsing could not be started.
pub async fn resolve<B>(browser: &B, options: &DiscoveryOptions) -> Result<BridgeEndpoint>
where
    B: ServiceBrowser + ?Sized,
{
    let service_type = options.service_type();
    let mut records = browser.browse(service_type)?;

    tracing::info!(
        phase = "discovery",
        service = service_type,
        timeout_secs = options.timeout().as_secs(),
        "Searching for bridge"
    );

    let listener = tokio::spawn(async move {
        while let Some(record) = records.recv().await {
            match record.ipv4() {
                Some(address) => {
                    return Some(BridgeEndpoint::new(
                        IpAddr::V4(address),
                        Some(record.instance_name),
                        Some(record.host_name),
                    ));
                }
                None => {
                    tracing::debug!(
                        instance = %record.instance_name,
                        "Service record has no IPv4 address yet, waiting for update"
                    );
                }
            }
        }
        None
    });
    let abort = listener.abort_handle();

    let outcome = tokio::time::timeout(options.timeout(), listener).await;
    abort.abort();
    browser.stop_browse(service_type);

    match outcome {
        Ok(Ok(Some(endpoint))) => {
            tracing::info!(phase = "discovery", address = %endpoint.address(), "Found bridge");
            Ok(endpoint)
        }
        Ok(Ok(None)) => {
            tracing::warn!(phase = "discovery", "Discovery stream ended before a bridge was found");
            Err(Error::NotFound)
        }
        Ok(Err(e)) => {
            tracing::warn!(phase = "discovery", error = %e, "Discovery listener failed");
            Err(Error::NotFound)
        }
        Err(_) => {
            tracing::info!(phase = "discovery", "Bridge search timed out, no bridge");
            Err(Error::NotFound)
        }
    }
}

#[cfg(feature = "mdns")]
pub use mdns::MdnsBrowser;

#[cfg(feature = "mdns")]
mod mdns {
    use std::net::IpAddr;

    use mdns_sd::{ServiceDaemon, ServiceEvent};
    use tokio::sync::mpsc;

    use crate::error::{ProtocolError, Result};

    use super::{ServiceBrowser, ServiceRecord};

    /// Service browser backed by an mDNS daemon.
    pub struct MdnsBrowser {
        daemon: ServiceDaemon,
    }

    impl MdnsBrowser {
        /// Starts the mDNS daemon.
        ///
        /// # Errors
        ///
        /// Returns error if the daemon cannot bind its sockets.
        pub fn new() -> Result<Self> {
            let daemon = ServiceDaemon::new().map_err(ProtocolError::Mdns)?;
            Ok(Self { daemon })
        }
    }

    impl ServiceBrowser for MdnsBrowser {
        fn browse(&self, service_type: &str) -> Result<mpsc::UnboundedReceiver<ServiceRecord>> {
            let events = self
                .daemon
                .browse(service_type)
                .map_err(ProtocolError::Mdns)?;
            let (tx, rx) = mpsc::unbounded_channel();

            // The daemon hands out a blocking receiver; pump it on the
            // blocking pool until browsing stops or nobody listens anymore.
            tokio::task::spawn_blocking(move || {
                while let Ok(event) = events.recv() {
                    match event {
                        ServiceEvent::ServiceResolved(info) => {
                            // Scoped IPv6 addresses carry a zone suffix and
                            // do not parse; they are skipped.
                            let addresses = info
                                .get_addresses()
                                .iter()
                                .filter_map(|addr| addr.to_string().parse::<IpAddr>().ok())
                                .collect();
                            let record = ServiceRecord {
                                instance_name: info.get_fullname().to_string(),
                                host_name: info.get_hostname().to_string(),
                                addresses,
                            };
                            if tx.send(record).is_err() {
                                break;
                            }
                        }
                        ServiceEvent::SearchStopped(_) => break,
                        _ => {}
                    }
                }
            });

            Ok(rx)
        }

        fn stop_browse(&self, service_type: &str) {
            if let Err(e) = self.daemon.stop_browse(service_type) {
                tracing::warn!(error = %e, "Failed to stop mDNS browse");
            }
        }
    }

    impl Drop for MdnsBrowser {
        fn drop(&mut self) {
            if let Err(e) = self.daemon.shutdown() {
                tracing::debug!(error = %e, "mDNS daemon already shut down");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Browser that hands out a pre-made channel and records stop calls.
    struct ChannelBrowser {
        rx: Mutex<Option<mpsc::UnboundedReceiver<ServiceRecord>>>,
        stopped: Mutex<Vec<String>>,
    }

    impl ChannelBrowser {
        fn new() -> (Self, mpsc::UnboundedSender<ServiceRecord>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let browser = Self {
                rx: Mutex::new(Some(rx)),
                stopped: Mutex::new(Vec::new()),
            };
            (browser, tx)
        }
    }

    impl ServiceBrowser for ChannelBrowser {
        fn browse(&self, _service_type: &str) -> Result<mpsc::UnboundedReceiver<ServiceRecord>> {
            Ok(self.rx.lock().take().expect("browse called twice"))
        }

        fn stop_browse(&self, service_type: &str) {
            self.stopped.lock().push(service_type.to_string());
        }
    }

    fn record(addresses: Vec<IpAddr>) -> ServiceRecord {
        ServiceRecord {
            instance_name: "Hue Bridge - 1A2B3C._hue._tcp.local.".to_string(),
            host_name: "ecb5fa1a2b3c.local.".to_string(),
            addresses,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_record_with_address() {
        let (browser, tx) = ChannelBrowser::new();
        let addr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));

        tokio::spawn(async move {
            tx.send(record(Vec::new())).unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send(record(vec![addr])).unwrap();
            // Keep the sender alive past the timeout.
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let endpoint = resolve(&browser, &DiscoveryOptions::new()).await.unwrap();
        assert_eq!(endpoint.address(), addr);
        assert_eq!(endpoint.host_name(), Some("ecb5fa1a2b3c.local."));
        assert_eq!(browser.stopped.lock().as_slice(), [BRIDGE_SERVICE]);
    }

    #[tokio::test(start_paused = true)]
    async fn ipv6_only_record_is_not_enough() {
        let (browser, tx) = ChannelBrowser::new();
        tx.send(record(vec!["fe80::1".parse().unwrap()])).unwrap();

        let start = tokio::time::Instant::now();
        let err = resolve(&browser, &DiscoveryOptions::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
        assert_eq!(start.elapsed(), DEFAULT_DISCOVERY_TIMEOUT);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_records() {
        let (browser, tx) = ChannelBrowser::new();
        let options = DiscoveryOptions::new().with_timeout(Duration::from_secs(2));

        let start = tokio::time::Instant::now();
        let err = resolve(&browser, &options).await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(browser.stopped.lock().len(), 1);
        // The aborted listener drops its receiver once the runtime reaps it.
        for _ in 0..10 {
            if tx.is_closed() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(tx.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_stream_fails_fast() {
        let (browser, tx) = ChannelBrowser::new();
        drop(tx);

        let start = tokio::time::Instant::now();
        let err = resolve(&browser, &DiscoveryOptions::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn first_addressed_record_wins() {
        let (browser, tx) = ChannelBrowser::new();
        let first = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let second = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        tx.send(record(vec!["fe80::1".parse().unwrap(), first])).unwrap();
        tx.send(record(vec![second])).unwrap();

        let endpoint = resolve(&browser, &DiscoveryOptions::new()).await.unwrap();
        assert_eq!(endpoint.address(), first);
    }

    #[test]
    fn options_defaults() {
        let options = DiscoveryOptions::new();
        assert_eq!(options.timeout(), Duration::from_secs(5));
        assert_eq!(options.service_type(), "_hue._tcp.local.");

        let options = options.with_service_type("_test._tcp.local.");
        assert_eq!(options.service_type(), "_test._tcp.local.");
    }
}
