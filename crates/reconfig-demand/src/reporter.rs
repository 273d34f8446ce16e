//! DemandReporter — periodic trim-and-ship loop.
//!
//! Active replicas have no durable home for demand statistics, so they
//! keep the table bounded by shipping evicted profiles to the
//! reconfigurators. The transport is the caller's: the reporter hands each
//! batch of exported statistics to a callback and logs failures.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::profile::DemandStats;
use crate::store::DemandProfileStore;

type BoxFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
>;

/// Callback type for shipping evicted profiles upstream.
pub type ShipCallback = Box<dyn Fn(Vec<DemandStats>) -> BoxFuture + Send + Sync>;

/// Trims a [`DemandProfileStore`] on an interval and ships what it evicts.
pub struct DemandReporter {
    store: Arc<DemandProfileStore>,
    ship_fn: Option<ShipCallback>,
}

impl DemandReporter {
    pub fn new(store: Arc<DemandProfileStore>) -> Self {
        Self {
            store,
            ship_fn: None,
        }
    }

    /// Set the callback used to ship evicted profiles.
    pub fn with_ship_fn(mut self, f: ShipCallback) -> Self {
        self.ship_fn = Some(f);
        self
    }

    /// Trim once and ship the evicted profiles.
    ///
    /// Returns how many profiles were evicted. A failed shipment is logged
    /// and the profiles are dropped; retrying is the transport's business.
    pub async fn report_once(&self) -> usize {
        let plucked: Vec<DemandStats> = self.store.trim().iter().map(|p| p.stats()).collect();
        let evicted = plucked.len();
        if evicted == 0 {
            return 0;
        }

        match &self.ship_fn {
            Some(ship) => {
                if let Err(e) = ship(plucked).await {
                    warn!(evicted, error = %e, "failed to ship demand profiles");
                } else {
                    debug!(evicted, "shipped demand profiles");
                }
            }
            None => warn!(evicted, "no ship callback; evicted demand profiles dropped"),
        }
        evicted
    }

    /// Run the reporter loop until `shutdown` changes.
    pub async fn run(&self, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        info!(interval_ms = interval.as_millis() as u64, "demand reporter started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    self.report_once().await;
                }
                _ = shutdown.changed() => {
                    info!("demand reporter shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProfileRegistry;
    use reconfig_core::{RequestTypeId, ServiceRequest, StaticClusterInfo};
    use std::sync::Mutex;

    struct Req(String);

    impl ServiceRequest for Req {
        fn service_name(&self) -> Option<&str> {
            Some(&self.0)
        }

        fn request_type(&self) -> RequestTypeId {
            1
        }
    }

    fn filled_store(names: usize, max_size: usize, pluck_size: usize) -> Arc<DemandProfileStore> {
        let store = DemandProfileStore::new(
            Arc::new(ProfileRegistry::default()),
            Arc::new(StaticClusterInfo::new()),
        )
        .with_limits(max_size, pluck_size);
        for i in 0..names {
            store.record_and_should_report(&Req(format!("svc-{i}")), "10.0.0.1".parse().unwrap());
        }
        Arc::new(store)
    }

    fn collecting_callback(sink: Arc<Mutex<Vec<DemandStats>>>) -> ShipCallback {
        Box::new(move |batch: Vec<DemandStats>| {
            let sink = Arc::clone(&sink);
            Box::pin(async move {
                sink.lock().unwrap().extend(batch);
                Ok::<(), anyhow::Error>(())
            }) as BoxFuture
        })
    }

    #[tokio::test]
    async fn report_once_ships_evicted_profiles() {
        let store = filled_store(8, 8, 3);
        let shipped = Arc::new(Mutex::new(Vec::new()));
        let reporter =
            DemandReporter::new(Arc::clone(&store)).with_ship_fn(collecting_callback(Arc::clone(&shipped)));

        assert_eq!(reporter.report_once().await, 3);
        assert_eq!(shipped.lock().unwrap().len(), 3);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn report_once_below_limit_ships_nothing() {
        let store = filled_store(4, 8, 3);
        let shipped = Arc::new(Mutex::new(Vec::new()));
        let reporter =
            DemandReporter::new(store).with_ship_fn(collecting_callback(Arc::clone(&shipped)));

        assert_eq!(reporter.report_once().await, 0);
        assert!(shipped.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_shipment_still_evicts() {
        let store = filled_store(8, 8, 2);
        let reporter = DemandReporter::new(Arc::clone(&store)).with_ship_fn(Box::new(|_: Vec<DemandStats>| {
            Box::pin(async { Err::<(), _>(anyhow::anyhow!("reconfigurator unreachable")) }) as BoxFuture
        }));

        assert_eq!(reporter.report_once().await, 2);
        assert_eq!(store.len(), 6);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let store = filled_store(1, 8, 2);
        let reporter = DemandReporter::new(store);
        let (tx, rx) = tokio::sync::watch::channel(false);

        let handle = tokio::spawn(async move {
            reporter.run(Duration::from_millis(10), rx).await;
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
