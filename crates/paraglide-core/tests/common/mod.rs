#![allow(dead_code)]

use paraglide_core::geo::Bounds;
use paraglide_core::loader::{LocalSiteStore, RemoteSiteApi};
use paraglide_core::sites::{LocalSite, RemoteSite};
use paraglide_core::SiteError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Routes library logs to the test harness output.
pub fn init_logging() {
    let _ = simplelog::TestLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
    );
}

/// Call bookkeeping shared between a mock and the test holding a clone.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    pub calls: Arc<AtomicUsize>,
    pub completed: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
    pub seen: Arc<Mutex<Vec<Bounds>>>,
}

impl Probe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn seen(&self) -> Vec<Bounds> {
        self.seen.lock().unwrap().clone()
    }

    fn enter(&self, bounds: &Bounds) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(*bounds);
    }
}

#[derive(Debug, Clone)]
pub struct MockLocal {
    pub sites: Vec<LocalSite>,
    pub delay: Duration,
    pub probe: Probe,
}

impl MockLocal {
    pub fn new(sites: Vec<LocalSite>) -> Self {
        Self {
            sites,
            delay: Duration::from_millis(20),
            probe: Probe::default(),
        }
    }
}

impl LocalSiteStore for MockLocal {
    async fn query_in_bounds(&self, bounds: &Bounds) -> Result<Vec<LocalSite>, SiteError> {
        self.probe.enter(bounds);
        tokio::time::sleep(self.delay).await;
        self.probe.completed.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail.load(Ordering::SeqCst) {
            return Err(SiteError::Api("local store unavailable".to_string()));
        }
        Ok(self.sites.clone())
    }
}

#[derive(Debug, Clone)]
pub struct MockRemote {
    pub sites: Vec<RemoteSite>,
    pub delay: Duration,
    pub probe: Probe,
    pub requests: Arc<Mutex<Vec<(u32, bool)>>>,
}

impl MockRemote {
    pub fn new(sites: Vec<RemoteSite>) -> Self {
        Self {
            sites,
            delay: Duration::from_millis(100),
            probe: Probe::default(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl RemoteSiteApi for MockRemote {
    async fn query_in_bounds(
        &self,
        bounds: &Bounds,
        limit: u32,
        detailed: bool,
    ) -> Result<Vec<RemoteSite>, SiteError> {
        self.probe.enter(bounds);
        self.requests.lock().unwrap().push((limit, detailed));
        tokio::time::sleep(self.delay).await;
        self.probe.completed.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail.load(Ordering::SeqCst) {
            return Err(SiteError::Api("PGE returned HTTP 503".to_string()));
        }
        Ok(self.sites.iter().take(limit as usize).cloned().collect())
    }
}

pub fn local_sites(n: usize, lat: f64, lon: f64) -> Vec<LocalSite> {
    (0..n)
        .map(|i| LocalSite {
            id: i as u64 + 1,
            name: format!("Local {}", i + 1),
            latitude: lat + i as f64 * 0.01,
            longitude: lon + i as f64 * 0.01,
            altitude: None,
            country: Some("FR".to_string()),
            flight_count: 0,
            last_flight: None,
        })
        .collect()
}

pub fn remote_sites(n: usize, lat: f64, lon: f64) -> Vec<RemoteSite> {
    (0..n)
        .map(|i| RemoteSite {
            pge_id: Some(format!("{}", 1000 + i)),
            name: format!("Remote {}", i + 1),
            latitude: lat + i as f64 * 0.01,
            longitude: lon + i as f64 * 0.01,
            country_code: Some("CH".to_string()),
            region: None,
            takeoff_altitude: Some(1200.0),
            wind_directions: vec!["W".to_string()],
        })
        .collect()
}
