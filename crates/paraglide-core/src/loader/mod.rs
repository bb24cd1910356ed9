//! Bounds-driven incremental loader behind the nearby-sites map.
//!
//! Viewport changes are debounced, filtered against the last accepted
//! viewport, and deduplicated by bounds key before the local store and the
//! remote API are queried together. Fresh results replace the displayed
//! layers and the active search query is re-applied on top.
//!
//! `NearbySites` is the synchronous state machine; `SiteLoaderService`
//! drives it from an event channel on a tokio task.

pub mod debounce;
pub mod fetch;
pub mod filter;
pub mod reconcile;
pub mod service;

pub use debounce::Debouncer;
pub use fetch::{DualSourceFetcher, LocalSiteStore, RemoteSiteApi};
pub use filter::BoundsFilter;
pub use reconcile::{recenter_target, Reconciled, Reconciler};
pub use service::{LoaderEvent, SiteLoaderService};

use crate::config::Settings;
use crate::geo::{Bounds, LatLon};
use crate::sites::{LocalSite, RemoteSite, SiteSets};
use crate::LoadError;
use log::{debug, info};
use std::time::Duration;
use tokio::time::Instant;

/// Output of the loader towards the map view.
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderUpdate {
    /// "Loading nearby sites…" banner on/off
    Loading(bool),
    Layers {
        local: Vec<LocalSite>,
        remote: Vec<RemoteSite>,
    },
    Recenter(LatLon),
    /// Transient, non-fatal error notification
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderPhase {
    Idle,
    Debouncing,
    Fetching,
}

#[derive(Debug, Clone, PartialEq)]
enum FetchState {
    Idle,
    Fetching { key: String },
}

/// A fetch the caller must run and report back through `fetch_completed`.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub bounds: Bounds,
    pub key: String,
}

/// Why a debounced viewport did not produce a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    NotDue,
    Unchanged,
    AlreadyLoaded,
    InFlight,
    Disposed,
}

#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    pub debounce: Duration,
    pub threshold: f64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Settings::default().into()
    }
}

impl From<Settings> for LoaderOptions {
    fn from(settings: Settings) -> Self {
        (&settings).into()
    }
}

impl From<&Settings> for LoaderOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            debounce: settings.debounce(),
            threshold: settings.bounds_threshold,
        }
    }
}

/// Per-screen loader state.
#[derive(Debug)]
pub struct NearbySites {
    debouncer: Debouncer,
    filter: BoundsFilter,
    reconciler: Reconciler,
    fetch: FetchState,
    last_loaded_key: Option<String>,
    mounted: bool,
}

impl Default for NearbySites {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}

impl NearbySites {
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            debouncer: Debouncer::new(options.debounce),
            filter: BoundsFilter::new(options.threshold),
            reconciler: Reconciler::new(),
            fetch: FetchState::Idle,
            last_loaded_key: None,
            mounted: true,
        }
    }

    pub fn phase(&self) -> LoaderPhase {
        if matches!(self.fetch, FetchState::Fetching { .. }) {
            LoaderPhase::Fetching
        } else if self.debouncer.is_pending() {
            LoaderPhase::Debouncing
        } else {
            LoaderPhase::Idle
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self.fetch, FetchState::Fetching { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn last_loaded_key(&self) -> Option<&str> {
        self.last_loaded_key.as_deref()
    }

    pub fn sites(&self) -> &SiteSets {
        self.reconciler.sites()
    }

    pub fn bounds_changed(&mut self, bounds: Bounds, now: Instant) {
        if !self.mounted {
            return;
        }
        self.debouncer.notify(bounds, now);
    }

    /// Called when the debounce deadline may have passed.
    pub fn timer_fired(&mut self, now: Instant) -> Result<FetchRequest, Skip> {
        if !self.mounted {
            return Err(Skip::Disposed);
        }
        let bounds = self.debouncer.poll(now).ok_or(Skip::NotDue)?;

        if !self.filter.accept(bounds) {
            debug!("Bounds unchanged; skipping — bounds={}", bounds.key());
            return Err(Skip::Unchanged);
        }

        let key = bounds.key();
        if self.last_loaded_key.as_deref() == Some(key.as_str()) {
            debug!("Bounds key already loaded — key={}", key);
            return Err(Skip::AlreadyLoaded);
        }

        if let FetchState::Fetching { key: current } = &self.fetch {
            debug!(
                "Fetch in flight; dropping request — current={} dropped={}",
                current, key
            );
            return Err(Skip::InFlight);
        }

        self.fetch = FetchState::Fetching { key: key.clone() };
        Ok(FetchRequest { bounds, key })
    }

    /// Applies a finished fetch. The in-flight state is cleared on every path.
    pub fn fetch_completed(
        &mut self,
        key: &str,
        result: Result<SiteSets, LoadError>,
    ) -> Vec<LoaderUpdate> {
        self.fetch = FetchState::Idle;

        if !self.mounted {
            debug!("Discarding fetch result after dispose — key={}", key);
            return Vec::new();
        }

        let mut updates = vec![LoaderUpdate::Loading(false)];
        match result {
            Ok(sites) => {
                info!(
                    "Nearby sites loaded — key={} total={} local={} remote={}",
                    key,
                    sites.len(),
                    sites.local.len(),
                    sites.remote.len()
                );
                self.last_loaded_key = Some(key.to_string());
                self.reconciler.replace(sites);
                updates.extend(self.render());
            }
            Err(err) => {
                // Previous layers stay on screen
                updates.push(LoaderUpdate::Error(err.to_string()));
            }
        }
        updates
    }

    /// Re-filters already fetched sites; never triggers a fetch.
    pub fn search_changed(&mut self, query: &str) -> Vec<LoaderUpdate> {
        if !self.mounted {
            return Vec::new();
        }
        self.reconciler.set_query(query);
        self.render()
    }

    pub fn dispose(&mut self) {
        self.debouncer.cancel();
        self.mounted = false;
    }

    fn render(&self) -> Vec<LoaderUpdate> {
        let Reconciled {
            local,
            remote,
            recenter,
        } = self.reconciler.apply_search();

        let mut updates = vec![LoaderUpdate::Layers { local, remote }];
        if let Some(target) = recenter {
            updates.push(LoaderUpdate::Recenter(target));
        }
        updates
    }
}
