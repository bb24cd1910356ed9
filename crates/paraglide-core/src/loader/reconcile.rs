use crate::geo::LatLon;
use crate::sites::{LocalSite, MapSite, RemoteSite, SiteSets};

/// Above this many matches the map keeps its position.
pub const MAX_RECENTER_MATCHES: usize = 20;

/// Filtered layers ready for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub local: Vec<LocalSite>,
    pub remote: Vec<RemoteSite>,
    pub recenter: Option<LatLon>,
}

/// 1 match: that point. 2..20 matches: their centroid. Otherwise none.
pub fn recenter_target(points: &[LatLon]) -> Option<LatLon> {
    match points.len() {
        1 => Some(points[0]),
        n if n < MAX_RECENTER_MATCHES => LatLon::centroid(points),
        _ => None,
    }
}

/// Holds the last successfully fetched sites and the active search query.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    sites: SiteSets,
    query: String,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sites(&self) -> &SiteSets {
        &self.sites
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
    }

    /// Replaces both displayed layers with a fresh fetch.
    pub fn replace(&mut self, sites: SiteSets) {
        self.sites = sites;
    }

    /// Filters both layers by the current query. A blank query shows
    /// everything and never recenters.
    pub fn apply_search(&self) -> Reconciled {
        let query = self.query.trim();
        let local: Vec<LocalSite> = self
            .sites
            .local
            .iter()
            .filter(|s| s.matches_query(query))
            .cloned()
            .collect();
        let remote: Vec<RemoteSite> = self
            .sites
            .remote
            .iter()
            .filter(|s| s.matches_query(query))
            .cloned()
            .collect();

        let recenter = if query.is_empty() {
            None
        } else {
            let points: Vec<LatLon> = local
                .iter()
                .map(MapSite::location)
                .chain(remote.iter().map(MapSite::location))
                .collect();
            recenter_target(&points)
        };

        Reconciled {
            local,
            remote,
            recenter,
        }
    }
}
