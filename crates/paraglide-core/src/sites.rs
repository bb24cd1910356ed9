use crate::geo::LatLon;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Launch site stored on the device, usually created from logged flights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSite {
    pub id: u64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>, // meters AMSL
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub flight_count: u32,
    #[serde(default)]
    pub last_flight: Option<NaiveDate>,
}

/// Summary record returned by ParaglidingEarth for map display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSite {
    pub pge_id: Option<String>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub takeoff_altitude: Option<f64>,
    #[serde(default)]
    pub wind_directions: Vec<String>,
}

/// Common view over both site kinds for search and recentering.
pub trait MapSite {
    fn name(&self) -> &str;
    fn location(&self) -> LatLon;
    fn country(&self) -> Option<&str>;

    fn region(&self) -> Option<&str> {
        None
    }

    /// Case-insensitive substring match on name, country and region.
    /// An empty or blank query matches everything.
    fn matches_query(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&q));
        hit(Some(self.name())) || hit(self.country()) || hit(self.region())
    }
}

impl MapSite for LocalSite {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }

    fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }
}

impl MapSite for RemoteSite {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }

    fn country(&self) -> Option<&str> {
        self.country_code.as_deref()
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

/// The two layers fetched for one viewport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteSets {
    pub local: Vec<LocalSite>,
    pub remote: Vec<RemoteSite>,
}

impl SiteSets {
    pub fn len(&self) -> usize {
        self.local.len() + self.remote.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.remote.is_empty()
    }
}
