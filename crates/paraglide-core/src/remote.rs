use crate::config::{Settings, DEFAULT_PGE_SEARCH_URL};
use crate::geo::Bounds;
use crate::loader::RemoteSiteApi;
use crate::sites::RemoteSite;
use crate::SiteError;
use log::{debug, info, warn};
use serde::Deserialize;
use std::time::Duration;

const BOUNDING_BOX_ENDPOINT: &str = "getBoundingBoxSites.php";
const WIND_SECTORS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// PGE serves most numbers as strings, some as numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Lenient {
    Num(f64),
    Str(String),
}

impl Lenient {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Lenient::Num(n) => Some(*n),
            Lenient::Str(s) => s.trim().parse().ok(),
        }
    }

    fn as_string(&self) -> Option<String> {
        match self {
            Lenient::Num(n) => Some(n.to_string()),
            Lenient::Str(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Lenient::Str(_) => None,
        }
    }
}

/// Features stay raw so one malformed entry cannot reject the page.
#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<Lenient>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<Properties>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<Option<Lenient>>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    name: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
    region: Option<String>,
    pge_site_id: Option<Lenient>,
    takeoff_altitude: Option<Lenient>,
    #[serde(flatten)]
    winds: Orientations,
}

#[derive(Debug, Default, Deserialize)]
#[allow(non_snake_case)]
struct Orientations {
    N: Option<Lenient>,
    NE: Option<Lenient>,
    E: Option<Lenient>,
    SE: Option<Lenient>,
    S: Option<Lenient>,
    SW: Option<Lenient>,
    W: Option<Lenient>,
    NW: Option<Lenient>,
}

impl Orientations {
    /// Sectors flagged as flyable (PGE uses 1 = good, 2 = excellent).
    fn flyable(&self) -> Vec<String> {
        let flags = [
            &self.N, &self.NE, &self.E, &self.SE, &self.S, &self.SW, &self.W, &self.NW,
        ];
        WIND_SECTORS
            .iter()
            .zip(flags)
            .filter(|(_, flag)| {
                flag.as_ref()
                    .and_then(Lenient::as_f64)
                    .is_some_and(|v| v > 0.0)
            })
            .map(|(sector, _)| sector.to_string())
            .collect()
    }
}

impl Feature {
    fn into_site(self) -> Option<RemoteSite> {
        let coords = self.geometry?.coordinates;
        // GeoJSON order is [lon, lat]
        let lon = coords.first()?.as_ref()?.as_f64()?;
        let lat = coords.get(1)?.as_ref()?.as_f64()?;
        let props = self.properties.unwrap_or_default();

        Some(RemoteSite {
            pge_id: props
                .pge_site_id
                .as_ref()
                .or(self.id.as_ref())
                .and_then(Lenient::as_string),
            name: props
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            latitude: lat,
            longitude: lon,
            country_code: props
                .country_code
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),
            region: props.region.filter(|r| !r.trim().is_empty()),
            takeoff_altitude: props.takeoff_altitude.as_ref().and_then(Lenient::as_f64),
            wind_directions: props.winds.flyable(),
        })
    }
}

/// Parses a ParaglidingEarth GeoJSON response. Malformed features and
/// features without usable coordinates are skipped.
pub fn parse_sites_geojson(body: &str) -> Result<Vec<RemoteSite>, SiteError> {
    let collection: FeatureCollection = serde_json::from_str(body)?;
    let features = collection.features.unwrap_or_default();
    let total = features.len();
    let sites: Vec<RemoteSite> = features
        .into_iter()
        .filter_map(|raw| serde_json::from_value::<Feature>(raw).ok())
        .filter_map(Feature::into_site)
        .collect();
    if sites.len() < total {
        warn!(
            "Skipped unusable PGE features — skipped={} kept={}",
            total - sites.len(),
            sites.len()
        );
    }
    Ok(sites)
}

/// One row of the name search endpoint. Unlike the GeoJSON API the
/// coordinates sit next to the name.
#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    id: Option<Lenient>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    lat: Option<Lenient>,
    #[serde(default)]
    lng: Option<Lenient>,
    #[serde(default, rename = "countryCode")]
    country_code: Option<String>,
}

impl SearchHit {
    fn into_site(self) -> Option<RemoteSite> {
        let latitude = self.lat.as_ref()?.as_f64()?;
        let longitude = self.lng.as_ref()?.as_f64()?;
        Some(RemoteSite {
            pge_id: self.id.as_ref().and_then(Lenient::as_string),
            name: self
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            latitude,
            longitude,
            country_code: self
                .country_code
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),
            region: None,
            takeoff_altitude: None,
            wind_directions: Vec::new(),
        })
    }
}

/// Parses the name search response, best match first.
pub fn parse_search_results(body: &str) -> Result<Vec<RemoteSite>, SiteError> {
    let collection: FeatureCollection = serde_json::from_str(body)?;
    Ok(collection
        .features
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| serde_json::from_value::<SearchHit>(raw).ok())
        .filter_map(SearchHit::into_site)
        .collect())
}

/// ParaglidingEarth API client.
#[derive(Debug, Clone)]
pub struct PgeClient {
    client: reqwest::Client,
    base_url: String,
    search_url: String,
}

impl PgeClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, SiteError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            search_url: DEFAULT_PGE_SEARCH_URL.to_string(),
        })
    }

    pub fn with_search_url(mut self, search_url: &str) -> Self {
        self.search_url = search_url.to_string();
        self
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SiteError> {
        Ok(Self::new(
            &settings.remote_base_url,
            &settings.user_agent,
            settings.remote_timeout(),
        )?
        .with_search_url(&settings.pge_search_url))
    }

    pub fn bounding_box_url(&self) -> String {
        format!("{}/{}", self.base_url, BOUNDING_BOX_ENDPOINT)
    }

    fn query_params(bounds: &Bounds, limit: u32, detailed: bool) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("north", bounds.north.to_string()),
            ("south", bounds.south.to_string()),
            ("east", bounds.east.to_string()),
            ("west", bounds.west.to_string()),
            ("limit", limit.to_string()),
        ];
        if detailed {
            params.push(("style", "detailled".to_string()));
        }
        params
    }
}

impl PgeClient {
    /// Looks a site up by name. PGE answers 403 when it rate limits; that
    /// comes back as `SiteError::Forbidden` so callers can ask for
    /// coordinates instead.
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<RemoteSite>, SiteError> {
        debug!("Searching PGE by name — url={} name={}", self.search_url, name);

        let response = self
            .client
            .get(&self.search_url)
            .query(&[("name", name.trim())])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            warn!("PGE refused name search — name={}", name);
            return Err(SiteError::Forbidden("PGE".to_string()));
        }
        if !status.is_success() {
            return Err(SiteError::Api(format!("PGE returned HTTP {}", status)));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let sites = parse_search_results(&body)?;
        info!("PGE name search — name={} matches={}", name, sites.len());
        Ok(sites)
    }
}

impl RemoteSiteApi for PgeClient {
    async fn query_in_bounds(
        &self,
        bounds: &Bounds,
        limit: u32,
        detailed: bool,
    ) -> Result<Vec<RemoteSite>, SiteError> {
        let url = self.bounding_box_url();
        debug!(
            "Querying PGE — url={} bounds={} limit={} detailed={}",
            url,
            bounds.key(),
            limit,
            detailed
        );

        let response = self
            .client
            .get(&url)
            .query(&Self::query_params(bounds, limit, detailed))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SiteError::Api(format!("PGE returned HTTP {}", status)));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let sites = parse_sites_geojson(&body)?;
        info!("PGE sites loaded — count={} bounds={}", sites.len(), bounds.key());
        Ok(sites)
    }
}
