//! Weather observation stations near a site, from the National Weather
//! Service API. Only points inside an NWS coverage region are queried.

use crate::config::Settings;
use crate::coverage;
use crate::geo::{within_radius, LatLon};
use crate::SiteError;
use log::{debug, info};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub location: LatLon,
}

#[derive(Debug, Deserialize)]
struct PointResponse {
    #[serde(default)]
    properties: Option<PointProperties>,
}

#[derive(Debug, Deserialize)]
struct PointProperties {
    #[serde(default, rename = "observationStations")]
    observation_stations: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StationCollection {
    #[serde(default)]
    features: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct StationFeature {
    geometry: StationGeometry,
    #[serde(default)]
    properties: Option<StationProperties>,
}

#[derive(Debug, Deserialize)]
struct StationGeometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct StationProperties {
    #[serde(default, rename = "stationIdentifier")]
    station_identifier: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl StationFeature {
    fn into_station(self) -> Option<Station> {
        // GeoJSON order is [lon, lat]
        let lon = *self.geometry.coordinates.first()?;
        let lat = *self.geometry.coordinates.get(1)?;
        let props = self.properties.unwrap_or_default();
        Some(Station {
            id: props.station_identifier.unwrap_or_default(),
            name: props
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            location: LatLon::new(lat, lon),
        })
    }
}

/// Extracts the observation stations URL from a `/points` response.
pub fn parse_stations_url(body: &str) -> Result<Option<String>, SiteError> {
    let point: PointResponse = serde_json::from_str(body)?;
    Ok(point
        .properties
        .and_then(|p| p.observation_stations)
        .filter(|url| !url.trim().is_empty()))
}

/// Parses a station collection, skipping entries without coordinates.
pub fn parse_stations(body: &str) -> Result<Vec<Station>, SiteError> {
    let collection: StationCollection = serde_json::from_str(body)?;
    Ok(collection
        .features
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| serde_json::from_value::<StationFeature>(raw).ok())
        .filter_map(StationFeature::into_station)
        .collect())
}

#[derive(Debug, Clone)]
pub struct NwsClient {
    client: reqwest::Client,
    base_url: String,
}

impl NwsClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, SiteError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, SiteError> {
        Self::new(
            &settings.nws_base_url,
            &settings.user_agent,
            settings.remote_timeout(),
        )
    }

    pub fn points_url(&self, point: LatLon) -> String {
        format!("{}/points/{:.4},{:.4}", self.base_url, point.lat, point.lon)
    }

    async fn get_text(&self, url: &str) -> Result<Option<String>, SiteError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SiteError::Api(format!("NWS returned HTTP {}", status)));
        }
        Ok(Some(response.text().await?))
    }

    /// Stations within `radius_km` of `point`, nearest first. Points outside
    /// NWS coverage return nothing without touching the network.
    pub async fn stations_near(
        &self,
        point: LatLon,
        radius_km: f64,
    ) -> Result<Vec<(f64, Station)>, SiteError> {
        if !coverage::is_covered(point) {
            debug!("Outside NWS coverage — lat={} lon={}", point.lat, point.lon);
            return Ok(Vec::new());
        }

        let Some(body) = self.get_text(&self.points_url(point)).await? else {
            debug!("NWS has no grid point — lat={} lon={}", point.lat, point.lon);
            return Ok(Vec::new());
        };
        let Some(stations_url) = parse_stations_url(&body)? else {
            return Ok(Vec::new());
        };
        let Some(body) = self.get_text(&stations_url).await? else {
            return Ok(Vec::new());
        };

        let stations = parse_stations(&body)?;
        let nearby: Vec<(f64, Station)> =
            within_radius(point, &stations, radius_km, |s| s.location)
                .into_iter()
                .map(|(distance, station)| (distance, station.clone()))
                .collect();
        info!(
            "NWS stations — lat={} lon={} listed={} within_radius={}",
            point.lat,
            point.lon,
            stations.len(),
            nearby.len()
        );
        Ok(nearby)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    // Lookout Mountain, Georgia
    const LOOKOUT: LatLon = LatLon {
        lat: 34.98,
        lon: -85.35,
    };

    fn stations_body() -> &'static str {
        r#"{"features": [
            {
                "geometry": {"type": "Point", "coordinates": [-85.2036, 35.0336]},
                "properties": {"stationIdentifier": "KCHA", "name": "Chattanooga Airport"}
            },
            {
                "geometry": {"type": "Point", "coordinates": [-84.39, 33.64]},
                "properties": {"stationIdentifier": "KATL", "name": "Atlanta Hartsfield"}
            },
            {"geometry": null, "properties": {"stationIdentifier": "KBAD"}},
            {
                "geometry": {"type": "Point", "coordinates": [-85.33, 34.97]},
                "properties": null
            }
        ]}"#
    }

    #[test]
    fn test_parse_stations_skips_missing_geometry() {
        let stations = parse_stations(stations_body()).unwrap();
        let ids: Vec<&str> = stations.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["KCHA", "KATL", ""]);
        assert_eq!(stations[2].name, "Unknown");
        assert_eq!(stations[0].location, LatLon::new(35.0336, -85.2036));
    }

    #[test]
    fn test_parse_stations_url() {
        let body = r#"{"properties": {"observationStations": "https://api.weather.gov/gridpoints/MRX/13,22/stations"}}"#;
        assert_eq!(
            parse_stations_url(body).unwrap().as_deref(),
            Some("https://api.weather.gov/gridpoints/MRX/13,22/stations")
        );
        assert_eq!(parse_stations_url(r#"{"properties": {}}"#).unwrap(), None);
    }

    #[tokio::test]
    async fn test_stations_near_covered_point() {
        let server = MockServer::start_async().await;
        let points = server
            .mock_async(|when, then| {
                when.method(GET).path("/points/34.9800,-85.3500");
                then.status(200).body(format!(
                    r#"{{"properties": {{"observationStations": "{}"}}}}"#,
                    server.url("/gridpoints/MRX/13,22/stations")
                ));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gridpoints/MRX/13,22/stations");
                then.status(200).body(stations_body());
            })
            .await;

        let client = NwsClient::new(&server.base_url(), "test", Duration::from_secs(5)).unwrap();
        let nearby = client.stations_near(LOOKOUT, 50.0).await.unwrap();
        points.assert_async().await;

        // Atlanta is ~160 km away
        let ids: Vec<&str> = nearby.iter().map(|(_, s)| s.id.as_str()).collect();
        assert_eq!(ids, vec!["", "KCHA"]);
        assert!(nearby[0].0 < nearby[1].0);
    }

    #[tokio::test]
    async fn test_stations_near_uncovered_point_skips_network() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.path_contains("/");
                then.status(500);
            })
            .await;

        let client = NwsClient::new(&server.base_url(), "test", Duration::from_secs(5)).unwrap();
        // Annecy
        let nearby = client
            .stations_near(LatLon::new(45.9, 6.1), 50.0)
            .await
            .unwrap();
        assert!(nearby.is_empty());
        assert_eq!(any.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_stations_near_unknown_grid_point() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path_contains("/points/");
                then.status(404);
            })
            .await;

        let client = NwsClient::new(&server.base_url(), "test", Duration::from_secs(5)).unwrap();
        assert!(client.stations_near(LOOKOUT, 50.0).await.unwrap().is_empty());
    }
}
