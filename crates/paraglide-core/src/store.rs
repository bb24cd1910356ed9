use crate::geo::Bounds;
use crate::loader::LocalSiteStore;
use crate::sites::LocalSite;
use crate::SiteError;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

const CURRENT_STORE_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    version: u32,
    updated: DateTime<Utc>,
    /// Id handed to the next added site. Ids are never reused.
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    sites: Vec<LocalSite>,
}

/// Input for a new local site. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewSite {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub country: Option<String>,
}

/// On-device site store persisted as a single JSON document.
#[derive(Debug, Clone)]
pub struct JsonSiteStore {
    path: PathBuf,
    updated: DateTime<Utc>,
    next_id: u64,
    sites: Vec<LocalSite>,
}

impl JsonSiteStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SiteError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            debug!("Site store missing; starting empty — path={}", path.display());
            return Ok(Self {
                path,
                updated: Utc::now(),
                next_id: 1,
                sites: Vec::new(),
            });
        }

        let content = std::fs::read_to_string(&path)?;
        let file: StoreFile = serde_json::from_str(&content)?;
        if file.version != CURRENT_STORE_VERSION {
            return Err(SiteError::StoreVersion {
                found: file.version,
                expected: CURRENT_STORE_VERSION,
            });
        }

        debug!(
            "Opened site store — path={} sites={}",
            path.display(),
            file.sites.len()
        );
        // Files written before `next_id` existed start after the highest id
        let floor = file.sites.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        Ok(Self {
            path,
            updated: file.updated,
            next_id: file.next_id.max(floor),
            sites: file.sites,
        })
    }

    pub fn save(&self) -> Result<(), SiteError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = StoreFile {
            version: CURRENT_STORE_VERSION,
            updated: self.updated,
            next_id: self.next_id,
            sites: self.sites.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, content)?;
        info!(
            "Site store saved — path={} sites={}",
            self.path.display(),
            self.sites.len()
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    pub fn all(&self) -> &[LocalSite] {
        &self.sites
    }

    pub fn get(&self, id: u64) -> Option<&LocalSite> {
        self.sites.iter().find(|s| s.id == id)
    }

    pub fn add(&mut self, site: NewSite) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.sites.push(LocalSite {
            id,
            name: site.name.trim().to_string(),
            latitude: site.latitude,
            longitude: site.longitude,
            altitude: site.altitude,
            country: site.country.filter(|c| !c.trim().is_empty()),
            flight_count: 0,
            last_flight: None,
        });
        self.updated = Utc::now();
        id
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.sites.len();
        self.sites.retain(|s| s.id != id);
        let removed = self.sites.len() != before;
        if removed {
            self.updated = Utc::now();
        }
        removed
    }

    /// Bumps the flight count and keeps the most recent flight date.
    pub fn record_flight(&mut self, id: u64, date: NaiveDate) -> bool {
        let Some(site) = self.sites.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        site.flight_count += 1;
        site.last_flight = Some(site.last_flight.map_or(date, |d| d.max(date)));
        self.updated = Utc::now();
        true
    }

    /// Imports `name,latitude,longitude,altitude,country` rows. Returns the number added.
    pub fn import_csv<R: Read>(&mut self, reader: R) -> Result<usize, SiteError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut added = 0;
        for record in rdr.deserialize::<NewSite>() {
            let site = record?;
            if site.name.is_empty() {
                continue;
            }
            self.add(site);
            added += 1;
        }

        info!("Imported sites from CSV — added={}", added);
        Ok(added)
    }

    pub fn in_bounds(&self, bounds: &Bounds) -> Vec<LocalSite> {
        self.sites
            .iter()
            .filter(|s| bounds.contains(s.latitude, s.longitude))
            .cloned()
            .collect()
    }
}

impl LocalSiteStore for JsonSiteStore {
    async fn query_in_bounds(&self, bounds: &Bounds) -> Result<Vec<LocalSite>, SiteError> {
        Ok(self.in_bounds(bounds))
    }
}
