// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use paraglide_core::config::{Settings, SettingsManager};
use paraglide_core::geo::{within_radius, Bounds, LatLon, DEFAULT_SEARCH_RADIUS_KM};
use paraglide_core::loader::{
    DualSourceFetcher, LoaderEvent, LoaderOptions, LoaderUpdate, SiteLoaderService,
};
use paraglide_core::remote::PgeClient;
use paraglide_core::sites::{LocalSite, MapSite, RemoteSite};
use paraglide_core::stations::NwsClient;
use paraglide_core::store::{JsonSiteStore, NewSite};
use paraglide_core::SiteError;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration directory (settings.json, sites.json)
    #[arg(long, env = "PARAGLIDE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the local site store
    Sites {
        #[command(subcommand)]
        action: SitesAction,
    },
    /// Load local and ParaglidingEarth sites inside a viewport
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        north: f64,
        #[arg(long, allow_hyphen_values = true)]
        south: f64,
        #[arg(long, allow_hyphen_values = true)]
        east: f64,
        #[arg(long, allow_hyphen_values = true)]
        west: f64,
        /// Filter results by name or country
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Local sites within a radius of a point, closest first
    Near {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_RADIUS_KM)]
        radius: f64,
    },
    /// NWS weather stations near a point or a ParaglidingEarth site
    Stations {
        #[arg(allow_hyphen_values = true, required_unless_present = "site")]
        lat: Option<f64>,
        #[arg(allow_hyphen_values = true, required_unless_present = "site")]
        lon: Option<f64>,
        /// Look the point up by site name instead
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        site: Option<String>,
        /// Search radius in km (defaults to settings.json)
        #[arg(short, long)]
        radius: Option<f64>,
    },
    /// Show which NWS weather coverage areas include a point
    Coverage {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },
    /// Show or initialize settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum SitesAction {
    /// List all local sites
    List,
    /// Add a site
    Add {
        name: String,
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        altitude: Option<f64>,
        #[arg(long)]
        country: Option<String>,
    },
    /// Remove a site by id
    Remove { id: u64 },
    /// Search ParaglidingEarth by site name
    Search { name: String },
    /// Import sites from CSV (name,latitude,longitude,altitude,country)
    Import { file: PathBuf },
    /// Record a flight from a site (defaults to today)
    Flight {
        id: u64,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    /// Write default settings.json if missing
    Init,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("paraglide")
        .build();
    // A logger may already be installed when embedded
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let manager = match &cli.config_dir {
        Some(dir) => SettingsManager::new(dir.clone()),
        None => SettingsManager::default(),
    };
    let settings = manager.load()?;
    let store_path = settings.store_path_in(manager.config_root());

    match cli.command {
        Commands::Sites {
            action: SitesAction::Search { name },
        } => block_on(run_search(&settings, &name)),
        Commands::Sites { action } => run_sites(action, &store_path),
        Commands::Nearby {
            north,
            south,
            east,
            west,
            query,
        } => {
            let bounds = Bounds::new(north, south, east, west);
            block_on(run_nearby(&settings, &store_path, bounds, query))
        }
        Commands::Stations {
            lat,
            lon,
            site,
            radius,
        } => {
            let radius = radius.unwrap_or(settings.station_radius_km);
            block_on(run_stations(&settings, lat.zip(lon), site, radius))
        }
        Commands::Near { lat, lon, radius } => {
            let store = JsonSiteStore::open(&store_path)?;
            let origin = LatLon::new(lat, lon);
            let hits = within_radius(origin, store.all(), radius, |s| s.location());
            println!(
                "{} site(s) within {} km of {:.4}, {:.4}",
                hits.len(),
                radius,
                lat,
                lon
            );
            for (distance, site) in hits {
                println!("{:>7.1} km  {}", distance, describe_local(site));
            }
            Ok(())
        }
        Commands::Coverage { lat, lon } => {
            let regions = paraglide_core::coverage::regions_covering(LatLon::new(lat, lon));
            if regions.is_empty() {
                println!("Outside NWS coverage");
            }
            for region in regions {
                println!("{} ({})", region.name, region.id);
            }
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("# {}", manager.config_path().display());
                let content = serde_json::to_string_pretty(&settings)
                    .context("Failed to serialize settings")?;
                println!("{}", content);
                Ok(())
            }
            ConfigAction::Init => {
                if manager.config_path().exists() {
                    println!("Settings already exist at {}", manager.config_path().display());
                } else {
                    manager.save(&Settings::default())?;
                    println!("Wrote {}", manager.config_path().display());
                }
                Ok(())
            }
        },
    }
}

fn run_sites(action: SitesAction, store_path: &std::path::Path) -> Result<()> {
    let mut store = JsonSiteStore::open(store_path)?;
    match action {
        SitesAction::List => {
            println!(
                "{} local site(s) in {} (updated {})",
                store.all().len(),
                store.path().display(),
                store.updated().format("%Y-%m-%d %H:%M UTC")
            );
            for site in store.all() {
                println!("{}", describe_local(site));
            }
        }
        SitesAction::Add {
            name,
            lat,
            lon,
            altitude,
            country,
        } => {
            let id = store.add(NewSite {
                name,
                latitude: lat,
                longitude: lon,
                altitude,
                country,
            });
            store.save()?;
            println!("Added site #{}", id);
        }
        SitesAction::Remove { id } => {
            if store.remove(id) {
                store.save()?;
                println!("Removed site #{}", id);
            } else {
                println!("No site with id {}", id);
            }
        }
        SitesAction::Import { file } => {
            let reader = std::fs::File::open(&file)
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let added = store.import_csv(reader)?;
            store.save()?;
            println!("Imported {} site(s)", added);
        }
        // Dispatched in main; needs no store
        SitesAction::Search { .. } => {}
        SitesAction::Flight { id, date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            if store.record_flight(id, date) {
                store.save()?;
                println!("Recorded flight on {} from site #{}", date, id);
            } else {
                println!("No site with id {}", id);
            }
        }
    }
    Ok(())
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
    runtime.block_on(future)
}

/// Maps a PGE 403 to advice the user can act on.
fn pge_error(err: SiteError) -> anyhow::Error {
    match err {
        SiteError::Forbidden(_) => anyhow::anyhow!(
            "{}. PGE may be rate limiting; try again later or pass coordinates directly",
            err
        ),
        other => other.into(),
    }
}

async fn run_search(settings: &Settings, name: &str) -> Result<()> {
    let client = PgeClient::from_settings(settings)?;
    let hits = client.search_by_name(name).await.map_err(pge_error)?;
    if hits.is_empty() {
        println!("No ParaglidingEarth site matches \"{}\"", name);
    }
    for site in &hits {
        println!(
            "{:<8} {}",
            site.pge_id.as_deref().unwrap_or("-"),
            describe_remote(site)
        );
    }
    Ok(())
}

async fn run_stations(
    settings: &Settings,
    point: Option<(f64, f64)>,
    site: Option<String>,
    radius: f64,
) -> Result<()> {
    let origin = match (point, site) {
        (Some((lat, lon)), _) => LatLon::new(lat, lon),
        (None, Some(name)) => {
            let client = PgeClient::from_settings(settings)?;
            let hits = client.search_by_name(&name).await.map_err(pge_error)?;
            let found = hits
                .first()
                .with_context(|| format!("Site not found: {}", name))?;
            println!(
                "Found: {} ({:.4}, {:.4})",
                found.name, found.latitude, found.longitude
            );
            found.location()
        }
        (None, None) => anyhow::bail!("Pass coordinates or --site"),
    };

    if !paraglide_core::coverage::is_covered(origin) {
        println!("Outside NWS coverage; no stations to list");
        return Ok(());
    }

    let client = NwsClient::from_settings(settings)?;
    let stations = client.stations_near(origin, radius).await?;
    println!("{} NWS station(s) within {} km", stations.len(), radius);
    for (distance, station) in stations {
        println!("{:>7.1} km  {:<6} {}", distance, station.id, station.name);
    }
    Ok(())
}

async fn run_nearby(
    settings: &Settings,
    store_path: &std::path::Path,
    bounds: Bounds,
    query: Option<String>,
) -> Result<()> {
    let store = JsonSiteStore::open(store_path)?;
    let remote = PgeClient::from_settings(settings)?;
    let fetcher = DualSourceFetcher::new(
        store,
        remote,
        settings.remote_page_size,
        settings.remote_timeout(),
    );

    let (event_tx, event_rx) = mpsc::channel(16);
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let service = SiteLoaderService::new(fetcher, LoaderOptions::from(settings), update_tx);

    let driver = async move {
        let mut layers = None;
        let mut failure = None;
        let mut recenter = None;

        if event_tx.send(LoaderEvent::BoundsChanged(bounds)).await.is_err() {
            return (layers, failure, recenter);
        }

        while let Some(update) = update_rx.recv().await {
            match update {
                LoaderUpdate::Loading(true) => log::info!("Loading nearby sites…"),
                LoaderUpdate::Loading(false) => {}
                LoaderUpdate::Layers { local, remote } => {
                    layers = Some((local, remote));
                    break;
                }
                LoaderUpdate::Recenter(target) => recenter = Some(target),
                LoaderUpdate::Error(message) => {
                    failure = Some(message);
                    break;
                }
            }
        }

        let query = query.filter(|_| layers.is_some());
        if let Some(q) = query {
            let _ = event_tx.send(LoaderEvent::SearchChanged(q)).await;
            while let Some(update) = update_rx.recv().await {
                match update {
                    LoaderUpdate::Layers { local, remote } => layers = Some((local, remote)),
                    LoaderUpdate::Recenter(target) => recenter = Some(target),
                    _ => {}
                }
                if update_rx.is_empty() {
                    break;
                }
            }
        }

        let _ = event_tx.send(LoaderEvent::Dispose).await;
        (layers, failure, recenter)
    };

    let (_, (layers, failure, recenter)) = tokio::join!(service.run(event_rx), driver);

    if let Some(message) = failure {
        anyhow::bail!(message);
    }
    if let Some((local, remote)) = layers {
        print_layers(&local, &remote);
    }
    if let Some(target) = recenter {
        println!("Recenter: {:.4}, {:.4}", target.lat, target.lon);
    }
    Ok(())
}

fn describe_local(site: &LocalSite) -> String {
    format!(
        "#{:<4} {:<32} {:>9.4} {:>10.4}  {:>6}  {:<4} flights={}",
        site.id,
        site.name,
        site.latitude,
        site.longitude,
        site.altitude.map(|a| format!("{:.0}m", a)).unwrap_or_default(),
        site.country.as_deref().unwrap_or("-"),
        site.flight_count
    )
}

fn describe_remote(site: &RemoteSite) -> String {
    format!(
        "{:<38} {:>9.4} {:>10.4}  {:>6}  {:<4} {}",
        site.name(),
        site.latitude,
        site.longitude,
        site.takeoff_altitude
            .map(|a| format!("{:.0}m", a))
            .unwrap_or_default(),
        site.country().unwrap_or("-"),
        site.wind_directions.join(",")
    )
}

fn print_layers(local: &[LocalSite], remote: &[RemoteSite]) {
    println!("Local sites ({}):", local.len());
    for site in local {
        println!("  {}", describe_local(site));
    }
    println!("ParaglidingEarth sites ({}):", remote.len());
    for site in remote {
        println!("  {}", describe_remote(site));
    }
}
