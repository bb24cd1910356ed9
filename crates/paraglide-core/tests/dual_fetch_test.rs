mod common;

use common::{local_sites, remote_sites, MockLocal, MockRemote};
use paraglide_core::geo::Bounds;
use paraglide_core::loader::DualSourceFetcher;
use paraglide_core::store::{JsonSiteStore, NewSite};
use std::time::Duration;
use tokio::time::Instant;

fn viewport() -> Bounds {
    Bounds::new(46.0, 45.7, 6.4, 6.0)
}

#[tokio::test(start_paused = true)]
async fn test_sources_are_queried_concurrently() {
    let mut local = MockLocal::new(local_sites(2, 45.8, 6.1));
    local.delay = Duration::from_secs(1);
    let mut remote = MockRemote::new(remote_sites(3, 45.8, 6.1));
    remote.delay = Duration::from_secs(1);

    let fetcher = DualSourceFetcher::new(local, remote, 50, Duration::from_secs(10));
    let start = Instant::now();
    let sites = fetcher.fetch(&viewport()).await.unwrap();

    assert_eq!(sites.local.len(), 2);
    assert_eq!(sites.remote.len(), 3);
    assert!(start.elapsed() < Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn test_remote_page_size_and_summary_mode() {
    let remote = MockRemote::new(remote_sites(80, 45.8, 6.1));
    let requests = remote.requests.clone();
    let fetcher = DualSourceFetcher::new(
        MockLocal::new(vec![]),
        remote,
        50,
        Duration::from_secs(10),
    );

    let sites = fetcher.fetch(&viewport()).await.unwrap();
    assert_eq!(sites.remote.len(), 50);
    assert_eq!(*requests.lock().unwrap(), vec![(50, false)]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_remote_times_out() {
    let local = MockLocal::new(local_sites(2, 45.8, 6.1));
    let mut remote = MockRemote::new(remote_sites(3, 45.8, 6.1));
    remote.delay = Duration::from_secs(60);

    let fetcher = DualSourceFetcher::new(local, remote, 50, Duration::from_secs(10));
    let start = Instant::now();
    let err = fetcher.fetch(&viewport()).await.unwrap_err();

    assert_eq!(err.local, None);
    assert_eq!(err.remote.as_deref(), Some("Request timed out after 10s"));
    assert!(start.elapsed() < Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn test_both_failures_reported() {
    let local = MockLocal::new(vec![]);
    local.probe.set_failing(true);
    let remote = MockRemote::new(vec![]);
    remote.probe.set_failing(true);

    let fetcher = DualSourceFetcher::new(local, remote, 50, Duration::from_secs(10));
    let err = fetcher.fetch(&viewport()).await.unwrap_err();
    assert!(err.local.is_some());
    assert!(err.remote.is_some());
    assert_eq!(fetcher.local().probe.completed(), 1);
    assert_eq!(fetcher.remote().probe.completed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_json_store_as_local_source() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonSiteStore::open(dir.path().join("sites.json")).unwrap();
    store.add(NewSite {
        name: "Planfait".to_string(),
        latitude: 45.86,
        longitude: 6.20,
        altitude: Some(1150.0),
        country: Some("FR".to_string()),
    });
    store.add(NewSite {
        name: "Lookout Mountain".to_string(),
        latitude: 34.98,
        longitude: -85.35,
        altitude: None,
        country: Some("US".to_string()),
    });

    let fetcher = DualSourceFetcher::new(
        store,
        MockRemote::new(vec![]),
        50,
        Duration::from_secs(10),
    );
    let sites = fetcher.fetch(&viewport()).await.unwrap();
    assert_eq!(sites.local.len(), 1);
    assert_eq!(sites.local[0].name, "Planfait");
    assert!(sites.remote.is_empty());
}
