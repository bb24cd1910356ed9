use super::{DualSourceFetcher, FetchRequest, LoaderOptions, LoaderUpdate, NearbySites};
use super::{LocalSiteStore, RemoteSiteApi};
use crate::geo::Bounds;
use crate::sites::SiteSets;
use crate::LoadError;
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, info};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Input from the map screen.
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderEvent {
    BoundsChanged(Bounds),
    SearchChanged(String),
    /// Screen teardown
    Dispose,
}

type InFlight<'a> = BoxFuture<'a, (String, Result<SiteSets, LoadError>)>;

/// Drives a `NearbySites` state machine from a single event channel.
///
/// Everything runs on the task that awaits `run`: the debounce timer, the
/// event receiver and the one outstanding fetch are multiplexed with
/// `tokio::select!`, so no state is shared across tasks.
pub struct SiteLoaderService<L, R> {
    fetcher: DualSourceFetcher<L, R>,
    loader: NearbySites,
    updates: mpsc::UnboundedSender<LoaderUpdate>,
}

impl<L, R> SiteLoaderService<L, R>
where
    L: LocalSiteStore + Sync,
    R: RemoteSiteApi + Sync,
{
    pub fn new(
        fetcher: DualSourceFetcher<L, R>,
        options: LoaderOptions,
        updates: mpsc::UnboundedSender<LoaderUpdate>,
    ) -> Self {
        Self {
            fetcher,
            loader: NearbySites::new(options),
            updates,
        }
    }

    /// Processes events until `Dispose` or until the sender side is dropped.
    /// A fetch still running at that point is awaited and its result dropped.
    pub async fn run(self, mut events: mpsc::Receiver<LoaderEvent>) -> NearbySites {
        let SiteLoaderService {
            fetcher,
            mut loader,
            updates,
        } = self;
        let emit = |batch: Vec<LoaderUpdate>| {
            for update in batch {
                if updates.send(update).is_err() {
                    debug!("Map view gone; dropping loader update");
                }
            }
        };

        let mut in_flight: Option<InFlight<'_>> = None;

        loop {
            let deadline = loader.deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(LoaderEvent::BoundsChanged(bounds)) => {
                        loader.bounds_changed(bounds, Instant::now());
                    }
                    Some(LoaderEvent::SearchChanged(query)) => {
                        emit(loader.search_changed(&query));
                    }
                    Some(LoaderEvent::Dispose) | None => {
                        info!(
                            "Nearby sites loader disposed — fetch_in_flight={}",
                            in_flight.is_some()
                        );
                        loader.dispose();
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    match loader.timer_fired(Instant::now()) {
                        Ok(request) => {
                            emit(vec![LoaderUpdate::Loading(true)]);
                            in_flight = Some(start_fetch(&fetcher, request));
                        }
                        Err(skip) => debug!("Debounced bounds skipped — reason={:?}", skip),
                    }
                },
                (key, result) = settle(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    emit(loader.fetch_completed(&key, result));
                },
            }
        }

        if let Some(fetch) = in_flight.take() {
            let (key, result) = fetch.await;
            // Unmounted: this only clears the in-flight marker
            loader.fetch_completed(&key, result);
        }

        debug!("Loader service stopped");
        loader
    }
}

fn start_fetch<'a, L, R>(
    fetcher: &'a DualSourceFetcher<L, R>,
    request: FetchRequest,
) -> InFlight<'a>
where
    L: LocalSiteStore + Sync,
    R: RemoteSiteApi + Sync,
{
    async move {
        let result = fetcher.fetch(&request.bounds).await;
        (request.key, result)
    }
    .boxed()
}

async fn settle(in_flight: &mut Option<InFlight<'_>>) -> (String, Result<SiteSets, LoadError>) {
    match in_flight.as_mut() {
        Some(fetch) => fetch.await,
        None => std::future::pending().await,
    }
}
