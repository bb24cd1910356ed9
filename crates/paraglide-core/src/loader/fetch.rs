use crate::geo::Bounds;
use crate::sites::{LocalSite, RemoteSite, SiteSets};
use crate::{LoadError, SiteError};
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

/// On-device site storage.
pub trait LocalSiteStore {
    /// All stored sites inside `bounds`. Not paginated.
    fn query_in_bounds(
        &self,
        bounds: &Bounds,
    ) -> impl Future<Output = Result<Vec<LocalSite>, SiteError>> + Send;
}

/// Remote site directory.
pub trait RemoteSiteApi {
    /// At most `limit` sites inside `bounds`. With `detailed == false` only
    /// lightweight summaries are requested.
    fn query_in_bounds(
        &self,
        bounds: &Bounds,
        limit: u32,
        detailed: bool,
    ) -> impl Future<Output = Result<Vec<RemoteSite>, SiteError>> + Send;
}

/// Queries the local store and the remote API for the same viewport.
#[derive(Debug)]
pub struct DualSourceFetcher<L, R> {
    local: L,
    remote: R,
    page_size: u32,
    remote_timeout: Duration,
}

impl<L, R> DualSourceFetcher<L, R>
where
    L: LocalSiteStore,
    R: RemoteSiteApi,
{
    pub fn new(local: L, remote: R, page_size: u32, remote_timeout: Duration) -> Self {
        Self {
            local,
            remote,
            page_size,
            remote_timeout,
        }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Runs both queries concurrently and waits for both to settle.
    /// Any failure discards the whole result.
    pub async fn fetch(&self, bounds: &Bounds) -> Result<SiteSets, LoadError> {
        let remote = async {
            match tokio::time::timeout(
                self.remote_timeout,
                self.remote.query_in_bounds(bounds, self.page_size, false),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(SiteError::Timeout(self.remote_timeout)),
            }
        };

        let (local, remote) = tokio::join!(self.local.query_in_bounds(bounds), remote);

        match (local, remote) {
            (Ok(local), Ok(remote)) => {
                debug!(
                    "Dual fetch complete — bounds={} local={} remote={}",
                    bounds.key(),
                    local.len(),
                    remote.len()
                );
                Ok(SiteSets { local, remote })
            }
            (local, remote) => {
                let err = LoadError {
                    local: local.err().map(|e| e.to_string()),
                    remote: remote.err().map(|e| e.to_string()),
                };
                warn!("Dual fetch failed — bounds={} error={}", bounds.key(), err);
                Err(err)
            }
        }
    }
}
