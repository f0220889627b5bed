use tracing::{debug, info};
use waypoint_matrix_providers::{
    cache::FileMatricesCache, travel_matrix_client::TravelMatrixClient,
};

pub type Client = TravelMatrixClient<Option<FileMatricesCache>>;

/// Caches matrices in `WAYPOINT_CACHE_FOLDER` when it points to a folder.
pub fn matrix_client() -> Client {
    match FileMatricesCache::from_env() {
        Ok(cache) => {
            info!("Caching travel matrices");
            TravelMatrixClient::new(Some(cache))
        }
        Err(error) => {
            debug!("Travel matrices are not cached: {error}");
            TravelMatrixClient::new(None)
        }
    }
}
