use tracing::{debug, warn};

use crate::{
    as_the_crow_flies::{as_the_crow_flies_matrices, euclidean_matrices},
    cache::MatricesCache,
    travel_matrices::TravelMatrices,
    travel_matrix_provider::TravelMatrixProvider,
};

pub struct TravelMatrixClient<C: MatricesCache> {
    cache: C,
}

fn compute_matrices<P>(
    points: &[P],
    provider: &TravelMatrixProvider,
) -> anyhow::Result<TravelMatrices>
where
    for<'a> &'a P: Into<geo_types::Point>,
{
    match provider {
        TravelMatrixProvider::AsTheCrowFlies { speed_kmh } => {
            Ok(as_the_crow_flies_matrices(points, *speed_kmh))
        }
        TravelMatrixProvider::Euclidean {
            speed_meters_per_second,
        } => Ok(euclidean_matrices(points, *speed_meters_per_second)),
        TravelMatrixProvider::Custom { matrices } => {
            matrices.validate_for(points.len())?;
            Ok(matrices.clone())
        }
    }
}

impl<C: MatricesCache> TravelMatrixClient<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    pub fn fetch_matrix<P>(
        &self,
        points: &[P],
        provider: TravelMatrixProvider,
    ) -> anyhow::Result<TravelMatrices>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        if !provider.is_cacheable() {
            return compute_matrices(points, &provider);
        }

        match self.cache.get_cached(&provider, points) {
            Ok(Some(matrices)) => {
                debug!("Using cached matrices for {} points", points.len());
                return Ok(matrices);
            }
            Ok(None) => {}
            Err(error) => warn!("Could not read matrices cache: {}", error),
        }

        let matrices = compute_matrices(points, &provider)?;

        if let Err(error) = self.cache.cache(&provider, points, &matrices) {
            warn!("Could not write matrices cache: {}", error);
        }

        Ok(matrices)
    }
}
