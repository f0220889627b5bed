use std::{
    hash::{Hash, Hasher},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use fxhash::FxHasher64;
use tracing::debug;

use crate::{travel_matrices::TravelMatrices, travel_matrix_provider::TravelMatrixProvider};

const CACHE_FOLDER_ENV_VAR: &str = "WAYPOINT_CACHE_FOLDER";

pub trait MatricesCache {
    fn cache<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
        matrices: &TravelMatrices,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>;

    fn get_cached<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
    ) -> Result<Option<TravelMatrices>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>;
}

/// Cache that never stores anything.
pub struct NoCache;

impl MatricesCache for NoCache {
    fn cache<P>(
        &self,
        _provider: &TravelMatrixProvider,
        _points: &[P],
        _matrices: &TravelMatrices,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        Ok(())
    }

    fn get_cached<P>(
        &self,
        _provider: &TravelMatrixProvider,
        _points: &[P],
    ) -> Result<Option<TravelMatrices>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        Ok(None)
    }
}

/// `None` behaves like [`NoCache`].
impl<C: MatricesCache> MatricesCache for Option<C> {
    fn cache<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
        matrices: &TravelMatrices,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        match self {
            Some(cache) => cache.cache(provider, points, matrices),
            None => Ok(()),
        }
    }

    fn get_cached<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
    ) -> Result<Option<TravelMatrices>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        match self {
            Some(cache) => cache.get_cached(provider, points),
            None => Ok(None),
        }
    }
}

/// Stores computed matrices as JSON files named after a hash of the points and provider.
pub struct FileMatricesCache {
    folder: PathBuf,
}

fn hash_points<H, P>(points: &[P], hasher: &mut H)
where
    H: Hasher,
    for<'a> &'a P: Into<geo_types::Point>,
{
    points.len().hash(hasher);
    for point in points {
        let point = point.into();
        hasher.write_u64(point.x().to_bits());
        hasher.write_u64(point.y().to_bits());
    }
}

fn get_filename<P>(points: &[P], provider: &TravelMatrixProvider) -> String
where
    for<'a> &'a P: Into<geo_types::Point>,
{
    let mut hasher = FxHasher64::default();

    hash_points(points, &mut hasher);
    provider.hash(&mut hasher);

    let hash = hasher.finish();
    format!("{:016x}.json", hash)
}

impl FileMatricesCache {
    pub fn new(folder: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let folder = folder.as_ref();

        if !folder.is_dir() {
            return Err(anyhow::anyhow!(
                "Path {} is not a directory",
                folder.display()
            ));
        }

        Ok(FileMatricesCache {
            folder: folder.to_path_buf(),
        })
    }

    /// Reads the cache folder from `WAYPOINT_CACHE_FOLDER`.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let cache_folder_path = std::env::var(CACHE_FOLDER_ENV_VAR)?;
        Self::new(cache_folder_path)
    }
}

impl MatricesCache for FileMatricesCache {
    fn cache<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
        matrices: &TravelMatrices,
    ) -> Result<(), anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let filename = get_filename(points, provider);

        let file = std::fs::File::create(self.folder.join(&filename))?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        serde_json::to_writer(&mut writer, &matrices)?;
        writer.flush()?;

        debug!("Cached matrices in {}", filename);

        Ok(())
    }

    fn get_cached<P>(
        &self,
        provider: &TravelMatrixProvider,
        points: &[P],
    ) -> Result<Option<TravelMatrices>, anyhow::Error>
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        let filename = get_filename(points, provider);
        let file_path = self.folder.join(filename);

        if !file_path.is_file() {
            return Ok(None);
        }

        let file = std::fs::File::open(file_path)?;
        let matrices: TravelMatrices = serde_json::from_reader(file)?;

        Ok(Some(matrices))
    }
}
