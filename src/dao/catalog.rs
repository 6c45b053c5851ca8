//! Movie catalog consumed when a room is created.

use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::dao::{models::MovieEntity, storage::StorageError};

/// Failures raised while drawing movies for a room.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog cannot provide the requested number of distinct movies.
    #[error("catalog holds {available} movies, {requested} required")]
    Insufficient {
        /// Distinct movies in the catalog.
        available: usize,
        /// Movies a room needs.
        requested: usize,
    },
    /// The backing store could not be reached.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Source of movies for new rooms.
pub trait MovieCatalog: Send + Sync {
    /// Draw exactly `count` distinct movies in random order, or fail.
    fn sample_random_movies(
        &self,
        count: usize,
    ) -> BoxFuture<'static, Result<Vec<MovieEntity>, CatalogError>>;
}

/// Catalog held in memory, built from the application configuration.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    movies: Arc<[MovieEntity]>,
}

impl StaticCatalog {
    /// Build the catalog, keeping the first occurrence of every movie id.
    pub fn new(movies: impl IntoIterator<Item = MovieEntity>) -> Self {
        let unique = movies
            .into_iter()
            .fold(IndexMap::new(), |mut acc, movie| {
                acc.entry(movie.id.clone()).or_insert(movie);
                acc
            })
            .into_values()
            .collect::<Vec<_>>();

        Self {
            movies: unique.into(),
        }
    }

    /// Number of distinct movies available.
    pub fn len(&self) -> usize {
        self.movies.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    fn sample(&self, count: usize) -> Result<Vec<MovieEntity>, CatalogError> {
        if self.movies.len() < count {
            return Err(CatalogError::Insufficient {
                available: self.movies.len(),
                requested: count,
            });
        }

        let mut rng = rand::rng();
        Ok(self
            .movies
            .choose_multiple(&mut rng, count)
            .cloned()
            .collect())
    }
}

impl MovieCatalog for StaticCatalog {
    fn sample_random_movies(
        &self,
        count: usize,
    ) -> BoxFuture<'static, Result<Vec<MovieEntity>, CatalogError>> {
        let result = self.sample(count);
        Box::pin(async move { result })
    }
}
