use async_trait::async_trait;
use nlgeo_core::error::Result;
use nlgeo_core::models::{PlaceId, PlaceRecord};
use std::sync::Arc;

/// Coarse lookup sent to a gazetteer store.
///
/// A store only has to return every record that could match the text in one
/// of the ranking tiers; ranking and deduplication happen afterwards in
/// [`crate::ranking`].
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    pub text: String,
    /// Trigram similarity a name must exceed to count as a fuzzy match
    pub trigram_threshold: f64,
    /// Upper bound on returned records
    pub limit: usize,
}

/// Port for gazetteer storage
#[async_trait]
pub trait GazetteerStore: Send + Sync {
    /// Records that may match the query text
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<PlaceRecord>>;

    /// Fetch one place by its key
    async fn get_place(&self, id: &PlaceId) -> Result<Option<PlaceRecord>>;

    /// Insert or replace places keyed by `(source, source_id)`; returns the
    /// number written
    async fn upsert_places(&self, places: &[PlaceRecord]) -> Result<usize>;

    /// Number of stored places
    async fn count(&self) -> Result<usize>;
}

#[async_trait]
impl<T: GazetteerStore + ?Sized> GazetteerStore for Arc<T> {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<PlaceRecord>> {
        (**self).fetch_candidates(query).await
    }

    async fn get_place(&self, id: &PlaceId) -> Result<Option<PlaceRecord>> {
        (**self).get_place(id).await
    }

    async fn upsert_places(&self, places: &[PlaceRecord]) -> Result<usize> {
        (**self).upsert_places(places).await
    }

    async fn count(&self) -> Result<usize> {
        (**self).count().await
    }
}
