//! In-memory gazetteer, loaded from a GeoJSON place file.
//!
//! Lock guards are unwrapped: a poisoned lock means a writer panicked mid-insert.

use async_trait::async_trait;
use nlgeo_core::error::Result;
use nlgeo_core::models::{normalize_name, PlaceId, PlaceRecord};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::loader::PlaceLoader;
use crate::ports::{CandidateQuery, GazetteerStore};
use crate::ranking::{score_record, trigram_similarity, trigrams};

/// In-memory implementation of GazetteerStore
#[derive(Debug, Clone, Default)]
pub struct MemoryGazetteer {
    places: Arc<RwLock<HashMap<PlaceId, PlaceRecord>>>,
}

impl MemoryGazetteer {
    /// Create an empty gazetteer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gazetteer holding the given places
    pub fn with_places(places: impl IntoIterator<Item = PlaceRecord>) -> Self {
        let store = Self::new();
        store.insert_all(places);
        store
    }

    /// Create a gazetteer from a GeoJSON place file
    pub fn from_file(path: &Path) -> Result<Self> {
        let places = PlaceLoader::new().read_file(path)?;
        Ok(Self::with_places(places))
    }

    fn insert_all(&self, places: impl IntoIterator<Item = PlaceRecord>) -> usize {
        let mut map = self.places.write().unwrap();
        let mut written = 0;
        for place in places {
            map.insert(place.id.clone(), place);
            written += 1;
        }
        written
    }
}

#[async_trait]
impl GazetteerStore for MemoryGazetteer {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<PlaceRecord>> {
        let query_name = normalize_name(&query.text);
        if query_name.is_empty() {
            return Ok(Vec::new());
        }
        let query_trigrams = trigrams(&query.text);

        let places = self.places.read().unwrap();
        let mut matches: Vec<(bool, f64, &PlaceRecord)> = places
            .values()
            .filter(|r| !score_record(&query.text, r, query.trigram_threshold).is_empty())
            .map(|r| {
                let exact = normalize_name(&r.name) == query_name;
                (exact, trigram_similarity(&query_trigrams, &trigrams(&r.name)), r)
            })
            .collect();

        // Exact names first, then closest names, then key; the same order the
        // SQL adapter truncates in.
        matches.sort_by(|a, b| {
            b.0.cmp(&a.0).then(b.1.total_cmp(&a.1)).then_with(|| a.2.id.cmp(&b.2.id))
        });
        Ok(matches.into_iter().take(query.limit).map(|(_, _, r)| r.clone()).collect())
    }

    async fn get_place(&self, id: &PlaceId) -> Result<Option<PlaceRecord>> {
        let places = self.places.read().unwrap();
        Ok(places.get(id).cloned())
    }

    async fn upsert_places(&self, places: &[PlaceRecord]) -> Result<usize> {
        Ok(self.insert_all(places.iter().cloned()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.places.read().unwrap().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlgeo_core::models::{Geometry, PlaceType};

    fn place(id: &str, name: &str) -> PlaceRecord {
        PlaceRecord::new(PlaceId::new("wof", id), name, PlaceType::Locality, Geometry::point(0.0, 0.0))
    }

    fn query(text: &str) -> CandidateQuery {
        CandidateQuery { text: text.to_string(), trigram_threshold: 0.3, limit: 100 }
    }

    #[tokio::test]
    async fn test_fetch_candidates_filters_coarsely() {
        let store = MemoryGazetteer::with_places(vec![
            place("1", "Boston"),
            place("2", "Bostonia"),
            place("3", "Zzyzx"),
            place("4", "Cambridge").with_alternate_names(["Boston Cambridge"]),
        ]);

        let found = store.fetch_candidates(&query("boston")).await.unwrap();
        let ids: Vec<_> = found.iter().map(|r| r.id.source_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "4"]);

        assert!(store.fetch_candidates(&query("  ")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_respects_limit() {
        let store = MemoryGazetteer::with_places((0..10).map(|i| place(&i.to_string(), "Paris")));
        let mut q = query("Paris");
        q.limit = 3;
        assert_eq!(store.fetch_candidates(&q).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_exact_match_survives_truncation() {
        // Ids sort before the exact match and every name shares trigrams with it.
        let mut places: Vec<PlaceRecord> = (0..150)
            .map(|i| {
                PlaceRecord::new(
                    PlaceId::new("aaa", i.to_string()),
                    format!("Boston {}", i),
                    PlaceType::Locality,
                    Geometry::point(0.0, 0.0),
                )
            })
            .collect();
        places.push(place("boston", "Boston"));
        let store = MemoryGazetteer::with_places(places);

        let found = store.fetch_candidates(&query("Boston")).await.unwrap();
        assert_eq!(found.len(), 100);
        assert_eq!(found[0].id, PlaceId::new("wof", "boston"));
    }

    #[tokio::test]
    async fn test_single_shared_trigram_is_not_a_match() {
        let store = MemoryGazetteer::with_places(
            (0..150).map(|i| place(&format!("b{:03}", i), &format!("Bxq{}", i))),
        );
        assert!(store.fetch_candidates(&query("Boston")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_key() {
        let store = MemoryGazetteer::new();
        assert_eq!(store.upsert_places(&[place("1", "Bostn")]).await.unwrap(), 1);
        store.upsert_places(&[place("1", "Boston")]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let fetched = store.get_place(&PlaceId::new("wof", "1")).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Boston");
        assert!(store.get_place(&PlaceId::new("wof", "2")).await.unwrap().is_none());
    }
}
