//! `GazetteerStore` over the `geo_places` table

use async_trait::async_trait;
use nlgeo_core::error::{NlgeoError, Result};
use nlgeo_core::models::{Ancestor, Geometry, PlaceId, PlaceRecord, PlaceType};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::collections::HashMap;
use tracing::debug;

use super::PostgresGazetteer;
use crate::ports::{CandidateQuery, GazetteerStore};

const SELECT_COLUMNS: &str = "source, source_id, name, place_type, alternate_names, ancestors, \
     population, properties, ST_AsGeoJSON(geometry)::text AS geometry";

/// Transaction-local trigram threshold read by the `%` operator.
const SET_TRIGRAM_THRESHOLD: &str =
    "SELECT set_config('pg_trgm.similarity_threshold', $1, true)";

/// Coarse filter: exact lowercase name, trigram match at the threshold set by
/// `SET_TRIGRAM_THRESHOLD`, or a full-text match on the weighted document.
/// `%` is served by `geo_places_name_trgm_idx`; rows at exactly the threshold
/// are dropped again by ranking.
const FETCH_CANDIDATES: &str = "SELECT source, source_id, name, place_type, alternate_names, \
     ancestors, population, properties, ST_AsGeoJSON(geometry)::text AS geometry \
     FROM geo_places \
     WHERE lower(name) = lower($1) \
        OR lower(name) % lower($1) \
        OR document @@ plainto_tsquery('simple', $1) \
     ORDER BY (lower(name) = lower($1)) DESC, similarity(lower(name), lower($1)) DESC, id \
     LIMIT $2";

const UPSERT_PLACE: &str = "INSERT INTO geo_places \
     (source, source_id, name, place_type, alternate_names, alternate_names_text, ancestors, \
      population, properties, geometry) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, ST_SetSRID(ST_GeomFromGeoJSON($10), 4326)) \
     ON CONFLICT (source, source_id) DO UPDATE SET \
        name = EXCLUDED.name, \
        place_type = EXCLUDED.place_type, \
        alternate_names = EXCLUDED.alternate_names, \
        alternate_names_text = EXCLUDED.alternate_names_text, \
        ancestors = EXCLUDED.ancestors, \
        population = EXCLUDED.population, \
        properties = EXCLUDED.properties, \
        geometry = EXCLUDED.geometry";

fn db_error(operation: &str, err: sqlx::Error) -> NlgeoError {
    NlgeoError::backend(format!("{}: {}", operation, err))
}

/// Map one `geo_places` row to a record
fn row_to_record(row: &PgRow) -> Result<PlaceRecord> {
    let get_err = |e: sqlx::Error| db_error("Failed to read place row", e);

    let source: String = row.try_get("source").map_err(get_err)?;
    let source_id: String = row.try_get("source_id").map_err(get_err)?;
    let id = PlaceId::new(source, source_id);

    let place_type: String = row.try_get("place_type").map_err(get_err)?;
    let place_type: PlaceType = place_type.parse().map_err(|_| NlgeoError::SchemaViolation {
        reason: format!("place {} has unknown place type '{}'", id, place_type),
    })?;

    let ancestors: serde_json::Value = row.try_get("ancestors").map_err(get_err)?;
    let ancestors: Vec<Ancestor> = serde_json::from_value(ancestors)
        .map_err(|e| NlgeoError::Serialization(format!("place {} ancestors: {}", id, e)))?;

    let properties: serde_json::Value = row.try_get("properties").map_err(get_err)?;
    let properties: HashMap<String, serde_json::Value> = serde_json::from_value(properties)
        .map_err(|e| NlgeoError::Serialization(format!("place {} properties: {}", id, e)))?;

    let geometry: String = row.try_get("geometry").map_err(get_err)?;
    let geometry: serde_json::Value = serde_json::from_str(&geometry)
        .map_err(|e| NlgeoError::Serialization(format!("place {} geometry: {}", id, e)))?;

    let population: Option<i64> = row.try_get("population").map_err(get_err)?;

    Ok(PlaceRecord {
        name: row.try_get("name").map_err(get_err)?,
        place_type,
        alternate_names: row.try_get("alternate_names").map_err(get_err)?,
        ancestors,
        population: population.and_then(|p| u64::try_from(p).ok()),
        properties,
        geometry: Geometry::from_geojson(&geometry)?,
        id,
    })
}

#[async_trait]
impl GazetteerStore for PostgresGazetteer {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<PlaceRecord>> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let mut tx =
            self.pool().begin().await.map_err(|e| db_error("Failed to begin transaction", e))?;

        // Same connection as the filter below; reset when the transaction ends
        sqlx::query(SET_TRIGRAM_THRESHOLD)
            .bind(query.trigram_threshold.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to set trigram threshold", e))?;

        let rows = sqlx::query(FETCH_CANDIDATES)
            .bind(&query.text)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to fetch candidates", e))?;

        tx.commit().await.map_err(|e| db_error("Failed to end candidate transaction", e))?;

        debug!(text = %query.text, rows = rows.len(), "Fetched gazetteer candidates");
        rows.iter().map(row_to_record).collect()
    }

    async fn get_place(&self, id: &PlaceId) -> Result<Option<PlaceRecord>> {
        let sql = format!(
            "SELECT {} FROM geo_places WHERE source = $1 AND source_id = $2",
            SELECT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&id.source)
            .bind(&id.source_id)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| db_error("Failed to get place", e))?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn upsert_places(&self, places: &[PlaceRecord]) -> Result<usize> {
        let mut tx =
            self.pool().begin().await.map_err(|e| db_error("Failed to begin transaction", e))?;

        for place in places {
            let ancestors = serde_json::to_value(&place.ancestors)
                .map_err(|e| NlgeoError::Serialization(e.to_string()))?;
            let properties = serde_json::to_value(&place.properties)
                .map_err(|e| NlgeoError::Serialization(e.to_string()))?;
            let geometry = serde_json::to_string(&place.geometry)
                .map_err(|e| NlgeoError::Serialization(e.to_string()))?;
            let population = place.population.and_then(|p| i64::try_from(p).ok());

            sqlx::query(UPSERT_PLACE)
                .bind(&place.id.source)
                .bind(&place.id.source_id)
                .bind(&place.name)
                .bind(place.place_type.as_str())
                .bind(&place.alternate_names)
                .bind(place.alternate_names.join(" "))
                .bind(ancestors)
                .bind(population)
                .bind(properties)
                .bind(geometry)
                .execute(&mut *tx)
                .await
                .map_err(|e| db_error(&format!("Failed to upsert place {}", place.id), e))?;
        }

        tx.commit().await.map_err(|e| db_error("Failed to commit places", e))?;
        debug!(places = places.len(), "Upserted gazetteer places");
        Ok(places.len())
    }

    async fn count(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM geo_places")
            .fetch_one(self.pool())
            .await
            .map_err(|e| db_error("Failed to count places", e))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_select_the_same_columns() {
        assert!(FETCH_CANDIDATES.contains(SELECT_COLUMNS));
        assert!(FETCH_CANDIDATES.contains("plainto_tsquery('simple', $1)"));
        assert!(UPSERT_PLACE.contains("ON CONFLICT (source, source_id)"));
    }

    #[test]
    fn test_trigram_filter_uses_indexed_operator() {
        // A function call in the filter cannot use geo_places_name_trgm_idx
        let filter = FETCH_CANDIDATES.split("ORDER BY").next().unwrap_or_default();
        assert!(filter.contains("lower(name) % lower($1)"));
        assert!(!filter.contains("similarity("));
        assert!(SET_TRIGRAM_THRESHOLD.contains("pg_trgm.similarity_threshold"));
        // Local to the transaction, so pooled connections keep their default
        assert!(SET_TRIGRAM_THRESHOLD.ends_with("true)"));
    }
}
