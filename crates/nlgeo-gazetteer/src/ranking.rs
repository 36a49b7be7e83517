//! Pure ranking of gazetteer records against a query.
//!
//! Three tiers are scored for every record:
//!
//! 1. exact name match (case and whitespace insensitive), score 1.0
//! 2. trigram similarity of the name above the configured threshold
//! 3. full-text match over a weighted document: the name (weight 1.0), the
//!    place type (0.4) and the alternate names (0.1)
//!
//! Hits from all tiers are merged and deduplicated per place, keeping the
//! best tier, then sorted into a total order so that the same records always
//! rank the same way.

use nlgeo_core::config::SearchConfig;
use nlgeo_core::models::{normalize_name, MatchKind, PlaceCandidate, PlaceRecord, PlaceType};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

const WEIGHT_NAME: f64 = 1.0;
const WEIGHT_PLACE_TYPE: f64 = 0.4;
const WEIGHT_ALTERNATE: f64 = 0.1;

/// What the caller is looking for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub type_hint: Option<PlaceType>,
    /// Name of a place expected among the candidate's ancestors
    pub containment_hint: Option<String>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    pub fn with_type(mut self, place_type: Option<PlaceType>) -> Self {
        self.type_hint = place_type;
        self
    }

    pub fn within(mut self, hint: Option<impl Into<String>>) -> Self {
        self.containment_hint = hint.map(Into::into);
        self
    }
}

/// One tier match of one record
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<'a> {
    pub record: &'a PlaceRecord,
    pub kind: MatchKind,
    pub score: f64,
}

/// Lowercase alphanumeric words of a text
pub fn lexemes(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Trigrams of a text: each word is padded with two leading blanks and one
/// trailing blank before being cut into three-character windows.
pub fn trigrams(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for word in lexemes(text) {
        let padded: Vec<char> = "  ".chars().chain(word.chars()).chain(" ".chars()).collect();
        for window in padded.windows(3) {
            out.insert(window.iter().collect());
        }
    }
    out
}

/// Shared trigrams over all distinct trigrams of both texts
pub fn trigram_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Weighted full-text rank of a record, `None` unless every query lexeme
/// occurs somewhere in the record's document.
pub fn fulltext_rank(query_lexemes: &[String], record: &PlaceRecord) -> Option<f64> {
    if query_lexemes.is_empty() {
        return None;
    }

    let mut weights: HashMap<String, f64> = HashMap::new();
    let mut add = |text: &str, weight: f64| {
        for lexeme in lexemes(text) {
            let entry = weights.entry(lexeme).or_insert(0.0);
            if weight > *entry {
                *entry = weight;
            }
        }
    };
    add(&record.name, WEIGHT_NAME);
    add(record.place_type.as_str(), WEIGHT_PLACE_TYPE);
    for alternate in &record.alternate_names {
        add(alternate, WEIGHT_ALTERNATE);
    }

    let mut total = 0.0;
    for lexeme in query_lexemes {
        total += weights.get(lexeme)?;
    }
    Some(total / query_lexemes.len() as f64)
}

/// Every tier a record matches in
pub fn score_record<'a>(
    query: &str,
    record: &'a PlaceRecord,
    trigram_threshold: f64,
) -> Vec<Hit<'a>> {
    let wanted = normalize_name(query);
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    if normalize_name(&record.name) == wanted {
        hits.push(Hit { record, kind: MatchKind::Exact, score: 1.0 });
    }

    let similarity = trigram_similarity(&trigrams(query), &trigrams(&record.name));
    if similarity > trigram_threshold {
        hits.push(Hit { record, kind: MatchKind::Trigram, score: similarity });
    }

    if let Some(rank) = fulltext_rank(&lexemes(query), record) {
        hits.push(Hit { record, kind: MatchKind::Fulltext, score: rank });
    }
    hits
}

/// Keep one hit per place: the lowest tier, then the highest score.
/// First-seen order is preserved among the survivors.
pub fn dedup_hits(hits: Vec<Hit<'_>>) -> Vec<Hit<'_>> {
    let mut best: Vec<Hit<'_>> = Vec::with_capacity(hits.len());
    let mut index: HashMap<_, usize> = HashMap::new();

    for hit in hits {
        match index.get(&hit.record.id) {
            Some(&i) => {
                let current = &best[i];
                let better = hit.kind.tier() < current.kind.tier()
                    || (hit.kind.tier() == current.kind.tier() && hit.score > current.score);
                if better {
                    best[i] = hit;
                }
            }
            None => {
                index.insert(hit.record.id.clone(), best.len());
                best.push(hit);
            }
        }
    }
    best
}

/// Build candidates from deduplicated hits and sort them.
pub fn order_hits(
    hits: Vec<Hit<'_>>,
    query: &SearchQuery,
    config: &SearchConfig,
) -> Vec<PlaceCandidate> {
    let mut candidates: Vec<PlaceCandidate> = hits
        .into_iter()
        .map(|hit| {
            let record = hit.record;
            let mut candidate = PlaceCandidate {
                id: record.id.clone(),
                name: record.name.clone(),
                place_type: record.place_type,
                geometry: record.geometry.clone(),
                ancestors: record.ancestors.clone(),
                population: record.population,
                score: hit.score,
                match_kind: hit.kind,
                containment_match: false,
                type_match: query.type_hint == Some(record.place_type),
            };
            if let Some(hint) = query.containment_hint.as_deref() {
                candidate.containment_match = candidate.has_ancestor_named(hint);
            }
            candidate
        })
        .collect();

    candidates.sort_by(|a, b| compare_candidates(a, b, config));
    candidates
}

/// Total order of candidates: tier, containment match, type match, score,
/// place type order, source order, population, id.
pub fn compare_candidates(
    a: &PlaceCandidate,
    b: &PlaceCandidate,
    config: &SearchConfig,
) -> Ordering {
    a.match_kind
        .tier()
        .cmp(&b.match_kind.tier())
        .then_with(|| b.containment_match.cmp(&a.containment_match))
        .then_with(|| b.type_match.cmp(&a.type_match))
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| {
            config.place_type_rank(a.place_type).cmp(&config.place_type_rank(b.place_type))
        })
        .then_with(|| config.source_rank(a.source()).cmp(&config.source_rank(b.source())))
        .then_with(|| a.source().cmp(b.source()))
        .then_with(|| b.population.unwrap_or(0).cmp(&a.population.unwrap_or(0)))
        .then_with(|| a.id.cmp(&b.id))
}

/// Rank records for a query and keep at most `result_limit` candidates.
pub fn rank_candidates(
    query: &SearchQuery,
    records: &[PlaceRecord],
    config: &SearchConfig,
) -> Vec<PlaceCandidate> {
    let hits: Vec<Hit<'_>> = records
        .iter()
        .flat_map(|record| score_record(&query.text, record, config.trigram_threshold))
        .collect();

    let mut candidates = order_hits(dedup_hits(hits), query, config);
    candidates.truncate(config.result_limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlgeo_core::models::{Geometry, PlaceId};

    fn place(source: &str, id: &str, name: &str, place_type: PlaceType) -> PlaceRecord {
        PlaceRecord::new(PlaceId::new(source, id), name, place_type, Geometry::point(0.0, 0.0))
    }

    #[test]
    fn test_trigrams_match_pg_trgm() {
        let t = trigrams("cat");
        let expected: BTreeSet<String> =
            ["  c", " ca", "cat", "at "].iter().map(|s| s.to_string()).collect();
        assert_eq!(t, expected);
    }

    #[test]
    fn test_trigram_similarity() {
        let a = trigrams("Annapolis");
        assert_eq!(trigram_similarity(&a, &a), 1.0);
        let b = trigrams("Anapolis");
        let sim = trigram_similarity(&a, &b);
        assert!(sim > 0.3 && sim < 1.0, "similarity {}", sim);
        assert_eq!(trigram_similarity(&trigrams(""), &trigrams("")), 0.0);
    }

    #[test]
    fn test_fulltext_weights() {
        let record = place("wof", "1", "Boston", PlaceType::Locality)
            .with_alternate_names(["Beantown"]);
        assert_eq!(fulltext_rank(&lexemes("boston"), &record), Some(1.0));
        let both = fulltext_rank(&lexemes("boston locality"), &record).unwrap();
        assert!((both - 0.7).abs() < 1e-12);
        assert_eq!(fulltext_rank(&lexemes("beantown"), &record), Some(0.1));
        assert_eq!(fulltext_rank(&lexemes("boston harbor"), &record), None);
    }

    #[test]
    fn test_same_place_in_three_tiers_returned_once_as_exact() {
        let annapolis = place("wof", "1", "Annapolis", PlaceType::Locality);
        let other = place("wof", "2", "Annapolis Junction", PlaceType::Locality);
        let hits = vec![
            Hit { record: &annapolis, kind: MatchKind::Fulltext, score: 0.5 },
            Hit { record: &other, kind: MatchKind::Trigram, score: 0.6 },
            Hit { record: &annapolis, kind: MatchKind::Trigram, score: 0.9 },
            Hit { record: &annapolis, kind: MatchKind::Exact, score: 1.0 },
        ];

        let query = SearchQuery::new("Annapolis");
        let ranked = order_hits(dedup_hits(hits), &query, &SearchConfig::default());

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, PlaceId::new("wof", "1"));
        assert_eq!(ranked[0].match_kind, MatchKind::Exact);
        assert_eq!(ranked[0].score, 1.0);
        assert_eq!(ranked.iter().filter(|c| c.id == annapolis.id).count(), 1);
    }

    #[test]
    fn test_tiers_rank_before_scores() {
        let records = vec![
            place("wof", "1", "Springfield Township", PlaceType::Localadmin),
            place("wof", "2", "Springfield", PlaceType::Locality),
            place("wof", "3", "Springfeld", PlaceType::Locality),
        ];
        let ranked = rank_candidates(&SearchQuery::new("springfield"), &records, &SearchConfig::default());
        let kinds: Vec<_> = ranked.iter().map(|c| (c.id.source_id.as_str(), c.match_kind)).collect();
        assert_eq!(kinds[0], ("2", MatchKind::Exact));
        assert!(kinds[1..].iter().all(|(_, k)| *k != MatchKind::Exact));
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn test_containment_hint_promotes_within_tier() {
        let maryland = place("wof", "md", "Maryland", PlaceType::Region);
        let california = place("wof", "ca", "California", PlaceType::Region);
        let records = vec![
            place("wof", "1", "Annapolis", PlaceType::Locality).with_ancestor(&california),
            place("wof", "2", "Annapolis", PlaceType::Locality).with_ancestor(&maryland),
        ];

        let query = SearchQuery::new("Annapolis").within(Some("maryland"));
        let ranked = rank_candidates(&query, &records, &SearchConfig::default());
        assert_eq!(ranked[0].id.source_id, "2");
        assert!(ranked[0].containment_match);
        assert!(!ranked[1].containment_match);
    }

    #[test]
    fn test_tie_breaks_are_total() {
        let records = vec![
            place("wof", "9", "Georgia", PlaceType::Region),
            place("ne", "4", "Georgia", PlaceType::Country),
            place("comp", "7", "Georgia", PlaceType::Region),
            place("wof", "3", "Georgia", PlaceType::Country).with_population(3_700_000),
            place("wof", "2", "Georgia", PlaceType::Country),
        ];
        let ranked = rank_candidates(&SearchQuery::new("Georgia"), &records, &SearchConfig::default());
        let order: Vec<_> = ranked.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(order, vec!["ne:4", "wof:3", "wof:2", "comp:7", "wof:9"]);

        let mut reversed = records.clone();
        reversed.reverse();
        let again = rank_candidates(&SearchQuery::new("Georgia"), &reversed, &SearchConfig::default());
        assert_eq!(ranked, again);
    }

    #[test]
    fn test_type_hint_promotes() {
        let records = vec![
            place("wof", "1", "Washington", PlaceType::Region),
            place("wof", "2", "Washington", PlaceType::Locality),
        ];
        let query = SearchQuery::new("Washington").with_type(Some(PlaceType::Locality));
        let ranked = rank_candidates(&query, &records, &SearchConfig::default());
        assert_eq!(ranked[0].id.source_id, "2");
        assert!(ranked[0].type_match);
    }

    #[test]
    fn test_result_limit_and_empty_query() {
        let records: Vec<_> = (0..20)
            .map(|i| place("wof", &i.to_string(), "Paris", PlaceType::Locality))
            .collect();
        let config = SearchConfig { result_limit: 5, ..SearchConfig::default() };
        assert_eq!(rank_candidates(&SearchQuery::new("Paris"), &records, &config).len(), 5);
        assert!(rank_candidates(&SearchQuery::new("   "), &records, &config).is_empty());
    }
}
