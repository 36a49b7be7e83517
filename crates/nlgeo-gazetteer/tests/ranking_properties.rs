//! Ranking invariants over random gazetteers

use nlgeo_core::config::SearchConfig;
use nlgeo_core::models::{Geometry, MatchKind, PlaceId, PlaceRecord, PlaceType};
use nlgeo_gazetteer::ranking::{rank_candidates, SearchQuery};
use proptest::prelude::*;
use std::collections::HashSet;

const NAMES: [&str; 8] = [
    "Springfield",
    "Springfield Township",
    "Springfeld",
    "West Springfield",
    "Portland",
    "Portland Heights",
    "Salem",
    "New Salem",
];
const SOURCES: [&str; 4] = ["wof", "ne", "comp", "osm"];
const TYPES: [PlaceType; 4] =
    [PlaceType::Locality, PlaceType::County, PlaceType::Region, PlaceType::Localadmin];

fn arb_record() -> impl Strategy<Value = PlaceRecord> {
    (0..NAMES.len(), 0..SOURCES.len(), 0..TYPES.len(), 0u32..6, proptest::option::of(0u64..1000))
        .prop_map(|(name, source, place_type, id, population)| {
            let mut record = PlaceRecord::new(
                PlaceId::new(SOURCES[source], id.to_string()),
                NAMES[name],
                TYPES[place_type],
                Geometry::point(0.0, 0.0),
            );
            record.population = population;
            record
        })
}

/// Records with distinct keys, as a store holds them
fn arb_gazetteer() -> impl Strategy<Value = Vec<PlaceRecord>> {
    proptest::collection::vec(arb_record(), 0..24).prop_map(|records| {
        let mut seen = HashSet::new();
        records.into_iter().filter(|r| seen.insert(r.id.clone())).collect()
    })
}

fn arb_query() -> impl Strategy<Value = String> {
    prop_oneof![
        (0..NAMES.len()).prop_map(|i| NAMES[i].to_string()),
        Just("springfield".to_string()),
        Just("salem county".to_string()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn ranking_ignores_input_order(
        records in arb_gazetteer(),
        text in arb_query(),
    ) {
        let config = SearchConfig::default();
        let query = SearchQuery::new(text);
        let forward = rank_candidates(&query, &records, &config);

        let mut reversed = records.clone();
        reversed.reverse();
        let backward = rank_candidates(&query, &reversed, &config);

        let ids = |c: &[nlgeo_core::models::PlaceCandidate]| {
            c.iter().map(|c| (c.id.clone(), c.match_kind)).collect::<Vec<_>>()
        };
        prop_assert_eq!(ids(&forward), ids(&backward));
    }

    #[test]
    fn ranking_is_deduplicated_bounded_and_tiered(
        records in arb_gazetteer(),
        text in arb_query(),
    ) {
        let config = SearchConfig::default();
        let ranked = rank_candidates(&SearchQuery::new(text), &records, &config);

        prop_assert!(ranked.len() <= config.result_limit);

        let unique: HashSet<_> = ranked.iter().map(|c| c.id.clone()).collect();
        prop_assert_eq!(unique.len(), ranked.len());

        for pair in ranked.windows(2) {
            prop_assert!(pair[0].match_kind.tier() <= pair[1].match_kind.tier());
        }
        for candidate in ranked.iter().filter(|c| c.match_kind == MatchKind::Exact) {
            prop_assert_eq!(candidate.score, 1.0);
        }
    }
}
