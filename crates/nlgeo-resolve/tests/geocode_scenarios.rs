//! End-to-end evaluation of request trees against an in-memory gazetteer

use nlgeo_core::config::GeocodeSettings;
use nlgeo_core::error::NlgeoError;
use nlgeo_core::models::{
    Direction, DistanceUnit, Geometry, PlaceId, PlaceRecord, PlaceType, RequestNode, TraceOutcome,
};
use nlgeo_gazetteer::MemoryGazetteer;
use nlgeo_resolve::SpatialTreeEvaluator;

fn place(id: &str, name: &str, place_type: PlaceType, bounds: [f64; 4]) -> PlaceRecord {
    let [west, south, east, north] = bounds;
    let geometry = Geometry::rect(west, south, east, north);
    PlaceRecord::new(PlaceId::new("wof", id), name, place_type, geometry)
}

fn gazetteer() -> Vec<PlaceRecord> {
    let usa = place("us", "United States", PlaceType::Country, [-125.0, 24.0, -66.0, 49.0]);
    let maryland = place("md", "Maryland", PlaceType::Region, [-79.5, 37.9, -75.0, 39.7])
        .with_ancestor(&usa);
    let massachusetts = place("ma", "Massachusetts", PlaceType::Region, [-73.5, 41.2, -69.9, 42.9])
        .with_ancestor(&usa);
    let uk = place("gb", "United Kingdom", PlaceType::Country, [-8.2, 49.9, 1.8, 58.7]);
    let nova_scotia = place("ns", "Nova Scotia", PlaceType::Region, [-66.4, 43.4, -59.7, 47.1]);

    vec![
        place("annapolis-md", "Annapolis", PlaceType::Locality, [-76.54, 38.94, -76.46, 39.0])
            .with_ancestor(&usa)
            .with_ancestor(&maryland),
        place("annapolis-ns", "Annapolis", PlaceType::County, [-65.7, 44.5, -64.8, 45.1])
            .with_ancestor(&nova_scotia),
        place("boston-ma", "Boston", PlaceType::Locality, [-71.19, 42.23, -70.99, 42.4])
            .with_ancestor(&usa)
            .with_ancestor(&massachusetts),
        place("boston-uk", "Boston", PlaceType::Locality, [-0.06, 52.95, 0.0, 53.0])
            .with_ancestor(&uk),
        place("springfield-il", "Springfield", PlaceType::Locality, [-89.8, 39.7, -89.6, 39.9]),
        place("springfield-mo", "Springfield", PlaceType::Locality, [-93.4, 37.1, -93.2, 37.3]),
        place("alpha", "Alpha", PlaceType::Region, [0.0, 0.0, 1.0, 1.0]),
        place("bravo", "Bravo", PlaceType::Region, [3.0, 0.0, 4.0, 1.0]),
        place("charlie", "Charlie", PlaceType::Region, [0.5, 0.5, 1.5, 1.5]),
        usa,
        maryland,
        massachusetts,
        uk,
        nova_scotia,
    ]
}

fn evaluator() -> SpatialTreeEvaluator<MemoryGazetteer> {
    SpatialTreeEvaluator::from_settings(
        MemoryGazetteer::with_places(gazetteer()),
        &GeocodeSettings::default(),
    )
}

#[tokio::test]
async fn test_buffered_locality_grows() {
    let ev = evaluator();
    let plain = ev.evaluate(&RequestNode::named("Annapolis, Maryland")).await.unwrap();
    let annapolis = RequestNode::named("Annapolis, Maryland");
    let tree = RequestNode::buffer(annapolis, 3.0, DistanceUnit::Miles);
    let buffered = ev.evaluate(&tree).await.unwrap();

    assert_eq!(buffered.trace.len(), 1);
    match &buffered.trace.entries[0].outcome {
        TraceOutcome::Resolved { chosen, .. } => {
            assert_eq!(chosen.id, PlaceId::new("wof", "annapolis-md"));
            assert_eq!(chosen.place_type, PlaceType::Locality);
        }
        other => panic!("expected a resolution, got {:?}", other),
    }

    let algebra = ev.algebra();
    assert!(
        algebra.area_square_meters(&buffered.result.geometry)
            > algebra.area_square_meters(&plain.result.geometry)
    );
}

#[tokio::test]
async fn test_sibling_region_disambiguates() {
    let ev = evaluator();
    let tree = RequestNode::intersection(vec![
        RequestNode::buffer(RequestNode::named("Boston"), 5.0, DistanceUnit::Miles),
        RequestNode::named("Massachusetts"),
    ]);
    let evaluation = ev.evaluate(&tree).await.unwrap();

    let boston = &evaluation.trace.entries[0];
    assert_eq!(boston.text, "Boston");
    assert_eq!(boston.hints, vec!["Massachusetts".to_string()]);
    match &boston.outcome {
        TraceOutcome::Resolved { chosen, alternatives } => {
            assert_eq!(chosen.id.source_id, "boston-ma");
            assert!(alternatives.iter().any(|a| a.id.source_id == "boston-uk"));
        }
        other => panic!("expected a resolution, got {:?}", other),
    }
    assert!(!evaluation.result.geometry.is_empty());
}

#[tokio::test]
async fn test_between_overlapping_places_is_degenerate() {
    let tree = RequestNode::between(RequestNode::named("Alpha"), RequestNode::named("Charlie"));
    let err = evaluator().evaluate(&tree).await.unwrap_err();
    assert!(matches!(
        err,
        NlgeoError::DegenerateGeometry { ref operation, .. } if operation == "between"
    ));
}

#[tokio::test]
async fn test_between_disjoint_places() {
    let ev = evaluator();
    let tree = RequestNode::between(RequestNode::named("Alpha"), RequestNode::named("Bravo"));
    let evaluation = ev.evaluate(&tree).await.unwrap();
    let corridor = &evaluation.result.geometry;
    assert!(ev.algebra().equivalent(corridor, &Geometry::rect(1.0, 0.0, 3.0, 1.0)));
}

#[tokio::test]
async fn test_equal_candidates_are_ambiguous() {
    let ev = evaluator();
    let (result, trace) = ev.evaluate_with_trace(&RequestNode::named("Springfield")).await;

    match result {
        Err(NlgeoError::Ambiguous { text, candidates }) => {
            assert_eq!(text, "Springfield");
            let ids: Vec<_> = candidates.iter().map(|c| c.id.source_id.as_str()).collect();
            assert_eq!(ids, vec!["springfield-il", "springfield-mo"]);
        }
        other => panic!("expected Ambiguous, got {:?}", other),
    }
    match &trace.failure().unwrap().outcome {
        TraceOutcome::Failed { kind, candidates, .. } => {
            assert_eq!(kind, "ambiguous");
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("expected a failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_directional_selects_the_right_side() {
    let ev = evaluator();
    let east = RequestNode::intersection(vec![
        RequestNode::directional(RequestNode::named("Alpha"), Direction::East),
        RequestNode::named("Bravo"),
    ]);
    let evaluation = ev.evaluate(&east).await.unwrap();
    let east_of_alpha = &evaluation.result.geometry;
    assert!(ev.algebra().equivalent(east_of_alpha, &Geometry::rect(3.0, 0.0, 4.0, 1.0)));

    let west = RequestNode::intersection(vec![
        RequestNode::directional(RequestNode::named("Alpha"), Direction::West),
        RequestNode::named("Bravo"),
    ]);
    let evaluation = ev.evaluate(&west).await.unwrap();
    assert!(evaluation.result.geometry.is_empty());
}

#[tokio::test]
async fn test_directional_stays_inside_containing_region() {
    let ev = evaluator();
    let tree =
        RequestNode::directional(RequestNode::named("Annapolis, Maryland"), Direction::North);
    let evaluation = ev.evaluate(&tree).await.unwrap();

    let north_in_maryland = Geometry::rect(-79.5, 39.0, -75.0, 39.7);
    assert!(ev.algebra().equivalent(&evaluation.result.geometry, &north_in_maryland));
}

#[tokio::test]
async fn test_evaluation_is_deterministic() {
    let ev = evaluator();
    let tree = RequestNode::union(vec![
        RequestNode::buffer(RequestNode::named("Boston"), 2.0, DistanceUnit::Kilometers),
        RequestNode::named("Massachusetts"),
        RequestNode::named("Annapolis, Maryland"),
    ]);

    let first = ev.evaluate(&tree).await.unwrap();
    let second = ev.evaluate(&tree).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unknown_place_stops_evaluation() {
    let ev = evaluator();
    let tree = RequestNode::difference(RequestNode::named("Atlantis"), RequestNode::named("Alpha"));
    let (result, trace) = ev.evaluate_with_trace(&tree).await;

    assert!(matches!(result, Err(NlgeoError::NotFound { ref text }) if text == "Atlantis"));
    assert_eq!(trace.len(), 1);
}
