use futures::future::{BoxFuture, FutureExt};
use nlgeo_core::config::{EvaluatorConfig, GeocodeSettings};
use nlgeo_core::error::{NlgeoError, Result};
use nlgeo_core::models::{
    Distance, Evaluation, Geometry, NodePath, OperatorKind, PlaceId, RequestNode, ResolutionTrace,
    ResolvedGeometry, TraceEntry, TraceOutcome,
};
use nlgeo_gazetteer::{GazetteerSearch, GazetteerStore};
use nlgeo_geo::GeometryAlgebra;
use tracing::{debug, info};

use crate::context::ResolutionContext;
use crate::resolver::EntityResolver;

/// A node's result while the tree is being evaluated
struct Evaluated {
    resolved: ResolvedGeometry,
    /// Nearest containing place of a resolved `NamedEntity`
    parent: Option<PlaceId>,
}

impl Evaluated {
    fn operator(geometry: Geometry, operator: OperatorKind, inputs: Vec<Evaluated>) -> Self {
        let inputs = inputs.into_iter().map(|e| e.resolved.provenance).collect();
        Self { resolved: ResolvedGeometry::from_operator(geometry, operator, inputs), parent: None }
    }
}

/// Evaluates spatial request trees into geometries.
///
/// Children are evaluated before their parent, left to right. The first
/// failure stops the evaluation and is returned unchanged; no partial
/// geometry is ever produced.
pub struct SpatialTreeEvaluator<S: GazetteerStore> {
    resolver: EntityResolver<S>,
    algebra: GeometryAlgebra,
    config: EvaluatorConfig,
}

impl<S: GazetteerStore> SpatialTreeEvaluator<S> {
    pub fn new(
        resolver: EntityResolver<S>,
        algebra: GeometryAlgebra,
        config: EvaluatorConfig,
    ) -> Self {
        Self { resolver, algebra, config }
    }

    /// Wire search, resolver and algebra over `store` from frozen settings
    pub fn from_settings(store: S, settings: &GeocodeSettings) -> Self {
        let search = GazetteerSearch::new(store, settings.search.clone());
        let resolver = EntityResolver::new(search, settings.resolver);
        let algebra = GeometryAlgebra::new(settings.algebra.clone());
        Self::new(resolver, algebra, settings.evaluator.clone())
    }

    pub fn resolver(&self) -> &EntityResolver<S> {
        &self.resolver
    }

    pub fn algebra(&self) -> &GeometryAlgebra {
        &self.algebra
    }

    /// Evaluate a tree to its geometry and resolution trace
    pub async fn evaluate(&self, tree: &RequestNode) -> Result<Evaluation> {
        let (result, trace) = self.evaluate_with_trace(tree).await;
        Ok(Evaluation { result: result?, trace })
    }

    /// Evaluate a tree, keeping the trace of the resolutions made even when
    /// evaluation fails.
    pub async fn evaluate_with_trace(
        &self,
        tree: &RequestNode,
    ) -> (Result<ResolvedGeometry>, ResolutionTrace) {
        let mut trace = ResolutionTrace::new();

        if let Err(err) = tree.validate(&self.config.limits, &self.algebra.config().units) {
            return (Err(err), trace);
        }

        let context = ResolutionContext::build(tree);
        let result = self
            .eval_node(tree, NodePath::root(), &context, &mut trace)
            .await
            .map(|evaluated| {
                let mut resolved = evaluated.resolved;
                resolved.geometry = self.algebra.normalize(&resolved.geometry);
                resolved
            });

        match &result {
            Ok(resolved) => info!(
                entities = trace.len(),
                geometry = ?resolved.geometry.geometry_type(),
                "Evaluated request tree"
            ),
            Err(err) => {
                info!(entities = trace.len(), error = %err, "Request tree evaluation failed")
            }
        }
        (result, trace)
    }

    fn eval_node<'a>(
        &'a self,
        node: &'a RequestNode,
        path: NodePath,
        context: &'a ResolutionContext,
        trace: &'a mut ResolutionTrace,
    ) -> BoxFuture<'a, Result<Evaluated>> {
        async move {
            debug!(path = %path, node_type = node.node_type(), "Evaluating node");
            match node {
                RequestNode::NamedEntity { name, place_type, subportion } => {
                    let hints = context.hints_for(&path);
                    let outcome = self.resolver.resolve(name, *place_type, hints).await;

                    let resolution = match outcome {
                        Ok(resolution) => resolution,
                        Err(err) => {
                            trace.push(TraceEntry {
                                path,
                                text: name.clone(),
                                hints: hints.to_vec(),
                                outcome: failed_outcome(&err),
                            });
                            return Err(err);
                        }
                    };

                    trace.push(TraceEntry {
                        path,
                        text: name.clone(),
                        hints: resolution.hints.clone(),
                        outcome: TraceOutcome::Resolved {
                            chosen: resolution.chosen.summary(),
                            alternatives: resolution
                                .alternatives
                                .iter()
                                .map(|c| c.summary())
                                .collect(),
                        },
                    });

                    let place = Evaluated {
                        resolved: ResolvedGeometry::from_place(&resolution.chosen),
                        parent: resolution.chosen.parent().map(|a| a.id.clone()),
                    };
                    match subportion {
                        None => Ok(place),
                        Some(sub) => {
                            let geometry =
                                self.algebra.subportion(&place.resolved.geometry, *sub)?;
                            let parent = place.parent.clone();
                            let mut out = Evaluated::operator(
                                geometry,
                                OperatorKind::Subportion { subportion: *sub },
                                vec![place],
                            );
                            out.parent = parent;
                            Ok(out)
                        }
                    }
                }

                RequestNode::Buffer { child_node, distance, distance_unit } => {
                    let child = self.eval_node(child_node, path.child(0), context, trace).await?;
                    let distance = Distance::new(*distance, *distance_unit);
                    let geometry = self.algebra.buffer(&child.resolved.geometry, distance)?;
                    let operator = OperatorKind::Buffer { distance };
                    Ok(Evaluated::operator(geometry, operator, vec![child]))
                }

                RequestNode::Intersection { child_nodes } | RequestNode::Union { child_nodes } => {
                    let mut children = Vec::with_capacity(child_nodes.len());
                    for (i, child) in child_nodes.iter().enumerate() {
                        let evaluated = self.eval_node(child, path.child(i), context, trace).await?;
                        children.push(evaluated);
                    }
                    let geometries: Vec<Geometry> =
                        children.iter().map(|c| c.resolved.geometry.clone()).collect();

                    let (geometry, operator) = match node {
                        RequestNode::Intersection { .. } => (
                            self.algebra.intersection_all(&geometries)?,
                            OperatorKind::Intersection,
                        ),
                        _ => (self.algebra.union_all(&geometries)?, OperatorKind::Union),
                    };
                    Ok(Evaluated::operator(geometry, operator, children))
                }

                RequestNode::Difference { child_node_1, child_node_2 }
                | RequestNode::Between { child_node_1, child_node_2 }
                | RequestNode::BorderBetween { child_node_1, child_node_2 } => {
                    let a = self.eval_node(child_node_1, path.child(0), context, trace).await?;
                    let b = self.eval_node(child_node_2, path.child(1), context, trace).await?;
                    let (ga, gb) = (&a.resolved.geometry, &b.resolved.geometry);

                    let (geometry, operator) = match node {
                        RequestNode::Difference { .. } => {
                            (self.algebra.difference(ga, gb), OperatorKind::Difference)
                        }
                        RequestNode::Between { .. } => {
                            (self.algebra.between(ga, gb)?, OperatorKind::Between)
                        }
                        _ => (self.algebra.border_between(ga, gb)?, OperatorKind::BorderBetween),
                    };
                    Ok(Evaluated::operator(geometry, operator, vec![a, b]))
                }

                RequestNode::DirectionalQualifier { child_node, direction } => {
                    let child = self.eval_node(child_node, path.child(0), context, trace).await?;
                    let reference = self.reference_region(&child).await?;
                    let geometry = self.algebra.directional(
                        &child.resolved.geometry,
                        *direction,
                        reference.as_ref(),
                    )?;
                    Ok(Evaluated::operator(
                        geometry,
                        OperatorKind::Directional { direction: *direction },
                        vec![child],
                    ))
                }

                RequestNode::BorderOf { child_node } => {
                    let child = self.eval_node(child_node, path.child(0), context, trace).await?;
                    let geometry = self.algebra.border_of(&child.resolved.geometry)?;
                    Ok(Evaluated::operator(geometry, OperatorKind::BorderOf, vec![child]))
                }
            }
        }
        .boxed()
    }

    /// The region a directional qualifier is clipped to: the containing place
    /// of a resolved entity when it can be fetched, otherwise the whole world.
    async fn reference_region(&self, child: &Evaluated) -> Result<Option<Geometry>> {
        if !self.config.clip_directional_to_parent {
            return Ok(None);
        }
        let Some(parent) = &child.parent else {
            return Ok(None);
        };
        let record = self.resolver.search().get_place(parent).await?;
        if record.is_none() {
            debug!(parent = %parent, "Containing place not in gazetteer, using world extent");
        }
        Ok(record.map(|r| r.geometry))
    }
}

fn failed_outcome(err: &NlgeoError) -> TraceOutcome {
    let candidates = match err {
        NlgeoError::Ambiguous { candidates, .. } => {
            candidates.iter().map(|c| c.summary()).collect()
        }
        _ => Vec::new(),
    };
    TraceOutcome::Failed { kind: err.kind().to_string(), message: err.to_string(), candidates }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlgeo_core::config::{AlgebraConfig, ResolverConfig, SearchConfig};
    use nlgeo_core::models::{Direction, DistanceUnit, PlaceRecord, PlaceType, Provenance};
    use nlgeo_gazetteer::MemoryGazetteer;

    fn evaluator(
        places: Vec<PlaceRecord>,
        config: EvaluatorConfig,
    ) -> SpatialTreeEvaluator<MemoryGazetteer> {
        let store = MemoryGazetteer::with_places(places);
        let search = GazetteerSearch::new(store, SearchConfig::default());
        SpatialTreeEvaluator::new(
            EntityResolver::new(search, ResolverConfig::default()),
            GeometryAlgebra::new(AlgebraConfig::default()),
            config,
        )
    }

    fn square(id: &str, name: &str, west: f64, south: f64, size: f64) -> PlaceRecord {
        PlaceRecord::new(
            PlaceId::new("wof", id),
            name,
            PlaceType::Region,
            Geometry::rect(west, south, west + size, south + size),
        )
    }

    #[tokio::test]
    async fn test_leaf_resolves_with_trace() {
        let ev = evaluator(vec![square("1", "Alpha", 0.0, 0.0, 1.0)], EvaluatorConfig::default());
        let evaluation = ev.evaluate(&RequestNode::named("Alpha")).await.unwrap();

        assert_eq!(evaluation.result.geometry, Geometry::rect(0.0, 0.0, 1.0, 1.0));
        assert_eq!(evaluation.trace.len(), 1);
        assert!(matches!(evaluation.trace.entries[0].outcome, TraceOutcome::Resolved { .. }));
    }

    #[tokio::test]
    async fn test_invalid_tree_rejected_before_lookup() {
        let ev = evaluator(vec![square("1", "Alpha", 0.0, 0.0, 1.0)], EvaluatorConfig::default());
        let tree = RequestNode::buffer(RequestNode::named("Alpha"), f64::NAN, DistanceUnit::Miles);

        let (result, trace) = ev.evaluate_with_trace(&tree).await;
        assert!(matches!(result, Err(NlgeoError::InvalidParameter { .. })));
        assert!(trace.is_empty());
    }

    #[tokio::test]
    async fn test_failure_short_circuits_later_siblings() {
        let ev = evaluator(vec![square("1", "Alpha", 0.0, 0.0, 1.0)], EvaluatorConfig::default());
        let tree = RequestNode::union(vec![
            RequestNode::named("Alpha"),
            RequestNode::named("Nowhereland"),
            RequestNode::named("Alpha"),
        ]);

        let (result, trace) = ev.evaluate_with_trace(&tree).await;
        let err = result.unwrap_err();
        assert!(matches!(err, NlgeoError::NotFound { ref text } if text == "Nowhereland"));
        assert_eq!(trace.len(), 2);
        let failure = trace.failure().unwrap();
        assert_eq!(failure.path, NodePath(vec![1]));
        assert!(matches!(
            &failure.outcome,
            TraceOutcome::Failed { kind, .. } if kind == "not_found"
        ));
    }

    #[tokio::test]
    async fn test_directional_clipped_to_parent_region() {
        let region = square("r", "Region", 0.0, 0.0, 10.0);
        let town = PlaceRecord::new(
            PlaceId::new("wof", "t"),
            "Town",
            PlaceType::Locality,
            Geometry::rect(4.0, 4.0, 5.0, 5.0),
        )
        .with_ancestor(&region);
        let tree = RequestNode::directional(RequestNode::named("Town"), Direction::North);

        let ev = evaluator(vec![region.clone(), town.clone()], EvaluatorConfig::default());
        let north = ev.evaluate(&tree).await.unwrap().result.geometry;
        assert!(ev.algebra().equivalent(&north, &Geometry::rect(0.0, 5.0, 10.0, 10.0)));

        let unclipped =
            EvaluatorConfig { clip_directional_to_parent: false, ..EvaluatorConfig::default() };
        let ev = evaluator(vec![region, town], unclipped);
        let north = ev.evaluate(&tree).await.unwrap().result.geometry;
        assert!(ev.algebra().equivalent(&north, &Geometry::rect(-180.0, 5.0, 180.0, 90.0)));
    }

    #[tokio::test]
    async fn test_directional_without_known_parent_uses_world() {
        let town = square("t", "Town", 4.0, 4.0, 1.0);
        let tree = RequestNode::directional(RequestNode::named("Town"), Direction::South);

        let ev = evaluator(vec![town], EvaluatorConfig::default());
        let south = ev.evaluate(&tree).await.unwrap().result.geometry;
        assert!(ev.algebra().equivalent(&south, &Geometry::rect(-180.0, -90.0, 180.0, 4.0)));
    }

    #[tokio::test]
    async fn test_subportion_recorded_in_provenance() {
        let ev = evaluator(vec![square("1", "Alpha", 0.0, 0.0, 2.0)], EvaluatorConfig::default());
        let tree: RequestNode = serde_json::from_str(
            r#"{"node_type": "NamedEntity", "name": "Alpha", "subportion": "western half"}"#,
        )
        .unwrap();

        let evaluation = ev.evaluate(&tree).await.unwrap();
        let west = &evaluation.result.geometry;
        assert!(ev.algebra().equivalent(west, &Geometry::rect(0.0, 0.0, 1.0, 2.0)));
        assert!(matches!(
            evaluation.result.provenance,
            Provenance::Operator { operator: OperatorKind::Subportion { .. }, .. }
        ));
    }
}
