//! The spatial request tree produced upstream and consumed by the evaluator.

use super::geometry::{DistanceUnit, UnitTable};
use super::place::PlaceType;
use crate::error::{NlgeoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compass direction of a directional qualifier ("north of X")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

/// A named half of a place ("western Brazil")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subportion {
    #[serde(rename = "western half")]
    WesternHalf,
    #[serde(rename = "eastern half")]
    EasternHalf,
    #[serde(rename = "northern half")]
    NorthernHalf,
    #[serde(rename = "southern half")]
    SouthernHalf,
}

impl Subportion {
    /// The side of the centroid that is kept
    pub fn direction(&self) -> Direction {
        match self {
            Subportion::WesternHalf => Direction::West,
            Subportion::EasternHalf => Direction::East,
            Subportion::NorthernHalf => Direction::North,
            Subportion::SouthernHalf => Direction::South,
        }
    }
}

/// Position of a node in the request tree: child indexes from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "root.{}", parts.join("."))
    }
}

/// Bounds enforced when re-validating a tree before evaluation
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    pub max_depth: usize,
    /// Largest absolute buffer distance, in meters
    pub max_buffer_meters: f64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            // Half the equatorial circumference.
            max_buffer_meters: 20_037_508.0,
        }
    }
}

/// A node of the spatial request tree.
///
/// Leaves are `NamedEntity`; every other variant composes the geometry of its
/// children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type")]
pub enum RequestNode {
    /// The name of a place somewhere in the world
    #[serde(alias = "NamedPlace")]
    NamedEntity {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        place_type: Option<PlaceType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subportion: Option<Subportion>,
    },

    /// Grow (or, with a negative distance, shrink) the child's area
    Buffer {
        child_node: Box<RequestNode>,
        distance: f64,
        distance_unit: DistanceUnit,
    },

    Intersection {
        child_nodes: Vec<RequestNode>,
    },

    Union {
        child_nodes: Vec<RequestNode>,
    },

    /// The first child's area minus the second's
    Difference {
        child_node_1: Box<RequestNode>,
        child_node_2: Box<RequestNode>,
    },

    /// The corridor between two areas
    Between {
        child_node_1: Box<RequestNode>,
        child_node_2: Box<RequestNode>,
    },

    /// "north of", "west of", ...
    #[serde(alias = "DirectionalConstraint")]
    DirectionalQualifier {
        child_node: Box<RequestNode>,
        direction: Direction,
    },

    /// The boundary of an area
    BorderOf {
        child_node: Box<RequestNode>,
    },

    /// The shared border of two areas
    BorderBetween {
        child_node_1: Box<RequestNode>,
        child_node_2: Box<RequestNode>,
    },
}

impl RequestNode {
    /// Parse a request tree from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| NlgeoError::SchemaViolation {
            reason: format!("Failed to parse request tree: {}", e),
        })
    }

    pub fn named(name: impl Into<String>) -> Self {
        RequestNode::NamedEntity { name: name.into(), place_type: None, subportion: None }
    }

    pub fn named_as(name: impl Into<String>, place_type: PlaceType) -> Self {
        RequestNode::NamedEntity { name: name.into(), place_type: Some(place_type), subportion: None }
    }

    pub fn buffer(child: RequestNode, distance: f64, distance_unit: DistanceUnit) -> Self {
        RequestNode::Buffer { child_node: Box::new(child), distance, distance_unit }
    }

    pub fn intersection(children: Vec<RequestNode>) -> Self {
        RequestNode::Intersection { child_nodes: children }
    }

    pub fn union(children: Vec<RequestNode>) -> Self {
        RequestNode::Union { child_nodes: children }
    }

    pub fn difference(a: RequestNode, b: RequestNode) -> Self {
        RequestNode::Difference { child_node_1: Box::new(a), child_node_2: Box::new(b) }
    }

    pub fn between(a: RequestNode, b: RequestNode) -> Self {
        RequestNode::Between { child_node_1: Box::new(a), child_node_2: Box::new(b) }
    }

    pub fn directional(child: RequestNode, direction: Direction) -> Self {
        RequestNode::DirectionalQualifier { child_node: Box::new(child), direction }
    }

    pub fn border_of(child: RequestNode) -> Self {
        RequestNode::BorderOf { child_node: Box::new(child) }
    }

    pub fn border_between(a: RequestNode, b: RequestNode) -> Self {
        RequestNode::BorderBetween { child_node_1: Box::new(a), child_node_2: Box::new(b) }
    }

    /// The `node_type` discriminator
    pub fn node_type(&self) -> &'static str {
        match self {
            RequestNode::NamedEntity { .. } => "NamedEntity",
            RequestNode::Buffer { .. } => "Buffer",
            RequestNode::Intersection { .. } => "Intersection",
            RequestNode::Union { .. } => "Union",
            RequestNode::Difference { .. } => "Difference",
            RequestNode::Between { .. } => "Between",
            RequestNode::DirectionalQualifier { .. } => "DirectionalQualifier",
            RequestNode::BorderOf { .. } => "BorderOf",
            RequestNode::BorderBetween { .. } => "BorderBetween",
        }
    }

    /// Direct children in order
    pub fn children(&self) -> Vec<&RequestNode> {
        match self {
            RequestNode::NamedEntity { .. } => Vec::new(),
            RequestNode::Buffer { child_node, .. }
            | RequestNode::DirectionalQualifier { child_node, .. }
            | RequestNode::BorderOf { child_node } => vec![child_node.as_ref()],
            RequestNode::Intersection { child_nodes } | RequestNode::Union { child_nodes } => {
                child_nodes.iter().collect()
            }
            RequestNode::Difference { child_node_1, child_node_2 }
            | RequestNode::Between { child_node_1, child_node_2 }
            | RequestNode::BorderBetween { child_node_1, child_node_2 } => {
                vec![child_node_1.as_ref(), child_node_2.as_ref()]
            }
        }
    }

    /// The name of a `NamedEntity`, `None` for composite nodes
    pub fn entity_name(&self) -> Option<&str> {
        match self {
            RequestNode::NamedEntity { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            RequestNode::NamedEntity { .. } => 1,
            _ => self.children().iter().map(|c| c.leaf_count()).sum(),
        }
    }

    /// Every named entity with its position, in pre-order
    pub fn named_entities(&self) -> Vec<(NodePath, &RequestNode)> {
        let mut out = Vec::new();
        collect_named(self, NodePath::root(), &mut out);
        out
    }

    /// Re-check operator parameters and structure before evaluation.
    pub fn validate(&self, limits: &ValidationLimits, units: &UnitTable) -> Result<()> {
        validate_node(self, &NodePath::root(), limits, units)
    }
}

fn collect_named<'a>(
    node: &'a RequestNode,
    path: NodePath,
    out: &mut Vec<(NodePath, &'a RequestNode)>,
) {
    if let RequestNode::NamedEntity { .. } = node {
        out.push((path, node));
        return;
    }
    for (i, child) in node.children().into_iter().enumerate() {
        collect_named(child, path.child(i), out);
    }
}

fn validate_node(
    node: &RequestNode,
    path: &NodePath,
    limits: &ValidationLimits,
    units: &UnitTable,
) -> Result<()> {
    if path.depth() > limits.max_depth {
        return Err(NlgeoError::SchemaViolation {
            reason: format!("tree deeper than {} levels at {}", limits.max_depth, path),
        });
    }

    match node {
        RequestNode::NamedEntity { name, .. } => {
            if name.trim().is_empty() {
                return Err(NlgeoError::invalid_parameter(
                    format!("{}.name", path),
                    "named entity text must not be empty",
                ));
            }
        }
        RequestNode::Buffer { distance, distance_unit, .. } => {
            if !distance.is_finite() {
                return Err(NlgeoError::invalid_parameter(
                    format!("{}.distance", path),
                    format!("buffer distance must be a finite number, got {}", distance),
                ));
            }
            let meters = units.to_meters(*distance, *distance_unit)?;
            if meters.abs() > limits.max_buffer_meters {
                return Err(NlgeoError::invalid_parameter(
                    format!("{}.distance", path),
                    format!(
                        "buffer of {} {} exceeds the maximum of {} meters",
                        distance,
                        distance_unit.as_str(),
                        limits.max_buffer_meters
                    ),
                ));
            }
        }
        RequestNode::Intersection { child_nodes } | RequestNode::Union { child_nodes } => {
            if child_nodes.len() < 2 {
                return Err(NlgeoError::SchemaViolation {
                    reason: format!(
                        "{} at {} needs at least 2 children, found {}",
                        node.node_type(),
                        path,
                        child_nodes.len()
                    ),
                });
            }
        }
        RequestNode::Difference { .. }
        | RequestNode::Between { .. }
        | RequestNode::DirectionalQualifier { .. }
        | RequestNode::BorderOf { .. }
        | RequestNode::BorderBetween { .. } => {}
    }

    for (i, child) in node.children().into_iter().enumerate() {
        validate_node(child, &path.child(i), limits, units)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_buffer_tree() {
        let json = r#"{
            "node_type": "Buffer",
            "child_node": {"node_type": "NamedEntity", "name": "Annapolis, Maryland"},
            "distance": 3,
            "distance_unit": "miles"
        }"#;
        let node = RequestNode::from_json(json).unwrap();
        assert_eq!(
            node,
            RequestNode::buffer(RequestNode::named("Annapolis, Maryland"), 3.0, DistanceUnit::Miles)
        );
    }

    #[test]
    fn test_parse_legacy_aliases() {
        let json = r#"{
            "node_type": "DirectionalConstraint",
            "child_node": {"node_type": "NamedPlace", "name": "Albuquerque", "subportion": "western half"},
            "direction": "west"
        }"#;
        let node = RequestNode::from_json(json).unwrap();
        match node {
            RequestNode::DirectionalQualifier { child_node, direction } => {
                assert_eq!(direction, Direction::West);
                assert!(matches!(
                    *child_node,
                    RequestNode::NamedEntity { subportion: Some(Subportion::WesternHalf), .. }
                ));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_unknown_direction_is_schema_violation() {
        let json = r#"{"node_type": "DirectionalQualifier",
            "child_node": {"node_type": "NamedEntity", "name": "Ohio"},
            "direction": "up"}"#;
        let err = RequestNode::from_json(json).unwrap_err();
        assert!(matches!(err, NlgeoError::SchemaViolation { .. }));
    }

    #[test]
    fn test_validate_rejects_non_finite_distance() {
        let node = RequestNode::buffer(RequestNode::named("Ohio"), f64::INFINITY, DistanceUnit::Miles);
        let err = node.validate(&ValidationLimits::default(), &UnitTable::standard()).unwrap_err();
        assert!(matches!(err, NlgeoError::InvalidParameter { .. }));
    }

    #[test]
    fn test_validate_accepts_negative_distance() {
        let node = RequestNode::buffer(RequestNode::named("Ohio"), -5.0, DistanceUnit::Miles);
        assert!(node.validate(&ValidationLimits::default(), &UnitTable::standard()).is_ok());
    }

    #[test]
    fn test_validate_rejects_huge_buffer() {
        let node = RequestNode::buffer(RequestNode::named("Ohio"), 50_000.0, DistanceUnit::Kilometers);
        assert!(node.validate(&ValidationLimits::default(), &UnitTable::standard()).is_err());
    }

    #[test]
    fn test_validate_rejects_single_child_union() {
        let node = RequestNode::union(vec![RequestNode::named("Ohio")]);
        let err = node.validate(&ValidationLimits::default(), &UnitTable::standard()).unwrap_err();
        assert!(matches!(err, NlgeoError::SchemaViolation { .. }));
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let node = RequestNode::difference(RequestNode::named("Ohio"), RequestNode::named("  "));
        let err = node.validate(&ValidationLimits::default(), &UnitTable::standard()).unwrap_err();
        match err {
            NlgeoError::InvalidParameter { parameter, .. } => assert_eq!(parameter, "root.1.name"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_named_entities_in_preorder() {
        let tree = RequestNode::intersection(vec![
            RequestNode::named("Massachusetts"),
            RequestNode::buffer(RequestNode::named("Boston"), 5.0, DistanceUnit::Miles),
        ]);
        let named: Vec<_> = tree
            .named_entities()
            .into_iter()
            .map(|(path, node)| (path.to_string(), node.entity_name().unwrap().to_string()))
            .collect();
        assert_eq!(
            named,
            vec![
                ("root.0".to_string(), "Massachusetts".to_string()),
                ("root.1.0".to_string(), "Boston".to_string()),
            ]
        );
        assert_eq!(tree.leaf_count(), 2);
    }
}
