//! Containment hints derived from the shape of a request tree.
//!
//! Places mentioned together in a tree are usually near each other, so the
//! other named entities around a mention are good guesses for its containing
//! region: in `Intersection(Boston, Massachusetts)` the mention of
//! Massachusetts tells the resolver which Boston is meant.

use nlgeo_core::models::{normalize_name, NodePath, RequestNode};
use std::collections::HashMap;

/// Split a comma-qualified name into the name proper and its qualifiers.
///
/// `"Annapolis, Maryland"` gives `("Annapolis", ["Maryland"])`. A name with
/// nothing before the first comma is kept whole.
pub fn split_qualified(text: &str) -> (String, Vec<String>) {
    let mut pieces = text.split(',').map(str::trim);
    let head = pieces.next().unwrap_or_default();
    if head.is_empty() {
        return (text.trim().to_string(), Vec::new());
    }
    let qualifiers = pieces.filter(|q| !q.is_empty()).map(str::to_string).collect();
    (head.to_string(), qualifiers)
}

/// Hints for every named entity of one tree, built once per evaluation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionContext {
    hints: HashMap<NodePath, Vec<String>>,
}

impl ResolutionContext {
    /// Collect hints for each `NamedEntity`.
    ///
    /// For each ancestor of a mention, nearest first, the named entities in
    /// the ancestor's other subtrees are added in tree order; mentions that
    /// declare a container place type (country, region, ...) go before the
    /// rest at each level. The mention's own name and repeats are skipped.
    pub fn build(tree: &RequestNode) -> Self {
        let entities = tree.named_entities();
        let mut hints = HashMap::with_capacity(entities.len());

        for (path, node) in &entities {
            let own = node.entity_name().map(|n| normalize_name(&split_qualified(n).0));
            let mut seen: Vec<String> = own.into_iter().collect();
            let mut ordered = Vec::new();

            for depth in (0..path.depth()).rev() {
                let (ancestor, branch) = (&path.0[..depth], &path.0[..=depth]);
                let mut level: Vec<(&NodePath, &RequestNode)> = entities
                    .iter()
                    .filter(|(other, _)| {
                        other.0.starts_with(ancestor) && !other.0.starts_with(branch)
                    })
                    .map(|(p, n)| (p, *n))
                    .collect();
                // Stable: tree order is kept within each group.
                level.sort_by_key(|(_, n)| !declares_container(n));

                for (_, other) in level {
                    let Some(name) = other.entity_name() else { continue };
                    let name = split_qualified(name).0;
                    let key = normalize_name(&name);
                    if key.is_empty() || seen.contains(&key) {
                        continue;
                    }
                    seen.push(key);
                    ordered.push(name);
                }
            }
            hints.insert(path.clone(), ordered);
        }
        Self { hints }
    }

    /// Hints for the named entity at `path`, primary first
    pub fn hints_for(&self, path: &NodePath) -> &[String] {
        self.hints.get(path).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn declares_container(node: &RequestNode) -> bool {
    matches!(node, RequestNode::NamedEntity { place_type: Some(t), .. } if t.is_container())
}
