use nlgeo_core::config::ResolverConfig;
use nlgeo_core::error::{NlgeoError, Result};
use nlgeo_core::models::{normalize_name, PlaceCandidate, PlaceType};
use nlgeo_gazetteer::{GazetteerSearch, GazetteerStore};
use tracing::{debug, info, warn};

use crate::context::split_qualified;

/// The place chosen for one named entity
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The entity text as written in the request
    pub text: String,
    /// Containment hints used, primary first
    pub hints: Vec<String>,
    pub chosen: PlaceCandidate,
    /// Every other candidate the search returned, in rank order
    pub alternatives: Vec<PlaceCandidate>,
}

/// Picks one gazetteer candidate per named entity, or refuses to guess.
pub struct EntityResolver<S: GazetteerStore> {
    search: GazetteerSearch<S>,
    config: ResolverConfig,
}

impl<S: GazetteerStore> EntityResolver<S> {
    pub fn new(search: GazetteerSearch<S>, config: ResolverConfig) -> Self {
        Self { search, config }
    }

    pub fn search(&self) -> &GazetteerSearch<S> {
        &self.search
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve entity `text` to a single place.
    ///
    /// Qualifiers after a comma in `text` come before the context `hints`.
    /// The primary hint is passed to the search as its containment hint and
    /// earns [`ResolverConfig::containment_bonus`] for candidates inside it.
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing matches, `Ambiguous` when several candidates
    /// stay tied after every hint has been tried, `BackendUnavailable` when
    /// the gazetteer cannot be queried.
    pub async fn resolve(
        &self,
        text: &str,
        type_hint: Option<PlaceType>,
        hints: &[String],
    ) -> Result<Resolution> {
        let (query, qualifiers) = split_qualified(text);
        let hints = merge_hints(qualifiers, hints);

        let primary = hints.first().map(String::as_str);
        let candidates = self.search.search(&query, type_hint, primary).await?;
        debug!(
            text,
            query = %query,
            hints = ?hints,
            candidates = candidates.len(),
            "Resolving entity"
        );

        let chosen = match self.select(&candidates, type_hint, &hints) {
            Selection::None => {
                return Err(NlgeoError::NotFound { text: text.to_string() });
            }
            Selection::Tied(tied) => {
                let ids: Vec<String> = tied.iter().map(|c| c.id.to_string()).collect();
                warn!(text, candidates = %ids.join(", "), "Ambiguous place name");
                return Err(NlgeoError::Ambiguous {
                    text: text.to_string(),
                    candidates: tied.into_iter().cloned().collect(),
                });
            }
            Selection::One(index) => index,
        };

        let mut alternatives = candidates;
        let chosen = alternatives.remove(chosen);
        info!(
            text,
            place = %chosen.id,
            name = %chosen.name,
            place_type = %chosen.place_type,
            alternatives = alternatives.len(),
            "Resolved entity"
        );

        Ok(Resolution { text: text.to_string(), hints, chosen, alternatives })
    }

    fn effective_score(&self, candidate: &PlaceCandidate) -> f64 {
        if candidate.containment_match {
            candidate.score + self.config.containment_bonus
        } else {
            candidate.score
        }
    }

    /// Apply the margin rule, then narrow a tie by the hints.
    fn select<'c>(
        &self,
        candidates: &'c [PlaceCandidate],
        type_hint: Option<PlaceType>,
        hints: &[String],
    ) -> Selection<'c> {
        let Some(first) = candidates.first() else {
            return Selection::None;
        };
        if candidates.len() == 1 {
            return Selection::One(0);
        }

        // Only the best tier competes; a worse tier never ties with a better one.
        let tier = first.match_kind.tier();
        let mut contenders: Vec<(usize, f64)> = candidates
            .iter()
            .enumerate()
            .take_while(|(_, c)| c.match_kind.tier() == tier)
            .map(|(i, c)| (i, self.effective_score(c)))
            .collect();
        // Stable: rank order breaks equal effective scores.
        contenders.sort_by(|a, b| b.1.total_cmp(&a.1));

        let (top, top_score) = contenders[0];
        match contenders.get(1) {
            None => return Selection::One(top),
            Some(&(_, second)) if top_score - second > self.config.ambiguity_margin => {
                return Selection::One(top);
            }
            Some(_) => {}
        }

        let mut tied: Vec<usize> = contenders
            .iter()
            .filter(|(_, score)| top_score - score <= self.config.ambiguity_margin)
            .map(|(i, _)| *i)
            .collect();

        // Narrowing steps, tried in order: type hint, primary hint, other hints.
        let mut narrowings: Vec<Box<dyn Fn(&PlaceCandidate) -> bool + '_>> = Vec::new();
        if let Some(wanted) = type_hint {
            narrowings.push(Box::new(move |c: &PlaceCandidate| c.place_type == wanted));
        }
        if !hints.is_empty() {
            narrowings.push(Box::new(|c: &PlaceCandidate| c.containment_match));
        }
        for hint in hints.iter().skip(1) {
            narrowings.push(Box::new(move |c: &PlaceCandidate| c.has_ancestor_named(hint)));
        }

        for keep in &narrowings {
            let narrowed: Vec<usize> =
                tied.iter().copied().filter(|&i| keep(&candidates[i])).collect();
            match narrowed.len() {
                0 => {}
                1 => return Selection::One(narrowed[0]),
                _ => tied = narrowed,
            }
        }

        tied.sort_unstable();
        Selection::Tied(tied.into_iter().map(|i| &candidates[i]).collect())
    }
}

enum Selection<'c> {
    None,
    One(usize),
    Tied(Vec<&'c PlaceCandidate>),
}

/// Qualifiers first, then context hints, without repeats
fn merge_hints(qualifiers: Vec<String>, context: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(qualifiers.len() + context.len());
    for hint in qualifiers.into_iter().chain(context.iter().cloned()) {
        let key = normalize_name(&hint);
        if !key.is_empty() && !merged.iter().any(|h| normalize_name(h) == key) {
            merged.push(hint);
        }
    }
    merged
}
