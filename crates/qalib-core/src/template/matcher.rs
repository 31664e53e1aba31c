//! Exact and fuzzy template lookup.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::models::config::MatchingConfig;
use crate::models::observation::{DocumentObservation, fold_digit};
use crate::models::template::{DocumentType, InvoiceTemplate};
use super::builder::template_id_for;
use super::hints::{FieldHint, HintGenerator};
use super::store::TemplateStore;

/// Boost factor applied on an exact tax-number hit.
const EXACT_BOOST_FACTOR: f32 = 0.1;

/// Boost factor applied on a fuzzy accept. Deliberately smaller than the
/// exact-match factor.
const FUZZY_BOOST_FACTOR: f32 = 0.05;

/// Transient result of a template lookup. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateMatch {
    /// The matched template, if any.
    pub template: Option<InvoiceTemplate>,

    /// Match score in [0, 1]. Exactly 1.0 on an exact key hit.
    pub match_score: f32,

    /// Field names present in both the observation and the template
    /// (all template fields on an exact hit).
    pub matched_fields: Vec<String>,

    /// Field hints projected from the matched template.
    pub hints: HashMap<String, FieldHint>,

    /// Additive confidence adjustment for the extraction pipeline.
    pub confidence_boost: f32,
}

impl TemplateMatch {
    /// An empty no-match result.
    pub fn none() -> Self {
        Self {
            template: None,
            match_score: 0.0,
            matched_fields: Vec::new(),
            hints: HashMap::new(),
            confidence_boost: 0.0,
        }
    }

    /// Whether a template was matched.
    pub fn is_match(&self) -> bool {
        self.template.is_some()
    }
}

/// Resolves a (possibly partial) observation to a known template.
pub struct TemplateMatcher {
    config: MatchingConfig,
    hints: HintGenerator,
}

impl TemplateMatcher {
    /// Create a matcher with the given configuration.
    pub fn new(config: MatchingConfig) -> Self {
        let hints = HintGenerator::new().with_max_candidates(config.max_hint_candidates);
        Self { config, hints }
    }

    /// Find the best template for an observation: exact tax-number lookup
    /// first, fuzzy scoring as the fallback.
    pub fn find(&self, store: &TemplateStore, observation: &DocumentObservation) -> TemplateMatch {
        if let Some(tax_number) = observation.tax_number() {
            let template_id = template_id_for(&tax_number);
            if let Some(template) = store.get(&template_id) {
                debug!("exact template match: {}", template_id);
                return TemplateMatch {
                    match_score: 1.0,
                    matched_fields: template.field_names(),
                    hints: self.hints.generate(template),
                    confidence_boost: template.confidence_score * EXACT_BOOST_FACTOR,
                    template: Some(template.clone()),
                };
            }
        }

        self.find_fuzzy(store, observation)
    }

    fn find_fuzzy(
        &self,
        store: &TemplateStore,
        observation: &DocumentObservation,
    ) -> TemplateMatch {
        let present = observation.present_fields();
        let observed_name = observation.vendor.name.as_deref().unwrap_or("");

        let mut best: Option<(f32, &InvoiceTemplate)> = None;
        for template in store.list() {
            let score = self.score(template, observed_name, &present, observation.document_type);
            let better = match best {
                None => true,
                Some((best_score, best_template)) => {
                    score > best_score
                        || (score == best_score && wins_tie(template, best_template))
                }
            };
            if better {
                best = Some((score, template));
            }
        }

        match best {
            Some((score, template)) if score > self.config.accept_threshold => {
                debug!(
                    "fuzzy template match: {} (score {:.3})",
                    template.template_id, score
                );
                let matched_fields = present
                    .iter()
                    .filter(|path| template.fields.contains_key(**path))
                    .map(|path| path.to_string())
                    .collect();
                TemplateMatch {
                    match_score: score,
                    matched_fields,
                    hints: self.hints.generate(template),
                    confidence_boost: score * template.confidence_score * FUZZY_BOOST_FACTOR,
                    template: Some(template.clone()),
                }
            }
            _ => TemplateMatch::none(),
        }
    }

    fn score(
        &self,
        template: &InvoiceTemplate,
        observed_name: &str,
        present: &[&str],
        document_type: DocumentType,
    ) -> f32 {
        let name_score = name_similarity(observed_name, &template.vendor_name);

        let overlap = if template.fields.is_empty() {
            0.0
        } else {
            let shared = present
                .iter()
                .filter(|path| template.fields.contains_key(**path))
                .count();
            shared as f32 / template.fields.len() as f32
        };

        // Unknown never counts as a type match.
        let type_score = if document_type != DocumentType::Unknown
            && document_type == template.document_type
        {
            1.0
        } else {
            0.0
        };

        self.config.name_weight * name_score
            + self.config.field_weight * overlap
            + self.config.document_type_weight * type_score
    }
}

/// Deterministic tie-break: higher confidence, then most recently updated.
fn wins_tie(candidate: &InvoiceTemplate, current: &InvoiceTemplate) -> bool {
    candidate.confidence_score > current.confidence_score
        || (candidate.confidence_score == current.confidence_score
            && candidate.last_updated > current.last_updated)
}

/// Jaccard similarity over the character sets of two vendor names.
/// Order and frequency insensitive.
pub fn name_similarity(a: &str, b: &str) -> f32 {
    let set_a = char_set(a);
    let set_b = char_set(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count() as f32;
    let union = set_a.union(&set_b).count() as f32;
    intersection / union
}

fn char_set(name: &str) -> BTreeSet<char> {
    name.chars()
        .map(fold_digit)
        .flat_map(|c| c.to_lowercase())
        .filter(|c| c.is_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::builder::TemplateBuilder;
    use rust_decimal::Decimal;

    fn store_with(observations: &[DocumentObservation]) -> TemplateStore {
        let mut store = TemplateStore::open("target/test-templates-unused", 100);
        let builder = TemplateBuilder::new();
        for obs in observations {
            builder.learn(&mut store, obs);
        }
        store
    }

    fn observation(name: &str, tax_number: Option<&str>) -> DocumentObservation {
        let mut obs = DocumentObservation::default();
        obs.vendor.name = Some(name.to_string());
        obs.vendor.tax_number = tax_number.map(str::to_string);
        obs.totals.total = Some(Decimal::new(10000, 2));
        obs
    }

    fn matcher() -> TemplateMatcher {
        TemplateMatcher::new(MatchingConfig::default())
    }

    #[test]
    fn test_exact_match_scores_one() {
        let learned = observation("Acme Trading Co", Some("300111111111111"));
        let store = store_with(&[learned.clone()]);

        let result = matcher().find(&store, &learned);
        assert!(result.is_match());
        assert_eq!(result.match_score, 1.0);
        let template = result.template.unwrap();
        assert_eq!(result.matched_fields.len(), template.fields.len());
        assert!((result.confidence_boost - template.confidence_score * 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_fuzzy_match_similar_vendor() {
        let learned = observation("Acme Trading Co", Some("300111111111111"));
        let store = store_with(&[learned]);

        // No tax number: falls back to fuzzy scoring on name + fields.
        let query = observation("Acme Trading", None);
        let result = matcher().find(&store, &query);

        assert!(result.is_match());
        assert!(result.match_score > 0.5);
        assert!(result.match_score < 1.0);
        assert!(result.matched_fields.contains(&"totals.total".to_string()));
        let template = result.template.unwrap();
        let expected_boost = result.match_score * template.confidence_score * 0.05;
        assert!((result.confidence_boost - expected_boost).abs() < 1e-6);
    }

    #[test]
    fn test_fuzzy_rejects_unrelated_vendor() {
        let learned = observation("Acme Trading Co", Some("300111111111111"));
        let store = store_with(&[learned]);

        let mut query = DocumentObservation::default();
        query.vendor.name = Some("مؤسسة البناء".to_string());
        let result = matcher().find(&store, &query);

        assert!(!result.is_match());
        assert_eq!(result.match_score, 0.0);
        assert!(result.matched_fields.is_empty());
    }

    #[test]
    fn test_fuzzy_boost_smaller_than_exact() {
        let learned = observation("Acme Trading Co", Some("300111111111111"));
        let store = store_with(&[learned.clone()]);

        let exact = matcher().find(&store, &learned);
        let fuzzy = matcher().find(&store, &observation("Acme Trading", None));
        assert!(fuzzy.confidence_boost < exact.confidence_boost);
    }

    #[test]
    fn test_tie_broken_by_confidence() {
        let a = observation("Acme Trading Co", Some("300111111111111"));
        let b = observation("Acme Trading Co", Some("300222222222222"));
        // Learn vendor B twice so its template carries more confidence.
        let store = store_with(&[a, b.clone(), b]);

        let query = observation("Acme Trading Co", None);
        let result = matcher().find(&store, &query);
        assert!(result.is_match());
        assert_eq!(
            result.template.unwrap().vendor_tax_number,
            "300222222222222"
        );
    }

    #[test]
    fn test_empty_store_never_matches() {
        let store = TemplateStore::open("target/test-templates-unused", 100);
        let result = matcher().find(&store, &observation("Acme", Some("300111111111111")));
        assert!(!result.is_match());
    }

    #[test]
    fn test_name_similarity() {
        assert_eq!(name_similarity("Acme", "Acme"), 1.0);
        assert_eq!(name_similarity("", "Acme"), 0.0);
        assert!(name_similarity("Acme Trading Co", "Acme Trading") > 0.8);
        // Order-insensitive by design: anagrams score identical.
        assert_eq!(name_similarity("abc", "cab"), 1.0);
        // Arabic names compare the same way.
        assert!(name_similarity("شركة أكمي", "شركة اكمي التجارية") > 0.5);
    }
}
