//! Field-location hints projected from learned templates.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::observation::TextBlock;
use crate::models::template::{FieldPosition, FieldType, InvoiceTemplate, Region};

/// Boost factor applied per field when a hint region captures candidates.
const HINT_BOOST_FACTOR: f32 = 0.1;

/// A field-location hint usable by the extraction pipeline as a prior.
#[derive(Debug, Clone, Serialize)]
pub struct FieldHint {
    /// Where the field is expected on the page, if learned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_region: Option<Region>,

    /// Coarse position category.
    pub relative_position: FieldPosition,

    /// Semantic type.
    pub field_type: FieldType,

    /// Field confidence from the template.
    pub confidence: f32,
}

/// A hint resolved against concrete OCR text blocks.
#[derive(Debug, Clone, Serialize)]
pub struct RegionHint {
    /// The expected region tested against.
    pub region: Region,

    /// Texts of blocks whose centroid fell inside the region.
    pub candidates: Vec<String>,

    /// Additive confidence adjustment when a candidate supports the field.
    pub confidence_boost: f32,
}

/// Projects matched templates into field-location hints.
pub struct HintGenerator {
    max_candidates: usize,
}

impl HintGenerator {
    /// Create a generator with the default candidate cap.
    pub fn new() -> Self {
        Self { max_candidates: 5 }
    }

    /// Set the maximum candidate texts per field.
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    /// Project a template into per-field hints. Pure: no store access.
    pub fn generate(&self, template: &InvoiceTemplate) -> HashMap<String, FieldHint> {
        template
            .fields
            .iter()
            .map(|(name, field)| {
                (
                    name.clone(),
                    FieldHint {
                        expected_region: field.expected_region,
                        relative_position: field.position,
                        field_type: field.field_type,
                        confidence: field.confidence,
                    },
                )
            })
            .collect()
    }

    /// Resolve a template's regions against OCR text blocks. For each field
    /// with a non-empty expected region, blocks whose centroid falls inside
    /// become candidates, capped at the configured maximum. Both sides are
    /// assumed normalized to the same coordinate space.
    pub fn apply(
        &self,
        blocks: &[TextBlock],
        template: &InvoiceTemplate,
    ) -> HashMap<String, RegionHint> {
        let mut hints = HashMap::new();

        for (name, field) in &template.fields {
            let Some(region) = field.expected_region else {
                continue;
            };
            if region.area() == 0.0 {
                continue;
            }

            let candidates: Vec<String> = blocks
                .iter()
                .filter(|block| {
                    block
                        .centroid()
                        .is_some_and(|(x, y)| region.contains(x, y))
                })
                .take(self.max_candidates)
                .map(|block| block.text.clone())
                .collect();

            hints.insert(
                name.clone(),
                RegionHint {
                    region,
                    candidates,
                    confidence_boost: field.confidence * HINT_BOOST_FACTOR,
                },
            );
        }

        hints
    }
}

impl Default for HintGenerator {
    fn default() -> Self {
        Self::new()
    }
}
