//! Template creation and incremental refinement from extraction results.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::models::observation::{DocumentObservation, FIELD_CATALOGUE, LayoutDescriptor};
use crate::models::template::{
    DocumentType, FieldInfo, FieldPosition, FieldType, InvoiceTemplate,
};
use super::store::TemplateStore;

/// Confidence is capped below 1.0: residual uncertainty is always retained.
pub(crate) const CONFIDENCE_CEILING: f32 = 0.95;

/// Fixed low prior for a template learned from a single document.
const NEW_TEMPLATE_CONFIDENCE: f32 = 0.5;

lazy_static! {
    static ref ISO_DATE_VALUE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref DIGITS_VALUE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref AMOUNT_VALUE: Regex = Regex::new(r"^\d+\.\d+$").unwrap();
}

/// Deterministic template id for a normalized vendor tax number.
pub fn template_id_for(tax_number: &str) -> String {
    let digest = Sha256::digest(tax_number.as_bytes());
    format!("tpl_{}", hex::encode(&digest[..8]))
}

/// Order-independent signature of a structural layout: sorted zone types,
/// column count, and the header-zone flag.
pub fn layout_signature_for(layout: &LayoutDescriptor) -> String {
    let mut kinds: Vec<&str> = layout.zones.iter().map(|z| z.zone_type.as_str()).collect();
    kinds.sort_unstable();

    let seed = format!(
        "{}|{}|{}",
        kinds.join(","),
        layout.column_count,
        layout.has_header_zone
    );
    let digest = Sha256::digest(seed.as_bytes());
    hex::encode(&digest[..8])
}

/// Derives field metadata from structured extraction results and creates or
/// incrementally updates the vendor's template.
pub struct TemplateBuilder;

impl TemplateBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self
    }

    /// Learn from one observation. Returns the template id, or `None` when
    /// the observation carries no vendor tax number (the store is untouched).
    pub fn learn(
        &self,
        store: &mut TemplateStore,
        observation: &DocumentObservation,
    ) -> Option<String> {
        let tax_number = observation.tax_number()?;
        let template_id = template_id_for(&tax_number);

        let template = match store.get(&template_id) {
            Some(existing) => self.update_template(existing.clone(), observation),
            None => self.create_template(template_id.clone(), &tax_number, observation),
        };

        debug!(
            "learned template {} ({} samples, confidence {:.2})",
            template_id, template.sample_count, template.confidence_score
        );
        store.put(template);
        Some(template_id)
    }

    fn create_template(
        &self,
        template_id: String,
        tax_number: &str,
        observation: &DocumentObservation,
    ) -> InvoiceTemplate {
        let mut fields = BTreeMap::new();
        for (path, field_type) in FIELD_CATALOGUE {
            if observation.has_field(path) {
                fields.insert(path.to_string(), new_field(path, *field_type, observation));
            }
        }

        InvoiceTemplate {
            template_id,
            vendor_name: observation.vendor.name.clone().unwrap_or_default(),
            vendor_tax_number: tax_number.to_string(),
            document_type: observation.document_type,
            fields,
            layout_signature: observation.layout.as_ref().map(layout_signature_for),
            sample_count: 1,
            last_updated: Utc::now(),
            confidence_score: NEW_TEMPLATE_CONFIDENCE,
            metadata: HashMap::new(),
        }
    }

    fn update_template(
        &self,
        mut template: InvoiceTemplate,
        observation: &DocumentObservation,
    ) -> InvoiceTemplate {
        for (path, field_type) in FIELD_CATALOGUE {
            if !observation.has_field(path) {
                continue;
            }
            match template.fields.get_mut(*path) {
                Some(field) => refine_field(field, path, observation),
                None => {
                    template
                        .fields
                        .insert(path.to_string(), new_field(path, *field_type, observation));
                }
            }
        }

        if let Some(name) = &observation.vendor.name {
            if !name.trim().is_empty() {
                template.vendor_name = name.clone();
            }
        }
        if observation.document_type != DocumentType::Unknown {
            template.document_type = observation.document_type;
        }
        if let Some(layout) = &observation.layout {
            template.layout_signature = Some(layout_signature_for(layout));
        }

        template.sample_count += 1;
        template.last_updated = Utc::now();
        template.confidence_score = template_confidence(template.sample_count);
        template
    }
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn new_field(path: &str, field_type: FieldType, observation: &DocumentObservation) -> FieldInfo {
    let mut label_patterns = BTreeSet::new();
    if let Some(label) = observation.field_labels.get(path) {
        label_patterns.insert(label.trim().to_lowercase());
    }

    let mut value_patterns = BTreeSet::new();
    if let Some(value) = observation.value_for(path) {
        value_patterns.insert(derive_value_pattern(&value));
    }

    FieldInfo {
        name: path.to_string(),
        field_type,
        expected_region: observation.field_regions.get(path).copied(),
        label_patterns,
        value_patterns,
        position: position_for(path),
        occurrence_count: 1,
        confidence: field_confidence(1),
    }
}

fn refine_field(field: &mut FieldInfo, path: &str, observation: &DocumentObservation) {
    if let Some(observed) = observation.field_regions.get(path) {
        field.expected_region = Some(match field.expected_region {
            // Prior weight = occurrences so far, so the estimate stabilizes.
            Some(region) => region.blend(observed, field.occurrence_count as f32),
            None => *observed,
        });
    }

    if let Some(label) = observation.field_labels.get(path) {
        field.label_patterns.insert(label.trim().to_lowercase());
    }
    if let Some(value) = observation.value_for(path) {
        field.value_patterns.insert(derive_value_pattern(&value));
    }

    field.occurrence_count += 1;
    field.confidence = field_confidence(field.occurrence_count);
}

/// Position by path convention: vendor/invoice fields sit in the header,
/// totals in the footer, everything else in the body.
fn position_for(path: &str) -> FieldPosition {
    if path.starts_with("vendor.") || path.starts_with("invoice.") {
        FieldPosition::Header
    } else if path.starts_with("totals.") {
        FieldPosition::Footer
    } else {
        FieldPosition::Body
    }
}

fn field_confidence(occurrences: u32) -> f32 {
    (0.5 + 0.1 * occurrences as f32).min(CONFIDENCE_CEILING)
}

/// Saturates after 3 observations so a single noisy sample is never
/// over-trusted.
fn template_confidence(samples: u32) -> f32 {
    (0.5 + 0.15 * samples.min(3) as f32).min(CONFIDENCE_CEILING)
}

/// Collapse an observed value into a character-class shape, e.g.
/// `INV-2024/18` becomes `[A-Z]+\-\d+/\d+`. Common whole-value forms get
/// fixed patterns first.
fn derive_value_pattern(value: &str) -> String {
    let value = value.trim();

    if ISO_DATE_VALUE.is_match(value) {
        return r"\d{4}-\d{2}-\d{2}".to_string();
    }
    if DIGITS_VALUE.is_match(value) {
        return format!(r"\d{{{}}}", value.chars().count());
    }
    if AMOUNT_VALUE.is_match(value) {
        return r"\d+\.\d+".to_string();
    }

    value_shape(value)
}

fn value_shape(value: &str) -> String {
    #[derive(PartialEq, Clone, Copy)]
    enum Class {
        Upper,
        Lower,
        Digit,
        Arabic,
        Space,
    }

    fn classify(c: char) -> Option<Class> {
        if c.is_ascii_uppercase() {
            Some(Class::Upper)
        } else if c.is_ascii_lowercase() {
            Some(Class::Lower)
        } else if c.is_ascii_digit() || ('\u{0660}'..='\u{0669}').contains(&c) {
            Some(Class::Digit)
        } else if ('\u{0600}'..='\u{06FF}').contains(&c) {
            Some(Class::Arabic)
        } else if c.is_whitespace() {
            Some(Class::Space)
        } else {
            None
        }
    }

    fn emit(class: Class, out: &mut String) {
        out.push_str(match class {
            Class::Upper => "[A-Z]+",
            Class::Lower => "[a-z]+",
            Class::Digit => r"\d+",
            Class::Arabic => r"\p{Arabic}+",
            Class::Space => r"\s+",
        });
    }

    let mut shape = String::new();
    let mut run: Option<Class> = None;
    for c in value.chars() {
        match classify(c) {
            Some(class) => {
                if run != Some(class) {
                    emit(class, &mut shape);
                    run = Some(class);
                }
            }
            None => {
                shape.push_str(&regex::escape(&c.to_string()));
                run = None;
            }
        }
    }
    shape
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::observation::{LayoutZone, ZoneType};
    use crate::models::template::{RELIABLE_SAMPLE_COUNT, Region};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn store() -> TemplateStore {
        // The tests never persist, so the directory is never created.
        TemplateStore::open("target/test-templates-unused", 100)
    }

    fn observation(tax_number: &str) -> DocumentObservation {
        let mut obs = DocumentObservation::default();
        obs.vendor.tax_number = Some(tax_number.to_string());
        obs.vendor.name = Some("Acme Trading Co".to_string());
        obs.totals.total = Some(Decimal::new(10000, 2));
        obs
    }

    #[test]
    fn test_template_id_deterministic() {
        let a = template_id_for("300111111111111");
        let b = template_id_for("300111111111111");
        assert_eq!(a, b);
        assert!(a.starts_with("tpl_"));
        assert_ne!(a, template_id_for("300222222222222"));
    }

    #[test]
    fn test_learn_without_tax_number_is_noop() {
        let mut store = store();
        let builder = TemplateBuilder::new();

        let mut obs = DocumentObservation::default();
        obs.vendor.name = Some("Acme".to_string());
        assert_eq!(builder.learn(&mut store, &obs), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_new_template_defaults() {
        let mut store = store();
        let builder = TemplateBuilder::new();

        let id = builder.learn(&mut store, &observation("300111111111111")).unwrap();
        let template = store.get(&id).unwrap();

        assert_eq!(template.sample_count, 1);
        assert_eq!(template.confidence_score, 0.5);
        assert_eq!(template.vendor_tax_number, "300111111111111");
        assert!(template.fields.contains_key("vendor.name"));
        assert!(template.fields.contains_key("vendor.tax_number"));
        assert!(template.fields.contains_key("totals.total"));
        assert!(!template.fields.contains_key("invoice.date"));
    }

    #[test]
    fn test_field_positions_follow_convention() {
        let mut store = store();
        let builder = TemplateBuilder::new();

        let mut obs = observation("300111111111111");
        obs.invoice.reference_number = Some("INV-2024/18".to_string());
        obs.line_items.push(Default::default());

        let id = builder.learn(&mut store, &obs).unwrap();
        let template = store.get(&id).unwrap();
        assert_eq!(
            template.fields["vendor.name"].position,
            FieldPosition::Header
        );
        assert_eq!(
            template.fields["invoice.reference_number"].position,
            FieldPosition::Header
        );
        assert_eq!(
            template.fields["totals.total"].position,
            FieldPosition::Footer
        );
        assert_eq!(template.fields["line_items"].position, FieldPosition::Body);
    }

    #[test]
    fn test_sample_count_and_confidence_progression() {
        let mut store = store();
        let builder = TemplateBuilder::new();
        let obs = observation("300111111111111");

        let id = builder.learn(&mut store, &obs).unwrap();
        assert_eq!(store.get(&id).unwrap().confidence_score, 0.5);

        builder.learn(&mut store, &obs).unwrap();
        let after_two = store.get(&id).unwrap().confidence_score;
        assert!((after_two - 0.8).abs() < 1e-6);

        builder.learn(&mut store, &obs).unwrap();
        let template = store.get(&id).unwrap();
        assert_eq!(template.sample_count, RELIABLE_SAMPLE_COUNT);
        assert_eq!(template.confidence_score, CONFIDENCE_CEILING);
        assert!(template.is_reliable());

        // Saturated: further samples never push confidence past the ceiling.
        builder.learn(&mut store, &obs).unwrap();
        assert_eq!(store.get(&id).unwrap().confidence_score, CONFIDENCE_CEILING);
    }

    #[test]
    fn test_field_occurrences_bounded_by_sample_count() {
        let mut store = store();
        let builder = TemplateBuilder::new();

        let first = observation("300111111111111");
        let id = builder.learn(&mut store, &first).unwrap();

        // Second observation adds a field the first one lacked.
        let mut second = observation("300111111111111");
        second.invoice.date = chrono::NaiveDate::from_ymd_opt(2024, 3, 15);
        builder.learn(&mut store, &second).unwrap();

        let template = store.get(&id).unwrap();
        assert_eq!(template.sample_count, 2);
        assert_eq!(template.fields["totals.total"].occurrence_count, 2);
        assert_eq!(template.fields["invoice.date"].occurrence_count, 1);
        for field in template.fields.values() {
            assert!(field.occurrence_count <= template.sample_count);
        }
    }

    #[test]
    fn test_region_average_weighted_toward_prior() {
        let mut store = store();
        let builder = TemplateBuilder::new();

        let r1 = Region::new(0.1, 0.1, 0.3, 0.2);
        let r2 = Region::new(0.5, 0.5, 0.7, 0.6);

        let mut obs = observation("300111111111111");
        obs.field_regions.insert("totals.total".to_string(), r1);
        let id = builder.learn(&mut store, &obs).unwrap();
        builder.learn(&mut store, &obs).unwrap();

        obs.field_regions.insert("totals.total".to_string(), r2);
        builder.learn(&mut store, &obs).unwrap();

        let region = store.get(&id).unwrap().fields["totals.total"]
            .expected_region
            .unwrap();
        // (0.1 * 2 + 0.5) / 3: between r1 and r2 but closer to r1.
        assert!(region.x1 > r1.x1 && region.x1 < r2.x1);
        assert!(region.x1 - r1.x1 < r2.x1 - region.x1);
    }

    #[test]
    fn test_pattern_sets_union() {
        let mut store = store();
        let builder = TemplateBuilder::new();

        let mut obs = observation("300111111111111");
        obs.invoice.reference_number = Some("INV-2024/18".to_string());
        obs.field_labels
            .insert("invoice.reference_number".to_string(), "Invoice No".to_string());
        let id = builder.learn(&mut store, &obs).unwrap();

        obs.invoice.reference_number = Some("20240018".to_string());
        obs.field_labels
            .insert("invoice.reference_number".to_string(), "Ref".to_string());
        builder.learn(&mut store, &obs).unwrap();

        let field = &store.get(&id).unwrap().fields["invoice.reference_number"];
        assert_eq!(field.label_patterns.len(), 2);
        assert!(field.label_patterns.contains("invoice no"));
        assert_eq!(field.value_patterns.len(), 2);
        assert!(field.value_patterns.contains(r"\d{8}"));
    }

    #[test]
    fn test_layout_signature_order_independent() {
        let zones = |order: &[ZoneType]| LayoutDescriptor {
            zones: order
                .iter()
                .map(|z| LayoutZone {
                    zone_type: *z,
                    region: None,
                })
                .collect(),
            column_count: 2,
            has_header_zone: true,
        };

        let a = layout_signature_for(&zones(&[ZoneType::Header, ZoneType::Table, ZoneType::Text]));
        let b = layout_signature_for(&zones(&[ZoneType::Text, ZoneType::Header, ZoneType::Table]));
        assert_eq!(a, b);

        let c = layout_signature_for(&LayoutDescriptor {
            column_count: 3,
            ..zones(&[ZoneType::Header, ZoneType::Table, ZoneType::Text])
        });
        assert_ne!(a, c);
    }

    #[test]
    fn test_derive_value_pattern() {
        assert_eq!(derive_value_pattern("300111111111111"), r"\d{15}");
        assert_eq!(derive_value_pattern("2024-03-15"), r"\d{4}-\d{2}-\d{2}");
        assert_eq!(derive_value_pattern("59.80"), r"\d+\.\d+");
        assert_eq!(derive_value_pattern("INV-2024/18"), r"[A-Z]+\-\d+/\d+");
        assert_eq!(
            derive_value_pattern("شركة التجارة"),
            r"\p{Arabic}+\s+\p{Arabic}+"
        );
    }
}
