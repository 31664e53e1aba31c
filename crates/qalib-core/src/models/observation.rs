//! Structured observation consumed from the extraction pipeline.
//!
//! One observation describes a single processed document: the extracted
//! field values, an optional layout descriptor, and the raw OCR text blocks.
//! Every section is optional; missing fields are absent, never errors.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::template::{DocumentType, FieldType, Region};

/// The fixed catalogue of invoice field paths a template can learn,
/// with the semantic type assigned to each.
pub const FIELD_CATALOGUE: &[(&str, FieldType)] = &[
    ("vendor.name", FieldType::Text),
    ("vendor.tax_number", FieldType::Number),
    ("invoice.reference_number", FieldType::Text),
    ("invoice.date", FieldType::Date),
    ("totals.subtotal", FieldType::Currency),
    ("totals.tax_amount", FieldType::Currency),
    ("totals.total", FieldType::Currency),
    ("line_items", FieldType::Table),
];

/// A structured extraction result for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentObservation {
    /// Vendor identification.
    pub vendor: VendorFields,

    /// Invoice header fields.
    pub invoice: InvoiceFields,

    /// Monetary totals.
    pub totals: TotalFields,

    /// Extracted line items.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,

    /// Document classification.
    pub document_type: DocumentType,

    /// Structural layout, when layout analysis ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutDescriptor>,

    /// Raw OCR text blocks with geometry.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text_blocks: Vec<TextBlock>,

    /// Normalized page region each field value was found in, by field path.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub field_regions: HashMap<String, Region>,

    /// Label text seen next to each field value, by field path.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub field_labels: HashMap<String, String>,
}

/// Vendor identification fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_number: Option<String>,
}

/// Invoice header fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// Monetary totals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
}

/// A single extracted line item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
}

/// An OCR text block with its geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    /// Recognized text.
    pub text: String,

    /// Bounding geometry, resolved to a box or polygon at deserialization.
    #[serde(flatten)]
    pub bounds: BlockBounds,

    /// Recognition confidence, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Bounding geometry of a text block. The wire shape is decided once at
/// the ingestion boundary: either an axis-aligned box or a polygon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockBounds {
    /// Axis-aligned box [x1, y1, x2, y2].
    Rect { bbox: [f32; 4] },
    /// Bounding polygon as [x, y] vertices.
    Polygon { polygon: Vec<[f32; 2]> },
}

impl TextBlock {
    /// Centroid of the bounding geometry: box midpoint or vertex mean.
    /// Returns `None` for an empty polygon.
    pub fn centroid(&self) -> Option<(f32, f32)> {
        match &self.bounds {
            BlockBounds::Rect { bbox } => {
                Some(((bbox[0] + bbox[2]) / 2.0, (bbox[1] + bbox[3]) / 2.0))
            }
            BlockBounds::Polygon { polygon } => {
                if polygon.is_empty() {
                    return None;
                }
                let n = polygon.len() as f32;
                let (sx, sy) = polygon
                    .iter()
                    .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p[0], sy + p[1]));
                Some((sx / n, sy / n))
            }
        }
    }
}

/// Structural layout descriptor for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutDescriptor {
    /// Detected structural zones.
    pub zones: Vec<LayoutZone>,

    /// Number of text columns.
    pub column_count: u32,

    /// Whether a dedicated header zone was detected.
    pub has_header_zone: bool,
}

/// One structural zone within a layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutZone {
    /// Zone type.
    pub zone_type: ZoneType,

    /// Zone region, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

/// Structural zone types reported by layout analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    /// Text paragraph zone.
    Text,
    /// Title or heading.
    Title,
    /// Table zone.
    Table,
    /// Page header zone.
    Header,
    /// Page footer zone.
    Footer,
    /// Figure or stamp.
    Figure,
    /// Unknown zone type.
    Unknown,
}

impl ZoneType {
    /// Stable string form used in layout signatures.
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneType::Text => "text",
            ZoneType::Title => "title",
            ZoneType::Table => "table",
            ZoneType::Header => "header",
            ZoneType::Footer => "footer",
            ZoneType::Figure => "figure",
            ZoneType::Unknown => "unknown",
        }
    }
}

impl DocumentObservation {
    /// Normalized vendor tax number, if one is present.
    pub fn tax_number(&self) -> Option<String> {
        self.vendor.tax_number.as_deref().and_then(normalize_tax_number)
    }

    /// Whether the observation carries a value for a catalogue field path.
    pub fn has_field(&self, path: &str) -> bool {
        match path {
            "vendor.name" => non_empty(self.vendor.name.as_deref()),
            "vendor.tax_number" => self.tax_number().is_some(),
            "invoice.reference_number" => non_empty(self.invoice.reference_number.as_deref()),
            "invoice.date" => self.invoice.date.is_some(),
            "totals.subtotal" => self.totals.subtotal.is_some(),
            "totals.tax_amount" => self.totals.tax_amount.is_some(),
            "totals.total" => self.totals.total.is_some(),
            "line_items" => !self.line_items.is_empty(),
            _ => false,
        }
    }

    /// Catalogue paths with a value in this observation.
    pub fn present_fields(&self) -> Vec<&'static str> {
        FIELD_CATALOGUE
            .iter()
            .map(|(path, _)| *path)
            .filter(|path| self.has_field(path))
            .collect()
    }

    /// String form of a field value, used for value pattern derivation.
    /// Table fields have no single value.
    pub fn value_for(&self, path: &str) -> Option<String> {
        match path {
            "vendor.name" => self.vendor.name.clone(),
            "vendor.tax_number" => self.tax_number(),
            "invoice.reference_number" => self.invoice.reference_number.clone(),
            "invoice.date" => self.invoice.date.map(|d| d.format("%Y-%m-%d").to_string()),
            "totals.subtotal" => self.totals.subtotal.map(|d| d.to_string()),
            "totals.tax_amount" => self.totals.tax_amount.map(|d| d.to_string()),
            "totals.total" => self.totals.total.map(|d| d.to_string()),
            _ => None,
        }
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|s| !s.trim().is_empty())
}

/// Fold an Arabic-Indic digit (U+0660-0669, U+06F0-06F9) to its ASCII form.
pub(crate) fn fold_digit(c: char) -> char {
    match c {
        '\u{0660}'..='\u{0669}' => {
            char::from_digit(c as u32 - 0x0660, 10).unwrap_or(c)
        }
        '\u{06F0}'..='\u{06F9}' => {
            char::from_digit(c as u32 - 0x06F0, 10).unwrap_or(c)
        }
        _ => c,
    }
}

/// Normalize a vendor tax number: fold Arabic-Indic digits to ASCII and
/// strip everything that is not a digit. Returns `None` when no digits
/// survive, which callers treat as "no stable key".
pub fn normalize_tax_number(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .map(fold_digit)
        .filter(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() { None } else { Some(digits) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_normalize_tax_number_ascii() {
        assert_eq!(
            normalize_tax_number("300-111-111111111"),
            Some("300111111111111".to_string())
        );
        assert_eq!(
            normalize_tax_number("VAT: 300111111111111"),
            Some("300111111111111".to_string())
        );
    }

    #[test]
    fn test_normalize_tax_number_arabic_indic() {
        assert_eq!(
            normalize_tax_number("٣٠٠١١١١١١١١١١١١"),
            Some("300111111111111".to_string())
        );
        assert_eq!(normalize_tax_number("۱۲۳"), Some("123".to_string()));
    }

    #[test]
    fn test_normalize_tax_number_empty() {
        assert_eq!(normalize_tax_number(""), None);
        assert_eq!(normalize_tax_number("   "), None);
        assert_eq!(normalize_tax_number("n/a"), None);
    }

    #[test]
    fn test_present_fields() {
        let mut obs = DocumentObservation::default();
        assert!(obs.present_fields().is_empty());

        obs.vendor.tax_number = Some("300111111111111".to_string());
        obs.totals.total = Some(Decimal::new(10000, 2));
        assert_eq!(obs.present_fields(), vec!["vendor.tax_number", "totals.total"]);
    }

    #[test]
    fn test_text_block_box_centroid() {
        let block: TextBlock = serde_json::from_str(
            r#"{"text": "Total", "bbox": [0.1, 0.2, 0.3, 0.4]}"#,
        )
        .unwrap();
        let (x, y) = block.centroid().unwrap();
        assert!((x - 0.2).abs() < 1e-6);
        assert!((y - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_text_block_polygon_centroid() {
        let block: TextBlock = serde_json::from_str(
            r#"{"text": "Total", "polygon": [[0.0, 0.0], [0.2, 0.0], [0.2, 0.1], [0.0, 0.1]]}"#,
        )
        .unwrap();
        let (x, y) = block.centroid().unwrap();
        assert!((x - 0.1).abs() < 1e-6);
        assert!((y - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_empty_polygon_has_no_centroid() {
        let block = TextBlock {
            text: String::new(),
            bounds: BlockBounds::Polygon { polygon: vec![] },
            confidence: None,
        };
        assert_eq!(block.centroid(), None);
    }

    #[test]
    fn test_observation_tolerates_missing_sections() {
        let obs: DocumentObservation = serde_json::from_str("{}").unwrap();
        assert!(obs.tax_number().is_none());
        assert!(obs.layout.is_none());
        assert!(obs.text_blocks.is_empty());
    }
}
