//! Learned template models: per-vendor field metadata and layout knowledge.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of observations after which a template is considered reliable.
pub const RELIABLE_SAMPLE_COUNT: u32 = 3;

/// A normalized rectangle expressed as fractions of page width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Region {
    /// Create a region, swapping inverted corners and clamping to [0, 1].
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let (y1, y2) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        Self {
            x1: x1.clamp(0.0, 1.0),
            y1: y1.clamp(0.0, 1.0),
            x2: x2.clamp(0.0, 1.0),
            y2: y2.clamp(0.0, 1.0),
        }
    }

    /// Get the width of the region.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Get the height of the region.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Get the area of the region.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Check if a point is inside this region.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    /// Weighted average of this region (weight `weight`) with a newly
    /// observed one (implicit weight 1).
    pub fn blend(&self, observed: &Region, weight: f32) -> Self {
        let total = weight + 1.0;
        Self::new(
            (self.x1 * weight + observed.x1) / total,
            (self.y1 * weight + observed.y1) / total,
            (self.x2 * weight + observed.x2) / total,
            (self.y2 * weight + observed.y2) / total,
        )
    }
}

/// Semantic type of an invoice field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Free-form text (names, reference numbers).
    Text,
    /// Numeric identifier (tax numbers).
    Number,
    /// Calendar date.
    Date,
    /// Monetary amount.
    Currency,
    /// Tabular data (line items).
    Table,
}

/// Coarse vertical position of a field on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPosition {
    /// Top of the page (vendor block, invoice header).
    Header,
    /// Middle of the page (line items).
    Body,
    /// Bottom of the page (totals).
    Footer,
}

/// Type of invoice document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Standard tax invoice.
    TaxInvoice,
    /// Simplified (B2C) tax invoice.
    SimplifiedInvoice,
    /// Credit note.
    CreditNote,
    /// Debit note.
    DebitNote,
    /// Unclassified document.
    #[default]
    Unknown,
}

/// Per-field metadata within a template, refined on every re-observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field path (e.g. "totals.total").
    pub name: String,

    /// Semantic type.
    pub field_type: FieldType,

    /// Where the field is expected on the page, averaged over observations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_region: Option<Region>,

    /// Label texts seen next to this field, lowercased.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub label_patterns: BTreeSet<String>,

    /// Character-class shapes of observed values.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub value_patterns: BTreeSet<String>,

    /// Coarse position category.
    pub position: FieldPosition,

    /// How many observations included this field.
    pub occurrence_count: u32,

    /// Field confidence (0.0 - 1.0), grows with occurrences.
    pub confidence: f32,
}

/// A learned description of one vendor's invoice layout and fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTemplate {
    /// Deterministic id derived from the vendor tax number.
    pub template_id: String,

    /// Vendor name as last observed.
    pub vendor_name: String,

    /// Normalized vendor tax number.
    pub vendor_tax_number: String,

    /// Document type of the observations this template was learned from.
    pub document_type: DocumentType,

    /// Field metadata keyed by field path.
    pub fields: BTreeMap<String, FieldInfo>,

    /// Order-independent hash of the structural layout, if one was observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_signature: Option<String>,

    /// Number of documents learned from. Monotone non-decreasing.
    pub sample_count: u32,

    /// Timestamp of the last learn, ISO-8601.
    pub last_updated: DateTime<Utc>,

    /// Template confidence (0.0 - 1.0), capped below 1.0.
    pub confidence_score: f32,

    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl InvoiceTemplate {
    /// Whether enough samples were seen to trust this template.
    pub fn is_reliable(&self) -> bool {
        self.sample_count >= RELIABLE_SAMPLE_COUNT
    }

    /// Names of all learned fields.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }
}
