//! Template learning and matching engine for English/Arabic invoice OCR.
//!
//! This crate provides:
//! - Per-vendor template learning from structured extraction results
//! - Exact and fuzzy template matching with deterministic scoring
//! - Field-location hints projected from learned templates
//! - A persistent, capacity-bounded template store

pub mod error;
pub mod models;
pub mod template;

pub use error::{QalibError, Result, StoreError};
pub use models::config::{MatchingConfig, QalibConfig, StoreConfig};
pub use models::observation::{
    BlockBounds, DocumentObservation, LayoutDescriptor, LayoutZone, TextBlock, ZoneType,
};
pub use models::template::{
    DocumentType, FieldInfo, FieldPosition, FieldType, InvoiceTemplate, Region,
};
pub use template::{
    EngineRegistry, FieldHint, HintGenerator, RegionHint, TemplateBuilder, TemplateEngine,
    TemplateMatch, TemplateMatcher, TemplateStats, TemplateStore,
};
