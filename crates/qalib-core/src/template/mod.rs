//! Template learning, matching, and hint generation.

mod builder;
mod engine;
mod hints;
mod matcher;
mod registry;
mod store;

pub use builder::{TemplateBuilder, layout_signature_for, template_id_for};
pub use engine::{TemplateEngine, TemplateStats};
pub use hints::{FieldHint, HintGenerator, RegionHint};
pub use matcher::{TemplateMatch, TemplateMatcher, name_similarity};
pub use registry::EngineRegistry;
pub use store::TemplateStore;
