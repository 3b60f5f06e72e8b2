//! Backend schema adapters
//!
//! An adapter owns the ordered list of extraction sections for one recipe
//! backend, the post-merge normalization rules and the final wire-format
//! transformation. Tandoor wants a flat step-based object, Mealie wants a
//! schema.org JSON-LD envelope; the assembler stays agnostic of both.

pub mod mealie;
pub mod tandoor;

pub use mealie::MealieAdapter;
pub use tandoor::TandoorAdapter;

use serde_json::{Map, Value};

use crate::types::{Caption, RecipeBackend, SectionTemplate, TargetDocument};

/// One unit of extraction work in an adapter's ordered section list
#[derive(Debug, Clone)]
pub enum PlannedSection {
    /// Rendered into a prompt and filled by the model
    Model(SectionTemplate),
    /// Merged into the document verbatim, no model call
    Static {
        label: &'static str,
        fragment: Map<String, Value>,
    },
}

/// Backend-specific section list, normalization and wire transformation
pub trait SchemaAdapter: Send {
    fn backend(&self) -> RecipeBackend;

    /// Whether the section list depends on a known total step count
    fn requires_step_count(&self) -> bool;

    /// The ordered sections to extract; `step_count` is only meaningful
    /// when `requires_step_count` returns true.
    fn sections(&self, step_count: u32) -> Vec<PlannedSection>;

    /// Schema-specific post-processing of the merged document
    fn normalize(&self, document: &mut Map<String, Value>, caption: &Caption);

    /// Produce the immutable backend-ready payload
    fn finalize(&self, document: Map<String, Value>) -> TargetDocument;
}
