//! Recipe assembler
//!
//! Drives one extraction run: establishes the recipe context, discovers the
//! step count when the adapter needs one, iterates the adapter's ordered
//! section list one model call at a time and merges the partial results
//! into a single accumulating document.
//!
//! Only two failures abort a run, because they make every later prompt
//! meaningless: a failed context establishment and a missing step count.
//! Any single section's failure is logged and skipped; a recipe missing
//! nutrition info is still useful.

use serde_json::{Map, Value};

use crate::adapter::{PlannedSection, SchemaAdapter};
use crate::error::{RecipeForgeError, Result};
use crate::prompt::PromptContext;
use crate::session::ModelSession;
use crate::types::{Caption, SectionKind, TargetDocument};

/// Key the ordered step fragments accumulate under
const STEPS_KEY: &str = "steps";

/// Sequences model calls and merges fragments for one extraction run.
///
/// Owns its model session exclusively for the run's duration; concurrent
/// extraction runs each need their own assembler and session.
pub struct RecipeAssembler<A: SchemaAdapter> {
    session: Box<dyn ModelSession>,
    adapter: A,
    language: String,
}

impl<A: SchemaAdapter> RecipeAssembler<A> {
    pub fn new(session: Box<dyn ModelSession>, adapter: A, language: impl Into<String>) -> Self {
        Self {
            session,
            adapter,
            language: language.into(),
        }
    }

    /// Run the full extraction pipeline and produce the backend-ready
    /// payload. Returns an error only for fatal preconditions.
    pub async fn run(&mut self, caption: &Caption) -> Result<TargetDocument> {
        self.session
            .initialize_chat(&caption.text)
            .await
            .map_err(|err| {
                RecipeForgeError::session(format!(
                    "failed to initialize chat with recipe context: {}",
                    err
                ))
            })?;

        let step_count = if self.adapter.requires_step_count() {
            // a zero count means the discovery failed, not an empty recipe
            let count = self
                .session
                .get_number_of_steps()
                .await
                .filter(|count| *count > 0)
                .ok_or_else(|| {
                    RecipeForgeError::session("failed to determine number of steps in recipe")
                })?;
            tracing::info!(steps = count, "recipe step count established");
            count
        } else {
            0
        };

        let base_ctx = PromptContext::new(self.language.clone());
        let mut document: Map<String, Value> = Map::new();

        for planned in self.adapter.sections(step_count) {
            match planned {
                PlannedSection::Static { label, fragment } => {
                    merge_fragment(&mut document, fragment);
                    tracing::debug!(section = label, "static section merged");
                }
                PlannedSection::Model(section) => {
                    let label = section.label;
                    let step = section.step;
                    // Step prompts carry the fragments gathered so far: the
                    // "do not repeat ingredients" constraint needs earlier
                    // steps spelled out, not just remembered by the model.
                    let ctx = if section.kind == SectionKind::Step && !document.is_empty() {
                        base_ctx.clone().with_context(Value::Object(document.clone()))
                    } else {
                        base_ctx.clone()
                    };
                    match self.session.process_recipe_part(&section, &ctx).await {
                        Some(value) if section.kind == SectionKind::Step => {
                            append_step(&mut document, value, step);
                        }
                        Some(value) => merge_value(&mut document, label, value),
                        None => {
                            tracing::warn!(section = label, step, "section skipped after extraction failure");
                        }
                    }
                }
            }
        }

        self.adapter.normalize(&mut document, caption);
        Ok(self.adapter.finalize(document))
    }

    /// Hand the session back once the run is over.
    pub fn into_session(self) -> Box<dyn ModelSession> {
        self.session
    }
}

fn merge_fragment(document: &mut Map<String, Value>, fragment: Map<String, Value>) {
    for (key, value) in fragment {
        document.insert(key, value);
    }
}

fn merge_value(document: &mut Map<String, Value>, label: &str, value: Value) {
    match value {
        Value::Object(fragment) => {
            merge_fragment(document, fragment);
            tracing::info!(section = label, "section merged into document");
        }
        _ => {
            tracing::warn!(section = label, "section reply was not a JSON object, skipped");
        }
    }
}

fn append_step(document: &mut Map<String, Value>, value: Value, step: Option<u32>) {
    let Value::Object(fragment) = value else {
        tracing::warn!(step, "step reply was not a JSON object, skipped");
        return;
    };
    let steps = document
        .entry(STEPS_KEY)
        .or_insert_with(|| Value::Array(Vec::new()));
    match steps {
        Value::Array(entries) => {
            entries.push(Value::Object(fragment));
            tracing::info!(step, "step appended to document");
        }
        _ => tracing::warn!(step, "steps field is not a list, step dropped"),
    }
}
