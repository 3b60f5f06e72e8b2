//! Prompt rendering for the extraction sections
//!
//! Each section kind carries its own rendering rule. Rendering is a pure
//! function of the template and context: identical inputs produce identical
//! prompt text.

use serde_json::Value;

use crate::types::{SectionKind, SectionTemplate};

/// Context shared by every prompt of one extraction run
#[derive(Debug, Clone)]
pub struct PromptContext {
    /// ISO language code the model must answer in
    pub language: String,
    /// Prior-fragment JSON the model may use as additional context
    pub context: Option<Value>,
}

impl PromptContext {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Render one provider-agnostic instruction for the given section.
///
/// The instruction states the output language, restates the template
/// verbatim, lists the permitted fields and mandates that the reply be
/// exactly one fenced JSON block.
pub fn render(section: &SectionTemplate, ctx: &PromptContext) -> String {
    let mut prompt = String::new();

    if let Some(context) = &ctx.context {
        prompt.push_str(&format!("Recipe context (JSON): {}\n", context));
    }
    prompt.push_str("Please respond ONLY with a valid JSON code block (```json ... ```).\n");

    match (section.kind, section.step) {
        (SectionKind::Step, Some(step)) => {
            prompt.push_str(&format!(
                "Fill out the following fields for step {} of the recipe: \
                 'name', 'instruction', 'ingredients', 'time', 'order', \
                 'show_as_header', 'show_ingredients_table'.\n",
                step
            ));
            prompt.push_str(&format!(
                "- 'name' should be the step number, e.g. 'name': '{}.'\n",
                step
            ));
            prompt.push_str("- 'instruction' should be a clear, short description of only this step.\n");
            prompt.push_str("- 'ingredients' should be a list of ingredient objects (max 3 per step).\n");
            prompt.push_str("- 'amount' must be a whole number or decimal, NOT a fraction.\n");
            prompt.push_str("- Do NOT repeat ingredients from previous steps.\n");
        }
        (SectionKind::Info, _) => {
            prompt.push_str(
                "Fill out the fields: 'author', 'description', 'recipeYield', 'prepTime', 'cookTime'.\n",
            );
            prompt.push_str(
                "- 'prepTime' and 'cookTime' format: PT1H for one hour, PT15M for 15 minutes.\n",
            );
        }
        (SectionKind::Ingredients, _) => {
            prompt.push_str(
                "Append the ingredients to the 'recipeIngredient' list. One ingredient per line.\n",
            );
        }
        (SectionKind::Name, _) => {
            prompt.push_str("Fill out the field 'name' with a short, clear recipe name.\n");
        }
        (SectionKind::Nutrition, _) => {
            prompt.push_str("Fill out the fields: 'calories' and 'fatContent' as strings.\n");
        }
        (SectionKind::Instructions, _) => {
            prompt.push_str(
                "Write the instruction as one long string. No string separation, \
                 just one long text! Don't add ingredients here.\n",
            );
        }
        _ => {
            prompt.push_str("Fill out the specified sections of the document.\n");
        }
    }

    prompt.push_str(&format!("Language: {}\n", ctx.language));
    prompt.push_str(&format!("JSON template: {}", section.template));
    prompt
}
