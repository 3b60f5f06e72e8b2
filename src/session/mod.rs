//! Model session abstraction
//!
//! A `ModelSession` is a conversational language model with a standing
//! context (the recipe caption). Two realizations exist: a direct
//! chat-completions API call and a WebDriver-driven chat UI. The
//! orchestration logic is identical against either; the higher-level
//! operations are provided as default methods on the trait.

pub mod api;
pub mod browser;

pub use api::ApiSession;
pub use browser::{BrowserSession, ChatSurface, WebDriverSurface};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::extract;
use crate::prompt::{self, PromptContext};
use crate::types::SectionTemplate;

/// Prompt used to discover the total number of recipe steps
pub const STEP_COUNT_PROMPT: &str = "How many steps are in this recipe? \
    Respond only with a single integer. Do not include any explanation, \
    text, units, or formatting. Only reply with the number.";

const STEP_COUNT_ATTEMPTS: u32 = 3;

/// A conversational language model backend.
///
/// Every operation except `initialize_chat` is allowed to fail by returning
/// `None`; callers treat that as "skip this fragment, continue". A failed
/// `initialize_chat` is fatal for the whole extraction run.
#[async_trait]
pub trait ModelSession: Send {
    /// Establish the standing recipe context all later prompts rely on.
    async fn initialize_chat(&mut self, caption: &str) -> Result<()>;

    /// Submit free text, return the model's free-text reply.
    async fn send_raw_prompt(&mut self, prompt: &str) -> Option<String>;

    /// Submit a JSON-constrained prompt and parse the embedded JSON reply.
    async fn send_json_prompt(&mut self, prompt: &str) -> Option<Value> {
        let raw = self.send_raw_prompt(prompt).await?;
        extract::extract_json(&raw)
    }

    /// Ask for the total step count, retrying on malformed replies. A count
    /// of zero is as useless as no count at all and is retried the same way.
    async fn get_number_of_steps(&mut self) -> Option<u32> {
        for attempt in 1..=STEP_COUNT_ATTEMPTS {
            let Some(reply) = self.send_raw_prompt(STEP_COUNT_PROMPT).await else {
                tracing::warn!(attempt, "no reply to step-count prompt");
                continue;
            };
            match extract::parse_step_count(&reply) {
                Some(count) if count > 0 => {
                    tracing::info!(steps = count, "found step count in reply");
                    return Some(count);
                }
                Some(_) => tracing::warn!(attempt, "step count of zero rejected"),
                None => tracing::warn!(attempt, "step-count reply did not contain a number"),
            }
        }
        tracing::warn!(
            "failed to determine step count after {} attempts",
            STEP_COUNT_ATTEMPTS
        );
        None
    }

    /// Render one section prompt and submit it as a JSON-constrained query.
    async fn process_recipe_part(
        &mut self,
        section: &SectionTemplate,
        ctx: &PromptContext,
    ) -> Option<Value> {
        let prompt = prompt::render(section, ctx);
        let result = self.send_json_prompt(&prompt).await;
        match &result {
            Some(_) => tracing::debug!(section = section.label, "section data extracted"),
            None => tracing::warn!(section = section.label, "no valid JSON reply for section"),
        }
        result
    }
}
