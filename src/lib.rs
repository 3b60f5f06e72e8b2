//! Recipe Forge - AI-powered recipe extraction from social media captions
//!
//! Drives a conversational language model through an ordered sequence of
//! JSON-constrained prompts to turn an unstructured recipe caption into a
//! backend-ready document for Tandoor or Mealie.

pub mod adapter;
pub mod assembler;
pub mod config;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod types;
pub mod upload;

// Re-export commonly used types
pub use error::{RecipeForgeError, Result};
pub use types::{
    Caption, Fragment, Platform, RecipeBackend, SectionKind, SectionTemplate, SessionKind,
    TargetDocument,
};

// Re-export main functionality
pub use adapter::{MealieAdapter, SchemaAdapter, TandoorAdapter};
pub use assembler::RecipeAssembler;
pub use config::ForgeConfig;
pub use pipeline::{run_pipeline, CaptionSource, FileCaptionSource, PipelineOutcome};
pub use session::{ApiSession, BrowserSession, ModelSession, WebDriverSurface};
pub use upload::{BackendConfig, UploadClient, UploadReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    Ok(())
}
