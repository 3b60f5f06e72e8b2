//! Core types and structures for recipe-forge

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::RecipeForgeError;

/// Social platform a post was extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Instagram => write!(f, "instagram"),
            Platform::Tiktok => write!(f, "tiktok"),
        }
    }
}

impl FromStr for Platform {
    type Err = RecipeForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "tiktok" => Ok(Platform::Tiktok),
            other => Err(RecipeForgeError::validation(format!(
                "Unknown platform: {}. Supported platforms: instagram, tiktok",
                other
            ))),
        }
    }
}

/// Recipe management backend the finished document is destined for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeBackend {
    Tandoor,
    Mealie,
}

impl std::fmt::Display for RecipeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipeBackend::Tandoor => write!(f, "tandoor"),
            RecipeBackend::Mealie => write!(f, "mealie"),
        }
    }
}

impl FromStr for RecipeBackend {
    type Err = RecipeForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tandoor" => Ok(RecipeBackend::Tandoor),
            "mealie" => Ok(RecipeBackend::Mealie),
            other => Err(RecipeForgeError::config(format!(
                "Unknown recipe backend: {}. Supported backends: tandoor, mealie",
                other
            ))),
        }
    }
}

/// Which model session realization to drive the extraction with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Direct chat-completions API call
    Api,
    /// Chat web UI driven through WebDriver
    Browser,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Api => write!(f, "api"),
            SessionKind::Browser => write!(f, "browser"),
        }
    }
}

impl FromStr for SessionKind {
    type Err = RecipeForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api" => Ok(SessionKind::Api),
            "browser" => Ok(SessionKind::Browser),
            other => Err(RecipeForgeError::config(format!(
                "Unknown model session kind: {}. Supported kinds: api, browser",
                other
            ))),
        }
    }
}

/// The social post's text, paired with its source URL and an optional
/// extracted still image. Read-only input for the whole extraction run.
#[derive(Debug, Clone)]
pub struct Caption {
    pub text: String,
    pub source_url: String,
    pub thumbnail: Option<PathBuf>,
}

impl Caption {
    pub fn new(text: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_url: source_url.into(),
            thumbnail: None,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: PathBuf) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }
}

/// Kind of extraction section, each with its own prompt rendering rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Info,
    Ingredients,
    Instructions,
    Name,
    Nutrition,
    Step,
    Generic,
}

/// A named, immutable template describing the target shape of one recipe
/// facet. Step sections carry the 1-based step index they ask about.
#[derive(Debug, Clone)]
pub struct SectionTemplate {
    pub kind: SectionKind,
    pub label: &'static str,
    pub template: Value,
    pub step: Option<u32>,
}

impl SectionTemplate {
    pub fn new(kind: SectionKind, label: &'static str, template: Value) -> Self {
        Self {
            kind,
            label,
            template,
            step: None,
        }
    }

    /// Template for one numbered recipe step
    pub fn for_step(step: u32, template: Value) -> Self {
        Self {
            kind: SectionKind::Step,
            label: "step",
            template,
            step: Some(step),
        }
    }
}

/// One parsed recipe facet, as returned by the model
pub type Fragment = Map<String, Value>;

/// The finished, backend-ready payload
#[derive(Debug, Clone, Serialize)]
pub struct TargetDocument {
    pub backend: RecipeBackend,
    pub body: Value,
}
