//! End-to-end assembler and pipeline scenarios against a scripted session

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use recipe_forge::error::{RecipeForgeError, Result};
use recipe_forge::pipeline::{run_pipeline, CaptionSource, PipelineOutcome};
use recipe_forge::prompt::PromptContext;
use recipe_forge::session::{ModelSession, STEP_COUNT_PROMPT};
use recipe_forge::types::{Caption, Platform, SectionTemplate};
use recipe_forge::{
    BackendConfig, MealieAdapter, RecipeAssembler, TandoorAdapter, UploadClient,
};

/// Session whose high-level answers are scripted per section label
struct ScriptedSession {
    init_ok: bool,
    step_count: Option<u32>,
    fragments: HashMap<String, Value>,
    asked: Arc<Mutex<Vec<String>>>,
    contexts: Arc<Mutex<Vec<(String, Option<Value>)>>>,
}

impl ScriptedSession {
    fn new(init_ok: bool, step_count: Option<u32>) -> Self {
        Self {
            init_ok,
            step_count,
            fragments: HashMap::new(),
            asked: Arc::new(Mutex::new(Vec::new())),
            contexts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_fragment(mut self, key: &str, fragment: Value) -> Self {
        self.fragments.insert(key.to_string(), fragment);
        self
    }

    fn asked_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.asked)
    }

    fn contexts_log(&self) -> Arc<Mutex<Vec<(String, Option<Value>)>>> {
        Arc::clone(&self.contexts)
    }
}

#[async_trait]
impl ModelSession for ScriptedSession {
    async fn initialize_chat(&mut self, _caption: &str) -> Result<()> {
        if self.init_ok {
            Ok(())
        } else {
            Err(RecipeForgeError::session("chat UI never became ready"))
        }
    }

    async fn send_raw_prompt(&mut self, _prompt: &str) -> Option<String> {
        None
    }

    async fn get_number_of_steps(&mut self) -> Option<u32> {
        self.step_count
    }

    async fn process_recipe_part(
        &mut self,
        section: &SectionTemplate,
        ctx: &PromptContext,
    ) -> Option<Value> {
        let key = match section.step {
            Some(step) => format!("step:{}", step),
            None => section.label.to_string(),
        };
        self.asked.lock().push(key.clone());
        self.contexts.lock().push((key.clone(), ctx.context.clone()));
        self.fragments.get(&key).cloned()
    }
}

/// Session that only answers raw prompts, always with the same useless
/// reply; exercises the default step-count retry logic.
struct UncooperativeSession {
    reply: &'static str,
    raw_prompts: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ModelSession for UncooperativeSession {
    async fn initialize_chat(&mut self, _caption: &str) -> Result<()> {
        Ok(())
    }

    async fn send_raw_prompt(&mut self, prompt: &str) -> Option<String> {
        self.raw_prompts.lock().push(prompt.to_string());
        Some(self.reply.to_string())
    }
}

struct StaticCaptionSource {
    caption: Caption,
}

#[async_trait]
impl CaptionSource for StaticCaptionSource {
    async fn fetch(&self, _url: &str, _platform: Platform) -> Result<Caption> {
        Ok(self.caption.clone())
    }
}

fn sample_caption() -> Caption {
    Caption::new(
        "Chop 2 onions, fry 5 min, serve.",
        "https://www.instagram.com/p/chop/",
    )
}

fn tandoor_session() -> ScriptedSession {
    ScriptedSession::new(true, Some(1))
        .with_fragment(
            "info",
            json!({
                "name": "Fried Onions",
                "description": "Quick fried onions.",
                "keywords": [{"name": "onion", "description": ""}]
            }),
        )
        .with_fragment(
            "step:1",
            json!({
                "name": "1.",
                "instruction": "Chop onions and fry.",
                "ingredients": [{"food": {"name": "onion"}, "amount": "2"}],
                "order": 1
            }),
        )
        .with_fragment("servings", json!({"servings": 2, "servings_text": "2 servings"}))
        .with_fragment("meta", json!({"working_time": 5, "waiting_time": 0}))
}

#[tokio::test]
async fn tandoor_end_to_end() {
    let session = tandoor_session();
    let mut assembler =
        RecipeAssembler::new(Box::new(session), TandoorAdapter::new(), "en");
    let document = assembler.run(&sample_caption()).await.unwrap();

    let body = &document.body;
    assert_eq!(body["name"], "Fried Onions");
    assert_eq!(body["steps"][0]["name"], "1.");
    assert_eq!(body["steps"][0]["ingredients"][0]["is_header"], false);
    assert_eq!(body["source_url"], "https://www.instagram.com/p/chop/");
    assert_eq!(body["servings"], 2);
    // boundary defaults filled in
    assert_eq!(body["private"], false);
    assert_eq!(body["internal"], true);
}

#[tokio::test]
async fn mealie_end_to_end() {
    let session = ScriptedSession::new(true, None)
        .with_fragment("instructions", json!({"recipeInstructions": "Mix and bake."}))
        .with_fragment(
            "info",
            json!({"author": "chef", "prepTime": "PT15M", "cookTime": "PT1H", "recipeYield": "4"}),
        )
        .with_fragment("ingredients", json!({"recipeIngredient": ["2 onions", "butter"]}))
        .with_fragment("name", json!({"name": "Oven Onions"}))
        .with_fragment(
            "nutrition",
            json!({"nutrition": {"@type": "NutritionInformation", "calories": "120", "fatContent": "3"}}),
        );

    let mut assembler = RecipeAssembler::new(Box::new(session), MealieAdapter::new(), "en");
    let document = assembler.run(&sample_caption()).await.unwrap();

    assert_eq!(document.body["includeTags"], false);
    let data = document.body["data"].as_str().unwrap();
    assert!(data.starts_with(r#"<script type="application/ld+json">"#));

    let inner = data
        .strip_prefix(r#"<script type="application/ld+json">"#)
        .and_then(|s| s.strip_suffix("</script>"))
        .unwrap();
    let recipe: Value = serde_json::from_str(inner).unwrap();
    assert_eq!(recipe["@type"], "Recipe");
    assert_eq!(recipe["name"], "Oven Onions");
    assert_eq!(recipe["recipeInstructions"], "Mix and bake.");
    assert_eq!(recipe["interactionStatistic"]["@type"], "InteractionCounter");
    assert!(recipe["datePublished"].is_string());
}

#[tokio::test]
async fn failed_sections_contribute_no_keys() {
    // only instructions and name answer; info, ingredients, nutrition fail
    let session = ScriptedSession::new(true, None)
        .with_fragment("instructions", json!({"recipeInstructions": "Stir."}))
        .with_fragment("name", json!({"name": "Stirred Stuff"}));

    let mut assembler = RecipeAssembler::new(Box::new(session), MealieAdapter::new(), "en");
    let document = assembler.run(&sample_caption()).await.unwrap();

    let data = document.body["data"].as_str().unwrap();
    let inner = data
        .strip_prefix(r#"<script type="application/ld+json">"#)
        .and_then(|s| s.strip_suffix("</script>"))
        .unwrap();
    let recipe: Value = serde_json::from_str(inner).unwrap();

    assert_eq!(recipe["name"], "Stirred Stuff");
    assert_eq!(recipe["recipeInstructions"], "Stir.");
    // failed sections left no trace
    assert!(recipe.get("author").is_none());
    assert!(recipe.get("recipeIngredient").is_none());
    assert!(recipe.get("nutrition").is_none());
    // static sections still merged
    assert!(recipe.get("interactionStatistic").is_some());
    assert!(recipe.get("suitableForDiet").is_some());
}

#[tokio::test]
async fn aborts_when_chat_initialization_fails() {
    let session = ScriptedSession::new(false, Some(1));
    let asked = session.asked_log();
    let mut assembler = RecipeAssembler::new(Box::new(session), TandoorAdapter::new(), "en");

    let result = assembler.run(&sample_caption()).await;
    assert!(result.is_err());
    assert!(asked.lock().is_empty(), "no section prompts after failed init");
}

#[tokio::test]
async fn aborts_after_three_step_count_attempts() {
    let raw_prompts = Arc::new(Mutex::new(Vec::new()));
    let session = UncooperativeSession {
        reply: "I cannot tell.",
        raw_prompts: Arc::clone(&raw_prompts),
    };
    let mut assembler = RecipeAssembler::new(Box::new(session), TandoorAdapter::new(), "en");

    let result = assembler.run(&sample_caption()).await;
    assert!(result.is_err());

    let prompts = raw_prompts.lock();
    assert_eq!(prompts.len(), 3, "exactly three step-count attempts");
    assert!(prompts.iter().all(|p| p == STEP_COUNT_PROMPT));
}

#[tokio::test]
async fn zero_step_count_reply_is_retried_then_fatal() {
    // "0" parses cleanly but cannot drive a per-step extraction; it must be
    // treated like a malformed reply, not like a recipe with no steps
    let raw_prompts = Arc::new(Mutex::new(Vec::new()));
    let session = UncooperativeSession {
        reply: "0",
        raw_prompts: Arc::clone(&raw_prompts),
    };
    let mut assembler = RecipeAssembler::new(Box::new(session), TandoorAdapter::new(), "en");

    let result = assembler.run(&sample_caption()).await;
    assert!(result.is_err());
    assert_eq!(raw_prompts.lock().len(), 3, "zero replies are retried");
}

#[tokio::test]
async fn aborts_when_session_reports_zero_steps() {
    let session = ScriptedSession::new(true, Some(0));
    let asked = session.asked_log();
    let mut assembler = RecipeAssembler::new(Box::new(session), TandoorAdapter::new(), "en");

    let result = assembler.run(&sample_caption()).await;
    assert!(result.is_err());
    assert!(asked.lock().is_empty(), "no section prompts after a zero count");
}

#[tokio::test]
async fn step_prompts_receive_accumulated_fragments() {
    let session = ScriptedSession::new(true, Some(2))
        .with_fragment("info", json!({"name": "Fried Onions", "description": ""}))
        .with_fragment(
            "step:1",
            json!({
                "name": "1.",
                "instruction": "Chop onions.",
                "ingredients": [{"food": {"name": "onion"}, "amount": "2"}],
                "order": 1
            }),
        )
        .with_fragment(
            "step:2",
            json!({"name": "2.", "instruction": "Fry them.", "ingredients": [], "order": 2}),
        );
    let contexts = session.contexts_log();
    let mut assembler = RecipeAssembler::new(Box::new(session), TandoorAdapter::new(), "en");
    assembler.run(&sample_caption()).await.unwrap();

    let contexts = contexts.lock();
    let ctx_for = |key: &str| -> Option<Value> {
        contexts
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, ctx)| ctx.clone())
            .unwrap()
    };

    // the first step sees the info fragment, the second sees step one
    let first = ctx_for("step:1").unwrap();
    assert_eq!(first["name"], "Fried Onions");
    let second = ctx_for("step:2").unwrap();
    assert_eq!(second["steps"][0]["instruction"], "Chop onions.");
    // non-step sections get no prior-fragment context
    assert!(ctx_for("servings").is_none());
}

#[tokio::test]
async fn aborted_run_produces_no_document_and_no_audit() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("final_json.json");

    let source = StaticCaptionSource {
        caption: sample_caption(),
    };
    let session = ScriptedSession::new(false, Some(1));
    let uploader = UploadClient::new(None, None).unwrap();

    let outcome = run_pipeline(
        &source,
        Box::new(session),
        TandoorAdapter::new(),
        &uploader,
        "https://www.instagram.com/p/chop/",
        Platform::Instagram,
        "en",
        &audit_path,
    )
    .await;

    assert!(matches!(outcome, PipelineOutcome::Aborted { .. }));
    assert!(!audit_path.exists(), "no audit file for an aborted run");
}

#[tokio::test]
async fn upload_failure_is_distinct_from_extraction_failure() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("final_json.json");

    let source = StaticCaptionSource {
        caption: sample_caption(),
    };
    let session = tandoor_session();
    // nothing listens on port 1; the create request fails fast
    let uploader = UploadClient::new(
        Some(BackendConfig::new("http://127.0.0.1:1", "token")),
        None,
    )
    .unwrap();

    let outcome = run_pipeline(
        &source,
        Box::new(session),
        TandoorAdapter::new(),
        &uploader,
        "https://www.instagram.com/p/chop/",
        Platform::Instagram,
        "en",
        &audit_path,
    )
    .await;

    match outcome {
        PipelineOutcome::UploadFailed { document, .. } => {
            assert_eq!(document.body["name"], "Fried Onions");
        }
        other => panic!("expected UploadFailed, got {:?}", other),
    }

    // the audit trail was written before the upload was attempted
    let audit: Value =
        serde_json::from_str(&std::fs::read_to_string(&audit_path).unwrap()).unwrap();
    assert_eq!(audit["name"], "Fried Onions");
}
