//! Tandoor schema adapter
//!
//! Tandoor ingests a flat recipe object with an ordered `steps` list. Steps
//! must be extracted in ascending order: each step prompt tells the model
//! not to repeat ingredients from earlier steps, which only works if the
//! model has already seen those turns.

use serde_json::{json, Map, Value};
use std::collections::HashSet;

use super::{PlannedSection, SchemaAdapter};
use crate::types::{Caption, RecipeBackend, SectionKind, SectionTemplate, TargetDocument};

/// Name used when the model never produced one
pub const FALLBACK_RECIPE_NAME: &str = "Unbenanntes Rezept";

#[derive(Debug, Default, Clone)]
pub struct TandoorAdapter;

impl TandoorAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn info_template() -> Value {
    json!({
        "name": "string",
        "description": "string",
        "keywords": [
            {
                "name": "string",
                "description": "string"
            }
        ]
    })
}

fn step_template() -> Value {
    json!({
        "name": "string",
        "instruction": "string",
        "ingredients": [
            {
                "food": {
                    "name": "string",
                    "plural_name": "string"
                },
                "unit": {
                    "name": "string",
                    "plural_name": "string",
                    "description": "string",
                    "base_unit": "string",
                    "open_data_slug": "string"
                },
                "amount": "string",
                "note": "string",
                "order": 0,
                "is_header": true,
                "no_amount": true
            }
        ],
        "time": 0,
        "order": 0,
        "show_as_header": true,
        "show_ingredients_table": true
    })
}

fn servings_template() -> Value {
    json!({
        "servings": 0,
        "servings_text": "string"
    })
}

fn meta_template() -> Value {
    json!({
        "working_time": 0,
        "waiting_time": 0,
        "source_url": "string",
        "internal": true,
        "show_ingredient_overview": true
    })
}

/// Required fields and their defaults per the Tandoor OpenAPI spec
fn required_defaults() -> Vec<(&'static str, Value)> {
    vec![
        ("name", Value::String(FALLBACK_RECIPE_NAME.to_string())),
        ("description", Value::String(String::new())),
        ("steps", Value::Array(Vec::new())),
        ("keywords", Value::Array(Vec::new())),
        ("image", Value::Null),
        ("internal", Value::Bool(true)),
        ("show_ingredient_overview", Value::Bool(false)),
        ("servings", json!(1)),
        ("servings_text", Value::String(String::new())),
        ("working_time", json!(0)),
        ("waiting_time", json!(0)),
        ("source_url", Value::String(String::new())),
        ("private", Value::Bool(false)),
        ("shared", Value::Array(Vec::new())),
    ]
}

/// Fill in every required Tandoor field that is missing or null, and coerce
/// fields the model got structurally wrong. Also applied at the upload
/// boundary.
pub fn apply_required_defaults(document: &mut Map<String, Value>) {
    for (key, default) in required_defaults() {
        let missing = match document.get(key) {
            None | Some(Value::Null) => true,
            _ => false,
        };
        if missing {
            document.insert(key.to_string(), default);
        }
    }
    if !document["steps"].is_array() {
        document.insert("steps".to_string(), Value::Array(Vec::new()));
    }
    if !document["keywords"].is_array() {
        document.insert("keywords".to_string(), Value::Array(Vec::new()));
    }
    let name_empty = document["name"].as_str().map(str::is_empty).unwrap_or(true);
    if name_empty {
        document.insert(
            "name".to_string(),
            Value::String(FALLBACK_RECIPE_NAME.to_string()),
        );
    }
}

impl SchemaAdapter for TandoorAdapter {
    fn backend(&self) -> RecipeBackend {
        RecipeBackend::Tandoor
    }

    fn requires_step_count(&self) -> bool {
        true
    }

    fn sections(&self, step_count: u32) -> Vec<PlannedSection> {
        let mut sections = vec![PlannedSection::Model(SectionTemplate::new(
            SectionKind::Info,
            "info",
            info_template(),
        ))];
        for step in 1..=step_count {
            sections.push(PlannedSection::Model(SectionTemplate::for_step(
                step,
                step_template(),
            )));
        }
        sections.push(PlannedSection::Model(SectionTemplate::new(
            SectionKind::Generic,
            "servings",
            servings_template(),
        )));
        sections.push(PlannedSection::Model(SectionTemplate::new(
            SectionKind::Generic,
            "meta",
            meta_template(),
        )));
        sections
    }

    fn normalize(&self, document: &mut Map<String, Value>, caption: &Caption) {
        document.insert(
            "source_url".to_string(),
            Value::String(caption.source_url.clone()),
        );

        // The "don't repeat ingredients" prompt instruction is best-effort;
        // enforce it here. First mention of a food wins, later mentions are
        // dropped, and every surviving ingredient loses its header flag.
        let mut seen_foods: HashSet<String> = HashSet::new();
        if let Some(Value::Array(steps)) = document.get_mut("steps") {
            for step in steps.iter_mut() {
                let Some(Value::Array(ingredients)) = step.get_mut("ingredients") else {
                    continue;
                };
                ingredients.retain_mut(|ingredient| {
                    let Value::Object(entry) = ingredient else {
                        return false;
                    };
                    entry.insert("is_header".to_string(), Value::Bool(false));
                    match entry
                        .get("food")
                        .and_then(|food| food.get("name"))
                        .and_then(Value::as_str)
                    {
                        Some(name) => seen_foods.insert(name.trim().to_lowercase()),
                        None => true,
                    }
                });
            }
        }

        apply_required_defaults(document);
    }

    fn finalize(&self, document: Map<String, Value>) -> TargetDocument {
        TargetDocument {
            backend: RecipeBackend::Tandoor,
            body: Value::Object(document),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption() -> Caption {
        Caption::new("some recipe", "https://www.instagram.com/p/abc/")
    }

    fn ingredient(food: &str, header: bool) -> Value {
        json!({
            "food": {"name": food},
            "amount": "1",
            "is_header": header
        })
    }

    #[test]
    fn sections_iterate_steps_in_ascending_order() {
        let adapter = TandoorAdapter::new();
        let sections = adapter.sections(3);
        let steps: Vec<u32> = sections
            .iter()
            .filter_map(|s| match s {
                PlannedSection::Model(t) if t.kind == SectionKind::Step => t.step,
                _ => None,
            })
            .collect();
        assert_eq!(steps, vec![1, 2, 3]);
        // info first, servings and meta after the steps
        assert!(matches!(
            &sections[0],
            PlannedSection::Model(t) if t.label == "info"
        ));
        assert_eq!(sections.len(), 5);
    }

    #[test]
    fn normalize_clears_header_flags() {
        let adapter = TandoorAdapter::new();
        let mut document = Map::new();
        document.insert(
            "steps".to_string(),
            json!([
                {"name": "1.", "ingredients": [ingredient("onion", true), ingredient("salt", true)]},
                {"name": "2.", "ingredients": [ingredient("butter", true)]}
            ]),
        );
        adapter.normalize(&mut document, &caption());

        for step in document["steps"].as_array().unwrap() {
            for entry in step["ingredients"].as_array().unwrap() {
                assert_eq!(entry["is_header"], false);
            }
        }
    }

    #[test]
    fn normalize_drops_repeated_ingredients() {
        let adapter = TandoorAdapter::new();
        let mut document = Map::new();
        document.insert(
            "steps".to_string(),
            json!([
                {"name": "1.", "ingredients": [ingredient("onion", false)]},
                {"name": "2.", "ingredients": [ingredient("Onion", false), ingredient("butter", false)]}
            ]),
        );
        adapter.normalize(&mut document, &caption());

        let steps = document["steps"].as_array().unwrap();
        assert_eq!(steps[0]["ingredients"].as_array().unwrap().len(), 1);
        let second = steps[1]["ingredients"].as_array().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0]["food"]["name"], "butter");
    }

    #[test]
    fn normalize_sets_source_url_and_defaults() {
        let adapter = TandoorAdapter::new();
        let mut document = Map::new();
        adapter.normalize(&mut document, &caption());

        assert_eq!(document["source_url"], "https://www.instagram.com/p/abc/");
        assert_eq!(document["name"], FALLBACK_RECIPE_NAME);
        assert_eq!(document["servings"], 1);
        assert!(document["steps"].as_array().unwrap().is_empty());
        assert_eq!(document["private"], false);
    }

    #[test]
    fn defaults_coerce_non_list_steps_and_keywords() {
        let mut document = Map::new();
        document.insert("steps".to_string(), json!("not a list"));
        document.insert("keywords".to_string(), json!(42));
        document.insert("name".to_string(), json!(""));
        apply_required_defaults(&mut document);

        assert!(document["steps"].as_array().unwrap().is_empty());
        assert!(document["keywords"].as_array().unwrap().is_empty());
        assert_eq!(document["name"], FALLBACK_RECIPE_NAME);
    }
}
