//! Mealie schema adapter
//!
//! Mealie ingests recipes through its "parse HTML or JSON" endpoint: the
//! merged document is serialized as schema.org JSON-LD, embedded in a
//! `<script type="application/ld+json">` element and wrapped in an envelope
//! carrying the `includeTags` flag. Ingredients and instructions are single
//! aggregate sections, so no step count is needed.

use chrono::Utc;
use serde_json::{json, Map, Value};

use super::{PlannedSection, SchemaAdapter};
use crate::types::{Caption, RecipeBackend, SectionKind, SectionTemplate, TargetDocument};

#[derive(Debug, Default, Clone)]
pub struct MealieAdapter;

impl MealieAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn instructions_template() -> Value {
    json!({
        "recipeInstructions": "string"
    })
}

fn info_template() -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "Recipe",
        "author": "string",
        "cookTime": "PT1H",
        "prepTime": "PT15M",
        "datePublished": "string",
        "description": "",
        "image": null,
        "recipeYield": ""
    })
}

fn ingredients_template() -> Value {
    json!({
        "recipeIngredient": ["string"]
    })
}

fn name_template() -> Value {
    json!({
        "name": ""
    })
}

fn nutrition_template() -> Value {
    json!({
        "nutrition": {
            "@type": "NutritionInformation",
            "calories": "string",
            "fatContent": "string"
        }
    })
}

fn interaction_fragment() -> Map<String, Value> {
    let mut fragment = Map::new();
    fragment.insert(
        "interactionStatistic".to_string(),
        json!({
            "@type": "InteractionCounter",
            "interactionType": "https://schema.org/Comment",
            "userInteractionCount": "140"
        }),
    );
    fragment
}

fn diet_fragment() -> Map<String, Value> {
    let mut fragment = Map::new();
    fragment.insert("suitableForDiet".to_string(), Value::Null);
    fragment
}

impl SchemaAdapter for MealieAdapter {
    fn backend(&self) -> RecipeBackend {
        RecipeBackend::Mealie
    }

    fn requires_step_count(&self) -> bool {
        false
    }

    fn sections(&self, _step_count: u32) -> Vec<PlannedSection> {
        vec![
            PlannedSection::Model(SectionTemplate::new(
                SectionKind::Instructions,
                "instructions",
                instructions_template(),
            )),
            PlannedSection::Model(SectionTemplate::new(
                SectionKind::Info,
                "info",
                info_template(),
            )),
            PlannedSection::Model(SectionTemplate::new(
                SectionKind::Ingredients,
                "ingredients",
                ingredients_template(),
            )),
            PlannedSection::Static {
                label: "interaction-stats",
                fragment: interaction_fragment(),
            },
            PlannedSection::Model(SectionTemplate::new(
                SectionKind::Name,
                "name",
                name_template(),
            )),
            PlannedSection::Model(SectionTemplate::new(
                SectionKind::Nutrition,
                "nutrition",
                nutrition_template(),
            )),
            PlannedSection::Static {
                label: "diet",
                fragment: diet_fragment(),
            },
        ]
    }

    fn normalize(&self, document: &mut Map<String, Value>, _caption: &Caption) {
        // The JSON-LD typing must hold even when the info section failed.
        document.insert(
            "@context".to_string(),
            Value::String("https://schema.org".to_string()),
        );
        document.insert("@type".to_string(), Value::String("Recipe".to_string()));
        document.insert(
            "datePublished".to_string(),
            Value::String(Utc::now().format("%Y-%m-%d").to_string()),
        );
    }

    fn finalize(&self, document: Map<String, Value>) -> TargetDocument {
        let json_ld = Value::Object(document).to_string();
        let script = format!(r#"<script type="application/ld+json">{}</script>"#, json_ld);
        TargetDocument {
            backend: RecipeBackend::Mealie,
            body: json!({
                "includeTags": false,
                "data": script
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_order_matches_ingestion_contract() {
        let adapter = MealieAdapter::new();
        let labels: Vec<&str> = adapter
            .sections(0)
            .iter()
            .map(|s| match s {
                PlannedSection::Model(t) => t.label,
                PlannedSection::Static { label, .. } => *label,
            })
            .collect();
        assert_eq!(
            labels,
            vec![
                "instructions",
                "info",
                "ingredients",
                "interaction-stats",
                "name",
                "nutrition",
                "diet"
            ]
        );
    }

    #[test]
    fn normalize_stamps_type_and_date() {
        let adapter = MealieAdapter::new();
        let mut document = Map::new();
        adapter.normalize(&mut document, &Caption::new("", ""));

        assert_eq!(document["@type"], "Recipe");
        assert_eq!(document["@context"], "https://schema.org");
        let date = document["datePublished"].as_str().unwrap();
        assert_eq!(date.len(), 10);
        assert_eq!(&date[4..5], "-");
    }

    #[test]
    fn finalize_wraps_document_in_json_ld_envelope() {
        let adapter = MealieAdapter::new();
        let mut document = Map::new();
        document.insert("name".to_string(), json!("Lemon Cake"));
        adapter.normalize(&mut document, &Caption::new("", ""));
        let target = adapter.finalize(document);

        assert_eq!(target.backend, RecipeBackend::Mealie);
        assert_eq!(target.body["includeTags"], false);

        let data = target.body["data"].as_str().unwrap();
        assert!(data.starts_with(r#"<script type="application/ld+json">"#));
        assert!(data.ends_with("</script>"));

        let inner = data
            .strip_prefix(r#"<script type="application/ld+json">"#)
            .and_then(|s| s.strip_suffix("</script>"))
            .unwrap();
        let parsed: Value = serde_json::from_str(inner).unwrap();
        assert_eq!(parsed["@type"], "Recipe");
        assert_eq!(parsed["name"], "Lemon Cake");
    }
}
