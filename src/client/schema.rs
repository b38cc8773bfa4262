use serde_json::{json, Value};

/// Model the original tool shipped with; overridable via config.toml.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// The instruction sent with every request. Explanations are asked for in
/// Chinese, pitched at a child's comprehension level.
pub fn teacher_prompt(text: &str) -> String {
    format!(
        "You are a friendly and expert English teacher for children. \
         Analyze the following English text for a child student. \
         Identify grammar points, useful phrases/idioms, and provide a natural Chinese translation. \
         Keep explanations simple, encouraging, and easy to understand.\n\n\
         Text to analyze: \"{text}\""
    )
}

/// The response-shape contract negotiated with the provider at request
/// time. This mirrors `AnalysisResult` field for field so the model
/// returns machine-readable JSON instead of prose; nothing is scraped
/// from free text.
pub fn analysis_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "translation": {
                "type": "STRING",
                "description": "The natural Chinese translation of the English text."
            },
            "grammarPoints": {
                "type": "ARRAY",
                "description": "A list of grammatical rules found in the text.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "rule": {
                            "type": "STRING",
                            "description": "The name of the grammar rule (e.g., 'Past Tense', 'Subject-Verb Agreement')."
                        },
                        "explanation": {
                            "type": "STRING",
                            "description": "A simple, child-friendly explanation of how this grammar is used in the sentence, in Chinese."
                        }
                    },
                    "required": ["rule", "explanation"]
                }
            },
            "phrases": {
                "type": "ARRAY",
                "description": "A list of useful phrases, idioms, or collocations found.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "text": {
                            "type": "STRING",
                            "description": "The English phrase or idiom."
                        },
                        "meaning": {
                            "type": "STRING",
                            "description": "The Chinese meaning of the phrase."
                        },
                        "type": {
                            "type": "STRING",
                            "description": "The type of phrase (e.g., Short Phrase, Idiom)."
                        }
                    },
                    "required": ["text", "meaning", "type"]
                }
            },
            "encouragement": {
                "type": "STRING",
                "description": "A short, cheerful message praising the child for learning, in Chinese."
            }
        },
        "required": ["translation", "grammarPoints", "phrases", "encouragement"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_all_four_result_fields() {
        let schema = analysis_response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(
            required,
            vec!["translation", "grammarPoints", "phrases", "encouragement"]
        );
        assert_eq!(schema["type"], "OBJECT");
    }

    #[test]
    fn prompt_embeds_the_learner_text() {
        let prompt = teacher_prompt("Once upon a time");
        assert!(prompt.contains("\"Once upon a time\""));
        assert!(prompt.contains("English teacher for children"));
    }
}
