use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GrammarPoint {
    pub rule: String,
    pub explanation: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Phrase {
    pub text: String,
    pub meaning: String,
    // "type" on the wire; free-form label, e.g. "Idiom", "Phrasal Verb", "Collocation"
    #[serde(rename = "type")]
    pub kind: String,
}

/// The structured analysis the provider returns. Field names on the wire
/// are camelCase; all four fields are required, so a payload missing any
/// of them fails deserialization instead of producing a partial result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub translation: String,
    pub grammar_points: Vec<GrammarPoint>,
    pub phrases: Vec<Phrase>,
    pub encouragement: String,
}

impl AnalysisResult {
    /// Shape constraints serde cannot express on its own.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.encouragement.trim().is_empty() {
            return Err("encouragement must be a non-empty message".to_string());
        }
        Ok(())
    }
}
