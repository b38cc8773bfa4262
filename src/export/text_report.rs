use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::types::analysis::AnalysisResult;

pub const TEXT_EXPORT_FILE_NAME: &str = "english-explorer-analysis.txt";

/// Fixed plain-text layout: header, original text, translation,
/// enumerated phrases, numbered grammar points, encouragement. Empty
/// lists keep their section headers with zero entries.
pub fn render_text_report(input_text: &str, result: &AnalysisResult) -> String {
    let phrases = result
        .phrases
        .iter()
        .map(|p| format!("- {} ({}): {}", p.text, p.kind, p.meaning))
        .collect::<Vec<_>>()
        .join("\n");
    let grammar = result
        .grammar_points
        .iter()
        .enumerate()
        .map(|(i, g)| format!("{}. {}: {}", i + 1, g.rule, g.explanation))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "English Explorer Analysis\n\
         =========================\n\n\
         Original Text:\n{input_text}\n\n\
         Chinese Meaning:\n{translation}\n\n\
         Cool Phrases:\n{phrases}\n\n\
         Grammar Notes:\n{grammar}\n\n\
         Message: {encouragement}",
        translation = result.translation,
        encouragement = result.encouragement,
    )
}

/// Writes the report into the export directory under its fixed name and
/// returns the path it landed at.
pub fn write_text_report(
    export_dir: &Path,
    input_text: &str,
    result: &AnalysisResult,
) -> Result<PathBuf, ExportError> {
    let path = export_dir.join(TEXT_EXPORT_FILE_NAME);
    fs::write(&path, render_text_report(input_text, result)).map_err(|source| {
        ExportError::Write {
            path: path.clone(),
            source,
        }
    })?;
    Ok(path)
}
