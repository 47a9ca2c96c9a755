use crate::domain::model::{Question, QuestionBank};
use crate::domain::ports::Storage;
use crate::utils::error::{QuizError, Result};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub existing: usize,
    pub incoming: usize,
    pub total: usize,
}

/// `existing ++ incoming`, keeping the first question for each distinct text.
pub fn merge_questions(existing: Vec<Question>, incoming: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::new();
    existing
        .into_iter()
        .chain(incoming)
        .filter(|q| seen.insert(q.question.clone()))
        .collect()
}

pub fn to_pretty_json(questions: &[Question]) -> Result<Vec<u8>> {
    let mut json = serde_json::to_vec_pretty(questions)?;
    json.push(b'\n');
    Ok(json)
}

/// Loads the bank at `name`; a missing file is an empty bank, an unreadable
/// one is reported and treated as empty.
pub async fn load_bank<S: Storage>(storage: &S, name: &str) -> Vec<Question> {
    match storage.read_file(name).await {
        Ok(bytes) => match serde_json::from_slice::<Vec<Question>>(&bytes) {
            Ok(questions) => questions,
            Err(e) => {
                tracing::warn!(
                    "⚠️ Could not parse existing bank {}: {}. Starting a new one.",
                    storage.locate(name),
                    e
                );
                Vec::new()
            }
        },
        Err(e) if e.not_found() => Vec::new(),
        Err(e) => {
            tracing::warn!("⚠️ Could not read existing bank {}: {}", storage.locate(name), e);
            Vec::new()
        }
    }
}

/// Merges `incoming` into the bank `name` of `storage` and writes the result.
pub async fn save_bank<S: Storage>(
    storage: &S,
    name: &str,
    incoming: Vec<Question>,
) -> Result<(MergeSummary, Vec<u8>)> {
    let existing = load_bank(storage, name).await;
    let existing_len = existing.len();
    let incoming_len = incoming.len();

    let merged = merge_questions(existing, incoming);
    let json = to_pretty_json(&merged)?;
    storage.write_file(name, &json).await?;

    let summary = MergeSummary {
        existing: existing_len,
        incoming: incoming_len,
        total: merged.len(),
    };
    tracing::debug!(
        "Bank {}: existing={}, incoming={}, total={}",
        storage.locate(name),
        summary.existing,
        summary.incoming,
        summary.total
    );
    Ok((summary, json))
}

/// Every `*.json` bank directly inside `dir`, keyed by file stem, in path
/// order. Files that cannot be read or parsed are logged and skipped.
pub fn read_bank_dir(dir: &Path) -> Result<Vec<QuestionBank>> {
    let pattern = format!(
        "{}/*.json",
        glob::Pattern::escape(&dir.to_string_lossy()).trim_end_matches('/')
    );
    let mut paths: Vec<_> = glob::glob(&pattern)?.filter_map(|p| p.ok()).collect();
    paths.sort();

    let mut banks = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(key) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let parsed = std::fs::read(&path)
            .map_err(QuizError::from)
            .and_then(|bytes| Ok(serde_json::from_slice::<Vec<Question>>(&bytes)?));
        match parsed {
            Ok(questions) => banks.push(QuestionBank { key, questions }),
            Err(e) => tracing::error!("❌ Error loading bank {}: {}", path.display(), e),
        }
    }
    Ok(banks)
}
