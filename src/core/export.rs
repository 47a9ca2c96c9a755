use crate::core::bank::to_pretty_json;
use crate::domain::model::{QuestionBank, OPTION_KEYS};
use crate::utils::error::{QuizError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const CSV_HEADER: [&str; 8] = [
    "key",
    "question_id",
    "question",
    "option_a",
    "option_b",
    "option_c",
    "option_d",
    "correct_answer",
];

/// One row per question; `question_id` falls back to the 1-based position.
pub fn questions_csv(banks: &[QuestionBank]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for bank in banks {
        for (index, q) in bank.questions.iter().enumerate() {
            let id = q.question_id.unwrap_or(index as u64 + 1).to_string();
            let mut record = vec![bank.key.as_str(), id.as_str(), q.question.as_str()];
            record.extend(
                OPTION_KEYS
                    .iter()
                    .map(|k| q.options.get(*k).map(String::as_str).unwrap_or("")),
            );
            record.push(q.correct_answer.as_str());
            writer.write_record(&record)?;
        }
    }

    writer.into_inner().map_err(|e| QuizError::IoError(e.into_error()))
}

#[derive(Debug, Serialize)]
struct BundleManifest<'a> {
    generated_at: DateTime<Utc>,
    banks: Vec<ManifestEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct ManifestEntry<'a> {
    key: &'a str,
    file: String,
    questions: usize,
}

/// ZIP archive holding each bank as JSON, `questions.csv` and `manifest.json`.
pub fn bundle_zip(banks: &[QuestionBank], generated_at: DateTime<Utc>) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default();
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for bank in banks {
        zip.start_file(bank.file_name(), options)?;
        zip.write_all(&to_pretty_json(&bank.questions)?)?;
    }

    zip.start_file("questions.csv", options)?;
    zip.write_all(&questions_csv(banks)?)?;

    let manifest = BundleManifest {
        generated_at,
        banks: banks
            .iter()
            .map(|b| ManifestEntry {
                key: &b.key,
                file: b.file_name(),
                questions: b.questions.len(),
            })
            .collect(),
    };
    zip.start_file("manifest.json", options)?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

    Ok(zip.finish()?.into_inner())
}
