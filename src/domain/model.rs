use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const OPTION_KEYS: [&str; 4] = ["A", "B", "C", "D"];

/// Front-matter block of an MDX page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub fields: BTreeMap<String, String>,
}

impl FrontMatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.get("description")
    }

    pub fn layout(&self) -> Option<&str> {
        self.get("layout")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdxDocument {
    pub path: PathBuf,
    pub filename: String,
    pub front_matter: FrontMatter,
    /// Body with the front-matter removed; `None` when the file could not be read.
    pub body: Option<String>,
    pub raw: Option<String>,
    pub error: Option<String>,
}

impl MdxDocument {
    /// Body text when the document has something to ask questions about.
    pub fn usable_body(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: BTreeMap<String, String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl Question {
    /// Why the question is unusable, if it is.
    pub fn defect(&self) -> Option<String> {
        if self.question.trim().is_empty() {
            return Some("empty question text".to_string());
        }
        let keys: Vec<&str> = self.options.keys().map(String::as_str).collect();
        if keys != OPTION_KEYS {
            return Some(format!("expected options A-D, got [{}]", keys.join(", ")));
        }
        if !self.options.contains_key(self.correct_answer.trim()) {
            return Some(format!(
                "correct answer `{}` is not one of the options",
                self.correct_answer
            ));
        }
        None
    }
}

/// Stored shape of a bank: `{ key, questions }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBank {
    pub key: String,
    pub questions: Vec<Question>,
}

impl QuestionBank {
    pub fn file_name(&self) -> String {
        format!("{}.json", self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub banks: Vec<QuestionBank>,
    pub skipped: Vec<SkippedItem>,
}

impl TransformResult {
    pub fn question_count(&self) -> usize {
        self.banks.iter().map(|b| b.questions.len()).sum()
    }
}
