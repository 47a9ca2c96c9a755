use crate::config::toml_config::GeneratorConfig;
use crate::core::{Question, QuestionGenerator};
use crate::utils::error::{QuizError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(config: &GeneratorConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

pub fn build_prompt(text: &str, count: usize) -> String {
    format!(
        r#"Generate {count} multiple-choice questions based on the following text.
For each question, provide four options (A, B, C, D) with exactly one correct answer.

Format the output as a JSON array of objects with the following structure:
[
    {{
        "question": "The question text",
        "options": {{
            "A": "First option",
            "B": "Second option",
            "C": "Third option",
            "D": "Fourth option"
        }},
        "correct_answer": "The letter of the correct option (A, B, C, or D)"
    }},
    ...
]

Here is the text:
{text}
"#
    )
}

/// Removes a surrounding Markdown code fence (```` ```json ... ``` ````),
/// including one written on a single line.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    match rest.split_once('\n') {
        Some((info, body)) if !info.trim_start().starts_with(['[', '{']) => body.trim(),
        Some(_) => rest.trim(),
        // ```[...]``` or ```json[...]```
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()).trim(),
    }
}

/// Parses the model reply and drops malformed questions one by one.
pub fn parse_questions(content: &str) -> Result<Vec<Question>> {
    let items: Vec<serde_json::Value> = serde_json::from_str(strip_code_fence(content))?;
    let total = items.len();

    let valid: Vec<Question> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<Question>(item) {
            Ok(q) => match q.defect() {
                Some(defect) => {
                    tracing::warn!("⚠️ Dropping generated question \"{}\": {}", q.question, defect);
                    None
                }
                None => Some(q),
            },
            Err(e) => {
                tracing::warn!("⚠️ Dropping generated question #{}: {}", index + 1, e);
                None
            }
        })
        .collect();

    if valid.len() < total {
        tracing::debug!("Kept {} of {} generated questions", valid.len(), total);
    }
    Ok(valid)
}

#[async_trait]
impl QuestionGenerator for OpenAiGenerator {
    async fn generate(&self, text: &str, count: usize) -> Result<Vec<Question>> {
        let prompt = build_prompt(text, count);
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: self.temperature,
        };

        let url = format!("{}/chat/completions", self.endpoint);
        tracing::debug!("Requesting {} questions from {} ({})", count, url, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuizError::GenerationError {
                message: format!("{} returned {}: {}", url, status, body.trim()),
            });
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| QuizError::GenerationError {
                message: "response contained no message content".to_string(),
            })?;

        parse_questions(&content)
    }
}
