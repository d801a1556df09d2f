//! services/api/src/adapters/debug_llm.rs
//!
//! This module contains the AI completion gateway for debug sessions.
//! It implements the `DebugAssistantService` port on top of any
//! `CompletionService`, adding the prompts, defensive JSON extraction,
//! response shape checks and a bounded retry policy.
//!
//! The overall deadline is NOT enforced here; the caller races the whole
//! call against its own timeout.

const CLARIFYING_QUESTIONS_SYSTEM: &str = r#"You are DebugMate, a senior software engineer who helps developers find the root cause of bugs. Before diagnosing anything you ask exactly 3 short clarifying questions, the way an experienced reviewer would.

Rules:
- Ask exactly 3 questions.
- Every question must be specific to the code and error you were given.
- Do not ask generic questions such as "what have you tried?".
- Each question should narrow down the root cause.
- Keep each question under 15 words.
- Respond with a single JSON object and nothing else.

JSON shape:
{
  "questions": [
    {"id": "1", "question": "string"},
    {"id": "2", "question": "string"},
    {"id": "3", "question": "string"}
  ],
  "errorCategory": "short label, e.g. async/await, null reference, type mismatch",
  "language": "string"
}"#;

const DEBUG_REPORT_SYSTEM: &str = r#"You are DebugMate. Using the code, the error, and the developer's answers to your clarifying questions, write a complete debug report.

Rules:
- rootCause is written in plain English a junior developer can follow.
- stepByStepFix is a list of concrete, ordered steps.
- Include corrected code snippets where they help.
- whatToLearn names a real concept worth studying.
- similarBugs lists real patterns the developer should watch for.
- Be honest and encouraging.
- Respond with a single JSON object and nothing else.

JSON shape:
{
  "rootCause": {
    "summary": "one sentence",
    "explanation": "two or three sentences",
    "severity": "low | medium | high"
  },
  "stepByStepFix": [
    {"step": 1, "instruction": "string", "code": "string or null", "explanation": "why this step matters"}
  ],
  "fixedCode": "the complete corrected code",
  "whatToLearn": {
    "concept": "string",
    "whyItMatters": "string",
    "searchQuery": "what to search for to learn more",
    "estimatedLearningTime": "e.g. 30 minutes"
  },
  "similarBugs": [
    {"pattern": "string", "example": "string", "howToAvoid": "string"}
  ],
  "encouragement": "one personal, encouraging sentence",
  "errorCategory": "string"
}"#;

use async_trait::async_trait;
use debugmate_core::{
    domain::{ClarifyingQuestion, DebugReport, GeneratedQuestions, Language},
    ports::{CompletionRequest, CompletionService, DebugAssistantService, PortError, PortResult},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("valid fence regex"));
static OUTER_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid object regex"));

pub const REQUIRED_QUESTION_COUNT: usize = 3;

//=========================================================================================
// Retry Policy
//=========================================================================================

/// How many times a model call is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(2),
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `DebugAssistantService` using a text-completion model.
#[derive(Clone)]
pub struct LlmDebugAssistant {
    completion: Arc<dyn CompletionService>,
    retry: RetryPolicy,
}

impl LlmDebugAssistant {
    /// Creates a new `LlmDebugAssistant` with the default retry policy.
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self {
            completion,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Calls the model and parses its output, retrying on either kind of failure.
    async fn complete_with_retry<T, F>(&self, request: &CompletionRequest, parse: F) -> PortResult<T>
    where
        F: Fn(&str) -> PortResult<T> + Send + Sync,
        T: Send,
    {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry.backoff).await;
            }

            let outcome = match self.completion.complete(request).await {
                Ok(text) => parse(&text),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("Model attempt {} of {} failed: {}", attempt + 1, attempts, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| PortError::Unexpected("Model call was never attempted.".to_string())))
    }
}

fn user_message(language: Language, error_message: &str, code: &str) -> String {
    format!("Language: {}\nError: {}\nCode:\n{}", language, error_message, code)
}

//=========================================================================================
// `DebugAssistantService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DebugAssistantService for LlmDebugAssistant {
    async fn generate_clarifying_questions(
        &self,
        language: Language,
        error_message: &str,
        code: &str,
    ) -> PortResult<GeneratedQuestions> {
        let request = CompletionRequest {
            system: CLARIFYING_QUESTIONS_SYSTEM.to_string(),
            user: user_message(language, error_message, code),
            max_tokens: 500,
            temperature: 0.3,
        };
        self.complete_with_retry(&request, parse_questions).await
    }

    async fn generate_debug_report(
        &self,
        language: Language,
        error_message: &str,
        code: &str,
        answers_formatted: &str,
    ) -> PortResult<DebugReport> {
        let request = CompletionRequest {
            system: DEBUG_REPORT_SYSTEM.to_string(),
            user: format!(
                "{}\n\nMy answers to your questions:\n{}",
                user_message(language, error_message, code),
                answers_formatted
            ),
            max_tokens: 2000,
            temperature: 0.2,
        };
        self.complete_with_retry(&request, parse_report).await
    }
}

//=========================================================================================
// Response Parsing
//=========================================================================================

/// Pulls the JSON payload out of a model response.
///
/// A response that is already a JSON object is used as-is, so fences inside
/// its string values are left alone. Otherwise a fenced code block wins, then
/// the span from the first `{` to the last `}`.
pub fn extract_json(text: &str) -> PortResult<&str> {
    let trimmed = text.trim();
    if trimmed.starts_with('{')
        && serde_json::from_str::<serde::de::IgnoredAny>(trimmed).is_ok()
    {
        return Ok(trimmed);
    }
    if let Some(inner) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return Ok(inner.as_str().trim());
    }
    OUTER_OBJECT
        .find(text)
        .map(|m| m.as_str())
        .ok_or_else(|| PortError::MalformedResponse("No JSON object found in response.".to_string()))
}

#[derive(Deserialize)]
struct RawQuestions {
    #[serde(default)]
    questions: Vec<RawQuestion>,
    #[serde(default, rename = "errorCategory")]
    error_category: String,
}

#[derive(Deserialize)]
struct RawQuestion {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    question: String,
}

fn id_to_string(id: Option<serde_json::Value>) -> String {
    match id {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn parse_questions(text: &str) -> PortResult<GeneratedQuestions> {
    let raw: RawQuestions = serde_json::from_str(extract_json(text)?)
        .map_err(|e| PortError::MalformedResponse(e.to_string()))?;

    if raw.questions.len() != REQUIRED_QUESTION_COUNT {
        return Err(PortError::MalformedResponse(format!(
            "Expected {} clarifying questions, got {}.",
            REQUIRED_QUESTION_COUNT,
            raw.questions.len()
        )));
    }

    let error_category = raw.error_category.trim().to_string();
    if error_category.is_empty() {
        return Err(PortError::MalformedResponse("Missing errorCategory.".to_string()));
    }

    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(REQUIRED_QUESTION_COUNT);
    for (index, raw_question) in raw.questions.into_iter().enumerate() {
        let question = raw_question.question.trim().to_string();
        if question.is_empty() {
            return Err(PortError::MalformedResponse(format!(
                "Clarifying question {} is empty.",
                index + 1
            )));
        }
        let mut id = id_to_string(raw_question.id);
        if id.is_empty() {
            id = (index + 1).to_string();
        }
        if !seen.insert(id.clone()) {
            return Err(PortError::MalformedResponse(format!(
                "Duplicate clarifying question id '{}'.",
                id
            )));
        }
        questions.push(ClarifyingQuestion { id, question });
    }

    Ok(GeneratedQuestions {
        questions,
        error_category,
    })
}

fn parse_report(text: &str) -> PortResult<DebugReport> {
    let mut report: DebugReport = serde_json::from_str(extract_json(text)?)
        .map_err(|e| PortError::MalformedResponse(e.to_string()))?;

    if report.step_by_step_fix.is_empty() {
        return Err(PortError::MalformedResponse("Report has no fix steps.".to_string()));
    }
    report.renumber_steps();
    report.error_category = report.error_category.trim().to_string();
    Ok(report)
}
