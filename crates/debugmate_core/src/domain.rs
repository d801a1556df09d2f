//! crates/debugmate_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Types that cross the wire (drafts, reports) carry serde derives with the
//! camelCase field names the web client depends on.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Languages
//=========================================================================================

/// The fixed set of programming languages a debug session can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Typescript,
    Python,
    Java,
    Cpp,
    Rust,
    Go,
    Php,
    Ruby,
    Swift,
    Kotlin,
    Csharp,
    Html,
    Css,
    Sql,
}

impl Language {
    pub const ALL: [Language; 15] = [
        Language::Javascript,
        Language::Typescript,
        Language::Python,
        Language::Java,
        Language::Cpp,
        Language::Rust,
        Language::Go,
        Language::Php,
        Language::Ruby,
        Language::Swift,
        Language::Kotlin,
        Language::Csharp,
        Language::Html,
        Language::Css,
        Language::Sql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Php => "php",
            Language::Ruby => "ruby",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Csharp => "csharp",
            Language::Html => "html",
            Language::Css => "css",
            Language::Sql => "sql",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    /// Exact, case-sensitive match against the lowercase tags.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.as_str() == s)
            .ok_or_else(|| format!("Unsupported language '{}'", s))
    }
}

//=========================================================================================
// Clarification
//=========================================================================================

/// One of the three questions asked before a report is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClarifyingQuestion {
    pub id: String,
    pub question: String,
}

/// A user's answer to a clarifying question, as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    pub question_id: String,
    pub answer: String,
}

/// The output of the question-generation step of the AI gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuestions {
    pub questions: Vec<ClarifyingQuestion>,
    pub error_category: String,
}

/// The transient state held between phase 1 (start) and phase 2 (complete).
///
/// Lives only in the ephemeral session store and is never written to the
/// permanent datastore as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSessionDraft {
    pub session_id: Uuid,
    pub owner_id: String,
    pub language: Language,
    pub code: String,
    pub error_message: String,
    pub clarifying_questions: Vec<ClarifyingQuestion>,
    pub error_category: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DebugSessionDraft {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Looks up the text of one of the draft's questions by id.
    pub fn question_text(&self, question_id: &str) -> Option<&str> {
        self.clarifying_questions
            .iter()
            .find(|q| q.id == question_id)
            .map(|q| q.question.as_str())
    }

    /// Time left before the draft expires, or `None` if it already has.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<Duration> {
        let remaining = self.expires_at - now;
        if remaining > Duration::zero() {
            Some(remaining)
        } else {
            None
        }
    }
}

//=========================================================================================
// Debug Report
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

// Models are not consistent about casing ("High" vs "high").
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RootCause {
    pub summary: String,
    pub explanation: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FixStep {
    #[serde(default, alias = "stepNumber")]
    pub step: u32,
    pub instruction: String,
    #[serde(default)]
    pub code: Option<String>,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WhatToLearn {
    pub concept: String,
    pub why_it_matters: String,
    pub search_query: String,
    pub estimated_learning_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimilarBug {
    pub pattern: String,
    pub example: String,
    pub how_to_avoid: String,
}

/// The final artifact of a completed debug session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebugReport {
    pub root_cause: RootCause,
    pub step_by_step_fix: Vec<FixStep>,
    pub fixed_code: String,
    pub what_to_learn: WhatToLearn,
    pub similar_bugs: Vec<SimilarBug>,
    pub encouragement: String,
    #[serde(default)]
    pub error_category: String,
}

impl DebugReport {
    /// Rewrites step numbers to be 1-based and contiguous, in emitted order.
    pub fn renumber_steps(&mut self) {
        for (index, step) in self.step_by_step_fix.iter_mut().enumerate() {
            step.step = index as u32 + 1;
        }
    }
}

//=========================================================================================
// Users & Persisted Sessions
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    Bootcamp,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Bootcamp => "bootcamp",
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            "bootcamp" => Ok(Plan::Bootcamp),
            other => Err(format!("unknown plan '{}'", other)),
        }
    }
}

/// The verified identity attached to a request by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
}

/// A durable user record, including the usage counters the plan gate reads.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub email: Option<String>,
    pub plan: Plan,
    pub sessions_used: i32,
    pub sessions_limit: i32,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_quota_remaining(&self) -> bool {
        self.sessions_used < self.sessions_limit
    }
}

/// A finished debug session as written to the permanent datastore.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub language: Language,
    pub code: String,
    pub error_message: String,
    pub clarifying_questions: Vec<ClarifyingQuestion>,
    pub answers: Vec<QuestionAnswer>,
    pub report: DebugReport,
    pub error_category: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// The list-view projection of a `CompletedSession`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub language: Language,
    pub error_message: String,
    pub status: String,
    pub error_category: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user aggregate of a recurring error category.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeakSpot {
    pub error_category: String,
    pub language: Language,
    pub occurrence_count: i32,
    pub last_seen_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_round_trips_through_its_tag() {
        for lang in Language::ALL {
            assert_eq!(lang.as_str().parse::<Language>(), Ok(lang));
        }
        assert!("JavaScript".parse::<Language>().is_err());
        assert!("cobol".parse::<Language>().is_err());
    }

    #[test]
    fn severity_accepts_any_casing() {
        let severity: Severity = serde_json::from_str("\"High\"").unwrap();
        assert_eq!(severity, Severity::High);
        assert_eq!(serde_json::to_string(&Severity::Medium).unwrap(), "\"medium\"");
        assert!(serde_json::from_str::<Severity>("\"critical\"").is_err());
    }

    #[test]
    fn fix_step_accepts_step_number_alias() {
        let step: FixStep = serde_json::from_str(
            r#"{"stepNumber": 4, "instruction": "x", "explanation": "y"}"#,
        )
        .unwrap();
        assert_eq!(step.step, 4);
        assert_eq!(step.code, None);
    }

    #[test]
    fn draft_ttl_runs_out() {
        let now = Utc::now();
        let draft = DebugSessionDraft {
            session_id: Uuid::new_v4(),
            owner_id: "user_a".to_string(),
            language: Language::Python,
            code: "print(x)".to_string(),
            error_message: "NameError".to_string(),
            clarifying_questions: vec![ClarifyingQuestion {
                id: "1".to_string(),
                question: "Where is x defined?".to_string(),
            }],
            error_category: "name resolution".to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(30),
        };

        assert!(draft.is_owned_by("user_a"));
        assert!(!draft.is_owned_by("user_b"));
        assert_eq!(draft.question_text("1"), Some("Where is x defined?"));
        assert_eq!(draft.question_text("9"), None);
        assert!(draft.remaining_ttl(now + Duration::minutes(29)).is_some());
        assert!(draft.remaining_ttl(now + Duration::minutes(31)).is_none());
    }
}
