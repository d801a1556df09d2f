//! services/api/src/web/validation.rs
//!
//! The input gate shared by both protocol phases. Every check runs before any
//! model call; the first failing field short-circuits the request.

use crate::error::ApiError;
use crate::web::protocol::{CompleteDebugRequest, PageParams, StartDebugRequest};
use debugmate_core::domain::{Language, QuestionAnswer};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

pub const CODE_MIN_LEN: usize = 10;
pub const CODE_MAX_LEN: usize = 10_000;
pub const ERROR_MESSAGE_MIN_LEN: usize = 5;
pub const ERROR_MESSAGE_MAX_LEN: usize = 2_000;
pub const ANSWER_MAX_LEN: usize = 500;
pub const REQUIRED_ANSWERS: usize = 3;
pub const MAX_PAGE_SIZE: i64 = 50;
const DEFAULT_PAGE_SIZE: i64 = 10;

static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<script[\s\S]*?>[\s\S]*?</script>",
        r"(?i)javascript:",
        r"(?i)on\w+\s*=",
        r"(?i)DROP\s+TABLE",
        r"(?i)DELETE\s+FROM",
        r"(?i)INSERT\s+INTO",
        r"(?i)UNION\s+SELECT",
        r"(?i)exec\s*\(",
        r"(?i)eval\s*\(",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid dangerous-pattern regex"))
    .collect()
});

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<script[\s\S]*?>[\s\S]*?</script>").expect("valid script regex"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

//=========================================================================================
// Validated Inputs
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedStart {
    pub code: String,
    pub error_message: String,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedComplete {
    pub session_id: Uuid,
    pub answers: Vec<QuestionAnswer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    /// Rows to skip; always representable.
    pub offset: i64,
}

//=========================================================================================
// Helpers
//=========================================================================================

pub fn contains_malicious_patterns(input: &str) -> bool {
    DANGEROUS_PATTERNS.iter().any(|pattern| pattern.is_match(input))
}

/// Strips script blocks, then any remaining tags, then surrounding whitespace.
pub fn sanitize_input(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(input, "");
    ANY_TAG.replace_all(&without_scripts, "").trim().to_string()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

//=========================================================================================
// Validators
//=========================================================================================

pub fn validate_start(req: StartDebugRequest) -> Result<ValidatedStart, ApiError> {
    let code_len = char_len(&req.code);
    if code_len < CODE_MIN_LEN {
        return Err(ApiError::validation("code", "Code must be at least 10 characters"));
    }
    if code_len > CODE_MAX_LEN {
        return Err(ApiError::validation("code", "Code must be under 10,000 characters"));
    }
    if contains_malicious_patterns(&req.code) {
        return Err(ApiError::validation("code", "Invalid input detected"));
    }

    let message_len = char_len(&req.error_message);
    if message_len < ERROR_MESSAGE_MIN_LEN {
        return Err(ApiError::validation("errorMessage", "Error message too short"));
    }
    if message_len > ERROR_MESSAGE_MAX_LEN {
        return Err(ApiError::validation("errorMessage", "Error message too long"));
    }

    let language: Language = req
        .language
        .parse()
        .map_err(|e: String| ApiError::validation("language", e))?;

    Ok(ValidatedStart {
        code: req.code,
        error_message: req.error_message,
        language,
    })
}

pub fn validate_complete(req: CompleteDebugRequest) -> Result<ValidatedComplete, ApiError> {
    // Only the canonical hyphenated form is accepted.
    let session_id = Some(req.session_id.as_str())
        .filter(|raw| raw.len() == 36)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| ApiError::validation("sessionId", "Invalid session ID"))?;

    if req.answers.len() != REQUIRED_ANSWERS {
        return Err(ApiError::validation("answers", "Must provide exactly 3 answers"));
    }

    for (index, answer) in req.answers.iter().enumerate() {
        if answer.question_id.trim().is_empty() {
            return Err(ApiError::validation(
                format!("answers[{}].questionId", index),
                "Question id is required",
            ));
        }
        let len = char_len(&answer.answer);
        if len < 1 {
            return Err(ApiError::validation(
                format!("answers[{}].answer", index),
                "Please provide an answer",
            ));
        }
        if len > ANSWER_MAX_LEN {
            return Err(ApiError::validation(
                format!("answers[{}].answer", index),
                "Answer must be under 500 characters",
            ));
        }
    }

    Ok(ValidatedComplete {
        session_id,
        answers: req.answers,
    })
}

pub fn validate_page(params: &PageParams) -> Result<Pagination, ApiError> {
    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(ApiError::validation("page", "Page must be at least 1"));
    }
    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ApiError::validation("pageSize", "Page size must be between 1 and 50"));
    }
    let offset = (page - 1)
        .checked_mul(page_size)
        .ok_or_else(|| ApiError::validation("page", "Page is out of range"))?;
    Ok(Pagination {
        page,
        page_size,
        offset,
    })
}
