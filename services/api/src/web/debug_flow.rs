//! services/api/src/web/debug_flow.rs
//!
//! The two-phase debug protocol. Phase 1 gates on the caller's plan, asks the
//! model for clarifying questions and parks a draft in the session store.
//! Phase 2 claims that draft exactly once, asks the model for the report and
//! records the finished session.

use crate::error::ApiError;
use crate::web::protocol::{CompleteDebugResponse, StartDebugResponse};
use crate::web::state::AppState;
use crate::web::validation::{sanitize_input, ValidatedComplete, ValidatedStart};
use chrono::Utc;
use debugmate_core::domain::{
    CompletedSession, DebugReport, DebugSessionDraft, QuestionAnswer, UserIdentity,
};
use debugmate_core::ports::PortResult;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

const COMPLETED_STATUS: &str = "complete";
const FALLBACK_QUESTION_LABEL: &str = "Question";

pub fn draft_key(session_id: Uuid) -> String {
    format!("session:{}", session_id)
}

/// Runs one gateway call under the AI deadline. Any failure, including the
/// deadline firing, surfaces as `AiUnavailable`.
async fn within_ai_deadline<T, F>(deadline: Duration, call: F) -> Result<T, ApiError>
where
    F: Future<Output = PortResult<T>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!("AI gateway call failed: {}", e);
            Err(ApiError::AiUnavailable)
        }
        Err(_) => {
            warn!("AI gateway call exceeded the {:?} deadline", deadline);
            Err(ApiError::AiUnavailable)
        }
    }
}

//=========================================================================================
// Phase 1: Start
//=========================================================================================

pub async fn start_debug_session(
    app_state: &AppState,
    identity: &UserIdentity,
    input: ValidatedStart,
) -> Result<StartDebugResponse, ApiError> {
    // --- Plan gate ---
    let user = app_state
        .db
        .get_or_create_user(&identity.user_id)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to load user: {}", e)))?;
    if !user.has_quota_remaining() {
        info!(
            "User {} is at their session limit ({}/{})",
            identity.user_id, user.sessions_used, user.sessions_limit
        );
        return Err(ApiError::LimitReached);
    }

    // --- Clarifying questions ---
    let generated = within_ai_deadline(
        app_state.config.ai_timeout,
        app_state.assistant.generate_clarifying_questions(
            input.language,
            &input.error_message,
            &input.code,
        ),
    )
    .await?;

    // --- Park the draft ---
    let session_id = Uuid::new_v4();
    let ttl = app_state.config.session_ttl;
    let now = Utc::now();
    let expires_at = now
        + chrono::Duration::from_std(ttl)
            .map_err(|e| ApiError::Internal(format!("Session TTL out of range: {}", e)))?;
    let draft = DebugSessionDraft {
        session_id,
        owner_id: identity.user_id.clone(),
        language: input.language,
        code: input.code,
        error_message: input.error_message,
        clarifying_questions: generated.questions.clone(),
        error_category: generated.error_category.clone(),
        created_at: now,
        expires_at,
    };
    let serialized = serde_json::to_string(&draft)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize draft: {}", e)))?;
    app_state
        .sessions
        .put(&draft_key(session_id), &serialized, ttl)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to store draft: {}", e)))?;

    info!(
        "Started debug session {} for user {} ({})",
        session_id, identity.user_id, generated.error_category
    );

    Ok(StartDebugResponse {
        session_id,
        questions: generated.questions,
        error_category: generated.error_category,
    })
}

//=========================================================================================
// Phase 2: Complete
//=========================================================================================

pub async fn complete_debug_session(
    app_state: &AppState,
    identity: &UserIdentity,
    input: ValidatedComplete,
) -> Result<CompleteDebugResponse, ApiError> {
    let key = draft_key(input.session_id);

    // --- Load and check the draft ---
    let raw = match app_state.sessions.get(&key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Err(ApiError::SessionNotFound),
        Err(e) => {
            warn!("Session store read failed for {}: {}", key, e);
            return Err(ApiError::SessionNotFound);
        }
    };
    let draft: DebugSessionDraft = serde_json::from_str(&raw).map_err(|e| {
        warn!("Discarding unreadable draft {}: {}", key, e);
        ApiError::SessionNotFound
    })?;
    if draft.remaining_ttl(Utc::now()).is_none() {
        return Err(ApiError::SessionNotFound);
    }
    if !draft.is_owned_by(&identity.user_id) {
        info!(
            "User {} tried to complete session {} owned by someone else",
            identity.user_id, draft.session_id
        );
        return Err(ApiError::Unauthorized);
    }

    // --- Claim it; only one request gets past this point ---
    let claimed = app_state
        .sessions
        .take(&key)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to claim draft: {}", e)))?;
    if claimed.is_none() {
        info!("Session {} was already claimed by another request", draft.session_id);
        return Err(ApiError::SessionNotFound);
    }

    // --- Debug report ---
    let answers_formatted = format_answers(&draft, &input.answers);
    let report = within_ai_deadline(
        app_state.config.ai_timeout,
        app_state.assistant.generate_debug_report(
            draft.language,
            &draft.error_message,
            &draft.code,
            &answers_formatted,
        ),
    )
    .await;
    let mut report = match report {
        Ok(report) => report,
        Err(e) => {
            restore_draft(app_state, &key, &draft, &raw).await;
            return Err(e);
        }
    };
    if report.error_category.trim().is_empty() {
        report.error_category = draft.error_category.clone();
    }

    // --- Record it ---
    if let Err(e) = persist_session(app_state, &draft, &input.answers, &report).await {
        error!("{}", e);
    }

    info!(
        "Completed debug session {} for user {}",
        draft.session_id, identity.user_id
    );

    Ok(CompleteDebugResponse {
        session_id: draft.session_id,
        report,
    })
}

/// Puts a claimed draft back with whatever TTL it had left, so the caller can
/// retry phase 2 without answering again.
async fn restore_draft(app_state: &AppState, key: &str, draft: &DebugSessionDraft, raw: &str) {
    let Some(remaining) = draft
        .remaining_ttl(Utc::now())
        .and_then(|d| d.to_std().ok())
    else {
        return;
    };
    if let Err(e) = app_state.sessions.put(key, raw, remaining).await {
        warn!("Failed to restore draft {} after AI failure: {}", key, e);
    }
}

async fn persist_session(
    app_state: &AppState,
    draft: &DebugSessionDraft,
    answers: &[QuestionAnswer],
    report: &DebugReport,
) -> Result<(), ApiError> {
    let degraded = |e: debugmate_core::ports::PortError| {
        ApiError::PersistenceDegraded(format!("session {}: {}", draft.session_id, e))
    };
    let user = app_state
        .db
        .get_or_create_user(&draft.owner_id)
        .await
        .map_err(degraded)?;
    let session = CompletedSession {
        id: draft.session_id,
        user_id: user.id,
        language: draft.language,
        code: draft.code.clone(),
        error_message: draft.error_message.clone(),
        clarifying_questions: draft.clarifying_questions.clone(),
        answers: answers.to_vec(),
        report: report.clone(),
        error_category: report.error_category.clone(),
        status: COMPLETED_STATUS.to_string(),
        created_at: Utc::now(),
    };
    app_state
        .db
        .save_completed_session(&session)
        .await
        .map_err(degraded)
}

/// Renders answers as `Q:`/`A:` blocks in the draft's question order.
/// Answers to unknown question ids go last under a generic label.
pub fn format_answers(draft: &DebugSessionDraft, answers: &[QuestionAnswer]) -> String {
    let position = |answer: &QuestionAnswer| {
        draft
            .clarifying_questions
            .iter()
            .position(|q| q.id == answer.question_id)
            .unwrap_or(usize::MAX)
    };
    let mut ordered: Vec<&QuestionAnswer> = answers.iter().collect();
    ordered.sort_by_key(|a| position(a));

    ordered
        .into_iter()
        .map(|a| {
            let question = draft
                .question_text(&a.question_id)
                .unwrap_or(FALLBACK_QUESTION_LABEL);
            format!("Q: {}\nA: {}", question, sanitize_input(&a.answer))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use debugmate_core::domain::{ClarifyingQuestion, Language};

    fn draft() -> DebugSessionDraft {
        let now = Utc::now();
        DebugSessionDraft {
            session_id: Uuid::new_v4(),
            owner_id: "user_a".to_string(),
            language: Language::Javascript,
            code: "const x = undefined.y;".to_string(),
            error_message: "TypeError: cannot read y".to_string(),
            clarifying_questions: ["What is x?", "When does it fail?", "What changed?"]
                .iter()
                .enumerate()
                .map(|(i, q)| ClarifyingQuestion {
                    id: (i + 1).to_string(),
                    question: q.to_string(),
                })
                .collect(),
            error_category: "Null reference".to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::minutes(30),
        }
    }

    fn answer(id: &str, text: &str) -> QuestionAnswer {
        QuestionAnswer {
            question_id: id.to_string(),
            answer: text.to_string(),
        }
    }

    #[test]
    fn answers_follow_question_order() {
        let formatted = format_answers(
            &draft(),
            &[answer("3", "nothing"), answer("1", "an object"), answer("2", "on load")],
        );
        assert_eq!(
            formatted,
            "Q: What is x?\nA: an object\n\nQ: When does it fail?\nA: on load\n\nQ: What changed?\nA: nothing"
        );
    }

    #[test]
    fn unknown_ids_go_last_with_a_generic_label() {
        let formatted = format_answers(
            &draft(),
            &[answer("zz", "stray"), answer("2", "on load"), answer("1", "an object")],
        );
        assert!(formatted.ends_with("Q: Question\nA: stray"));
        assert!(formatted.starts_with("Q: What is x?"));
    }

    #[test]
    fn answers_are_sanitized() {
        let formatted = format_answers(&draft(), &[answer("1", " <i>an</i> object<script>x()</script> ")]);
        assert_eq!(formatted, "Q: What is x?\nA: an object");
    }

    #[test]
    fn draft_keys_are_namespaced() {
        let id = Uuid::nil();
        assert_eq!(draft_key(id), "session:00000000-0000-0000-0000-000000000000");
    }
}
