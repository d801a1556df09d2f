//! In-memory fakes of the core ports and helpers for driving the router.

#![allow(dead_code)]

use api_lib::adapters::{TieredSessionStore, TrustedHeaderIdentity};
use api_lib::config::Config;
use api_lib::web::{build_router, AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use debugmate_core::domain::{
    ClarifyingQuestion, CompletedSession, DebugReport, FixStep, GeneratedQuestions, Language,
    Plan, RootCause, SessionSummary, Severity, SimilarBug, User, WeakSpot, WhatToLearn,
};
use debugmate_core::ports::{DatabaseService, DebugAssistantService, PortError, PortResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const USER_A: &str = "user_alice";
pub const USER_B: &str = "user_bob";

//=========================================================================================
// Fake Database
//=========================================================================================

#[derive(Default)]
pub struct FakeDb {
    users: Mutex<HashMap<String, User>>,
    sessions: Mutex<Vec<CompletedSession>>,
    weak_spots: Mutex<HashMap<(Uuid, String), WeakSpot>>,
    pub fail_saves: Mutex<bool>,
}

impl FakeDb {
    /// Seeds a user that has already spent `used` of `limit` sessions.
    pub fn with_user(&self, external_id: &str, used: i32, limit: i32) {
        self.users.lock().unwrap().insert(
            external_id.to_string(),
            User {
                id: Uuid::new_v4(),
                external_id: external_id.to_string(),
                email: None,
                plan: Plan::Free,
                sessions_used: used,
                sessions_limit: limit,
                created_at: Utc::now(),
            },
        );
    }

    pub fn saved_sessions(&self) -> Vec<CompletedSession> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn sessions_used(&self, external_id: &str) -> i32 {
        self.users
            .lock()
            .unwrap()
            .get(external_id)
            .map(|u| u.sessions_used)
            .unwrap_or(0)
    }
}

#[async_trait]
impl DatabaseService for FakeDb {
    async fn get_or_create_user(&self, external_id: &str) -> PortResult<User> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .entry(external_id.to_string())
            .or_insert_with(|| User {
                id: Uuid::new_v4(),
                external_id: external_id.to_string(),
                email: None,
                plan: Plan::Free,
                sessions_used: 0,
                sessions_limit: 10,
                created_at: Utc::now(),
            });
        Ok(user.clone())
    }

    async fn save_completed_session(&self, session: &CompletedSession) -> PortResult<()> {
        if *self.fail_saves.lock().unwrap() {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        self.sessions.lock().unwrap().push(session.clone());
        if let Some(user) = self
            .users
            .lock()
            .unwrap()
            .values_mut()
            .find(|u| u.id == session.user_id)
        {
            user.sessions_used += 1;
        }
        self.weak_spots
            .lock()
            .unwrap()
            .entry((session.user_id, session.error_category.clone()))
            .and_modify(|spot| {
                spot.occurrence_count += 1;
                spot.last_seen_at = session.created_at;
            })
            .or_insert_with(|| WeakSpot {
                error_category: session.error_category.clone(),
                language: session.language,
                occurrence_count: 1,
                last_seen_at: session.created_at,
            });
        Ok(())
    }

    async fn list_sessions(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> PortResult<(Vec<SessionSummary>, i64)> {
        let mut owned: Vec<CompletedSession> = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = owned.len() as i64;
        let page = owned
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|s| SessionSummary {
                id: s.id,
                language: s.language,
                error_message: s.error_message,
                status: s.status,
                error_category: s.error_category,
                created_at: s.created_at,
            })
            .collect();
        Ok((page, total))
    }

    async fn get_session_for_user(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<CompletedSession> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == session_id && s.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(session_id.to_string()))
    }

    async fn delete_session_for_user(&self, session_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| !(s.id == session_id && s.user_id == user_id));
        if sessions.len() == before {
            return Err(PortError::NotFound(session_id.to_string()));
        }
        Ok(())
    }

    async fn list_weak_spots(&self, user_id: Uuid) -> PortResult<Vec<WeakSpot>> {
        Ok(self
            .weak_spots
            .lock()
            .unwrap()
            .iter()
            .filter(|((owner, _), _)| *owner == user_id)
            .map(|(_, spot)| spot.clone())
            .collect())
    }
}

//=========================================================================================
// Scripted Assistant
//=========================================================================================

/// Answers instantly with canned output. Report failures can be queued up,
/// and `hang` makes every call wait forever.
#[derive(Default)]
pub struct ScriptedAssistant {
    pub question_calls: AtomicUsize,
    pub report_calls: AtomicUsize,
    pub report_failures_left: AtomicUsize,
    pub hang: Mutex<bool>,
}

impl ScriptedAssistant {
    pub fn calls(&self) -> usize {
        self.question_calls.load(Ordering::SeqCst) + self.report_calls.load(Ordering::SeqCst)
    }

    fn hanging(&self) -> bool {
        *self.hang.lock().unwrap()
    }
}

pub fn sample_report(category: &str) -> DebugReport {
    DebugReport {
        root_cause: RootCause {
            summary: "Reading a property of undefined".to_string(),
            explanation: "user is undefined until the fetch resolves".to_string(),
            severity: Severity::Medium,
        },
        step_by_step_fix: vec![
            FixStep {
                step: 1,
                instruction: "Guard the access".to_string(),
                code: Some("user?.name".to_string()),
                explanation: "Optional chaining short-circuits on undefined".to_string(),
            },
            FixStep {
                step: 2,
                instruction: "Render a loading state".to_string(),
                code: None,
                explanation: "Avoid rendering before data arrives".to_string(),
            },
        ],
        fixed_code: "console.log(user?.name)".to_string(),
        what_to_learn: WhatToLearn {
            concept: "Async data flow".to_string(),
            why_it_matters: "Data is not there on first render".to_string(),
            search_query: "javascript optional chaining".to_string(),
            estimated_learning_time: "15 minutes".to_string(),
        },
        similar_bugs: vec![SimilarBug {
            pattern: "Accessing nested properties eagerly".to_string(),
            example: "a.b.c".to_string(),
            how_to_avoid: "Check each level".to_string(),
        }],
        encouragement: "Nice catch.".to_string(),
        error_category: category.to_string(),
    }
}

#[async_trait]
impl DebugAssistantService for ScriptedAssistant {
    async fn generate_clarifying_questions(
        &self,
        _language: Language,
        _error_message: &str,
        _code: &str,
    ) -> PortResult<GeneratedQuestions> {
        self.question_calls.fetch_add(1, Ordering::SeqCst);
        if self.hanging() {
            futures::future::pending::<()>().await;
        }
        Ok(GeneratedQuestions {
            questions: (1..=3)
                .map(|i| ClarifyingQuestion {
                    id: i.to_string(),
                    question: format!("Question number {}?", i),
                })
                .collect(),
            error_category: "Null reference".to_string(),
        })
    }

    async fn generate_debug_report(
        &self,
        _language: Language,
        _error_message: &str,
        _code: &str,
        _answers_formatted: &str,
    ) -> PortResult<DebugReport> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        if self.hanging() {
            futures::future::pending::<()>().await;
        }
        let injected = self
            .report_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(PortError::Unavailable("provider returned 503".to_string()));
        }
        Ok(sample_report(""))
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        _ => None,
    })
    .expect("test config")
}

pub struct Harness {
    pub app: Router,
    pub db: Arc<FakeDb>,
}

pub fn harness_with(db: Arc<FakeDb>, assistant: Arc<dyn DebugAssistantService>) -> Harness {
    let config = test_config();
    let sessions = Arc::new(TieredSessionStore::new(None, config.session_store_timeout));
    let state = Arc::new(AppState {
        db: db.clone(),
        config: Arc::new(config),
        identity: Arc::new(TrustedHeaderIdentity::new()),
        sessions,
        assistant,
    });
    Harness {
        app: build_router(state).expect("router"),
        db,
    }
}

pub fn harness(assistant: Arc<ScriptedAssistant>) -> Harness {
    harness_with(Arc::new(FakeDb::default()), assistant)
}

/// Sends one request and returns the status plus the parsed JSON body
/// (`Value::Null` for non-JSON bodies).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub fn start_body() -> Value {
    serde_json::json!({
        "code": "const user = undefined;\nconsole.log(user.name);",
        "errorMessage": "TypeError: Cannot read properties of undefined (reading 'name')",
        "language": "javascript"
    })
}

pub fn complete_body(session_id: &str) -> Value {
    serde_json::json!({
        "sessionId": session_id,
        "answers": [
            {"questionId": "1", "answer": "It should be the logged in user"},
            {"questionId": "2", "answer": "On first page load"},
            {"questionId": "3", "answer": "I added the fetch yesterday"}
        ]
    })
}

/// Runs phase 1 as `user` and returns the new session id.
pub async fn start_session(app: &Router, user: &str) -> String {
    let (status, body) = send(app, "POST", "/debug/start", Some(user), Some(start_body())).await;
    assert_eq!(status, StatusCode::OK, "start failed: {}", body);
    body["sessionId"].as_str().expect("sessionId").to_string()
}

pub const AI_DEADLINE: Duration = Duration::from_secs(30);
