pub mod domain;
pub mod ports;

pub use domain::{
    ClarifyingQuestion, CompletedSession, DebugReport, DebugSessionDraft, FixStep,
    GeneratedQuestions, Language, Plan, QuestionAnswer, RootCause, SessionSummary, Severity,
    SimilarBug, User, UserIdentity, WeakSpot, WhatToLearn,
};
pub use ports::{
    CompletionRequest, CompletionService, DatabaseService, DebugAssistantService,
    IdentityService, PortError, PortResult, SessionStore,
};
