pub mod completion_llm;
pub mod db;
pub mod debug_llm;
pub mod identity;
pub mod memory_store;
pub mod redis_store;
pub mod tiered_store;

pub use completion_llm::OpenAiCompletionAdapter;
pub use db::DbAdapter;
pub use debug_llm::{LlmDebugAssistant, RetryPolicy};
pub use identity::TrustedHeaderIdentity;
pub use memory_store::InMemorySessionStore;
pub use redis_store::RedisSessionStore;
pub use tiered_store::TieredSessionStore;
