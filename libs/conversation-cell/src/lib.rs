pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{ConversationError, ConversationState, Prompt, StepInput, StoredConversation};
pub use services::codes::ConfirmationCodeService;
pub use services::engine::ConversationEngine;
pub use services::stores::{CodeStore, ConversationStore, RedisCodeStore, RedisConversationStore};
