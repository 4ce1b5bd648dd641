mod error;
mod hash;
mod identity;
mod request;
mod result;

pub use error::{ErrorCode, HttpError};
pub use hash::{passes_rollout, rollout_bucket};
pub use identity::{Family, FamilyId, Identity, Profile, ProfileId};
pub use request::{
    ChatRequest, ConversationMessage, RequestMeta, Role, ToolSpec, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
pub use result::{ChatError, ChatSuccess, LedgerEntry, ResponseMeta, TokenUsage};
