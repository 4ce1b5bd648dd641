use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::identity::{FamilyId, ProfileId};

/// A single turn in a conversation history (spec.md §3)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A tool definition the model may be asked to call (spec.md §6)
///
/// Shape only — the Non-goals in spec.md §1 exclude function-calling
/// payload translation, so adapters never inspect `parameters`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// Mandatory per-request tracing/identity context (spec.md §3)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMeta {
    pub request_id: String,
    pub trace_id: String,
    pub user_id: String,
    pub family_id: FamilyId,
    pub profile_id: ProfileId,
    pub user_home_region: String,
}

/// One chat completion request (spec.md §3, wire shape spec.md §6)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default)]
    pub preferred_provider: Option<String>,
    #[serde(default)]
    pub preferred_model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub streaming: Option<bool>,
    #[serde(default)]
    pub required_capabilities: HashSet<String>,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationMessage>,
    #[serde(default)]
    pub estimated_input_tokens: Option<u32>,
    #[serde(default)]
    pub estimated_output_tokens: Option<u32>,
    #[serde(default)]
    pub config_id: Option<String>,

    /// Not part of the wire body; populated by the gateway from the
    /// authenticated request context (spec.md §3: "mandatory request context").
    #[serde(skip)]
    pub meta: Option<RequestMeta>,
}

/// Spec.md §6 defaults for missing optional fields
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

impl ChatRequest {
    #[must_use]
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming.unwrap_or(false)
    }

    #[must_use]
    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }

    /// Rough token estimate used for admission-time scoring only (spec.md §9)
    ///
    /// Downstream tokenization may differ per provider; the ledger always
    /// uses the provider's returned `usage`, never this estimate.
    #[must_use]
    pub fn estimated_input_tokens(&self) -> u32 {
        self.estimated_input_tokens
            .unwrap_or_else(|| u32::try_from(self.prompt.len() / 4).unwrap_or(u32::MAX))
    }

    /// Assemble the messages to send upstream per spec.md §4.2:
    /// `[optional single system, …history in original order minus any
    /// additional system entries, {user, currentPrompt}]`.
    #[must_use]
    pub fn assembled_messages(&self) -> Vec<ConversationMessage> {
        let mut out = Vec::with_capacity(self.conversation_history.len() + 2);
        let mut system_taken = false;

        for message in &self.conversation_history {
            if message.role == Role::System {
                if system_taken {
                    continue;
                }
                system_taken = true;
                // System entries are hoisted to the front regardless of
                // their position in the original history.
                out.insert(0, message.clone());
                continue;
            }
            out.push(message.clone());
        }

        out.push(ConversationMessage {
            role: Role::User,
            content: self.prompt.clone(),
        });

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: Role, content: &str) -> ConversationMessage {
        ConversationMessage {
            role,
            content: content.to_owned(),
        }
    }

    #[test]
    fn defaults_apply_when_absent() {
        let req = ChatRequest {
            prompt: "hi".to_owned(),
            preferred_provider: None,
            preferred_model: None,
            max_tokens: None,
            temperature: None,
            streaming: None,
            required_capabilities: HashSet::new(),
            tools: Vec::new(),
            conversation_history: Vec::new(),
            estimated_input_tokens: None,
            estimated_output_tokens: None,
            config_id: None,
            meta: None,
        };
        assert_eq!(req.max_tokens(), DEFAULT_MAX_TOKENS);
        assert!((req.temperature() - DEFAULT_TEMPERATURE).abs() < f64::EPSILON);
        assert!(!req.is_streaming());
    }

    #[test]
    fn empty_history_behaves_like_omitted() {
        let with_empty = ChatRequest {
            prompt: "hi".to_owned(),
            preferred_provider: None,
            preferred_model: None,
            max_tokens: None,
            temperature: None,
            streaming: None,
            required_capabilities: HashSet::new(),
            tools: Vec::new(),
            conversation_history: Vec::new(),
            estimated_input_tokens: None,
            estimated_output_tokens: None,
            config_id: None,
            meta: None,
        };
        let assembled = with_empty.assembled_messages();
        assert_eq!(assembled.len(), 1);
        assert_eq!(assembled[0].role, Role::User);
    }

    #[test]
    fn duplicate_system_entries_only_first_kept_order_preserved() {
        let req = ChatRequest {
            prompt: "final question".to_owned(),
            preferred_provider: None,
            preferred_model: None,
            max_tokens: None,
            temperature: None,
            streaming: None,
            required_capabilities: HashSet::new(),
            tools: Vec::new(),
            conversation_history: vec![
                msg(Role::System, "first system"),
                msg(Role::User, "q1"),
                msg(Role::Assistant, "a1"),
                msg(Role::System, "second system"),
                msg(Role::User, "q2"),
            ],
            estimated_input_tokens: None,
            estimated_output_tokens: None,
            config_id: None,
            meta: None,
        };

        let assembled = req.assembled_messages();
        let system_count = assembled.iter().filter(|m| m.role == Role::System).count();
        assert_eq!(system_count, 1);
        assert_eq!(assembled[0].content, "first system");

        // user/assistant order preserved, minus the dropped system entry
        let roles_and_content: Vec<_> = assembled
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            roles_and_content,
            vec![
                (Role::System, "first system"),
                (Role::User, "q1"),
                (Role::Assistant, "a1"),
                (Role::User, "q2"),
                (Role::User, "final question"),
            ]
        );
    }
}
