//! crates/nexus_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or wire format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Name of the document-retrieval tool, the only tool with real local execution.
pub const RETRIEVAL_TOOL: &str = "retrieve_document_context";

/// Name of the email-drafting tool. Never dispatched; always short-circuits
/// into a simulated-action notice.
pub const SEND_EMAIL_TOOL: &str = "send_email";

/// The author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One turn in the conversation log. Appended once, immutable thereafter.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Set only on assistant messages whose final answer was produced after a
    /// successful retrieval-tool round.
    pub used_retrieval: bool,
}

impl Message {
    /// Creates a new user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
            used_retrieval: false,
        }
    }

    /// Creates a new assistant message.
    pub fn assistant(text: impl Into<String>, used_retrieval: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            used_retrieval,
        }
    }
}

/// A unit of the private knowledge base, owned by exactly one identity.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    /// Assigned by the persistence backend at creation time, not the client clock.
    pub created_at: DateTime<Utc>,
}

/// A model-requested function invocation. Exists only within one
/// orchestration run; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: serde_json::Map<String, serde_json::Value>,
}

impl ToolCall {
    /// Returns the named argument as a string, if present and a string.
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(|v| v.as_str())
    }
}

/// Protocol role of one entry in the request context sent to the completion
/// endpoint. `Tool` is the third protocol role carrying function responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextRole {
    User,
    Model,
    Tool,
}

/// The single content part of one request-context entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextPart {
    Text(String),
    FunctionCall(ToolCall),
    FunctionResponse { name: String, content: String },
}

/// One entry of the accumulated request context for a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub role: ContextRole,
    pub part: ContextPart,
}

impl ContextEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ContextRole::User,
            part: ContextPart::Text(text.into()),
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: ContextRole::Model,
            part: ContextPart::Text(text.into()),
        }
    }

    /// A synthetic "the model issued this call" entry.
    pub fn model_call(call: ToolCall) -> Self {
        Self {
            role: ContextRole::Model,
            part: ContextPart::FunctionCall(call),
        }
    }

    /// A synthetic "the tool returned this result" entry.
    pub fn tool_response(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ContextRole::Tool,
            part: ContextPart::FunctionResponse {
                name: name.into(),
                content: content.into(),
            },
        }
    }

    /// Maps a conversation message into its protocol projection
    /// (user -> "user", assistant -> "model").
    pub fn from_message(message: &Message) -> Self {
        match message.role {
            Role::User => Self::user(message.text.clone()),
            Role::Assistant => Self::model_text(message.text.clone()),
        }
    }
}

/// One fully formed logical request to the completion endpoint.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub entries: Vec<ContextEntry>,
    /// Whether this round additionally requests the web-search capability.
    pub search_grounding: bool,
}

/// The dispatched content of a completion response: the first part of the
/// first candidate, already classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCall(ToolCall),
}
