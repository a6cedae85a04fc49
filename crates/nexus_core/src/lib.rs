pub mod documents;
pub mod domain;
pub mod ports;
pub mod retrieval;

pub use documents::DocumentStore;
pub use domain::{
    ContextEntry, ContextPart, ContextRole, Document, Message, ModelReply, ModelRequest, Role,
    ToolCall, RETRIEVAL_TOOL, SEND_EMAIL_TOOL,
};
pub use ports::{CompletionService, DocumentBackend, IdentityService, PortError, PortResult};
