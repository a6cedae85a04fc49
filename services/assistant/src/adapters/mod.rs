pub mod gemini;
pub mod identity;
pub mod store;

pub use gemini::GeminiCompletionAdapter;
pub use identity::FileIdentityAdapter;
pub use store::SqliteBackend;
