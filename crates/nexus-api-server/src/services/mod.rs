pub mod ai_engine;
pub mod context;
pub mod document_service;

pub use ai_engine::{AiEngine, Completion};
pub use context::ContextBuilder;
pub use document_service::DocumentService;
