pub mod event_repo;
pub mod token_usage_repo;
pub mod workflow_repo;

pub use event_repo::EventRepository;
pub use token_usage_repo::TokenUsageRepository;
pub use workflow_repo::{WorkflowPage, WorkflowRepository};
