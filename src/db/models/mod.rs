pub mod event_row;
pub mod token_usage_row;
pub mod workflow_row;

pub use event_row::EventRow;
pub use token_usage_row::TokenUsageRow;
pub use workflow_row::WorkflowRow;
