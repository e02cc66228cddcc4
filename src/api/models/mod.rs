pub mod usage;
pub mod workflow;

pub use usage::{ModelUsageResponse, UsageQuery, UsageSummaryResponse, UsageTrendPointResponse};
pub use workflow::{
    BlockerResolveRequest, CreateWorkflowRequest, RejectRequest, WorkflowDetailResponse,
    WorkflowListQuery, WorkflowSummaryResponse,
};
