//! Per-resource HTTP handlers, grounded on the teacher's `api/handlers/mod.rs`.

pub mod health;
pub mod usage;
pub mod workflows;

pub use health::{health, health_detailed};
pub use usage::get_usage;
pub use workflows::{
    approve_workflow, cancel_workflow, create_workflow, get_workflow, list_active, list_workflows,
    reject_workflow, resolve_blocker, resume_workflow,
};
