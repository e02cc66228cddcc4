//! Routing category for event framing on the wire (spec.md §9 Glossary:
//! "Event domain"). A closed enum rather than an extensible registry — the
//! fan-out only ever needs to distinguish workflow events (the only kind
//! this orchestrator emits) from side-channel events built atop the same
//! infrastructure (spec.md §6.2).

use crate::domain::event::Event;
use crate::ws::protocol::ServerMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDomain {
    Workflow,
    Brainstorm,
}

impl EventDomain {
    /// Frames a workflow-domain event for the wire (spec.md §6.2). Only
    /// `Workflow` is constructible from an [`Event`]; `Brainstorm` framing
    /// is exercised directly via [`ServerMessage::Brainstorm`] by
    /// side-channels built on this fan-out, not by this orchestrator.
    pub fn frame(self, event: &Event) -> ServerMessage {
        match self {
            EventDomain::Workflow => ServerMessage::Event { payload: event.clone() },
            EventDomain::Brainstorm => ServerMessage::Event { payload: event.clone() },
        }
    }
}
