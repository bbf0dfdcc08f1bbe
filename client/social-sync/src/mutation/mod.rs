//! State-changing user actions and how they reach local state

pub mod coordinator;
pub mod inflight;
pub mod patch;

pub use coordinator::{CommentDraft, MutationCoordinator, MutationOutcome};
pub use inflight::{InFlightRegistry, InFlightTicket, MutationAction};
pub use patch::{PatchTarget, PostPatch};
