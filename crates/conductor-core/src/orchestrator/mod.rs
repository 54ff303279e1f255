//! Manager orchestration
//!
//! The manager accepts user instructions, lets the engine decide whether to
//! answer directly or delegate, runs the chosen workers in order, and merges
//! their artifacts into one response.
//!
//! ```text
//! instruction -> Manager turn loop -> delegate_task -> DelegationExecutor
//!                                                   -> workers (own turn loops, persist artifacts)
//!                                                   -> ResponseSynthesizer -> manager artifact
//! ```

pub mod executor;
mod functions;
pub mod manager;
pub mod planner;
pub mod state;
pub mod synthesizer;

pub use executor::{DelegationExecutor, DelegationOutcome};
pub use manager::{Manager, TURN_FAILED_MESSAGE};
pub use planner::DelegationRequest;
pub use state::{DelegationRecord, TurnState};
pub use synthesizer::ResponseSynthesizer;

/// Owner id of the manager's own artifact and progress events
pub const MANAGER_AGENT_ID: &str = "manager_agent";
