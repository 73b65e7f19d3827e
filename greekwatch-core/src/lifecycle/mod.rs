//! Candidate lifecycle: Greek confirmation, exit monitoring and cooldown.
//!
//! Pending_Greek_Confirmation → ENTRY_APPROVED → CLOSED. A closed candidate
//! is never resurrected; the session drops it and starts a cooldown.

pub mod confirm;
pub mod cooldown;
pub mod exit;

pub use confirm::{
    confirm_candidate, evaluate_confirmation, stop_and_target, ConfirmationCheck,
    ConfirmationThresholds,
};
pub use cooldown::Cooldown;
pub use exit::{check_exit, ExitNotice, ExitReason, ExitThresholds};
