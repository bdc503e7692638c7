//! Status-code decision table
//!
//! Maps `(target state, operation attempted, HTTP status)` to a verdict. The
//! two idempotent exceptions live here and nowhere else: 404 on delete, and
//! 409 on create for resources whose API has no update endpoint.

use super::{Operation, ResourceKind, TargetState};

/// Classification of the terminal create/update/delete answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The call changed remote state
    Applied,
    /// Delete of something already gone
    AlreadyAbsent,
    /// Create of something that already exists and cannot be updated
    AlreadyExists,
    /// Any other failure status
    Rejected,
}

pub fn decide(kind: ResourceKind, target: TargetState, op: Operation, status: u16) -> Verdict {
    match (target, op, status) {
        (_, _, s) if s < 400 => Verdict::Applied,
        (TargetState::Absent, Operation::Delete, 404) => Verdict::AlreadyAbsent,
        (TargetState::Present, Operation::Create, 409) if kind.conflict_means_exists() => {
            Verdict::AlreadyExists
        }
        _ => Verdict::Rejected,
    }
}
