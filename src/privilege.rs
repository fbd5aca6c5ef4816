//! Privilege gating for mutating operations.
//!
//! Every mutating operation passes through [`require_root_or_exit`] before
//! any external command is constructed. The gate is a hard process exit,
//! not a recoverable error. The decision itself is a pure function so it
//! stays testable without changing the test process's privileges.

use sudo::RunningAs;

use crate::ui::prelude::*;

pub const PRIVILEGE_EXIT_CODE: i32 = 1;

const DENIED_MESSAGE: &str = "This operation requires root privileges";

/// Decision half of the gate. `Some` carries the message to print before
/// exiting.
pub fn denial_reason(running_as: RunningAs) -> Option<&'static str> {
    match running_as {
        RunningAs::User => Some(DENIED_MESSAGE),
        RunningAs::Root | RunningAs::Suid => None,
    }
}

/// Terminate the process when the caller is unprivileged.
pub fn require_root_or_exit(operation: &str) {
    if let Some(reason) = denial_reason(sudo::check()) {
        emit(
            Level::Error,
            "privilege.denied",
            reason,
            Some(serde_json::json!({ "operation": operation })),
        );
        std::process::exit(PRIVILEGE_EXIT_CODE);
    }
}
