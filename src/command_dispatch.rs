//! Purpose: Hold top-level CLI command dispatch for `cursorwindow`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Helpers in `main.rs` remain the source of command business logic.

use super::*;

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Page(args) => page_command(args),
        Command::Info(args) => info_command(args),
        Command::Version => version_command(),
    }
}
