//! Stable exit codes for `chad` CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid plan, config, or jail, a path escaping the jail, or any other error.
pub const INVALID: i32 = 1;
/// `chad exec` ran a codemod whose edits were all skipped.
pub const NO_CHANGES: i32 = 2;
