//! Jailed plan executor.
//!
//! A planner emits structured plans (chat, analysis, tool call, or codemod);
//! this crate carries them out against a single project directory, the
//! *jail*, and records what happened. The architecture keeps a strict split:
//!
//! - **[`core`]**: Pure logic (plan types, text normalization, edit
//!   computation). No I/O, fully testable in isolation.
//! - **[`io`]**: Side effects (jail resolution, file store, tools, SMTP,
//!   artifacts), each behind a seam that tests can replace.
//!
//! [`execute`] ties the two together for one plan.

pub mod core;
pub mod execute;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
