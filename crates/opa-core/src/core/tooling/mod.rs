//! Diagnostics, failure taxonomy, and outcome shaping.

pub mod diagnostics;
pub(crate) mod failure;
pub(crate) mod outcome;
pub(crate) mod response;
