#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

mod core;

pub mod api;

pub(crate) use crate::core::tooling::{diagnostics, outcome};

pub use api::*;
