//! Provides API for the books operator and related tooling.
#![warn(missing_docs)]

/// Book module for the Book resource and its controller.
pub mod book;
/// Labels module for managing resource labels.
#[cfg(feature = "controller")]
pub(crate) mod labels;
/// Utils module for shared utility functions.
#[cfg(feature = "controller")]
pub mod utils;

/// Field manager and label value identifying resources written by this operator.
#[cfg(feature = "controller")]
const CONTROLLER_NAME: &str = "books-operator";
