//! Book is a k8s custom resource describing a book that should always have a companion pod.
#[cfg(feature = "controller")]
pub(crate) mod controller;
/// Desired companion pod of a book.
#[cfg(feature = "controller")]
pub mod pod;
/// Book custom resource definition.
pub mod spec;
#[cfg(all(test, feature = "controller"))]
pub(crate) mod stub;

#[cfg(feature = "controller")]
pub use controller::run;
pub use spec::{Book, BookSpec, BookStatus, SpecError};
