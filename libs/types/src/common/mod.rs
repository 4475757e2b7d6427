//! Common helpers shared across the type modules

pub mod errors;

pub use errors::TypeError;
