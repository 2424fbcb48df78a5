//! Validation modules

pub mod outbound;

pub use outbound::validate_outbound;
