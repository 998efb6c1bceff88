//! Validation and filtering system
//!
//! Declarative, per-operation rules applied to JSON payloads before they
//! reach the handlers. Rules are declared with the validation arm of
//! [`impl_document!`](crate::impl_document).

pub mod config;
pub mod extractor;
pub mod filters;
pub mod validators;

pub use config::EntityValidationConfig;
pub use extractor::{ValidatableEntity, Validated};
