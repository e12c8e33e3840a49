//! Business logic services for the application layer.

pub mod click_recorder;
pub mod code_generator;
pub mod resolution_service;

pub use click_recorder::{ClickRecorder, RetryPolicy};
pub use code_generator::{CodeGenerator, CodeSettings};
pub use resolution_service::{ResolutionService, ShortenRequest};
