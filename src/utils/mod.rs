//! Utility functions shared across layers.
//!
//! - [`code_generator`] - Short code generation and alias validation
//! - [`secret`] - Salted hashing and constant-time verification of link secrets
//! - [`url_validator`] - Destination URL validation
//! - [`client_ip`] - Client IP extraction from HTTP headers
//! - [`db_error`] - PostgreSQL error classification
//! - [`deadline`] - Store call deadlines

pub mod client_ip;
pub mod code_generator;
pub mod db_error;
pub mod deadline;
pub mod secret;
pub mod url_validator;
