//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports from the [`secrecy`] crate. Use these types for every sensitive
//! value that flows through the coordinator: room passwords carried in join
//! requests and room state, and the media credential signing secret held in
//! configuration.
//!
//! `SecretString` implements `Debug` with redaction, so any struct that
//! derives `Debug` while containing one gets safe logging behavior for free;
//! `{:?}` and tracing field capture can never print the inner value. Secrets
//! are zeroized on drop. Access to the inner value always goes through an
//! explicit [`ExposeSecret::expose_secret`] call at the comparison or signing
//! site.
//!
//! With the `serde` feature enabled (it is, workspace-wide), secrets
//! deserialize from plain JSON strings, so wire payloads and environment
//! values can land directly in a `SecretString` without ever existing as a
//! loggable `String` field.

pub use secrecy::{ExposeSecret, SecretString};
