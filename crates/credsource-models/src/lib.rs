#![deny(missing_docs)]

//! # credsource models
//!
//! Data types shared by the credential input source reconciler, its HTTP
//! client and the mock controller.
//!
//! ## Object model
//!
//! ```text
//! Credential (target) ──┐
//!                       ├── CredentialInputSource
//! Credential (source) ──┘     ├── IdentityKey        (target_credential, input_field_name)
//!                             └── InputSourcePayload (source_credential, metadata)
//! ```
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`id`] | Numeric identifiers (`CredentialId`, `InputSourceId`, ...) |
//! | [`credential`] | Credentials, credential types, organizations, references |
//! | [`input_source`] | The managed object, its key and payload, `DesiredState` |
//! | [`request`] | Caller-facing request/response and the request builder |
//! | [`rules`] | Link validation applied by the controller |

pub mod credential;
pub mod error;
pub mod id;
pub mod input_source;
pub mod request;
pub mod rules;

// Re-export all public types at crate root for convenience.
pub use credential::*;
pub use error::*;
pub use id::*;
pub use input_source::*;
pub use request::*;
pub use rules::*;
