//! # credsource SDK
//!
//! Declarative management of *credential input sources*: links that make a
//! field of one credential resolve its value from an external lookup
//! credential at run time.
//!
//! The SDK provides:
//!
//! * [`ResourceLocator`]: resolves credential and organization references
//!   (names or ids) into identifiers, and answers capability questions.
//! * [`Reconciler`]: compares desired and current state by identity key and
//!   performs the minimal create / update / delete.
//! * [`InputSourceManager`]: the two wired together behind one `apply`.
//! * [`ControllerClient`]: the HTTP backend; [`MemoryController`]: an
//!   in-process one with the same constraints.
//! * [`ControllerConfig`]: connection settings from file and environment.
//! * [`SdkError`]: unified error type, classified by [`ErrorKind`].
//!
//! # Quick start
//!
//! ```rust
//! use credsource_models::InputSourceRequest;
//! use credsource_sdk::{InputSourceManager, MemoryController};
//!
//! # async fn run() -> Result<(), credsource_sdk::SdkError> {
//! let controller = MemoryController::with_defaults();
//! let machine = controller.credential_type_named("Machine").unwrap();
//! let vault = controller
//!     .credential_type_named("HashiCorp Vault Secret Lookup")
//!     .unwrap();
//! controller.add_credential("prod-ssh", None, machine.id)?;
//! controller.add_credential("vault", None, vault.id)?;
//!
//! let manager = InputSourceManager::from_backend(controller).await?;
//! let request = InputSourceRequest::builder("prod-ssh", "password")
//!     .source("vault")
//!     .metadata("secret_path", "/kv/prod")
//!     .build()?;
//!
//! assert!(manager.apply(&request).await?.changed);
//! assert!(!manager.apply(&request).await?.changed);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod locator;
pub mod manager;
pub mod memory;
pub mod paths;
pub mod reconciler;

pub use backend::{CredentialLookup, InputSourceCollection};
pub use client::{error_for_status, ControllerClient, Page};
pub use config::{ControllerAuth, ControllerConfig};
pub use error::{ErrorKind, SdkError};
pub use locator::{CapabilityTable, Lookup, ResolvedSpec, ResourceLocator};
pub use manager::InputSourceManager;
pub use memory::{MemoryController, DUPLICATE_KEY_MESSAGE};
pub use paths::ApiPaths;
pub use reconciler::{plan, Action, Outcome, Reconciler};
