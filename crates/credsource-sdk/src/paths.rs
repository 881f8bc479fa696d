//! Canonical REST paths of the controller API.
//!
//! Every path the client requests and the mock controller serves is built
//! through [`ApiPaths`], so both sides agree on one layout.
//!
//! ```text
//! /api/v2/organizations/
//! /api/v2/organizations/{id}/
//! /api/v2/credential_types/
//! /api/v2/credentials/
//! /api/v2/credentials/{id}/
//! /api/v2/credential_input_sources/
//! /api/v2/credential_input_sources/{id}/
//! ```

use credsource_models::{CredentialId, InputSourceId, OrganizationId};

/// Central authority for controller API paths.
///
/// # Examples
///
/// ```
/// use credsource_models::{CredentialId, InputSourceId};
/// use credsource_sdk::ApiPaths;
///
/// assert_eq!(ApiPaths::credential(CredentialId::new(4)), "/api/v2/credentials/4/");
/// assert_eq!(
///     ApiPaths::input_source(InputSourceId::new(9)),
///     "/api/v2/credential_input_sources/9/",
/// );
/// ```
pub struct ApiPaths;

impl ApiPaths {
    /// Organization list.
    pub const ORGANIZATIONS: &'static str = "/api/v2/organizations/";
    /// Credential type list.
    pub const CREDENTIAL_TYPES: &'static str = "/api/v2/credential_types/";
    /// Credential list.
    pub const CREDENTIALS: &'static str = "/api/v2/credentials/";
    /// Credential input source list.
    pub const INPUT_SOURCES: &'static str = "/api/v2/credential_input_sources/";

    /// Detail path of one organization.
    pub fn organization(id: OrganizationId) -> String {
        format!("{}{id}/", Self::ORGANIZATIONS)
    }

    /// Detail path of one credential.
    pub fn credential(id: CredentialId) -> String {
        format!("{}{id}/", Self::CREDENTIALS)
    }

    /// Detail path of one credential input source.
    pub fn input_source(id: InputSourceId) -> String {
        format!("{}{id}/", Self::INPUT_SOURCES)
    }

    /// Route pattern matching any organization detail path.
    pub fn organization_route() -> String {
        format!("{}{{id}}/", Self::ORGANIZATIONS)
    }

    /// Route pattern matching any credential detail path.
    pub fn credential_route() -> String {
        format!("{}{{id}}/", Self::CREDENTIALS)
    }

    /// Route pattern matching any input source detail path.
    pub fn input_source_route() -> String {
        format!("{}{{id}}/", Self::INPUT_SOURCES)
    }
}
