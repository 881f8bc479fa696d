//! HTTP client for the controller REST API.
//!
//! [`ControllerClient`] implements [`CredentialLookup`] and
//! [`InputSourceCollection`] over the paths in [`ApiPaths`]. Every call is
//! exactly one logical round trip (list reads follow `next` links) and
//! nothing is retried; the status mapping lives in [`error_for_status`].
//!
//! ```rust,no_run
//! use credsource_sdk::{ControllerClient, ControllerConfig, CredentialLookup};
//!
//! # async fn run() -> Result<(), credsource_sdk::SdkError> {
//! let client = ControllerClient::new(&ControllerConfig::load()?)?;
//! for ty in client.credential_types().await? {
//!     println!("{} ({})", ty.name, ty.kind);
//! }
//! # Ok(())
//! # }
//! ```

use credsource_models::{
    Credential, CredentialId, CredentialInputSource, CredentialType, IdentityKey, InputSourceId,
    InputSourcePayload, Metadata, Organization, OrganizationId, PayloadDelta,
};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{CredentialLookup, InputSourceCollection};
use crate::config::{ControllerAuth, ControllerConfig};
use crate::error::SdkError;
use crate::paths::ApiPaths;

/// One page of a list endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Total number of matching records.
    pub count: usize,
    /// Link to the following page, if any.
    pub next: Option<String>,
    /// Link to the preceding page, if any.
    pub previous: Option<String>,
    /// Records on this page.
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// A single page holding every record.
    pub fn single(results: Vec<T>) -> Self {
        Self {
            count: results.len(),
            next: None,
            previous: None,
            results,
        }
    }
}

/// Body of `POST /api/v2/credential_input_sources/`.
#[derive(Serialize)]
struct NewInputSource<'a> {
    target_credential: CredentialId,
    input_field_name: &'a str,
    source_credential: CredentialId,
    metadata: &'a Metadata,
}

/// Classify a non-success response.
///
/// `what` names the requested resource in `NotFound` errors.
pub fn error_for_status(status: StatusCode, body: &str, what: &str) -> SdkError {
    match status {
        StatusCode::NOT_FOUND => SdkError::not_found(what),
        StatusCode::BAD_REQUEST if body.contains("already exists") => {
            SdkError::Conflict(body.to_string())
        }
        StatusCode::BAD_REQUEST if body.contains("does not exist") => SdkError::NotFound {
            what: body.to_string(),
        },
        StatusCode::BAD_REQUEST => SdkError::Validation(body.to_string()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            SdkError::Unavailable(format!("HTTP {status}: {body}"))
        }
        s if s.is_server_error() => SdkError::Unavailable(format!("HTTP {status}: {body}")),
        s => SdkError::Api {
            status: s.as_u16(),
            body: body.to_string(),
        },
    }
}

/// Authenticated REST client for one controller.
#[derive(Debug, Clone)]
pub struct ControllerClient {
    http: reqwest::Client,
    base: Url,
    auth: Option<ControllerAuth>,
}

impl ControllerClient {
    /// Build a client from connection settings.
    pub fn new(config: &ControllerConfig) -> Result<Self, SdkError> {
        let base = Url::parse(&config.host)
            .map_err(|e| SdkError::Config(format!("invalid host {}: {e}", config.host)))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| SdkError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base,
            auth: config.auth.clone(),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL of `path` with query `params`.
    pub fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, SdkError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| SdkError::Config(format!("invalid path {path}: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.auth {
            Some(ControllerAuth::Token(token)) => request.bearer_auth(token),
            Some(ControllerAuth::Basic { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<reqwest::Response, SdkError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(%status, what, error = %e, "failed to read error body");
                String::new()
            }
        };
        debug!(%status, what, "controller rejected request");
        Err(error_for_status(status, &body, what))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, SdkError> {
        Ok(self.send(request, what).await?.json().await?)
    }

    /// Fetch every record of a list endpoint, following `next` links.
    async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, SdkError> {
        let mut url = self.url(path, params)?;
        let mut records = Vec::new();
        loop {
            let page: Page<T> = self
                .send_json(self.request(Method::GET, url.clone()), path)
                .await?;
            records.extend(page.results);
            match page.next {
                Some(next) => {
                    url = url
                        .join(&next)
                        .map_err(|e| SdkError::Config(format!("invalid next link {next}: {e}")))?;
                }
                None => return Ok(records),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Boundary traits
// ---------------------------------------------------------------------------

impl CredentialLookup for ControllerClient {
    async fn credential(&self, id: CredentialId) -> Result<Option<Credential>, SdkError> {
        let path = ApiPaths::credential(id);
        let request = self.request(Method::GET, self.url(&path, &[])?);
        match self.send_json(request, &format!("credential {id}")).await {
            Ok(credential) => Ok(Some(credential)),
            Err(SdkError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_credentials(
        &self,
        name: &str,
        organization: Option<OrganizationId>,
    ) -> Result<Vec<Credential>, SdkError> {
        let mut params = vec![("name", name.to_string())];
        if let Some(org) = organization {
            params.push(("organization", org.to_string()));
        }
        self.list(ApiPaths::CREDENTIALS, &params).await
    }

    async fn organization(&self, id: OrganizationId) -> Result<Option<Organization>, SdkError> {
        let path = ApiPaths::organization(id);
        let request = self.request(Method::GET, self.url(&path, &[])?);
        match self.send_json(request, &format!("organization {id}")).await {
            Ok(organization) => Ok(Some(organization)),
            Err(SdkError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_organizations(&self, name: &str) -> Result<Vec<Organization>, SdkError> {
        self.list(ApiPaths::ORGANIZATIONS, &[("name", name.to_string())])
            .await
    }

    async fn credential_types(&self) -> Result<Vec<CredentialType>, SdkError> {
        self.list(ApiPaths::CREDENTIAL_TYPES, &[]).await
    }
}

impl InputSourceCollection for ControllerClient {
    async fn find_by_key(&self, key: &IdentityKey) -> Result<Vec<CredentialInputSource>, SdkError> {
        let params = [
            ("target_credential", key.target_credential.to_string()),
            ("input_field_name", key.input_field_name.clone()),
        ];
        self.list(ApiPaths::INPUT_SOURCES, &params).await
    }

    async fn create(
        &self,
        key: &IdentityKey,
        payload: &InputSourcePayload,
    ) -> Result<CredentialInputSource, SdkError> {
        let body = NewInputSource {
            target_credential: key.target_credential,
            input_field_name: &key.input_field_name,
            source_credential: payload.source_credential,
            metadata: &payload.metadata,
        };
        let request = self
            .request(Method::POST, self.url(ApiPaths::INPUT_SOURCES, &[])?)
            .json(&body);
        self.send_json(request, &format!("input source {key}")).await
    }

    async fn update(
        &self,
        id: InputSourceId,
        delta: &PayloadDelta,
    ) -> Result<CredentialInputSource, SdkError> {
        let request = self
            .request(Method::PATCH, self.url(&ApiPaths::input_source(id), &[])?)
            .json(delta);
        self.send_json(request, &format!("input source {id}")).await
    }

    async fn delete(&self, id: InputSourceId) -> Result<(), SdkError> {
        let request = self.request(Method::DELETE, self.url(&ApiPaths::input_source(id), &[])?);
        self.send(request, &format!("input source {id}")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn kind(status: u16, body: &str) -> ErrorKind {
        error_for_status(StatusCode::from_u16(status).unwrap(), body, "thing").kind()
    }

    #[test]
    fn status_mapping() {
        assert_eq!(kind(404, r#"{"detail":"Not found."}"#), ErrorKind::NotFound);
        assert_eq!(
            kind(
                400,
                r#"{"__all__":["Credential Input Source with this Target credential and Input field name already exists."]}"#
            ),
            ErrorKind::Conflict
        );
        assert_eq!(
            kind(400, r#"{"source_credential":["Invalid pk \"9\" - object does not exist."]}"#),
            ErrorKind::NotFound
        );
        assert_eq!(
            kind(400, r#"{"input_field_name":["Input field must be defined on target credential (options are password, username)."]}"#),
            ErrorKind::Validation
        );
        assert_eq!(kind(500, ""), ErrorKind::Unavailable);
        assert_eq!(kind(503, ""), ErrorKind::Unavailable);
        assert_eq!(kind(429, ""), ErrorKind::Unavailable);
        assert_eq!(kind(401, "no"), ErrorKind::Other);
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = error_for_status(StatusCode::NOT_FOUND, "", "credential 4");
        assert_eq!(err.to_string(), "credential 4 not found");
    }

    #[test]
    fn urls_carry_encoded_queries() {
        let client = ControllerClient::new(
            &ControllerConfig::default().with_host("https://controller.example/"),
        )
        .unwrap();
        let url = client
            .url(ApiPaths::CREDENTIALS, &[("name", "prod ssh&co".into())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://controller.example/api/v2/credentials/?name=prod+ssh%26co"
        );
        assert_eq!(
            client.url(ApiPaths::ORGANIZATIONS, &[]).unwrap().as_str(),
            "https://controller.example/api/v2/organizations/"
        );
    }

    #[test]
    fn invalid_host_is_a_config_error() {
        let err = ControllerClient::new(&ControllerConfig::default().with_host("not a url"))
            .unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn page_wire_format() {
        let page: Page<Organization> = serde_json::from_str(
            r#"{"count": 1, "next": null, "previous": null, "results": [{"id": 1, "name": "Default"}]}"#,
        )
        .unwrap();
        assert_eq!(page.results[0].name, "Default");
        assert_eq!(Page::single(vec![1, 2]).count, 2);
    }

    #[test]
    fn create_body_shape() {
        let metadata = Metadata::from([("secret_path".into(), "/kv/db".into())]);
        let body = NewInputSource {
            target_credential: CredentialId::new(3),
            input_field_name: "password",
            source_credential: CredentialId::new(4),
            metadata: &metadata,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "target_credential": 3,
                "input_field_name": "password",
                "source_credential": 4,
                "metadata": {"secret_path": "/kv/db"}
            })
        );
    }
}
