//! Mock controller: serves the controller's credential REST API from a
//! [`MemoryController`].
//!
//! Used for local runs of the `credsource` CLI and by the end-to-end tests
//! of [`ControllerClient`](credsource_sdk::ControllerClient). The routes
//! come from [`ApiPaths`], so client and server cannot drift apart.
//!
//! | Method   | Path                                      |
//! |----------|-------------------------------------------|
//! | `GET`    | `/api/v2/organizations/?name=`            |
//! | `GET`    | `/api/v2/organizations/{id}/`             |
//! | `GET`    | `/api/v2/credential_types/`               |
//! | `GET`    | `/api/v2/credentials/?name=&organization=`|
//! | `POST`   | `/api/v2/credentials/`                    |
//! | `GET`    | `/api/v2/credentials/{id}/`               |
//! | `GET`    | `/api/v2/credential_input_sources/`       |
//! | `POST`   | `/api/v2/credential_input_sources/`       |
//! | `GET`    | `/api/v2/credential_input_sources/{id}/`  |
//! | `PATCH`  | `/api/v2/credential_input_sources/{id}/`  |
//! | `DELETE` | `/api/v2/credential_input_sources/{id}/`  |

pub mod error;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use credsource_models::{
    Credential, CredentialId, CredentialInputSource, CredentialType, CredentialTypeId,
    IdentityKey, InputSourceId, InputSourcePayload, Metadata, Organization, OrganizationId,
    PayloadDelta,
};
use credsource_sdk::{ApiPaths, CredentialLookup, InputSourceCollection, MemoryController, Page};
use serde::Deserialize;
use tracing::info;

pub use crate::error::ApiError;

/// Port used when `MOCK_CONTROLLER_PORT` is unset or invalid.
pub const DEFAULT_PORT: u16 = 8013;

/// Listen port from `MOCK_CONTROLLER_PORT`.
pub fn port_from_env() -> u16 {
    std::env::var("MOCK_CONTROLLER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Build the application router over `controller`.
pub fn router(controller: MemoryController) -> Router {
    Router::new()
        .route(ApiPaths::ORGANIZATIONS, get(list_organizations))
        .route(&ApiPaths::organization_route(), get(get_organization))
        .route(ApiPaths::CREDENTIAL_TYPES, get(list_credential_types))
        .route(
            ApiPaths::CREDENTIALS,
            get(list_credentials).post(create_credential),
        )
        .route(&ApiPaths::credential_route(), get(get_credential))
        .route(
            ApiPaths::INPUT_SOURCES,
            get(list_input_sources).post(create_input_source),
        )
        .route(
            &ApiPaths::input_source_route(),
            get(get_input_source)
                .patch(update_input_source)
                .delete(delete_input_source),
        )
        .with_state(controller)
}

// ---------------------------------------------------------------------------
// Query and body DTOs
// ---------------------------------------------------------------------------

/// Query of the organization list.
#[derive(Debug, Default, Deserialize)]
struct OrganizationFilter {
    name: Option<String>,
}

/// Query of the credential list.
#[derive(Debug, Default, Deserialize)]
struct CredentialFilter {
    name: Option<String>,
    organization: Option<OrganizationId>,
}

/// Query of the input source list.
#[derive(Debug, Default, Deserialize)]
struct InputSourceFilter {
    target_credential: Option<CredentialId>,
    input_field_name: Option<String>,
}

/// Body of `POST /api/v2/credentials/`.
#[derive(Debug, Deserialize)]
struct NewCredential {
    name: String,
    #[serde(default)]
    organization: Option<OrganizationId>,
    credential_type: CredentialTypeId,
}

/// Body of `POST /api/v2/credential_input_sources/`.
#[derive(Debug, Deserialize)]
struct NewInputSource {
    target_credential: CredentialId,
    input_field_name: String,
    source_credential: CredentialId,
    #[serde(default)]
    metadata: Metadata,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /api/v2/organizations/`
async fn list_organizations(
    State(ctl): State<MemoryController>,
    Query(filter): Query<OrganizationFilter>,
) -> Result<Json<Page<Organization>>, ApiError> {
    let organizations = match filter.name {
        Some(name) => ctl.find_organizations(&name).await?,
        None => ctl.organizations(),
    };
    Ok(Json(Page::single(organizations)))
}

/// `GET /api/v2/organizations/{id}/`
async fn get_organization(
    State(ctl): State<MemoryController>,
    Path(id): Path<OrganizationId>,
) -> Result<Json<Organization>, ApiError> {
    ctl.organization(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("organization {id}")))
}

/// `GET /api/v2/credential_types/`
async fn list_credential_types(
    State(ctl): State<MemoryController>,
) -> Result<Json<Page<CredentialType>>, ApiError> {
    Ok(Json(Page::single(ctl.credential_types().await?)))
}

/// `GET /api/v2/credentials/`
async fn list_credentials(
    State(ctl): State<MemoryController>,
    Query(filter): Query<CredentialFilter>,
) -> Result<Json<Page<Credential>>, ApiError> {
    let credentials = match filter.name {
        Some(name) => ctl.find_credentials(&name, filter.organization).await?,
        None => ctl
            .credentials()
            .into_iter()
            .filter(|c| filter.organization.is_none_or(|org| c.organization == Some(org)))
            .collect(),
    };
    Ok(Json(Page::single(credentials)))
}

/// `POST /api/v2/credentials/`
async fn create_credential(
    State(ctl): State<MemoryController>,
    Json(body): Json<NewCredential>,
) -> Result<(StatusCode, Json<Credential>), ApiError> {
    let credential = ctl.add_credential(&body.name, body.organization, body.credential_type)?;
    info!(id = %credential.id, name = %credential.name, "credential created");
    Ok((StatusCode::CREATED, Json(credential)))
}

/// `GET /api/v2/credentials/{id}/`
async fn get_credential(
    State(ctl): State<MemoryController>,
    Path(id): Path<CredentialId>,
) -> Result<Json<Credential>, ApiError> {
    ctl.credential(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("credential {id}")))
}

/// `GET /api/v2/credential_input_sources/`
async fn list_input_sources(
    State(ctl): State<MemoryController>,
    Query(filter): Query<InputSourceFilter>,
) -> Result<Json<Page<CredentialInputSource>>, ApiError> {
    let sources = match (filter.target_credential, filter.input_field_name) {
        (Some(target), Some(field)) => ctl.find_by_key(&IdentityKey::new(target, field)).await?,
        (target, field) => ctl.input_sources_matching(target, field.as_deref()),
    };
    Ok(Json(Page::single(sources)))
}

/// `POST /api/v2/credential_input_sources/`
async fn create_input_source(
    State(ctl): State<MemoryController>,
    Json(body): Json<NewInputSource>,
) -> Result<(StatusCode, Json<CredentialInputSource>), ApiError> {
    let key = IdentityKey::new(body.target_credential, body.input_field_name);
    let payload = InputSourcePayload {
        source_credential: body.source_credential,
        metadata: body.metadata,
    };
    let created = ctl.create(&key, &payload).await?;
    info!(id = %created.id, key = %key, "input source created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/v2/credential_input_sources/{id}/`
async fn get_input_source(
    State(ctl): State<MemoryController>,
    Path(id): Path<InputSourceId>,
) -> Result<Json<CredentialInputSource>, ApiError> {
    ctl.input_source(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("input source {id}")))
}

/// `PATCH /api/v2/credential_input_sources/{id}/`
async fn update_input_source(
    State(ctl): State<MemoryController>,
    Path(id): Path<InputSourceId>,
    Json(delta): Json<PayloadDelta>,
) -> Result<Json<CredentialInputSource>, ApiError> {
    let updated = ctl.update(id, &delta).await?;
    info!(id = %id, fields = ?delta.fields(), "input source updated");
    Ok(Json(updated))
}

/// `DELETE /api/v2/credential_input_sources/{id}/`
async fn delete_input_source(
    State(ctl): State<MemoryController>,
    Path(id): Path<InputSourceId>,
) -> Result<StatusCode, ApiError> {
    ctl.delete(id).await?;
    info!(id = %id, "input source deleted");
    Ok(StatusCode::NO_CONTENT)
}
