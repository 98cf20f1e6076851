//! Media-routing credential issuance.
//!
//! POST /api/media-credential
//!
//! Rooms that outgrow the pairwise relay move their media through an SFU,
//! which admits clients on the strength of a short-lived HS256 credential
//! signed with a shared secret. This endpoint mints that credential. The
//! deployment may run without an SFU at all, in which case the media block
//! of the configuration is absent and the endpoint reports 503.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use common::secret::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::MediaConfig;
use crate::errors::CredentialError;
use crate::handlers::AppState;
use crate::observability::record_credential_request;

/// Display names longer than this are truncated, matching the limit the
/// coordinator applies to join requests.
const MAX_NAME_LENGTH: usize = 50;

/// Body of a credential request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequest {
    /// Room the credential grants access to.
    pub room: String,

    /// Stable identity of the requesting participant.
    pub identity: String,

    /// Optional display name; falls back to the identity.
    pub name: Option<String>,
}

/// Successful credential response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialResponse {
    /// Signed credential to present to the media router.
    pub credential: String,

    /// Endpoint the client should connect to with the credential.
    pub endpoint_url: String,

    /// Unix timestamp (seconds) at which the credential expires.
    pub expires_at: i64,
}

/// Claims carried by an issued credential.
#[derive(Debug, Serialize, Deserialize)]
struct MediaClaims {
    /// API key of this deployment.
    iss: String,

    /// Participant identity.
    sub: String,

    /// Not valid before (Unix seconds).
    nbf: i64,

    /// Expiry (Unix seconds).
    exp: i64,

    /// Display name shown to other participants.
    name: String,

    /// Room access grant.
    video: VideoGrant,
}

#[derive(Debug, Serialize, Deserialize)]
struct VideoGrant {
    room: String,

    #[serde(rename = "roomJoin")]
    room_join: bool,
}

/// Handle a media credential request.
///
/// Validates the request, then signs an HS256 credential scoped to the
/// requested room. Requests are rejected with 503 when the deployment has
/// no media router configured.
#[instrument(skip_all, name = "rc.http.credential")]
pub async fn issue_credential(
    State(state): State<AppState>,
    Json(request): Json<CredentialRequest>,
) -> Result<Json<CredentialResponse>, CredentialError> {
    let room = request.room.trim();
    let identity = request.identity.trim();
    if room.is_empty() {
        record_credential_request("invalid");
        return Err(CredentialError::BadRequest("room is required".to_string()));
    }
    if identity.is_empty() {
        record_credential_request("invalid");
        return Err(CredentialError::BadRequest(
            "identity is required".to_string(),
        ));
    }

    let Some(media) = state.config.media.as_ref() else {
        record_credential_request("unconfigured");
        return Err(CredentialError::NotConfigured);
    };

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(identity)
        .chars()
        .take(MAX_NAME_LENGTH)
        .collect::<String>();

    let now = Utc::now().timestamp();
    let ttl = i64::try_from(state.config.credential_ttl_seconds).unwrap_or(i64::MAX);
    let expires_at = now.saturating_add(ttl);

    let claims = MediaClaims {
        iss: media.api_key.clone(),
        sub: identity.to_string(),
        nbf: now,
        exp: expires_at,
        name,
        video: VideoGrant {
            room: room.to_string(),
            room_join: true,
        },
    };

    let credential = sign_credential(&claims, media)?;

    record_credential_request("success");
    debug!(
        target: "rc.http",
        room = %room,
        expires_at,
        "Issued media credential"
    );

    Ok(Json(CredentialResponse {
        credential,
        endpoint_url: media.endpoint_url.clone(),
        expires_at,
    }))
}

/// Sign claims with the configured media secret.
fn sign_credential(claims: &MediaClaims, media: &MediaConfig) -> Result<String, CredentialError> {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    let key = EncodingKey::from_secret(media.api_secret.expose_secret().as_bytes());
    let header = Header::new(Algorithm::HS256);

    encode(&header, claims, &key).map_err(|e| {
        record_credential_request("error");
        CredentialError::Signing(e.to_string())
    })
}
