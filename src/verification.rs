/// National-id verification gateway
///
/// Checks an identity number against the remote verification authority and
/// degrades to local-only validation whenever the authority is unreachable.
/// Identity verification prefers availability over strict correctness when
/// the remote authority is down: every failure path terminates in a local
/// fallback outcome, so `verify` never returns an error.
use crate::{
    config::VerificationConfig,
    error::{SakanError, SakanResult},
    national_id::{self, DecodedNationalId},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a verification attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub is_valid: bool,
    pub name_matches: bool,
    pub message: String,
    pub data: Option<VerificationData>,
}

/// Decoded identity fields carried in a verification outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationData {
    pub full_name: String,
    pub birth_date: String,
    pub gender: String,
    pub governorate: String,
}

/// Request body sent to the remote authority
#[derive(Debug, Serialize)]
struct RemoteVerifyRequest<'a> {
    national_id: &'a str,
    full_name: &'a str,
}

/// Response body returned by the remote authority
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteVerifyResponse {
    is_valid: bool,
    name_matches: bool,
    #[serde(default)]
    message: String,
    data: Option<VerificationData>,
}

/// Classified remote failure, logged before taking the fallback path
#[derive(Debug)]
enum RemoteFailure {
    Timeout,
    Network(String),
    BadStatus(u16),
    BadResponse(String),
}

impl std::fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteFailure::Timeout => write!(f, "request timed out"),
            RemoteFailure::Network(e) => write!(f, "network error: {}", e),
            RemoteFailure::BadStatus(code) => write!(f, "unexpected status: {}", code),
            RemoteFailure::BadResponse(e) => write!(f, "malformed response: {}", e),
        }
    }
}

/// Gateway to the remote national-id verification endpoint
#[derive(Clone)]
pub struct VerificationGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl VerificationGateway {
    /// Create a new gateway from configuration
    pub fn new(config: &VerificationConfig) -> SakanResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SakanError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Verify a national identity number against a full name
    ///
    /// Invalid formats are rejected locally without a network call. Remote
    /// failures of any kind degrade to the local outcome.
    pub async fn verify(&self, national_id: &str, full_name: &str) -> VerificationOutcome {
        let decoded = match national_id::decode(national_id) {
            Ok(decoded) => decoded,
            Err(_) => {
                return VerificationOutcome {
                    is_valid: false,
                    name_matches: false,
                    message: "Invalid national id format".to_string(),
                    data: None,
                };
            }
        };

        match self.verify_remote(national_id, full_name).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                tracing::warn!(
                    failure = %failure,
                    "remote verification unavailable, falling back to local check"
                );
                Self::local_outcome(&decoded, full_name)
            }
        }
    }

    /// Call the remote authority
    async fn verify_remote(
        &self,
        national_id: &str,
        full_name: &str,
    ) -> Result<VerificationOutcome, RemoteFailure> {
        let url = format!("{}/verify", self.base_url);
        let payload = RemoteVerifyRequest {
            national_id,
            full_name,
        };

        let response = self
            .http
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteFailure::Timeout
                } else {
                    RemoteFailure::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(RemoteFailure::BadStatus(response.status().as_u16()));
        }

        let body: RemoteVerifyResponse = response
            .json()
            .await
            .map_err(|e| RemoteFailure::BadResponse(e.to_string()))?;

        Ok(VerificationOutcome {
            is_valid: body.is_valid,
            name_matches: body.name_matches,
            message: body.message,
            data: body.data,
        })
    }

    /// Local-only outcome for a structurally valid number
    ///
    /// Name match is assumed when the format is valid. This is a weaker
    /// guarantee than remote verification and deliberately preserved from
    /// the platform's availability-first policy.
    fn local_outcome(decoded: &DecodedNationalId, full_name: &str) -> VerificationOutcome {
        VerificationOutcome {
            is_valid: true,
            name_matches: true,
            message: "Verified locally; remote authority unavailable".to_string(),
            data: Some(VerificationData {
                full_name: full_name.to_string(),
                birth_date: decoded.birth_date.format("%Y-%m-%d").to_string(),
                gender: decoded.gender.as_str().to_string(),
                governorate: decoded.governorate.to_string(),
            }),
        }
    }
}
