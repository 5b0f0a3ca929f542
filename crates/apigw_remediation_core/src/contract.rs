use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const REMEDIATION_SCHEMA_VERSION: &str = "v1";

/// Authorization type written into every patched method.
pub const COGNITO_AUTHORIZATION_TYPE: &str = "COGNITO_USER_POOLS";
/// Authorizer type used when the remediation has to create one.
pub const COGNITO_AUTHORIZER_TYPE: &str = "COGNITO_USER_POOLS";
/// Request element the created authorizer reads the bearer credential from.
pub const DEFAULT_IDENTITY_SOURCE: &str = "method.request.header.Auth";

/// The REST API id sits in the third slash-delimited segment of the
/// compliance resource identifier.
const REST_API_ID_SEGMENT: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemediationEvent {
    #[serde(rename = "ResourceId")]
    pub resource_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedRemediationEvent {
    pub resource_id: String,
    pub rest_api_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn rest_api_id_from_resource_id(resource_id: &str) -> Result<&str, ValidationError> {
    let segment = resource_id
        .split('/')
        .nth(REST_API_ID_SEGMENT)
        .unwrap_or_default();
    if segment.is_empty() {
        return Err(ValidationError::new(format!(
            "ResourceId '{resource_id}' carries no REST API id in its third segment"
        )));
    }
    Ok(segment)
}

pub fn normalize_event(
    event: RemediationEvent,
) -> Result<NormalizedRemediationEvent, ValidationError> {
    let resource_id = event.resource_id.trim().to_string();
    if resource_id.is_empty() {
        return Err(ValidationError::new("ResourceId cannot be empty"));
    }

    let rest_api_id = rest_api_id_from_resource_id(&resource_id)?.to_string();
    Ok(NormalizedRemediationEvent {
        resource_id,
        rest_api_id,
    })
}

pub fn request_fingerprint(event: &NormalizedRemediationEvent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stable_contract_json(event));
    format!("{:x}", hasher.finalize())
}

pub fn stable_contract_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).expect("serialization of contract value should not fail")
}
