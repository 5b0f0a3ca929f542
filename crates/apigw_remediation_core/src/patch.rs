use serde::{Deserialize, Serialize};

use crate::contract::COGNITO_AUTHORIZATION_TYPE;

pub const PATCH_OP_REPLACE: &str = "replace";
pub const AUTHORIZATION_TYPE_PATH: &str = "/authorizationType";
pub const AUTHORIZER_ID_PATH: &str = "/authorizerId";

/// Wire shape of a single API Gateway patch operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    pub value: String,
}

impl PatchOperation {
    pub fn replace(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: PATCH_OP_REPLACE.to_string(),
            path: path.into(),
            value: value.into(),
        }
    }
}

/// The two replace operations applied to every enabled method: switch the
/// authorization type to Cognito user pools and bind the resolved authorizer.
pub fn method_authorization_patches(authorizer_id: &str) -> Vec<PatchOperation> {
    vec![
        PatchOperation::replace(AUTHORIZATION_TYPE_PATH, COGNITO_AUTHORIZATION_TYPE),
        PatchOperation::replace(AUTHORIZER_ID_PATH, authorizer_id),
    ]
}
