use crate::runtime::patch::PatchOperation;

/// Everything a create-authorizer call needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizerSpec {
    pub name: String,
    pub authorizer_type: String,
    pub provider_arn: String,
    pub identity_source: String,
}

/// Management-plane operations the remediation consumes.
pub trait RestApiGateway {
    fn rest_api_name(&self, rest_api_id: &str) -> Result<String, String>;

    /// Authorizer ids in service-returned listing order.
    fn authorizer_ids(&self, rest_api_id: &str) -> Result<Vec<String>, String>;

    fn create_authorizer(
        &self,
        rest_api_id: &str,
        spec: &AuthorizerSpec,
    ) -> Result<String, String>;

    fn resource_ids(&self, rest_api_id: &str) -> Result<Vec<String>, String>;

    /// Enabled HTTP method names of one resource; empty when the resource
    /// carries no method map.
    fn resource_methods(&self, rest_api_id: &str, resource_id: &str)
        -> Result<Vec<String>, String>;

    fn update_method_authorization(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        patch_operations: &[PatchOperation],
    ) -> Result<(), String>;
}
