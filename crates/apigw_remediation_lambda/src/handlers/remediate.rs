use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::adapters::rest_api::{AuthorizerSpec, RestApiGateway};
use crate::runtime::contract::{
    normalize_event, request_fingerprint, NormalizedRemediationEvent, RemediationEvent,
    COGNITO_AUTHORIZER_TYPE, DEFAULT_IDENTITY_SOURCE, REMEDIATION_SCHEMA_VERSION,
};
use crate::runtime::patch::method_authorization_patches;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationConfig {
    pub provider_arn: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodPatchRecord {
    pub resource_id: String,
    pub http_method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemediationSummary {
    pub rest_api_id: String,
    pub authorizer_id: String,
    pub authorizer_created: bool,
    pub resources_scanned: usize,
    pub methods_patched: usize,
    pub patches: Vec<MethodPatchRecord>,
    pub status: String,
    pub schema_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationError {
    pub message: String,
}

/// Ensures a Cognito authorizer exists on the event's REST API and rewires
/// every method on every resource to require it. Patches reapply
/// unconditionally; a mid-loop failure leaves earlier patches in place.
pub fn handle_remediation_event(
    event: &RemediationEvent,
    config: &RemediationConfig,
    gateway: &dyn RestApiGateway,
) -> Result<RemediationSummary, RemediationError> {
    let started_at = Instant::now();

    let normalized = normalize_event(event.clone()).map_err(|error| RemediationError {
        message: error.message().to_string(),
    })?;

    log_remediation_info(
        "remediation_started",
        json!({
            "resource_id": normalized.resource_id.clone(),
            "rest_api_id": normalized.rest_api_id.clone(),
            "request_fingerprint": request_fingerprint(&normalized),
        }),
    );

    match remediate(&normalized, config, gateway) {
        Ok(summary) => {
            log_remediation_info(
                "remediation_completed",
                json!({
                    "rest_api_id": summary.rest_api_id.clone(),
                    "authorizer_id": summary.authorizer_id.clone(),
                    "authorizer_created": summary.authorizer_created,
                    "resources_scanned": summary.resources_scanned,
                    "methods_patched": summary.methods_patched,
                    "duration_ms": started_at.elapsed().as_millis(),
                }),
            );
            Ok(summary)
        }
        Err(error) => {
            log_remediation_error(
                "remediation_failed",
                json!({
                    "rest_api_id": normalized.rest_api_id.clone(),
                    "duration_ms": started_at.elapsed().as_millis(),
                    "error": error.message.clone(),
                }),
            );
            Err(error)
        }
    }
}

fn remediate(
    event: &NormalizedRemediationEvent,
    config: &RemediationConfig,
    gateway: &dyn RestApiGateway,
) -> Result<RemediationSummary, RemediationError> {
    let rest_api_id = event.rest_api_id.as_str();

    // The name is only needed when creating an authorizer, but the lookup
    // also confirms the target API exists before anything is mutated.
    let rest_api_name = gateway
        .rest_api_name(rest_api_id)
        .map_err(|error| RemediationError {
            message: format!("Failed to resolve REST API name: {error}"),
        })?;

    let (authorizer_id, authorizer_created) =
        resolve_authorizer(rest_api_id, &rest_api_name, config, gateway)?;

    let resource_ids = gateway
        .resource_ids(rest_api_id)
        .map_err(|error| RemediationError {
            message: format!("Failed to list REST API resources: {error}"),
        })?;
    log_remediation_info(
        "resources_listed",
        json!({
            "rest_api_id": rest_api_id,
            "resource_count": resource_ids.len(),
            "resource_ids": resource_ids.clone(),
        }),
    );

    let mut patches = Vec::new();
    for resource_id in &resource_ids {
        let http_methods = gateway
            .resource_methods(rest_api_id, resource_id)
            .map_err(|error| RemediationError {
                message: format!("Failed to list methods for resource {resource_id}: {error}"),
            })?;
        log_remediation_info(
            "resource_methods_listed",
            json!({
                "rest_api_id": rest_api_id,
                "resource_id": resource_id,
                "http_methods": http_methods.clone(),
            }),
        );

        for http_method in &http_methods {
            let patch_operations = method_authorization_patches(&authorizer_id);
            gateway
                .update_method_authorization(
                    rest_api_id,
                    resource_id,
                    http_method,
                    &patch_operations,
                )
                .map_err(|error| RemediationError {
                    message: format!(
                        "Failed to patch method {http_method} on resource {resource_id}: {error}"
                    ),
                })?;
            log_remediation_info(
                "method_patched",
                json!({
                    "rest_api_id": rest_api_id,
                    "resource_id": resource_id,
                    "http_method": http_method,
                    "authorizer_id": authorizer_id.clone(),
                }),
            );
            patches.push(MethodPatchRecord {
                resource_id: resource_id.clone(),
                http_method: http_method.clone(),
            });
        }
    }

    Ok(RemediationSummary {
        rest_api_id: rest_api_id.to_string(),
        authorizer_id,
        authorizer_created,
        resources_scanned: resource_ids.len(),
        methods_patched: patches.len(),
        patches,
        status: "remediation_complete".to_string(),
        schema_version: REMEDIATION_SCHEMA_VERSION.to_string(),
    })
}

fn resolve_authorizer(
    rest_api_id: &str,
    rest_api_name: &str,
    config: &RemediationConfig,
    gateway: &dyn RestApiGateway,
) -> Result<(String, bool), RemediationError> {
    let existing = gateway
        .authorizer_ids(rest_api_id)
        .map_err(|error| RemediationError {
            message: format!("Failed to list authorizers: {error}"),
        })?;

    if let Some(authorizer_id) = existing.first() {
        log_remediation_info(
            "authorizer_reused",
            json!({
                "rest_api_id": rest_api_id,
                "authorizer_id": authorizer_id.clone(),
                "authorizer_count": existing.len(),
            }),
        );
        return Ok((authorizer_id.clone(), false));
    }

    let spec = AuthorizerSpec {
        name: rest_api_name.to_string(),
        authorizer_type: COGNITO_AUTHORIZER_TYPE.to_string(),
        provider_arn: config.provider_arn.clone(),
        identity_source: DEFAULT_IDENTITY_SOURCE.to_string(),
    };
    let authorizer_id = gateway
        .create_authorizer(rest_api_id, &spec)
        .map_err(|error| RemediationError {
            message: format!("Failed to create authorizer: {error}"),
        })?;
    log_remediation_info(
        "authorizer_created",
        json!({
            "rest_api_id": rest_api_id,
            "authorizer_id": authorizer_id.clone(),
            "name": spec.name.clone(),
            "identity_source": spec.identity_source.clone(),
        }),
    );
    Ok((authorizer_id, true))
}

fn log_remediation_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "remediation_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_remediation_error(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "remediation_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::runtime::contract::COGNITO_AUTHORIZATION_TYPE;
    use crate::runtime::patch::PatchOperation;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct RecordedUpdate {
        resource_id: String,
        http_method: String,
        operations: Vec<PatchOperation>,
    }

    struct RecordingGateway {
        rest_api_name: String,
        authorizers: Vec<String>,
        resources: Vec<(String, Vec<String>)>,
        created_authorizer_id: String,
        failing_method: Option<(String, String)>,
        creates: Mutex<Vec<AuthorizerSpec>>,
        updates: Mutex<Vec<RecordedUpdate>>,
    }

    impl RecordingGateway {
        fn new(authorizers: &[&str], resources: &[(&str, &[&str])]) -> Self {
            Self {
                rest_api_name: "orders-api".to_string(),
                authorizers: authorizers.iter().map(|id| id.to_string()).collect(),
                resources: resources
                    .iter()
                    .map(|(id, methods)| {
                        (
                            id.to_string(),
                            methods.iter().map(|method| method.to_string()).collect(),
                        )
                    })
                    .collect(),
                created_authorizer_id: "auth-new".to_string(),
                failing_method: None,
                creates: Mutex::new(Vec::new()),
                updates: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, resource_id: &str, http_method: &str) -> Self {
            self.failing_method = Some((resource_id.to_string(), http_method.to_string()));
            self
        }

        fn creates(&self) -> Vec<AuthorizerSpec> {
            self.creates.lock().expect("poisoned mutex").clone()
        }

        fn updates(&self) -> Vec<RecordedUpdate> {
            self.updates.lock().expect("poisoned mutex").clone()
        }
    }

    impl RestApiGateway for RecordingGateway {
        fn rest_api_name(&self, _rest_api_id: &str) -> Result<String, String> {
            Ok(self.rest_api_name.clone())
        }

        fn authorizer_ids(&self, _rest_api_id: &str) -> Result<Vec<String>, String> {
            Ok(self.authorizers.clone())
        }

        fn create_authorizer(
            &self,
            _rest_api_id: &str,
            spec: &AuthorizerSpec,
        ) -> Result<String, String> {
            self.creates
                .lock()
                .expect("poisoned mutex")
                .push(spec.clone());
            Ok(self.created_authorizer_id.clone())
        }

        fn resource_ids(&self, _rest_api_id: &str) -> Result<Vec<String>, String> {
            Ok(self.resources.iter().map(|(id, _)| id.clone()).collect())
        }

        fn resource_methods(
            &self,
            _rest_api_id: &str,
            resource_id: &str,
        ) -> Result<Vec<String>, String> {
            self.resources
                .iter()
                .find(|(id, _)| id == resource_id)
                .map(|(_, methods)| methods.clone())
                .ok_or_else(|| format!("unknown resource: {resource_id}"))
        }

        fn update_method_authorization(
            &self,
            _rest_api_id: &str,
            resource_id: &str,
            http_method: &str,
            patch_operations: &[PatchOperation],
        ) -> Result<(), String> {
            if let Some((failing_resource, failing_method)) = &self.failing_method {
                if failing_resource == resource_id && failing_method == http_method {
                    return Err("simulated update failure".to_string());
                }
            }

            self.updates
                .lock()
                .expect("poisoned mutex")
                .push(RecordedUpdate {
                    resource_id: resource_id.to_string(),
                    http_method: http_method.to_string(),
                    operations: patch_operations.to_vec(),
                });
            Ok(())
        }
    }

    fn sample_event() -> RemediationEvent {
        RemediationEvent {
            resource_id: "config/apigw/abc123/default".to_string(),
        }
    }

    fn sample_config() -> RemediationConfig {
        RemediationConfig {
            provider_arn:
                "arn:aws:cognito-idp:eu-west-1:123456789012:userpool/eu-west-1_Example".to_string(),
        }
    }

    #[test]
    fn reuses_first_authorizer_without_creating() {
        let gateway = RecordingGateway::new(
            &["auth-9", "auth-2"],
            &[("r1", &["GET", "POST"]), ("r2", &["DELETE"])],
        );

        let summary = handle_remediation_event(&sample_event(), &sample_config(), &gateway)
            .expect("remediation should pass");

        assert_eq!(summary.authorizer_id, "auth-9");
        assert!(!summary.authorizer_created);
        assert!(gateway.creates().is_empty());

        let updates = gateway.updates();
        assert_eq!(updates.len(), 3);
        for update in &updates {
            assert_eq!(update.operations[1].value, "auth-9");
        }
    }

    #[test]
    fn creates_authorizer_when_none_exist() {
        let gateway =
            RecordingGateway::new(&[], &[("r1", &["GET", "POST"]), ("r2", &["DELETE"])]);
        let config = sample_config();

        let summary = handle_remediation_event(&sample_event(), &config, &gateway)
            .expect("remediation should pass");

        let creates = gateway.creates();
        assert_eq!(creates.len(), 1);
        assert_eq!(
            creates[0],
            AuthorizerSpec {
                name: "orders-api".to_string(),
                authorizer_type: "COGNITO_USER_POOLS".to_string(),
                provider_arn: config.provider_arn,
                identity_source: "method.request.header.Auth".to_string(),
            }
        );

        assert_eq!(summary.authorizer_id, "auth-new");
        assert!(summary.authorizer_created);
        for update in gateway.updates() {
            assert_eq!(update.operations[1].value, "auth-new");
        }
    }

    #[test]
    fn patches_every_enabled_method_with_both_replace_operations() {
        let gateway = RecordingGateway::new(
            &["auth-9"],
            &[("r1", &["GET", "POST"]), ("r2", &["DELETE"])],
        );

        let summary = handle_remediation_event(&sample_event(), &sample_config(), &gateway)
            .expect("remediation should pass");

        let updates = gateway.updates();
        let targets: Vec<(String, String)> = updates
            .iter()
            .map(|update| (update.resource_id.clone(), update.http_method.clone()))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("r1".to_string(), "GET".to_string()),
                ("r1".to_string(), "POST".to_string()),
                ("r2".to_string(), "DELETE".to_string()),
            ]
        );

        for update in &updates {
            assert_eq!(
                update.operations,
                vec![
                    PatchOperation::replace("/authorizationType", COGNITO_AUTHORIZATION_TYPE),
                    PatchOperation::replace("/authorizerId", "auth-9"),
                ]
            );
        }

        assert_eq!(summary.rest_api_id, "abc123");
        assert_eq!(summary.resources_scanned, 2);
        assert_eq!(summary.methods_patched, 3);
        assert_eq!(summary.patches.len(), 3);
        assert_eq!(summary.status, "remediation_complete");
        assert_eq!(summary.schema_version, "v1");
    }

    #[test]
    fn resource_without_methods_produces_no_patches() {
        let gateway = RecordingGateway::new(&["auth-9"], &[("r1", &[]), ("r2", &["DELETE"])]);

        let summary = handle_remediation_event(&sample_event(), &sample_config(), &gateway)
            .expect("remediation should pass");

        let updates = gateway.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].resource_id, "r2");
        assert_eq!(summary.resources_scanned, 2);
        assert_eq!(summary.methods_patched, 1);
    }

    #[test]
    fn malformed_resource_id_fails_before_any_remote_call() {
        let gateway = RecordingGateway::new(&[], &[("r1", &["GET"])]);
        let event = RemediationEvent {
            resource_id: "config/apigw".to_string(),
        };

        let error = handle_remediation_event(&event, &sample_config(), &gateway)
            .expect_err("remediation should fail");

        assert!(error.message.contains("third segment"));
        assert!(gateway.creates().is_empty());
        assert!(gateway.updates().is_empty());
    }

    #[test]
    fn mid_loop_failure_leaves_earlier_patches_applied() {
        let gateway = RecordingGateway::new(
            &["auth-9"],
            &[("r1", &["GET", "POST"]), ("r2", &["DELETE"])],
        )
        .failing_on("r2", "DELETE");

        let error = handle_remediation_event(&sample_event(), &sample_config(), &gateway)
            .expect_err("remediation should fail");

        assert!(error
            .message
            .contains("Failed to patch method DELETE on resource r2"));
        let updates = gateway.updates();
        assert_eq!(updates.len(), 2);
        assert!(updates
            .iter()
            .all(|update| update.resource_id == "r1"));
    }
}
