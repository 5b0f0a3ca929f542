use apigw_remediation_core::contract::RemediationEvent;
use apigw_remediation_core::patch::PatchOperation;
use apigw_remediation_lambda::adapters::rest_api::{AuthorizerSpec, RestApiGateway};
use apigw_remediation_lambda::handlers::remediate::{
    handle_remediation_event, RemediationConfig, RemediationSummary,
};
use aws_sdk_apigateway::types::{AuthorizerType, Op, PatchOperation as SdkPatchOperation};
use lambda_runtime::{service_fn, Error, LambdaEvent};

struct AwsRestApiGateway {
    apigw_client: aws_sdk_apigateway::Client,
}

impl RestApiGateway for AwsRestApiGateway {
    fn rest_api_name(&self, rest_api_id: &str) -> Result<String, String> {
        let client = self.apigw_client.clone();
        let rest_api_id = rest_api_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_rest_api()
                    .rest_api_id(rest_api_id.clone())
                    .send()
                    .await
                    .map_err(|error| format!("failed to get rest api: {error}"))?;
                output
                    .name()
                    .map(str::to_string)
                    .ok_or_else(|| format!("rest api {rest_api_id} carries no name"))
            })
        })
    }

    fn authorizer_ids(&self, rest_api_id: &str) -> Result<Vec<String>, String> {
        let client = self.apigw_client.clone();
        let rest_api_id = rest_api_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_authorizers()
                    .rest_api_id(rest_api_id)
                    .send()
                    .await
                    .map_err(|error| format!("failed to list authorizers: {error}"))?;
                Ok(output
                    .items()
                    .iter()
                    .filter_map(|authorizer| authorizer.id().map(str::to_string))
                    .collect())
            })
        })
    }

    fn create_authorizer(
        &self,
        rest_api_id: &str,
        spec: &AuthorizerSpec,
    ) -> Result<String, String> {
        let client = self.apigw_client.clone();
        let rest_api_id = rest_api_id.to_string();
        let spec = spec.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .create_authorizer()
                    .rest_api_id(rest_api_id)
                    .name(spec.name)
                    .r#type(AuthorizerType::from(spec.authorizer_type.as_str()))
                    .provider_arns(spec.provider_arn)
                    .identity_source(spec.identity_source)
                    .send()
                    .await
                    .map_err(|error| format!("failed to create authorizer: {error}"))?;
                output
                    .id()
                    .map(str::to_string)
                    .ok_or_else(|| "create authorizer response carried no id".to_string())
            })
        })
    }

    fn resource_ids(&self, rest_api_id: &str) -> Result<Vec<String>, String> {
        let client = self.apigw_client.clone();
        let rest_api_id = rest_api_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_resources()
                    .rest_api_id(rest_api_id)
                    .send()
                    .await
                    .map_err(|error| format!("failed to list resources: {error}"))?;
                Ok(output
                    .items()
                    .iter()
                    .filter_map(|resource| resource.id().map(str::to_string))
                    .collect())
            })
        })
    }

    fn resource_methods(
        &self,
        rest_api_id: &str,
        resource_id: &str,
    ) -> Result<Vec<String>, String> {
        let client = self.apigw_client.clone();
        let rest_api_id = rest_api_id.to_string();
        let resource_id = resource_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_resource()
                    .rest_api_id(rest_api_id)
                    .resource_id(resource_id)
                    .send()
                    .await
                    .map_err(|error| format!("failed to get resource: {error}"))?;
                // Sorted so patch order and logs are stable across runs.
                let mut methods: Vec<String> = output
                    .resource_methods()
                    .map(|method_map| method_map.keys().cloned().collect())
                    .unwrap_or_default();
                methods.sort();
                Ok(methods)
            })
        })
    }

    fn update_method_authorization(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        http_method: &str,
        patch_operations: &[PatchOperation],
    ) -> Result<(), String> {
        let client = self.apigw_client.clone();
        let rest_api_id = rest_api_id.to_string();
        let resource_id = resource_id.to_string();
        let http_method = http_method.to_string();
        let patch_operations = patch_operations.to_vec();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut request = client
                    .update_method()
                    .rest_api_id(rest_api_id)
                    .resource_id(resource_id)
                    .http_method(http_method);
                for operation in &patch_operations {
                    request = request.patch_operations(
                        SdkPatchOperation::builder()
                            .op(Op::from(operation.op.as_str()))
                            .path(operation.path.clone())
                            .value(operation.value.clone())
                            .build(),
                    );
                }
                request
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to update method: {error}"))
            })
        })
    }
}

async fn handle_request(event: LambdaEvent<serde_json::Value>) -> Result<RemediationSummary, Error> {
    let payload: RemediationEvent = serde_json::from_value(event.payload)
        .map_err(|error| Error::from(format!("invalid remediation event: {error}")))?;

    let provider_arn =
        std::env::var("PROVIDER_ARN").map_err(|_| Error::from("PROVIDER_ARN must be configured"))?;
    let config = RemediationConfig { provider_arn };

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let gateway = AwsRestApiGateway {
        apigw_client: aws_sdk_apigateway::Client::new(&aws_config),
    };

    handle_remediation_event(&payload, &config, &gateway)
        .map_err(|error| Error::from(error.message))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
