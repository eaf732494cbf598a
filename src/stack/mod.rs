//! Deployment-stack metadata access.
//!
//! The deployment stack publishes the database connection coordinates and the
//! pre-generated FIS execution role. Failures here raise rather than return
//! structured results: callers at this layer have no agent-facing contract.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudformation::config::Region;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::StackLocator;
use crate::error::{StackError, StackResult};

const FIS_ROLE_ARN_EXPORT: &str = "ChaosAgentFISExecutionRoleArn";
const FIS_ROLE_NAME_EXPORT: &str = "ChaosAgentFISExecutionRoleName";

/// Key/value outputs of a deployment stack.
#[derive(Debug, Clone, Default)]
pub struct StackOutputs {
    map: HashMap<String, String>,
}

impl StackOutputs {
    pub fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The pre-generated FIS execution role published by the deployment stack.
#[derive(Debug, Clone, Serialize)]
pub struct FisRole {
    pub role_arn: String,
    pub role_name: String,
}

/// Read access to deployment-stack metadata.
#[async_trait]
pub trait StackMetadata: Send + Sync {
    /// Stack outputs, resolved once and cached for the provider's lifetime.
    async fn outputs(&self) -> StackResult<StackOutputs>;

    /// The FIS execution role from stack exports.
    async fn fis_execution_role(&self) -> StackResult<FisRole>;
}

/// CloudFormation-backed stack metadata provider.
pub struct CfnStackMetadata {
    client: aws_sdk_cloudformation::Client,
    stack_name: String,
    cached_outputs: OnceCell<StackOutputs>,
}

impl CfnStackMetadata {
    pub fn new(sdk_config: &SdkConfig, stack_name: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_cloudformation::Client::new(sdk_config),
            stack_name: stack_name.into(),
            cached_outputs: OnceCell::new(),
        }
    }

    async fn fetch_outputs(&self) -> StackResult<StackOutputs> {
        let response = self
            .client
            .describe_stacks()
            .stack_name(&self.stack_name)
            .send()
            .await
            .map_err(|e| StackError::Api {
                message: format!("Failed to get stack outputs for {}: {}", self.stack_name, e),
            })?;

        let stack = response
            .stacks
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| StackError::StackNotFound {
                stack_name: self.stack_name.clone(),
            })?;

        let mut map = HashMap::new();
        for output in stack.outputs.unwrap_or_default() {
            if let (Some(key), Some(value)) = (output.output_key, output.output_value) {
                map.insert(key, value);
            }
        }

        info!(stack = %self.stack_name, "Cached stack outputs");
        Ok(StackOutputs::new(map))
    }
}

#[async_trait]
impl StackMetadata for CfnStackMetadata {
    async fn outputs(&self) -> StackResult<StackOutputs> {
        self.cached_outputs
            .get_or_try_init(|| self.fetch_outputs())
            .await
            .cloned()
    }

    async fn fis_execution_role(&self) -> StackResult<FisRole> {
        let response = self
            .client
            .list_exports()
            .send()
            .await
            .map_err(|e| StackError::Api {
                message: format!("Failed to list stack exports: {e}"),
            })?;

        let mut role_arn = None;
        let mut role_name = None;
        for export in response.exports.unwrap_or_default() {
            match export.name.as_deref() {
                Some(FIS_ROLE_ARN_EXPORT) => role_arn = export.value,
                Some(FIS_ROLE_NAME_EXPORT) => role_name = export.value,
                _ => {}
            }
        }

        let role_arn = role_arn.ok_or_else(|| StackError::MissingExport {
            name: FIS_ROLE_ARN_EXPORT.to_string(),
        })?;

        Ok(FisRole {
            role_arn,
            role_name: role_name.unwrap_or_else(|| "ChaosAgentFISExecutionRole".to_string()),
        })
    }
}

/// CloudFormation-backed stack locator used for region resolution.
pub struct CfnStackLocator {
    base: SdkConfig,
}

impl CfnStackLocator {
    pub fn new(base: SdkConfig) -> Self {
        Self { base }
    }
}

#[async_trait]
impl StackLocator for CfnStackLocator {
    async fn default_region(&self) -> Option<String> {
        self.base.region().map(|r| r.to_string())
    }

    async fn stack_exists(&self, stack_name: &str, region: &str) -> bool {
        let config = aws_sdk_cloudformation::config::Builder::from(&self.base)
            .region(Region::new(region.to_string()))
            .build();
        let client = aws_sdk_cloudformation::Client::from_conf(config);

        match client.describe_stacks().stack_name(stack_name).send().await {
            Ok(response) => {
                let found = !response.stacks.unwrap_or_default().is_empty();
                if found {
                    info!(stack = stack_name, region = region, "Found deployment stack");
                }
                found
            }
            Err(e) => {
                let message = e.to_string();
                if message.contains("does not exist") {
                    debug!(stack = stack_name, region = region, "Stack not in region");
                } else {
                    warn!(stack = stack_name, region = region, error = %message, "Error checking stack");
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outputs_lookup() {
        let outputs = StackOutputs::new(HashMap::from([(
            "ClusterArn".to_string(),
            "arn:aws:rds:us-east-1:123:cluster:db".to_string(),
        )]));
        assert_eq!(
            outputs.get("ClusterArn"),
            Some("arn:aws:rds:us-east-1:123:cluster:db")
        );
        assert_eq!(outputs.get("SecretArn"), None);
        assert!(!outputs.is_empty());
        assert!(StackOutputs::default().is_empty());
    }
}
