//! Shared test doubles for the tool and workflow tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use chaos_agent::config::StackLocator;
use chaos_agent::db::{SqlExecutor, SqlParam, SqlResponse, SqlValue};
use chaos_agent::error::{DataApiError, DataApiResult, StackError, StackResult};
use chaos_agent::stack::{FisRole, StackMetadata, StackOutputs};

/// One recorded statement execution.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Scripted executor: returns queued responses in order and records every
/// call. With no queued response it returns an empty success.
#[derive(Default)]
pub struct FakeExecutor {
    responses: Mutex<VecDeque<DataApiResult<SqlResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: SqlResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(DataApiError::Execution {
                message: message.to_string(),
            }));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no statement was executed")
    }
}

#[async_trait]
impl SqlExecutor for FakeExecutor {
    async fn execute(&self, sql: &str, params: Vec<SqlParam>) -> DataApiResult<SqlResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            sql: sql.to_string(),
            params,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SqlResponse::default()))
    }
}

/// Response carrying generated ids, one row per id.
pub fn id_response(ids: &[i64]) -> SqlResponse {
    SqlResponse {
        records: ids.iter().map(|id| vec![SqlValue::Long(*id)]).collect(),
        number_of_records_updated: 0,
    }
}

/// Response reporting an update row count.
pub fn updated_response(count: i64) -> SqlResponse {
    SqlResponse {
        records: Vec::new(),
        number_of_records_updated: count,
    }
}

/// Response carrying arbitrary rows.
pub fn rows_response(records: Vec<Vec<SqlValue>>) -> SqlResponse {
    SqlResponse {
        records,
        number_of_records_updated: 0,
    }
}

/// Stack metadata double with fixed outputs and role.
pub struct FakeStackMetadata {
    pub outputs: HashMap<String, String>,
    pub role_arn: Option<String>,
}

impl FakeStackMetadata {
    pub fn with_role(role_arn: &str) -> Self {
        Self {
            outputs: HashMap::new(),
            role_arn: Some(role_arn.to_string()),
        }
    }
}

#[async_trait]
impl StackMetadata for FakeStackMetadata {
    async fn outputs(&self) -> StackResult<StackOutputs> {
        Ok(StackOutputs::new(self.outputs.clone()))
    }

    async fn fis_execution_role(&self) -> StackResult<FisRole> {
        match &self.role_arn {
            Some(role_arn) => Ok(FisRole {
                role_arn: role_arn.clone(),
                role_name: "ChaosAgentFISExecutionRole".to_string(),
            }),
            None => Err(StackError::MissingExport {
                name: "ChaosAgentFISExecutionRoleArn".to_string(),
            }),
        }
    }
}

/// Stack locator double: the stack lives in `stack_region`, the caller's
/// default region is `default_region`. Records probe calls.
pub struct FakeLocator {
    pub default_region: Option<String>,
    pub stack_region: Option<String>,
    pub probes: Mutex<Vec<String>>,
}

impl FakeLocator {
    pub fn new(default_region: Option<&str>, stack_region: Option<&str>) -> Self {
        Self {
            default_region: default_region.map(str::to_string),
            stack_region: stack_region.map(str::to_string),
            probes: Mutex::new(Vec::new()),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.lock().unwrap().len()
    }
}

#[async_trait]
impl StackLocator for FakeLocator {
    async fn default_region(&self) -> Option<String> {
        self.default_region.clone()
    }

    async fn stack_exists(&self, _stack_name: &str, region: &str) -> bool {
        self.probes.lock().unwrap().push(region.to_string());
        self.stack_region.as_deref() == Some(region)
    }
}
