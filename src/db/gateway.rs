use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_rdsdata::types::Field;
use tracing::{debug, info};

use super::{SqlParam, SqlResponse, SqlValue};
use crate::error::{DataApiError, DataApiResult};
use crate::stack::StackOutputs;

/// Deployment stack that publishes the database connection coordinates.
pub const STACK_NAME: &str = "ChaosAgentDatabaseStack";

/// Database name inside the Aurora cluster.
pub const DATABASE_NAME: &str = "chaosagent";

/// Physical connection triple for the data API.
#[derive(Debug, Clone)]
pub struct DbCoordinates {
    pub cluster_arn: String,
    pub secret_arn: String,
    pub database: String,
}

impl DbCoordinates {
    /// Pull the connection triple out of deployment-stack outputs.
    pub fn from_outputs(outputs: &StackOutputs) -> DataApiResult<Self> {
        let cluster_arn = outputs
            .get("ClusterArn")
            .ok_or_else(|| DataApiError::Configuration {
                message: "ClusterArn not found in stack outputs".to_string(),
            })?;
        let secret_arn = outputs
            .get("SecretArn")
            .ok_or_else(|| DataApiError::Configuration {
                message: "SecretArn not found in stack outputs".to_string(),
            })?;

        Ok(Self {
            cluster_arn: cluster_arn.to_string(),
            secret_arn: secret_arn.to_string(),
            database: DATABASE_NAME.to_string(),
        })
    }
}

/// Executes parameterized statements against the relational store.
///
/// A statement either fully executes or returns an error; callers must not
/// assume partial success.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str, params: Vec<SqlParam>) -> DataApiResult<SqlResponse>;
}

/// RDS Data API gateway.
///
/// Connection coordinates are resolved once at construction; building a fresh
/// gateway is the only reset.
pub struct DataApiGateway {
    client: aws_sdk_rdsdata::Client,
    coordinates: DbCoordinates,
}

impl DataApiGateway {
    /// Resolve coordinates from stack outputs and build the client.
    pub fn connect(sdk_config: &SdkConfig, outputs: &StackOutputs) -> DataApiResult<Self> {
        let coordinates = DbCoordinates::from_outputs(outputs)?;
        info!(
            cluster = %coordinates.cluster_arn,
            database = %coordinates.database,
            "Database gateway connected"
        );

        Ok(Self {
            client: aws_sdk_rdsdata::Client::new(sdk_config),
            coordinates,
        })
    }

    pub fn coordinates(&self) -> &DbCoordinates {
        &self.coordinates
    }
}

#[async_trait]
impl SqlExecutor for DataApiGateway {
    async fn execute(&self, sql: &str, params: Vec<SqlParam>) -> DataApiResult<SqlResponse> {
        debug!(sql = %sql.chars().take(100).collect::<String>(), "Executing SQL");

        let mut request = self
            .client
            .execute_statement()
            .resource_arn(&self.coordinates.cluster_arn)
            .secret_arn(&self.coordinates.secret_arn)
            .database(&self.coordinates.database)
            .sql(sql);

        if !params.is_empty() {
            request = request.set_parameters(Some(
                params.into_iter().map(SqlParam::into_wire).collect(),
            ));
        }

        let output = request
            .send()
            .await
            .map_err(|e| DataApiError::Execution {
                message: e.to_string(),
            })?;

        let records = output
            .records
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(convert_field).collect())
            .collect();

        debug!("SQL execution successful");

        Ok(SqlResponse {
            records,
            number_of_records_updated: output.number_of_records_updated,
        })
    }
}

fn convert_field(field: Field) -> SqlValue {
    match field {
        Field::IsNull(_) => SqlValue::Null,
        Field::BooleanValue(v) => SqlValue::Bool(v),
        Field::LongValue(v) => SqlValue::Long(v),
        Field::DoubleValue(v) => SqlValue::Double(v),
        Field::StringValue(v) => SqlValue::Text(v),
        // Blob/array cells never appear in this schema
        _ => SqlValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(pairs: &[(&str, &str)]) -> StackOutputs {
        StackOutputs::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_coordinates_from_outputs() {
        let coords = DbCoordinates::from_outputs(&outputs(&[
            ("ClusterArn", "arn:aws:rds:us-east-1:123:cluster:db"),
            ("SecretArn", "arn:aws:secretsmanager:us-east-1:123:secret:s"),
        ]))
        .unwrap();
        assert_eq!(coords.cluster_arn, "arn:aws:rds:us-east-1:123:cluster:db");
        assert_eq!(coords.database, DATABASE_NAME);
    }

    #[test]
    fn test_missing_output_names_the_key() {
        let err = DbCoordinates::from_outputs(&outputs(&[(
            "ClusterArn",
            "arn:aws:rds:us-east-1:123:cluster:db",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("SecretArn"));
    }

    #[test]
    fn test_field_conversion() {
        assert_eq!(convert_field(Field::IsNull(true)), SqlValue::Null);
        assert_eq!(convert_field(Field::LongValue(9)), SqlValue::Long(9));
        assert_eq!(
            convert_field(Field::StringValue("x".into())),
            SqlValue::Text("x".into())
        );
    }
}
