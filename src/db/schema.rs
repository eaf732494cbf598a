//! Schema DDL for the chaos agent database.
//!
//! Seven tables plus the `experiment_with_hypothesis` read-only view. The
//! view's column order and names are part of the contract consumed by the
//! view-reading tool.

use tracing::info;

use super::SqlExecutor;
use crate::error::DataApiResult;

/// Table creation statements, in dependency order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS system_component (
        id SERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        type VARCHAR(100) NOT NULL,
        description TEXT,
        created_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS hypothesis (
        id SERIAL PRIMARY KEY,
        title VARCHAR(500) NOT NULL,
        description TEXT,
        persona VARCHAR(255),
        steady_state_description TEXT,
        failure_mode TEXT,
        status VARCHAR(50) DEFAULT 'proposed',
        priority INTEGER DEFAULT 1,
        notes TEXT,
        system_component_id INTEGER REFERENCES system_component(id),
        created_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS experiment (
        id SERIAL PRIMARY KEY,
        hypothesis_id INTEGER REFERENCES hypothesis(id),
        title VARCHAR(500) NOT NULL,
        description TEXT,
        experiment_plan TEXT,
        fis_configuration JSONB,
        fis_role_configuration JSONB,
        fis_experiment_id VARCHAR(255),
        experiment_notes TEXT,
        status VARCHAR(50) DEFAULT 'draft',
        scheduled_for TIMESTAMP WITH TIME ZONE,
        executed_at TIMESTAMP WITH TIME ZONE,
        completed_at TIMESTAMP WITH TIME ZONE,
        created_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS learning_insights (
        id SERIAL PRIMARY KEY,
        experiment_id INTEGER REFERENCES experiment(id),
        key_learnings TEXT,
        recommendations TEXT,
        refined_hypotheses TEXT,
        risk_assessment TEXT,
        knowledge_gaps TEXT,
        follow_up_experiments TEXT,
        created_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS source_code_analysis (
        id SERIAL PRIMARY KEY,
        repository_url VARCHAR(500) NOT NULL,
        analysis_timestamp TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP,
        framework_stack JSONB,
        aws_services_detected JSONB,
        infrastructure_patterns JSONB,
        deployment_methods JSONB,
        architectural_summary TEXT,
        failure_points_analysis TEXT,
        recommendations TEXT
    )",
    "CREATE TABLE IF NOT EXISTS aws_resource_analysis (
        id SERIAL PRIMARY KEY,
        resource_type VARCHAR(100),
        resource_id VARCHAR(500) UNIQUE,
        aws_account_id VARCHAR(20),
        region VARCHAR(20),
        analysis_results JSONB,
        deployment_status VARCHAR(50) DEFAULT 'unknown',
        resource_metadata JSONB,
        analysis_timestamp TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP,
        created_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS hypothesis_evaluation (
        id SERIAL PRIMARY KEY,
        hypothesis_id INTEGER NOT NULL REFERENCES hypothesis(id),
        testability_score INTEGER NOT NULL CHECK (testability_score BETWEEN 1 AND 5),
        specificity_score INTEGER NOT NULL CHECK (specificity_score BETWEEN 1 AND 5),
        realism_score INTEGER NOT NULL CHECK (realism_score BETWEEN 1 AND 5),
        safety_score INTEGER NOT NULL CHECK (safety_score BETWEEN 1 AND 5),
        learning_value_score INTEGER NOT NULL CHECK (learning_value_score BETWEEN 1 AND 5),
        overall_score NUMERIC(3,2) NOT NULL,
        evaluation_timestamp TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (hypothesis_id)
    )",
];

/// Index creation statements.
pub const INDEX_STATEMENTS: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_hypothesis_status ON hypothesis(status)",
    "CREATE INDEX IF NOT EXISTS idx_hypothesis_priority ON hypothesis(priority)",
    "CREATE INDEX IF NOT EXISTS idx_hypothesis_system_component ON hypothesis(system_component_id)",
    "CREATE INDEX IF NOT EXISTS idx_experiment_status ON experiment(status)",
    "CREATE INDEX IF NOT EXISTS idx_experiment_hypothesis ON experiment(hypothesis_id)",
    "CREATE INDEX IF NOT EXISTS idx_experiment_scheduled ON experiment(scheduled_for)",
    "CREATE INDEX IF NOT EXISTS idx_hypothesis_evaluation_hypothesis_id ON hypothesis_evaluation(hypothesis_id)",
    "CREATE INDEX IF NOT EXISTS idx_hypothesis_evaluation_overall_score ON hypothesis_evaluation(overall_score DESC)",
];

/// Joined read-only view over experiment, hypothesis, and system component.
pub const VIEW_SQL: &str = "CREATE OR REPLACE VIEW experiment_with_hypothesis AS
    SELECT
        e.id,
        e.title,
        e.description,
        e.experiment_plan,
        e.status,
        e.scheduled_for,
        e.executed_at,
        e.completed_at,
        e.created_at,
        h.title as hypothesis_title,
        h.description as hypothesis_description,
        h.status as hypothesis_status,
        sc.name as component_name,
        sc.type as component_type
    FROM experiment e
    LEFT JOIN hypothesis h ON e.hypothesis_id = h.id
    LEFT JOIN system_component sc ON h.system_component_id = sc.id";

/// Create tables, indexes, and the view, in order.
pub async fn initialize_schema(exec: &dyn SqlExecutor) -> DataApiResult<()> {
    info!("Creating database schema");
    for statement in SCHEMA_STATEMENTS {
        exec.execute(statement, Vec::new()).await?;
    }

    info!("Creating database indexes");
    for statement in INDEX_STATEMENTS {
        exec.execute(statement, Vec::new()).await?;
    }

    info!("Creating database view");
    exec.execute(VIEW_SQL, Vec::new()).await?;

    info!("Database schema initialization complete");
    Ok(())
}
