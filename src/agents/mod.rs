//! Agent definitions: name, model role, system prompt, and tool surface for
//! each specialized agent in the pipeline.

use crate::config::AppContext;
use crate::prompts;
use crate::runtime::AgentInvocation;

/// Which configured model an agent runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Default,
    /// Fast model for analysis-heavy tasks.
    Small,
    /// Quality model for complex reasoning.
    Large,
}

/// Static definition of one specialized agent.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    pub name: &'static str,
    pub role: ModelRole,
    pub system_prompt: &'static str,
    pub tools: &'static [&'static str],
}

impl AgentDefinition {
    /// Resolve the model for this agent from the context and build an
    /// invocation carrying the given input.
    pub fn to_invocation(&self, ctx: &AppContext, input: impl Into<String>) -> AgentInvocation {
        let model = match self.role {
            ModelRole::Default => ctx.default_model(),
            ModelRole::Small => ctx.small_model(),
            ModelRole::Large => ctx.large_model(),
        };

        AgentInvocation::new(self.name, model, input)
            .with_system_prompt(self.system_prompt)
            .with_tools(self.tools.iter().map(|t| (*t).to_string()).collect())
    }
}

/// All agents in the pipeline, in workflow order.
pub const AGENT_DEFINITIONS: &[AgentDefinition] = &[
    AgentDefinition {
        name: "hypothesis-generator",
        role: ModelRole::Large,
        system_prompt: prompts::HYPOTHESIS_GENERATOR_PROMPT,
        tools: &[
            "get_source_analysis",
            "get_resource_analysis",
            "insert_source_analysis",
            "insert_resource_analysis",
            "get_deployed_resources",
            "get_workload_tags",
            "insert_system_component",
            "batch_insert_system_components",
            "get_system_components",
            "insert_hypothesis",
            "batch_insert_hypotheses",
            "get_hypotheses",
            "update_hypothesis",
        ],
    },
    AgentDefinition {
        name: "hypothesis-prioritization",
        role: ModelRole::Default,
        system_prompt: prompts::HYPOTHESIS_PRIORITIZATION_PROMPT,
        tools: &[
            "get_hypotheses",
            "update_hypothesis",
            "batch_update_hypothesis_priorities",
        ],
    },
    AgentDefinition {
        name: "hypothesis-evaluator",
        role: ModelRole::Small,
        system_prompt: prompts::HYPOTHESIS_EVALUATOR_PROMPT,
        tools: &[
            "get_hypotheses",
            "insert_hypothesis_evaluation",
            "batch_insert_hypothesis_evaluations",
            "get_hypothesis_evaluations",
            "display_evaluation_chart",
            "get_evaluation_statistics",
        ],
    },
    AgentDefinition {
        name: "experiment-design",
        role: ModelRole::Large,
        system_prompt: prompts::EXPERIMENT_DESIGN_PROMPT,
        tools: &[
            "get_hypotheses",
            "get_workload_tags",
            "get_fis_execution_role",
            "insert_experiment",
            "get_experiments",
            "update_experiment",
        ],
    },
    AgentDefinition {
        name: "experiments",
        role: ModelRole::Default,
        system_prompt: prompts::EXPERIMENTS_PROMPT,
        tools: &[
            "get_experiments",
            "get_experiments_with_context",
            "update_experiment",
            "get_workload_tags",
        ],
    },
    AgentDefinition {
        name: "learning-and-iteration",
        role: ModelRole::Default,
        system_prompt: prompts::LEARNING_AND_ITERATION_PROMPT,
        tools: &[
            "get_experiment_results",
            "save_learning_insights",
            "get_learning_history",
            "update_hypothesis_status",
            "get_hypothesis_evaluations",
        ],
    },
];

/// Find an agent definition by name.
pub fn find_agent(name: &str) -> Option<&'static AgentDefinition> {
    AGENT_DEFINITIONS.iter().find(|a| a.name == name)
}
