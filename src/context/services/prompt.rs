//! Agent prompt templates.

use super::ContextError;
use crate::agent_run::domain::RunType;
use minijinja::Environment;
use serde::Serialize;

const EXCERPT_CHAR_LIMIT: usize = 4000;

const PLANNING_TEMPLATE: &str = r#"Write an implementation plan for the task "{{ task.title }}".
{% if task.description %}
Description:
{{ task.description }}
{% endif %}{% if task.prompt %}
Original request:
{{ task.prompt }}
{% endif %}{% if context %}
Relevant context:
{% for item in context %}
### {{ item.title }} ({{ item.ref_type }} {{ item.ref_id }})
{{ item.body }}
{% endfor %}{% endif %}
Respond with a numbered list of steps. Do not modify any code.
"#;

const IMPLEMENTATION_TEMPLATE: &str = r#"Implement the task "{{ task.title }}"
{%- if repository %} in {{ repository.full_name }} starting from
{{- " " ~ repository.default_branch }}{% endif %}.
{% if task.description %}
Description:
{{ task.description }}
{% endif %}{% if task.prompt %}
Original request:
{{ task.prompt }}
{% endif %}{% if task.plan %}
Agreed plan:
{{ task.plan }}
{% endif %}{% if instructions %}
Follow-up instructions from reviewers:
{{ instructions }}
{% endif %}{% if context %}
Relevant context:
{% for item in context %}
### {{ item.title }} ({{ item.ref_type }} {{ item.ref_id }})
{{ item.body }}
{% endfor %}{% endif %}
Open a pull request with your changes, or explain why no change is needed.
"#;

/// Task fields exposed to prompt templates.
#[derive(Debug, Clone, Serialize)]
pub(super) struct PromptTask<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub prompt: Option<&'a str>,
    pub plan: Option<&'a str>,
}

/// Repository fields exposed to prompt templates.
#[derive(Debug, Clone, Serialize)]
pub(super) struct PromptRepository {
    pub full_name: String,
    pub default_branch: String,
}

/// Context excerpt exposed to prompt templates.
#[derive(Debug, Clone, Serialize)]
pub(super) struct PromptExcerpt {
    pub title: String,
    pub ref_type: &'static str,
    pub ref_id: String,
    pub body: String,
}

impl PromptExcerpt {
    pub(super) fn new(title: String, ref_type: &'static str, ref_id: String, body: &str) -> Self {
        Self {
            title,
            ref_type,
            ref_id,
            body: body.chars().take(EXCERPT_CHAR_LIMIT).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PromptInput<'a> {
    pub task: PromptTask<'a>,
    pub repository: Option<PromptRepository>,
    pub instructions: Option<&'a str>,
    pub context: Vec<PromptExcerpt>,
}

pub(super) fn render_prompt(
    run_type: RunType,
    input: &PromptInput<'_>,
) -> Result<String, ContextError> {
    let template = match run_type {
        RunType::Planning => PLANNING_TEMPLATE,
        RunType::Implementation => IMPLEMENTATION_TEMPLATE,
    };
    Environment::new()
        .render_str(template, input)
        .map_err(|error| ContextError::PromptRender {
            run_type,
            reason: error.to_string(),
        })
}
