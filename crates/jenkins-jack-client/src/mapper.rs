//! Data mapping utilities for Jenkins responses

use std::collections::HashSet;

use chrono::{
    DateTime,
    Utc,
};
use jenkins_jack_api::{
    BuildResult,
    BuildSummary,
    ExecutorBuild,
    JobMetadata,
    NodeInfo,
    ParameterDefinition,
    ParameterKind,
    QueueItem,
};

use crate::{
    config,
    types,
};

const PARAMETERS_PROPERTY: &str = "hudson.model.ParametersDefinitionProperty";

/// Converts a Jenkins job into JobMetadata, keeping only the parameters
/// declared through a `ParametersDefinitionProperty`.
pub(crate) fn job_to_metadata(job: types::Job, server_url: &str) -> JobMetadata {
    let parameters = job
        .property
        .into_iter()
        .find(|prop| prop._class.as_deref() == Some(PARAMETERS_PROPERTY))
        .map(|prop| parameter_definitions(prop.parameter_definitions));

    JobMetadata {
        full_name: job.full_name,
        name: job.name,
        url: config::rebase_url(server_url, &job.url),
        buildable: job.buildable,
        next_build_number: job.next_build_number,
        description: job.description.filter(|d| !d.is_empty()),
        parameters,
    }
}

/// Renders a JSON default the way a form field would carry it.
fn default_to_string(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

pub(crate) fn parameter_definitions(
    param_definitions: Vec<types::ParameterDefinition>,
) -> Vec<ParameterDefinition> {
    let mut parameters = Vec::with_capacity(param_definitions.len());
    let mut seen_param_names = HashSet::with_capacity(param_definitions.len());

    for param_def in param_definitions {
        if !seen_param_names.insert(param_def.name.clone()) {
            continue;
        }

        let class = param_def._class.unwrap_or_default();
        let mut default_value =
            default_to_string(param_def.default_parameter_value.and_then(|dpv| dpv.value));

        let kind = if class.contains("BooleanParameterDefinition") {
            ParameterKind::Boolean
        } else if class.contains("ChoiceParameterDefinition") && !param_def.choices.is_empty() {
            let mut choice_seen = HashSet::with_capacity(param_def.choices.len());
            let mut cleaned_choices = Vec::with_capacity(param_def.choices.len());

            for choice in param_def.choices {
                let clean = match choice.strip_suffix(":selected") {
                    Some(selected) => {
                        default_value.get_or_insert_with(|| selected.to_string());
                        selected.to_string()
                    }
                    None => choice,
                };
                if choice_seen.insert(clean.clone()) {
                    cleaned_choices.push(clean);
                }
            }

            if default_value.is_none() {
                default_value = cleaned_choices.first().cloned();
            }
            ParameterKind::Choice {
                choices: cleaned_choices,
            }
        } else if class.contains("TextParameterDefinition") {
            ParameterKind::Text
        } else if class.contains("PasswordParameterDefinition") {
            ParameterKind::Password
        } else if class.is_empty() || class.contains("StringParameterDefinition") {
            ParameterKind::String
        } else {
            ParameterKind::Other { class_name: class }
        };

        parameters.push(ParameterDefinition {
            name: param_def.name,
            description: param_def.description.filter(|d| !d.is_empty()),
            default_value,
            kind,
        });
    }

    parameters
}

fn timestamp_to_utc(millis: i64) -> Option<DateTime<Utc>> {
    if millis <= 0 {
        return None;
    }
    DateTime::from_timestamp_millis(millis)
}

pub(crate) fn build_to_summary(
    build: types::Build, server_url: &str, encoded_path: &str,
) -> BuildSummary {
    let url = match build.url {
        Some(url) => config::rebase_url(server_url, &url),
        None => format!("{}/job/{}/{}", server_url, encoded_path, build.number),
    };

    BuildSummary {
        number: build.number,
        url,
        result: build.result.as_deref().and_then(BuildResult::parse),
        building: build.building,
        description: build.description.filter(|d| !d.is_empty()),
        started_at: timestamp_to_utc(build.timestamp),
        duration_ms: (build.duration > 0).then_some(build.duration),
    }
}

pub(crate) fn computer_to_node(computer: types::Computer, server_url: &str) -> NodeInfo {
    let running = computer
        .executors
        .into_iter()
        .filter_map(|executor| executor.current_executable)
        .filter_map(|exe| {
            exe.url.map(|url| ExecutorBuild {
                url: config::rebase_url(server_url, &url),
                number: exe.number,
                full_display_name: exe.full_display_name,
            })
        })
        .collect();

    NodeInfo {
        display_name: computer.display_name,
        offline: computer.offline,
        temporarily_offline: computer.temporarily_offline,
        offline_reason: computer.offline_cause_reason.filter(|r| !r.is_empty()),
        num_executors: computer.num_executors,
        idle: computer.idle,
        running,
    }
}

pub(crate) fn queue_entry_to_item(entry: types::QueueEntry, server_url: &str) -> QueueItem {
    let (name, url) = match entry.task {
        Some(task) => (
            task.name.unwrap_or_default(),
            task.url.map(|url| config::rebase_url(server_url, &url)),
        ),
        None => (String::new(), None),
    };

    QueueItem {
        id: entry.id,
        name,
        why: entry.why,
        url,
        stuck: entry.stuck,
        blocked: entry.blocked,
        in_queue_since: entry.in_queue_since.and_then(timestamp_to_utc),
    }
}
