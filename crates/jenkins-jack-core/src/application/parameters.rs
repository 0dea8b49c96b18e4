use std::collections::BTreeMap;

use jenkins_jack_api::ParameterDefinition;

use crate::infrastructure::PipelineConfig;

/// Interactive source of build parameter values.
///
/// Returning `None` means the user dismissed the prompt; values collected up
/// to that point are kept.
pub trait ParameterPrompt: Send + Sync {
    /// Asks for a value of `definition`, prefilled with `current`.
    fn input(&self, definition: &ParameterDefinition, current: &str) -> Option<String>;

    /// Asks the user to pick one of `choices` for `definition`.
    fn choose(
        &self, definition: &ParameterDefinition, choices: &[String], current: &str,
    ) -> Option<String>;
}

/// Form title for a parameter: `NAME - description`
pub fn parameter_title(definition: &ParameterDefinition) -> String {
    match definition.description.as_deref() {
        Some(description) if !description.is_empty() => {
            format!("{} - {}", definition.name, description)
        }
        _ => definition.name.clone(),
    }
}

/// Collects build parameter values: job defaults, overridden by the values
/// saved in the sidecar, then optionally confirmed one by one through
/// `prompt`.
pub fn resolve_parameters<P>(
    definitions: &[ParameterDefinition], config: &PipelineConfig, prompt: Option<&P>,
) -> BTreeMap<String, String>
where
    P: ParameterPrompt + ?Sized,
{
    let mut values: BTreeMap<String, String> = definitions
        .iter()
        .map(|definition| {
            (
                definition.name.clone(),
                definition.default_value.clone().unwrap_or_default(),
            )
        })
        .collect();

    values.extend(config.saved_params());

    let Some(prompt) = prompt else {
        return values;
    };

    for definition in definitions {
        let current = values.get(&definition.name).cloned().unwrap_or_default();
        let overrides = config
            .interactive_input_override
            .as_ref()
            .and_then(|overrides| overrides.get(&definition.name));

        let value = match overrides {
            Some(choices) => prompt.choose(definition, choices, &current),
            None => prompt.input(definition, &current),
        };

        match value {
            Some(value) => {
                values.insert(definition.name.clone(), value);
            }
            None => {
                tracing::debug!(parameter = %definition.name, "Parameter input dismissed");
                break;
            }
        }
    }

    values
}
