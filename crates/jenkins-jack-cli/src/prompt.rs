use dialoguer::{
    Confirm,
    Input,
    Password,
    Select,
};
use jenkins_jack_api::{
    ParameterDefinition,
    ParameterKind,
};
use jenkins_jack_core::application::{
    parameter_title,
    FolderChoice,
    ParameterPrompt,
    PipelinePrompt,
};

/// Terminal prompts for the pipeline runner. Esc or Ctrl-C on a prompt
/// dismisses it.
pub struct TerminalPrompt {
    pub assume_yes: bool,
}

fn select(prompt: &str, items: &[String], current: &str) -> Option<String> {
    let default = items.iter().position(|item| item == current).unwrap_or(0);
    Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(default)
        .interact_opt()
        .ok()
        .flatten()
        .map(|index| items[index].clone())
}

impl ParameterPrompt for TerminalPrompt {
    fn input(&self, definition: &ParameterDefinition, current: &str) -> Option<String> {
        let title = parameter_title(definition);
        match &definition.kind {
            ParameterKind::Boolean => {
                let items = ["true".to_string(), "false".to_string()];
                select(&title, &items, current)
            }
            ParameterKind::Choice { choices } => select(&title, choices, current),
            ParameterKind::Password => Password::new()
                .with_prompt(title)
                .allow_empty_password(true)
                .interact()
                .ok(),
            _ => Input::<String>::new()
                .with_prompt(title)
                .with_initial_text(current)
                .allow_empty(true)
                .interact_text()
                .ok(),
        }
    }

    fn choose(
        &self, definition: &ParameterDefinition, choices: &[String], current: &str,
    ) -> Option<String> {
        select(&parameter_title(definition), choices, current)
    }
}

impl PipelinePrompt for TerminalPrompt {
    fn confirm_create(&self, job: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        Confirm::new()
            .with_prompt(format!("Job \"{job}\" does not exist. Create it?"))
            .default(true)
            .interact()
            .unwrap_or(false)
    }

    fn select_folder(&self, folders: &[String]) -> Option<FolderChoice> {
        if folders.is_empty() {
            return Some(FolderChoice::Root);
        }

        let mut items = vec!["(root)".to_string()];
        items.extend(folders.iter().cloned());

        let index = Select::new()
            .with_prompt("Create the job in")
            .items(&items)
            .default(0)
            .interact_opt()
            .ok()
            .flatten()?;

        Some(match index {
            0 => FolderChoice::Root,
            n => FolderChoice::Folder(items[n].clone()),
        })
    }
}
