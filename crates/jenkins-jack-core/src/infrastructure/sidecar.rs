use std::collections::BTreeMap;
use std::path::{
    Path,
    PathBuf,
};

use jenkins_jack_api::{
    JackError,
    JackResult,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Local metadata linking a script to a Jenkins job, stored next to the
/// script as `.{stem}.config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default)]
    pub params: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive_input_override: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(skip)]
    pub path: PathBuf,
}

fn script_stem(script: &Path) -> String {
    script
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl PipelineConfig {
    pub fn path_for(script: &Path) -> PathBuf {
        let file_name = format!(".{}.config.json", script_stem(script));
        match script.parent() {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    pub fn exists(script: &Path) -> bool {
        Self::path_for(script).exists()
    }

    /// Defaults for a script that has never been linked: the job is named
    /// after the file.
    pub fn for_script(script: &Path) -> Self {
        Self {
            name: script_stem(script),
            params: None,
            interactive_input_override: None,
            folder: None,
            path: Self::path_for(script),
        }
    }

    pub fn load(script: &Path) -> JackResult<Self> {
        let path = Self::path_for(script);
        let content = std::fs::read_to_string(&path)?;
        let mut config: PipelineConfig = serde_json::from_str(&content).map_err(|e| {
            JackError::Parse(format!("Invalid pipeline config {}: {e}", path.display()))
        })?;
        config.path = path;
        Ok(config)
    }

    /// Loads the sidecar, writing out defaults on first use.
    pub fn load_or_create(script: &Path) -> JackResult<Self> {
        if Self::exists(script) {
            return Self::load(script);
        }

        let config = Self::for_script(script);
        config.save()?;
        tracing::debug!(path = %config.path.display(), "Created pipeline config");
        Ok(config)
    }

    /// Points `script` at an existing job, overwriting any previous link.
    pub fn link(script: &Path, job_full_name: &str) -> JackResult<Self> {
        let (folder, name) = match job_full_name.trim_matches('/').rsplit_once('/') {
            Some((folder, name)) => (Some(folder.to_string()), name.to_string()),
            None => (None, job_full_name.trim_matches('/').to_string()),
        };

        let config = Self {
            name,
            folder,
            ..Self::for_script(script)
        };
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> JackResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Folder-qualified job name
    pub fn buildable_name(&self) -> String {
        match self.folder.as_deref() {
            None | Some("") => self.name.clone(),
            Some(folder) => format!("{}/{}", folder, self.name),
        }
    }

    /// Saved parameter values as form values; `null` becomes an empty string.
    pub fn saved_params(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .flatten()
            .map(|(name, value)| {
                let value = match value {
                    serde_json::Value::Null => String::new(),
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (name.clone(), value)
            })
            .collect()
    }

    pub fn set_params(&mut self, params: &BTreeMap<String, String>) {
        self.params = Some(
            params
                .iter()
                .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
                .collect(),
        );
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_path_for_script() {
        assert_eq!(
            PipelineConfig::path_for(Path::new("/work/deploy.groovy")),
            PathBuf::from("/work/.deploy.config.json")
        );
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("deploy.groovy");

        let config = PipelineConfig::load_or_create(&script).unwrap();
        assert_eq!(config.name, "deploy");
        assert_eq!(config.buildable_name(), "deploy");

        let written = std::fs::read_to_string(dir.path().join(".deploy.config.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "deploy", "params": null }));
    }

    #[test]
    fn test_reads_existing_sidecar() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("build.groovy");
        std::fs::write(
            dir.path().join(".build.config.json"),
            r#"{
                "name": "build",
                "folder": "team/tools",
                "params": { "ENV": "prod", "DRY_RUN": true, "TAG": null },
                "interactiveInputOverride": { "ENV": ["dev", "prod"] }
            }"#,
        )
        .unwrap();

        let config = PipelineConfig::load_or_create(&script).unwrap();
        assert_eq!(config.buildable_name(), "team/tools/build");

        let params = config.saved_params();
        assert_eq!(params["ENV"], "prod");
        assert_eq!(params["DRY_RUN"], "true");
        assert_eq!(params["TAG"], "");
        assert_eq!(
            config.interactive_input_override.unwrap()["ENV"],
            vec!["dev".to_string(), "prod".to_string()]
        );
    }

    #[test]
    fn test_link_splits_folder() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("pulled.groovy");

        let config = PipelineConfig::link(&script, "org/repo/main").unwrap();
        assert_eq!(config.name, "main");
        assert_eq!(config.folder.as_deref(), Some("org/repo"));

        let reloaded = PipelineConfig::load(&script).unwrap();
        assert_eq!(reloaded.buildable_name(), "org/repo/main");
    }

    #[test]
    fn test_set_params_round_trip() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("job.groovy");
        let mut config = PipelineConfig::load_or_create(&script).unwrap();

        let mut params = BTreeMap::new();
        params.insert("ENV".to_string(), "qa".to_string());
        config.set_params(&params);
        config.save().unwrap();

        assert_eq!(PipelineConfig::load(&script).unwrap().saved_params(), params);
    }
}
