use std::collections::HashSet;
use std::fmt;

use super::schema::JackConfig;

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    fn warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigIssue {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &JackConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        if config.connections.is_empty() {
            result.error("connections", "At least one connection is required");
        }

        let mut names = HashSet::new();
        for (index, connection) in config.connections.iter().enumerate() {
            let field = format!("connections[{index}]");

            if connection.name.trim().is_empty() {
                result.error(format!("{field}.name"), "Name must not be empty");
            } else if !names.insert(connection.name.as_str()) {
                result.error(
                    format!("{field}.name"),
                    format!("Duplicate connection name '{}'", connection.name),
                );
            }

            if !connection.uri.starts_with("http://") && !connection.uri.starts_with("https://") {
                result.error(
                    format!("{field}.uri"),
                    format!("'{}' is not an http(s) URL", connection.uri),
                );
            }

            if connection.username.is_empty() {
                result.warning(
                    format!("{field}.username"),
                    "No username, requests are anonymous",
                );
            }

            if !connection.strict_tls {
                result.warning(
                    format!("{field}.strict_tls"),
                    "Certificate verification is disabled",
                );
            }
        }

        let active = config.connections.iter().filter(|c| c.active).count();
        if active > 1 {
            result.error(
                "connections",
                format!("{active} connections are marked active, at most one may be"),
            );
        }

        if config.pipeline.build_ready_timeout_secs == 0 {
            result.error("pipeline.build_ready_timeout_secs", "Must be at least 1");
        }

        result
    }
}
