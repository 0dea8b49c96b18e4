use std::sync::LazyLock;

use regex::{
    Captures,
    Regex,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterpolationError {
    #[error("Required environment variable not found: {0}")]
    RequiredVarNotFound(String),

    #[error("Recursive interpolation limit exceeded")]
    RecursionLimit,
}

pub type InterpolationResult<T> = Result<T, InterpolationError>;

const MAX_DEPTH: usize = 10;

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("Invalid regex pattern")
});

/// Expands `${VAR}` and `${VAR:-default}` from the process environment.
/// Defaults are expanded in turn.
pub fn interpolate(input: &str) -> InterpolationResult<String> {
    expand(input, 0)
}

fn expand(input: &str, depth: usize) -> InterpolationResult<String> {
    if depth > MAX_DEPTH {
        return Err(InterpolationError::RecursionLimit);
    }

    let mut failure = None;
    let expanded = VAR_PATTERN.replace_all(input, |caps: &Captures<'_>| {
        if failure.is_some() {
            return String::new();
        }
        let name = &caps[1];
        match (std::env::var(name), caps.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(default)) => match expand(default.as_str(), depth + 1) {
                Ok(value) => value,
                Err(e) => {
                    failure = Some(e);
                    String::new()
                }
            },
            (Err(_), None) => {
                failure = Some(InterpolationError::RequiredVarNotFound(name.to_string()));
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(expanded.into_owned()),
    }
}

/// Interpolates every string in a parsed TOML document, in place.
pub fn interpolate_toml(value: &mut toml::Value) -> InterpolationResult<()> {
    match value {
        toml::Value::String(s) => *s = interpolate(s)?,
        toml::Value::Array(items) => {
            for item in items {
                interpolate_toml(item)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                interpolate_toml(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn has_variables(input: &str) -> bool {
    VAR_PATTERN.is_match(input)
}
