use crate::condition::ExpressionCondition;
use crate::errors::ParseError;
use crate::template::{ParseOptions, DEFAULT_PREFIX, DEFAULT_SUFFIX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid condition config: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Serializable description of a condition, e.g.
/// `{"expression": "#{age > 18}", "template": {}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConditionConfig {
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            suffix: default_suffix(),
        }
    }
}

impl ConditionConfig {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            template: None,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn parse_options(&self) -> ParseOptions {
        match &self.template {
            None => ParseOptions::Standard,
            Some(t) => ParseOptions::Template {
                prefix: t.prefix.clone(),
                suffix: t.suffix.clone(),
            },
        }
    }

    pub fn build(&self) -> Result<ExpressionCondition, ParseError> {
        ExpressionCondition::with_options(self.expression.clone(), self.parse_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::facts::Facts;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn template_section_defaults_delimiters() {
        let config = ConditionConfig::from_json_str(r##"{"expression": "#{age > 18}", "template": {}}"##).unwrap();
        assert_eq!(config.template, Some(TemplateConfig::default()));
        assert_eq!(config.parse_options(), ParseOptions::template());
        let facts: Facts = [("age", json!(30))].into_iter().collect();
        assert!(config.build().unwrap().evaluate(&facts));
    }

    #[test]
    fn plain_expression() {
        let config = ConditionConfig::from_json_str(r#"{"expression": "rain == true"}"#).unwrap();
        assert_eq!(config, ConditionConfig::new("rain == true"));
        assert_eq!(config.parse_options(), ParseOptions::Standard);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_expressions() {
        assert!(matches!(
            ConditionConfig::from_json_str(r#"{"expression": "a", "priority": 1}"#),
            Err(ConfigError::Json(_))
        ));
        assert!(ConditionConfig::new("(a").build().is_err());
    }

    #[test]
    fn missing_file() {
        let err = ConditionConfig::from_path("/nonexistent/condition.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
