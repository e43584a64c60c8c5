//! Model configuration units.
//!
//! Each unit describes one upstream backend. The unit's model id is not part of the
//! document; the loader derives it from the file name.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// One upstream backend
///
/// Keys outside the known sections are ignored, so units may carry notes such as
/// a `description`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ModelConfig {
    /// Upstream endpoint
    #[validate(nested)]
    pub api: ApiSection,

    /// Backend model selection
    #[validate(nested)]
    pub model: ModelSection,

    /// Default system prompt for this route
    #[serde(default)]
    pub system_prompt: String,

    /// Default sampling parameters
    #[serde(default)]
    #[validate(nested)]
    pub parameters: ParameterSection,
}

/// Upstream endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ApiSection {
    /// Absolute chat-completions URL
    #[validate(custom(function = "validate_http_url"))]
    pub url: String,
}

/// Backend model selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ModelSection {
    /// Model path forwarded as the upstream `model` field
    #[validate(length(min = 1, message = "model.path must not be empty"))]
    pub path: String,
}

/// Default sampling parameters, each optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ParameterSection {
    /// Sampling temperature
    #[serde(default)]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: Option<f32>,

    /// Nucleus sampling
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub top_p: Option<f32>,

    /// Top-k sampling
    #[serde(default)]
    pub top_k: Option<u32>,
}

impl ModelConfig {
    /// Parse a unit from YAML without validating it
    pub fn from_yaml(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }
}

fn validate_http_url(value: &str) -> Result<(), ValidationError> {
    let parsed = url::Url::parse(value).map_err(|_| {
        let mut err = ValidationError::new("url");
        err.message = Some("api.url must be an absolute URL".into());
        err
    })?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        let mut err = ValidationError::new("url_scheme");
        err.message = Some("api.url must use http or https".into());
        return Err(err);
    }

    Ok(())
}
