//! Error types for the Handlebars integration

use thiserror::Error;

/// Result type for Handlebars operations
pub type Result<T> = std::result::Result<T, HandlebarsError>;

/// Errors that can occur when loading or rendering Handlebars templates
#[derive(Error, Debug)]
pub enum HandlebarsError {
    /// Template not registered with the engine
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Template rendering error
    #[error("template rendering error: {0}")]
    Render(String),

    /// Template parsing error
    #[error("template parsing error: {0}")]
    Parse(String),

    /// IO error when loading templates
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<handlebars::RenderError> for HandlebarsError {
    fn from(err: handlebars::RenderError) -> Self {
        HandlebarsError::Render(err.to_string())
    }
}

impl From<handlebars::TemplateError> for HandlebarsError {
    fn from(err: handlebars::TemplateError) -> Self {
        HandlebarsError::Parse(err.to_string())
    }
}

// Engine failures surface to handlers as framework render errors.
impl From<HandlebarsError> for weft_core::Error {
    fn from(err: HandlebarsError) -> Self {
        weft_core::Error::Render(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_framework_error() {
        let err = HandlebarsError::TemplateNotFound("index".to_string());
        let framework: weft_core::Error = err.into();
        assert_eq!(
            framework.to_string(),
            "render error: template not found: index"
        );
    }
}
