//! Configuration for the Handlebars template engine

use std::path::PathBuf;

/// Configuration for the Handlebars template engine
#[derive(Debug, Clone)]
pub struct HandlebarsConfig {
    /// Directory containing template files
    pub template_dir: PathBuf,

    /// Template file extension (default: ".hbs")
    pub template_extension: String,

    /// Reload templates from disk on every render
    pub dev_mode: bool,

    /// Error on missing variables instead of rendering them empty
    pub strict_mode: bool,

    /// HTML-escape interpolated values (default: true)
    pub escape_html: bool,
}

impl HandlebarsConfig {
    /// Create a new configuration with template directory
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            template_extension: ".hbs".to_string(),
            dev_mode: false,
            strict_mode: false,
            escape_html: true,
        }
    }

    /// Set template file extension
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.template_extension = ext.into();
        self
    }

    /// Enable development mode (templates reload on every render)
    pub fn with_dev_mode(mut self, enable: bool) -> Self {
        self.dev_mode = enable;
        self
    }

    /// Enable strict mode (error on missing variables)
    pub fn with_strict_mode(mut self, enable: bool) -> Self {
        self.strict_mode = enable;
        self
    }

    /// Enable or disable HTML escaping
    pub fn with_escape_html(mut self, enable: bool) -> Self {
        self.escape_html = enable;
        self
    }
}

impl Default for HandlebarsConfig {
    fn default() -> Self {
        Self::new("templates")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = HandlebarsConfig::new("views")
            .with_extension(".html")
            .with_dev_mode(true)
            .with_strict_mode(true);

        assert_eq!(config.template_dir, PathBuf::from("views"));
        assert_eq!(config.template_extension, ".html");
        assert!(config.dev_mode);
        assert!(config.strict_mode);
    }

    #[test]
    fn test_default_config() {
        let config = HandlebarsConfig::default();

        assert_eq!(config.template_dir, PathBuf::from("templates"));
        assert_eq!(config.template_extension, ".hbs");
        assert!(!config.dev_mode);
        assert!(!config.strict_mode);
        assert!(config.escape_html);
    }
}
