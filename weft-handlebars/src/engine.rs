//! Handlebars template engine wrapper

use crate::{Result, config::HandlebarsConfig, error::HandlebarsError};
use handlebars::Handlebars;
use serde::Serialize;
use std::io;
use std::path::Path;
use std::sync::{Arc, RwLock};
use weft_core::Renderer;

/// Handlebars template engine
///
/// Loads every template below the configured directory at construction and
/// plugs into an application with `App::set_template_engine`.
#[derive(Clone)]
pub struct HandlebarsEngine {
    handlebars: Arc<RwLock<Handlebars<'static>>>,
    config: HandlebarsConfig,
}

impl HandlebarsEngine {
    /// Create a new Handlebars engine with configuration
    pub fn new(config: HandlebarsConfig) -> Result<Self> {
        let mut handlebars = Handlebars::new();

        handlebars.set_strict_mode(config.strict_mode);
        if !config.escape_html {
            handlebars.register_escape_fn(handlebars::no_escape);
        }

        let engine = Self {
            handlebars: Arc::new(RwLock::new(handlebars)),
            config,
        };
        engine.load_templates()?;

        Ok(engine)
    }

    /// Load all templates from the configured directory
    fn load_templates(&self) -> Result<()> {
        if !self.config.template_dir.exists() {
            return Err(HandlebarsError::Config(format!(
                "template directory not found: {:?}",
                self.config.template_dir
            )));
        }
        self.load_templates_from_dir(&self.config.template_dir)
    }

    /// Load templates from a directory recursively
    ///
    /// Template names are the path relative to the template directory with
    /// the extension dropped, so `pages/about.hbs` registers as
    /// `pages/about`.
    fn load_templates_from_dir(&self, dir: &Path) -> Result<()> {
        use std::fs;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                self.load_templates_from_dir(&path)?;
            } else if let Some(ext) = path.extension() {
                if ext == self.config.template_extension.trim_start_matches('.') {
                    let template_name = path
                        .strip_prefix(&self.config.template_dir)
                        .unwrap_or(&path)
                        .with_extension("")
                        .to_string_lossy()
                        .replace('\\', "/");

                    let template_content = fs::read_to_string(&path)?;

                    let mut handlebars = self.handlebars.write().unwrap();
                    handlebars.register_template_string(&template_name, template_content)?;
                }
            }
        }

        Ok(())
    }

    /// Render a template to a string
    pub fn render<T: Serialize>(&self, template: &str, data: &T) -> Result<String> {
        if self.config.dev_mode {
            self.reload_templates()?;
        }

        let handlebars = self.handlebars.read().unwrap();
        handlebars
            .render(template, data)
            .map_err(HandlebarsError::from)
    }

    /// Register a template from a string
    pub fn register_template(&self, name: &str, template: &str) -> Result<()> {
        let mut handlebars = self.handlebars.write().unwrap();
        handlebars
            .register_template_string(name, template)
            .map_err(HandlebarsError::from)
    }

    /// Register a custom helper
    pub fn register_helper<F>(&self, name: &str, helper: F)
    where
        F: handlebars::HelperDef + Send + Sync + 'static,
    {
        let mut handlebars = self.handlebars.write().unwrap();
        handlebars.register_helper(name, Box::new(helper));
    }

    /// Check if a template is registered
    pub fn has_template(&self, name: &str) -> bool {
        let handlebars = self.handlebars.read().unwrap();
        handlebars.has_template(name)
    }

    /// Names of all registered templates
    pub fn template_names(&self) -> Vec<String> {
        let handlebars = self.handlebars.read().unwrap();
        handlebars.get_templates().keys().cloned().collect()
    }

    /// Drop every registered template and reload from disk
    pub fn reload_templates(&self) -> Result<()> {
        let mut handlebars = self.handlebars.write().unwrap();
        handlebars.clear_templates();
        drop(handlebars);
        self.load_templates()
    }

    /// Get configuration
    pub fn config(&self) -> &HandlebarsConfig {
        &self.config
    }
}

impl Renderer for HandlebarsEngine {
    /// Stream the rendered template into the response. In dev mode the
    /// template directory is reloaded first.
    fn render(
        &self,
        out: &mut dyn io::Write,
        name: &str,
        data: &serde_json::Value,
    ) -> std::result::Result<(), weft_core::Error> {
        if self.config.dev_mode {
            self.reload_templates()?;
        }
        if !self.has_template(name) {
            return Err(HandlebarsError::TemplateNotFound(name.to_string()).into());
        }

        let handlebars = self.handlebars.read().unwrap();
        handlebars
            .render_to_write(name, data, out)
            .map_err(|e| HandlebarsError::from(e).into())
    }
}
