//! Handlebars templating for the weft framework
//!
//! This crate wires the `handlebars` engine into weft's rendering seam:
//! construct a [`HandlebarsEngine`], hand it to `App::set_template_engine`,
//! and handlers render with `ctx.render(name, &data)`.
//!
//! - Templates load recursively from a directory; `pages/about.hbs`
//!   registers as `pages/about`
//! - Development mode reloads templates from disk on every render
//! - Strict mode turns missing variables into errors
//! - Output streams straight into the response buffer
//!
//! ## Example
//!
//! ```no_run
//! use weft_core::{App, Context};
//! use weft_handlebars::{HandlebarsConfig, HandlebarsEngine};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = HandlebarsEngine::new(
//!         HandlebarsConfig::new("templates").with_strict_mode(true),
//!     )?;
//!
//!     let app = App::new();
//!     app.set_template_engine(engine);
//!     app.get("/", |ctx: Context| async move {
//!         ctx.render("index", &serde_json::json!({ "title": "weft" }))
//!     });
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;

pub use config::HandlebarsConfig;
pub use engine::HandlebarsEngine;
pub use error::{HandlebarsError, Result};
