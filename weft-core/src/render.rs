// Pluggable template rendering

use crate::error::Error;
use std::io;

/// A template engine usable from [`crate::Context::render`].
///
/// Implementations stream output directly into the response buffer, so
/// bytes produced before a failure stay in the response.
pub trait Renderer: Send + Sync {
    /// Render the template `name` with `data` into `out`.
    fn render(
        &self,
        out: &mut dyn io::Write,
        name: &str,
        data: &serde_json::Value,
    ) -> Result<(), Error>;
}
