// weft - a small, explicit HTTP layer for Rust
//
// This library provides prefix-composed routing, ordered middleware with a
// single error path, per-request contexts, and pluggable rendering.

// Re-export core functionality
pub use weft_core::*;

// Re-export optional crates
#[cfg(feature = "handlebars")]
pub use weft_handlebars;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        App,
        Background,
        BufferedResponse,
        Cancel,
        Context,
        Error,
        ErrorHandler,
        Handler,
        Renderer,
        RouteParams,
        TlsConfig,
    };
}
