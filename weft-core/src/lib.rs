// Core library for the weft HTTP framework
// This module contains routing, dispatch, request contexts, and the server loops

pub mod access_log;
pub mod app;
pub mod background;
pub mod context;
pub mod error;
pub mod handler;
pub mod logging;
pub mod render;
pub mod response;
pub mod router;
pub mod server;
pub mod static_files;
pub mod tls;

// Re-export commonly used types
pub use access_log::*;
pub use app::*;
pub use background::*;
pub use context::*;
pub use error::*;
pub use handler::*;
pub use render::*;
pub use response::*;
pub use router::*;
pub use server::*;
pub use static_files::*;
pub use tls::*;
// logging is addressed through its module: weft::logging::init()
