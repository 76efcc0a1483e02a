//! scanhub core
//!
//! Domain types shared by every scanhub crate: the normalized finding model,
//! scan targets, scanner descriptors, adapter results and the error taxonomy,
//! plus configuration loading and tracing setup.

pub mod config;
pub mod domain;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;
