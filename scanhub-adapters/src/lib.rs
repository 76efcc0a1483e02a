//! Tool adapters
//!
//! One adapter per external scanner. An adapter validates a request before
//! anything is spawned, builds the argv for its tool, and turns whatever the
//! tool printed or wrote into [`NormalizedFinding`]s. Running the process is
//! delegated to the shared [`ProcessRunner`].
//!
//! [`NormalizedFinding`]: scanhub_core::domain::NormalizedFinding
//! [`ProcessRunner`]: scanhub_runner::ProcessRunner

pub mod adapter;
pub mod catalog;
pub mod params;
pub mod parsing;
pub mod source;
pub mod tools;

pub use adapter::{AdapterContext, Invocation, PreparedSource, ToolAdapter, ToolOutput};
pub use catalog::default_catalog;
pub use params::ParameterRenderer;
