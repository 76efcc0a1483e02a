//! Process runner
//!
//! Launches external scanners as subprocesses, each in its own process group,
//! with a per-call timeout, cooperative cancellation and a byte ceiling on the
//! captured output. The whole process group is torn down on every exit path.

pub mod capture;
pub mod command;
pub mod guard;
pub mod runner;

pub use capture::{Captured, read_capped};
pub use command::CommandSpec;
pub use guard::ProcessGroupGuard;
pub use runner::{ProcessOutput, ProcessRunner, RunnerConfig, RunnerError};
