//! Domain model

pub mod error;
pub mod finding;
pub mod result;
pub mod scanner;
pub mod severity;
pub mod target;

pub use error::ScanError;
pub use finding::{
    FindingCategory, FindingLocation, NormalizedFinding, NormalizedFindingBuilder, sort_by_severity,
};
pub use result::{AdapterErrorKind, AdapterResult, AdapterStatus};
pub use scanner::{OutputFormat, ScannerDescriptor, ScannerSelection, ToolParameter};
pub use severity::{Severity, SeverityBreakdown};
pub use target::{ScanTarget, TargetError, TargetKind, TargetPolicy};
