//! scanhub orchestrator
//!
//! Owns the scan job lifecycle: submission, queueing, bounded-parallel
//! adapter execution, aggregation into a report, cancellation and the HTTP
//! API that exposes all of it.
//!
//! # Architecture
//!
//! ```text
//! scanhub-orchestrator/
//! ├── domain/           # ScanJob, JobStatus state machine, ScanReport
//! ├── application/      # Workflow, coordinator, use cases
//! ├── infrastructure/   # Job store, scanner registry, queue, cancellation, artifacts
//! └── presentation/     # axum routes, controllers, DTOs with OpenAPI schemas
//! ```
//!
//! # API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/scans` | POST | Submit a scan job |
//! | `/scans/{id}` | GET | Job status, progress and report |
//! | `/scans/{id}` | DELETE | Cancel a job |
//! | `/scanners` | GET | Registered scanners |
//! | `/health` | GET | Health check |

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
