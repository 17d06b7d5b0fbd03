//! # Delta Trace Core
//!
//! Shared logic for the Delta Trace document-to-graph pipeline: domain
//! models, dossier section parsing, rule-based entity extraction, the graph
//! store abstraction, graph assembly and case view building.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. Storage backends
//! implement [`store::GraphStore`]; the in-memory backend lives here for
//! tests and dry runs.
//!
//! ```text
//! text lines ──▶ sections::ReportParser ──┐
//!                                         ├──▶ assemble::GraphAssembler ──▶ GraphStore
//! raw text ───▶ extract::EntityExtractor ─┘                                     │
//!                                                                               ▼
//!                                               view::build_case_view ◀── query(pattern)
//! ```

pub mod assemble;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod sections;
pub mod store;
pub mod view;
