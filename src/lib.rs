//! # Delta Trace
//!
//! Investigative case backend: turns intake forms, evidence files and
//! identity dossiers into one deduplicated, provenance-tagged case graph.
//!
//! The pure pipeline (Section Parser, Entity Extractor, Graph Assembler,
//! Graph View Builder) lives in `delta_trace_core`. This crate adds the
//! SQLite graph store, the reconnecting connection handle, file text
//! extraction and the `dt` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌───────────┐   ┌──────────┐
//! │ PDF / TXT  │──▶│ Section      │──▶│ Graph     │──▶│  SQLite   │
//! │ files      │   │ Parser /     │   │ Assembler │   │  graph    │
//! └────────────┘   │ Extractor    │   └───────────┘   └────┬─────┘
//!                  └──────────────┘         ▲              │
//!                                           │              ▼
//!                                  ┌────────┴──┐     ┌───────────┐
//!                                  │  Intake   │     │ Graph View│
//!                                  └───────────┘     └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dt init                                   # create graph schema
//! dt intake payload.json                    # register a case
//! dt dossier DT-2025-001 dossie.pdf         # parse + assemble a dossier
//! dt ingest DT-2025-001 ./evidence --target "JOÃO DA SILVA"
//! dt graph DT-2025-001                      # view JSON
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Graph schema |
//! | [`sqlite_store`] | SQLite `GraphStore` |
//! | [`connection`] | Lazy, reconnecting store handle |
//! | [`extract`] | PDF / plain-text extraction |
//! | [`intake`] | Case registration |
//! | [`ingest`] | Evidence and dossier ingestion |
//! | [`report`] | Offline parse / extract commands |
//! | [`graph_cmd`] | Case view, node details, case deletion |

pub mod config;
pub mod connection;
pub mod db;
pub mod extract;
pub mod graph_cmd;
pub mod ingest;
pub mod intake;
pub mod migrate;
pub mod report;
pub mod sqlite_store;
