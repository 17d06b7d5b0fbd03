//! Offline commands: run the Section Parser or the Entity Extractor over one
//! file and print the result as JSON. Nothing is written to the graph.

use std::path::Path;

use anyhow::Result;
use tracing::warn;

use delta_trace_core::extract::EntityExtractor;
use delta_trace_core::sections::{identity_is_blank, ReportParser};

use crate::config::Config;
use crate::extract::read_document;

pub fn run_parse(path: &Path) -> Result<()> {
    let doc = read_document(path)?;
    let report = ReportParser::new().parse_text(&doc.text);
    if identity_is_blank(&report.identity) {
        warn!(path = %path.display(), "no identity block found");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn run_extract(config: &Config, path: &Path, target: &str) -> Result<()> {
    let doc = read_document(path)?;
    let extractor = EntityExtractor::with_config(target, config.extraction.clone());
    let extraction = extractor.extract_all(&doc.text);
    println!("{}", serde_json::to_string_pretty(&extraction)?);
    Ok(())
}
