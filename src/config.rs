use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use delta_trace_core::assemble::DEFAULT_MIN_CONFIDENCE;
use delta_trace_core::extract::ExtractionConfig;
use delta_trace_core::view::{Layout, ViewOptions};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: u32,
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,
}

fn default_max_reconnects() -> u32 {
    3
}
fn default_reconnect_backoff_ms() -> u64 {
    200
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_reconnects: default_max_reconnects(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphConfig {
    /// Entities must score strictly above this to be written.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u8,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default = "default_center_x")]
    pub center_x: f64,
    #[serde(default = "default_center_y")]
    pub center_y: f64,
}

fn default_min_confidence() -> u8 {
    DEFAULT_MIN_CONFIDENCE
}
fn default_radius() -> f64 {
    280.0
}
fn default_center_x() -> f64 {
    400.0
}
fn default_center_y() -> f64 {
    300.0
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            layout: Layout::default(),
            radius: default_radius(),
            center_x: default_center_x(),
            center_y: default_center_y(),
        }
    }
}

impl Config {
    /// Defaults for commands that never touch the graph database.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/dt.sqlite"),
            },
            store: StoreConfig::default(),
            extraction: ExtractionConfig::default(),
            graph: GraphConfig::default(),
        }
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            layout: self.graph.layout,
            radius: self.graph.radius,
            center: (self.graph.center_x, self.graph.center_y),
            ..ViewOptions::default()
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.extraction.window_after == 0 {
        anyhow::bail!("extraction.window_after must be > 0");
    }

    if config.graph.min_confidence > 100 {
        anyhow::bail!("graph.min_confidence must be in [0, 100]");
    }

    if config.graph.radius <= 0.0 || config.graph.radius.is_nan() {
        anyhow::bail!("graph.radius must be > 0");
    }

    if config.store.max_reconnects < 1 {
        anyhow::bail!("store.max_reconnects must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn sections_default_when_omitted() {
        let file = write_config("[db]\npath = \"./data/graph.sqlite\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.store.max_reconnects, 3);
        assert_eq!(config.extraction.window_before, 150);
        assert_eq!(config.graph.min_confidence, 30);
        assert_eq!(config.view_options(), ViewOptions::default());
    }

    #[test]
    fn layout_and_windows_are_read() {
        let file = write_config(
            "[db]\npath = \"g.sqlite\"\n\n[extraction]\nwindow_after = 50\n\n[graph]\nlayout = \"client\"\nradius = 100.0\n",
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.extraction.window_after, 50);
        assert_eq!(config.view_options().layout, Layout::Client);
        assert_eq!(config.view_options().radius, 100.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for body in [
            "[db]\npath = \"g\"\n[extraction]\nwindow_after = 0\n",
            "[db]\npath = \"g\"\n[graph]\nmin_confidence = 101\n",
            "[db]\npath = \"g\"\n[graph]\nradius = 0.0\n",
            "[db]\npath = \"g\"\n[store]\nmax_reconnects = 0\n",
        ] {
            let file = write_config(body);
            assert!(load_config(file.path()).is_err(), "accepted: {body}");
        }
    }
}
