// Configuration for execution graph reconstruction

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::event::Timestamp;

/// How a timestamp is tested against a task's or region's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Containment {
    /// `lower < t < upper`
    #[default]
    Strict,
    /// `lower <= t <= upper`
    Inclusive,
}

impl Containment {
    /// Whether `t` falls inside `(lower, upper)`; a missing upper bound is open
    pub fn contains(self, lower: Timestamp, t: Timestamp, upper: Option<Timestamp>) -> bool {
        match self {
            Containment::Strict => lower < t && upper.map_or(true, |u| t < u),
            Containment::Inclusive => lower <= t && upper.map_or(true, |u| t <= u),
        }
    }
}

/// Configuration for graph reconstruction
///
/// # Example
/// ```
/// use execgraph::config::{Containment, GraphConfig};
///
/// let config = GraphConfig::default();
/// assert_eq!(config.containment, Containment::Strict);
/// assert!(config.collapse_degenerate_pairs);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// Interval test used when attaching taskwait and taskgroup edges
    ///
    /// - `strict` (default): a task created exactly at the taskwait, or ending
    ///   exactly at it, is not considered pending
    /// - `inclusive`: boundary timestamps count as inside
    pub containment: Containment,

    /// Collapse an enter whose only successor is its own leave into one vertex
    ///
    /// Parallel regions always keep both endpoints.
    ///
    /// Default: true
    pub collapse_degenerate_pairs: bool,

    /// Fail with a structural mismatch if synchronisation produced a cycle
    ///
    /// Default: true
    pub check_dag: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            containment: Containment::Strict,
            collapse_degenerate_pairs: true,
            check_dag: true,
        }
    }
}

impl GraphConfig {
    /// Strict interval containment (same as the default)
    pub fn strict() -> Self {
        Self::default()
    }

    /// Inclusive interval containment; otherwise default
    pub fn inclusive() -> Self {
        Self {
            containment: Containment::Inclusive,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    ///
    /// Missing keys take their default value.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML graph configuration")
    }
}
