//! Runtime configuration, read from the environment with defaults.

use crate::error::{Error, Result};
use crate::layout::{LayoutParams, Viewport};
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE: &str = "http://localhost:8080";
pub const DEFAULT_BIND: &str = "127.0.0.1:8001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_VIEWPORT: Viewport = Viewport {
    width: 960.0,
    height: 600.0,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: Url,
    pub bind: String,
    pub timeout: Duration,
    pub viewport: Viewport,
    pub highlight_selection: bool,
    pub layout: LayoutParams,
    /// Seed for initial node placement and simulation jitter.
    pub seed: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL"),
            bind: DEFAULT_BIND.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            viewport: DEFAULT_VIEWPORT,
            highlight_selection: false,
            layout: LayoutParams::default(),
            seed: 0,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unset variables keep their
    /// defaults; malformed ones are rejected.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(base) = lookup("STUDYGRAPH_API_BASE") {
            config.api_base = Url::parse(base.trim())
                .map_err(|e| Error::Validation(format!("Invalid STUDYGRAPH_API_BASE: {}", e)))?;
        }
        if let Some(bind) = lookup("STUDYGRAPH_BIND") {
            config.bind = bind.trim().to_string();
        }
        if let Some(secs) = lookup("STUDYGRAPH_TIMEOUT_SECS") {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                Error::Validation(format!("Invalid STUDYGRAPH_TIMEOUT_SECS: {}", secs))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(vp) = lookup("STUDYGRAPH_VIEWPORT") {
            config.viewport = parse_viewport(&vp)?;
        }
        if let Some(flag) = lookup("STUDYGRAPH_HIGHLIGHT_SELECTION") {
            config.highlight_selection = matches!(
                flag.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(seed) = lookup("STUDYGRAPH_SEED") {
            config.seed = seed
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::Validation(format!("Invalid STUDYGRAPH_SEED: {}", seed)))?;
        }

        Ok(config)
    }
}

/// Parse `WIDTHxHEIGHT`, e.g. `1280x720`.
fn parse_viewport(s: &str) -> Result<Viewport> {
    let invalid = || Error::Validation(format!("Invalid STUDYGRAPH_VIEWPORT: {}", s));
    let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let width = w.trim().parse::<f64>().map_err(|_| invalid())?;
    let height = h.trim().parse::<f64>().map_err(|_| invalid())?;
    if width <= 0.0 || height <= 0.0 {
        return Err(invalid());
    }
    Ok(Viewport { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base.as_str(), "http://localhost:8080/");
        assert_eq!(config.bind, "127.0.0.1:8001");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.viewport, DEFAULT_VIEWPORT);
        assert!(!config.highlight_selection);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("STUDYGRAPH_API_BASE", "http://10.0.0.5:9000"),
            ("STUDYGRAPH_TIMEOUT_SECS", "5"),
            ("STUDYGRAPH_VIEWPORT", "1280x720"),
            ("STUDYGRAPH_HIGHLIGHT_SELECTION", "true"),
            ("STUDYGRAPH_SEED", "42"),
        ]))
        .unwrap();
        assert_eq!(config.api_base.host_str(), Some("10.0.0.5"));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.viewport, Viewport { width: 1280.0, height: 720.0 });
        assert!(config.highlight_selection);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert!(ClientConfig::from_lookup(lookup(&[("STUDYGRAPH_API_BASE", "not a url")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("STUDYGRAPH_TIMEOUT_SECS", "soon")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("STUDYGRAPH_VIEWPORT", "1280")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("STUDYGRAPH_VIEWPORT", "0x10")])).is_err());
    }
}
