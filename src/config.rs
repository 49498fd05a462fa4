// config.rs - Bot Configuration Module
// Loads tubeconfig.txt (KEY=VALUE) using the same multi-path fallback as the
// other config files, with environment variables taking precedence.
//
// Used by: main.rs (startup), pipeline.rs (probe and search settings)

use std::collections::HashMap;
use std::env;
use std::fs;
use std::time::Duration;

use log::{debug, info};
use thiserror::Error;

use crate::mirrors::MirrorSource;

// ============================================================================
// DEFAULTS
// ============================================================================

pub const CONFIG_PATHS: [&str; 4] = [
    "tubeconfig.txt",
    "../tubeconfig.txt",
    "../../tubeconfig.txt",
    "src/tubeconfig.txt",
];

/// Compiled-in mirror list used by the static source.
pub const DEFAULT_MIRRORS: [&str; 4] = [
    "https://inv.nadeko.net",
    "https://invidious.nerdvpn.de",
    "https://yewtu.be",
    "https://invidious.f5.si",
];

pub const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/wakame02/wktopu/refs/heads/main/inv.json";
pub const DEFAULT_SCHEME: &str = "https://";
pub const DEFAULT_PROBE_VIDEO_ID: &str = "DeKLpgzh-qQ";
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const MAX_RESULT_COUNT: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime settings for the resolve-and-deliver pipeline.
#[derive(Debug, Clone)]
pub struct TubeConfig {
    pub mirror_source: MirrorSource,
    pub probe_video_id: String,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
    /// Number of search hits listed in a keyword reply (1..=5).
    pub result_count: usize,
    /// Pause between the interim notice and the search. Zero disables both.
    pub pacing_delay: Duration,
}

impl Default for TubeConfig {
    fn default() -> Self {
        Self {
            mirror_source: MirrorSource::Static(
                DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect(),
            ),
            probe_video_id: DEFAULT_PROBE_VIDEO_ID.to_string(),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            result_count: 1,
            pacing_delay: Duration::ZERO,
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Load configuration from the first tubeconfig.txt found, overlaid by the
/// process environment. A missing file is not an error.
pub fn load_tube_config() -> Result<TubeConfig, ConfigError> {
    let mut file_vars = HashMap::new();
    for path in &CONFIG_PATHS {
        match fs::read_to_string(path) {
            Ok(content) => {
                info!("🔧 Loaded config from {}", path);
                file_vars = parse_config(&content);
                break;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_string(),
                    source: e,
                })
            }
        }
    }
    if file_vars.is_empty() {
        debug!("No tubeconfig.txt found, using defaults and environment");
    }
    build_config(&file_vars, env_var_string)
}

/// Parse KEY=VALUE lines. Blank lines and `#` comments are skipped.
pub fn parse_config(content: &str) -> HashMap<String, String> {
    // Remove BOM if present
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut config_map = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            config_map.insert(key.to_string(), value.trim().to_string());
        }
    }

    config_map
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn build_config(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<TubeConfig, ConfigError> {
    let lookup = |key: &str| env_lookup(key).or_else(|| file_vars.get(key).cloned());
    let mut config = TubeConfig::default();

    let scheme = lookup("MIRROR_SCHEME").unwrap_or_else(|| DEFAULT_SCHEME.to_string());
    let source = lookup("MIRROR_SOURCE").unwrap_or_else(|| "static".to_string());
    config.mirror_source = match source.to_ascii_lowercase().as_str() {
        "static" => match lookup("STATIC_MIRRORS") {
            Some(list) => MirrorSource::Static(
                list.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            None => config.mirror_source,
        },
        "remote" => MirrorSource::Remote {
            manifest_url: lookup("MIRROR_MANIFEST_URL")
                .unwrap_or_else(|| DEFAULT_MANIFEST_URL.to_string()),
            scheme,
        },
        _ => {
            return Err(ConfigError::Invalid {
                key: "MIRROR_SOURCE",
                value: source,
                reason: "expected 'static' or 'remote'",
            })
        }
    };

    if let Some(id) = lookup("PROBE_VIDEO_ID") {
        config.probe_video_id = id;
    }
    if let Some(secs) = parse_in_range(&lookup, "PROBE_TIMEOUT_SECS", 1, 60)? {
        config.probe_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = parse_in_range(&lookup, "REQUEST_TIMEOUT_SECS", 1, 300)? {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(count) = parse_in_range(&lookup, "RESULT_COUNT", 1, MAX_RESULT_COUNT as u64)? {
        config.result_count = count as usize;
    }
    if let Some(secs) = parse_in_range(&lookup, "PACING_DELAY_SECS", 0, 60)? {
        config.pacing_delay = Duration::from_secs(secs);
    }

    Ok(config)
}

fn parse_in_range(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    min: u64,
    max: u64,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let value = raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: "must be a whole number",
    })?;
    if value < min || value > max {
        return Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "out of range",
        });
    }
    Ok(Some(value))
}
