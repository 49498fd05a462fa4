// mirrors.rs - Mirror Registry
// Holds the ordered list of candidate mirror base URLs. The list comes either
// from configuration (static) or from a remote manifest fetched once at startup.
//
// Used by: main.rs (load at startup), pipeline.rs (read-only list per request)

use log::{error, info};
use serde::Deserialize;

use crate::invidious::ApiError;

/// Where the candidate mirrors come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorSource {
    Static(Vec<String>),
    Remote { manifest_url: String, scheme: String },
}

/// Manifest body: either a flat array or an object wrapping `instances`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Manifest {
    Flat(Vec<ManifestEntry>),
    Wrapped { instances: Vec<ManifestEntry> },
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    uri: String,
}

/// Ordered candidate mirrors. Order is probe preference.
#[derive(Debug)]
pub struct MirrorRegistry {
    source: MirrorSource,
    mirrors: Vec<String>,
    loaded: bool,
}

impl MirrorRegistry {
    pub fn new(source: MirrorSource) -> Self {
        Self {
            source,
            mirrors: Vec::new(),
            loaded: false,
        }
    }

    /// Populate the list once. Later calls are no-ops; use `reload` to refetch.
    pub async fn load(&mut self, client: &reqwest::Client) {
        if self.loaded {
            return;
        }
        self.reload(client).await;
    }

    /// Replace the whole list from the source. A failed remote fetch leaves
    /// the registry empty.
    pub async fn reload(&mut self, client: &reqwest::Client) {
        self.mirrors = match &self.source {
            MirrorSource::Static(list) => list.iter().filter_map(|m| normalize(m, "")).collect(),
            MirrorSource::Remote { manifest_url, scheme } => {
                match fetch_manifest(client, manifest_url, scheme).await {
                    Ok(list) => {
                        info!("📋 Loaded {} mirrors from {}", list.len(), manifest_url);
                        list
                    }
                    Err(e) => {
                        error!("❌ Failed to load mirror manifest from {}: {}", manifest_url, e);
                        Vec::new()
                    }
                }
            }
        };
        self.loaded = true;
    }

    pub fn list(&self) -> &[String] {
        &self.mirrors
    }

    pub fn source(&self) -> &MirrorSource {
        &self.source
    }
}

async fn fetch_manifest(
    client: &reqwest::Client,
    manifest_url: &str,
    scheme: &str,
) -> Result<Vec<String>, ApiError> {
    let response = client.get(manifest_url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            url: manifest_url.to_string(),
            status,
        });
    }
    let body = response.text().await?;
    let entries = match serde_json::from_str::<Manifest>(&body)? {
        Manifest::Flat(entries) => entries,
        Manifest::Wrapped { instances } => instances,
    };
    Ok(entries
        .iter()
        .filter_map(|entry| normalize(&entry.uri, scheme))
        .collect())
}

// Prefix bare hosts with the scheme and drop trailing slashes.
fn normalize(uri: &str, scheme: &str) -> Option<String> {
    let uri = uri.trim().trim_end_matches('/');
    if uri.is_empty() {
        return None;
    }
    if uri.contains("://") {
        Some(uri.to_string())
    } else {
        Some(format!("{}{}", scheme, uri))
    }
}
