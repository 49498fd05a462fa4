// prober.rs - Mirror Health Prober
// Walks the registry order and returns the first mirror that answers the probe.
// Probes are sequential; a failed mirror is skipped, never retried.

use std::time::Duration;

use log::{info, warn};

use crate::invidious::MirrorApi;

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub video_id: String,
    pub timeout: Duration,
}

pub async fn find_working(
    api: &dyn MirrorApi,
    mirrors: &[String],
    settings: &ProbeSettings,
) -> Option<String> {
    for mirror in mirrors {
        if api.probe(mirror, &settings.video_id, settings.timeout).await {
            info!("✅ Using mirror {}", mirror);
            return Some(mirror.clone());
        }
        warn!("⚠️ Mirror {} is not responding", mirror);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invidious::{ApiError, SearchHit, VideoMetadata};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Answers probes from a fixed healthy set and records the probe order.
    struct ScriptedMirrors {
        healthy: HashSet<String>,
        probed: Mutex<Vec<String>>,
    }

    impl ScriptedMirrors {
        fn new(healthy: &[&str]) -> Self {
            Self {
                healthy: healthy.iter().map(|m| m.to_string()).collect(),
                probed: Mutex::new(Vec::new()),
            }
        }

        fn probed(&self) -> Vec<String> {
            self.probed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MirrorApi for ScriptedMirrors {
        async fn probe(&self, mirror: &str, _video_id: &str, _timeout: Duration) -> bool {
            self.probed.lock().unwrap().push(mirror.to_string());
            self.healthy.contains(mirror)
        }

        async fn search(&self, _mirror: &str, _query: &str) -> Result<Vec<SearchHit>, ApiError> {
            unreachable!("prober never searches")
        }

        async fn video(&self, _mirror: &str, _video_id: &str) -> Result<VideoMetadata, ApiError> {
            unreachable!("prober never fetches metadata")
        }
    }

    fn settings() -> ProbeSettings {
        ProbeSettings {
            video_id: "probe".to_string(),
            timeout: Duration::from_secs(1),
        }
    }

    fn mirrors(names: &[&str]) -> Vec<String> {
        names.iter().map(|m| m.to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_healthy_mirror_wins() {
        let api = ScriptedMirrors::new(&["b", "c"]);
        let found = find_working(&api, &mirrors(&["a", "b", "c"]), &settings()).await;
        assert_eq!(found.as_deref(), Some("b"));
        assert_eq!(api.probed(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_head_of_list_short_circuits() {
        let api = ScriptedMirrors::new(&["a", "b", "c"]);
        let found = find_working(&api, &mirrors(&["a", "b", "c"]), &settings()).await;
        assert_eq!(found.as_deref(), Some("a"));
        assert_eq!(api.probed(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_all_failing_returns_none_after_probing_each_once() {
        let api = ScriptedMirrors::new(&[]);
        let found = find_working(&api, &mirrors(&["a", "b", "c"]), &settings()).await;
        assert!(found.is_none());
        assert_eq!(api.probed(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_empty_registry_returns_none() {
        let api = ScriptedMirrors::new(&["a"]);
        assert!(find_working(&api, &[], &settings()).await.is_none());
        assert!(api.probed().is_empty());
    }
}
