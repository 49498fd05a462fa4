// pipeline.rs - Resolve-and-Deliver Pipeline
// One inbound command runs start to finish here:
//   classify -> select mirror -> resolve -> fetch metadata -> format -> deliver
// Every failure ends in a reply; nothing is propagated to the caller.
//
// Used by: main.rs (operator console), any webhook layer built on top

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::config::TubeConfig;
use crate::invidious::MirrorApi;
use crate::mirrors::MirrorRegistry;
use crate::prober::{find_working, ProbeSettings};
use crate::reply::{format_reply, searching, ChatReply, Outcome, ReplyTarget};
use crate::resolver::{classify, resolve, Command, ResolveError};

/// Inputs handed over by the webhook layer.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub text: String,
    pub target: ReplyTarget,
}

#[derive(Debug, Error)]
#[error("reply delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Delivery collaborator. Implementations perform the chat API call.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn deliver(&self, reply: &ChatReply) -> Result<(), DeliveryError>;
}

pub struct Pipeline {
    api: Arc<dyn MirrorApi>,
    registry: Arc<MirrorRegistry>,
    probe: ProbeSettings,
    result_count: usize,
    pacing_delay: Duration,
}

impl Pipeline {
    pub fn new(api: Arc<dyn MirrorApi>, registry: Arc<MirrorRegistry>, config: &TubeConfig) -> Self {
        Self {
            api,
            registry,
            probe: ProbeSettings {
                video_id: config.probe_video_id.clone(),
                timeout: config.probe_timeout,
            },
            result_count: config.result_count,
            pacing_delay: config.pacing_delay,
        }
    }

    /// Process one command to a terminal reply and hand it to `sink`.
    /// The reply is returned even when delivery fails.
    pub async fn handle(&self, command: &InboundCommand, sink: &dyn ReplySink) -> ChatReply {
        let request_id = Uuid::new_v4();
        info!(
            "📺 [{}] Command from {} in room {}: '{}'",
            request_id, command.target.account_id, command.target.room_id, command.text
        );

        let outcome = match self.run(request_id, command, sink).await {
            Ok(outcome) => outcome,
            Err(ResolveError::InvalidInput) => {
                info!("[{}] Not a keyword or YouTube URL", request_id);
                Outcome::InvalidInput
            }
            Err(ResolveError::NoHealthyMirror) => {
                warn!(
                    "[{}] None of {} mirrors answered the probe",
                    request_id,
                    self.registry.list().len()
                );
                Outcome::NoHealthyMirror
            }
            Err(ResolveError::NotFound) => Outcome::NotFound,
            Err(ResolveError::Upstream(e)) => {
                error!("❌ [{}] Upstream API error: {}", request_id, e);
                Outcome::UpstreamError
            }
        };

        let reply = format_reply(&command.target, &outcome);
        deliver(request_id, sink, &reply).await;
        reply
    }

    async fn run(
        &self,
        request_id: Uuid,
        command: &InboundCommand,
        sink: &dyn ReplySink,
    ) -> Result<Outcome, ResolveError> {
        let parsed = classify(&command.text);
        if parsed == Command::Invalid {
            return Err(ResolveError::InvalidInput);
        }

        let mirror = find_working(self.api.as_ref(), self.registry.list(), &self.probe)
            .await
            .ok_or(ResolveError::NoHealthyMirror)?;

        if matches!(parsed, Command::Keyword(_)) && !self.pacing_delay.is_zero() {
            deliver(request_id, sink, &searching(&command.target)).await;
            tokio::time::sleep(self.pacing_delay).await;
        }

        let resolution = resolve(self.api.as_ref(), &mirror, &parsed, self.result_count).await?;
        let metadata = self.api.video(&mirror, &resolution.video_id).await?;
        info!(
            "✅ [{}] {} resolved to '{}' via {}",
            request_id, resolution.video_id, metadata.title, mirror
        );

        Ok(Outcome::Video {
            mirror,
            video_id: resolution.video_id,
            metadata,
            others: resolution.others,
        })
    }
}

async fn deliver(request_id: Uuid, sink: &dyn ReplySink, reply: &ChatReply) {
    if let Err(e) = sink.deliver(reply).await {
        error!("❌ [{}] {}", request_id, e);
    }
}
