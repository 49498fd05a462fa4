// console.rs - Operator Console
// Feeds stdin lines into the pipeline, one concurrent task per line. On EOF or
// Ctrl+C the loop stops reading and waits for every started request to reply.
//
// Used by: main.rs

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::signal;
use tokio::task::JoinSet;

use crate::pipeline::{DeliveryError, InboundCommand, Pipeline, ReplySink};
use crate::reply::{ChatReply, ReplyTarget};

const CONSOLE_ROOM_ID: &str = "console";
const CONSOLE_ACCOUNT_ID: &str = "operator";

/// Prints replies to stdout. Stands in for the chat delivery client when the
/// bot is driven from the operator console.
pub struct ConsoleSink;

#[async_trait]
impl ReplySink for ConsoleSink {
    async fn deliver(&self, reply: &ChatReply) -> Result<(), DeliveryError> {
        println!("--- reply to room {} ---\n{}\n", reply.room_id, reply.text);
        Ok(())
    }
}

/// Run commands read from `input` until EOF or Ctrl+C. Returns how many
/// commands were started; all of them have replied when this returns.
pub async fn run_console<R>(input: R, pipeline: Arc<Pipeline>, sink: Arc<dyn ReplySink>) -> u64
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut tasks = JoinSet::new();
    let mut next_message_id: u64 = 0;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("⏹️ Stopping gracefully...");
                break;
            }
            Some(finished) = tasks.join_next() => {
                if let Err(e) = finished {
                    error!("❌ Console request task failed: {}", e);
                }
            }
            line = lines.next_line() => {
                let text = match line {
                    Ok(Some(text)) => text,
                    Ok(None) => break,
                    Err(e) => {
                        error!("❌ Failed to read stdin: {}", e);
                        break;
                    }
                };
                if text.trim().is_empty() {
                    continue;
                }

                next_message_id += 1;
                let command = InboundCommand {
                    text,
                    target: ReplyTarget {
                        account_id: CONSOLE_ACCOUNT_ID.to_string(),
                        room_id: CONSOLE_ROOM_ID.to_string(),
                        message_id: next_message_id.to_string(),
                    },
                };
                let pipeline = Arc::clone(&pipeline);
                let sink = Arc::clone(&sink);
                tasks.spawn(async move {
                    pipeline.handle(&command, sink.as_ref()).await;
                });
            }
        }
    }

    if !tasks.is_empty() {
        info!("⏳ Waiting for {} requests in flight", tasks.len());
    }
    while let Some(finished) = tasks.join_next().await {
        if let Err(e) = finished {
            error!("❌ Console request task failed: {}", e);
        }
    }

    next_message_id
}
