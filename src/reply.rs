// reply.rs - Reply Formatter
// Builds ChatWork-markup replies for every terminal outcome of a request.

use crate::invidious::{SearchHit, VideoMetadata};

pub const NO_MIRROR_MESSAGE: &str = "No YouTube proxy is currently available. Please try again later.";
pub const NOT_FOUND_MESSAGE: &str = "No videos were found for that keyword.";
pub const INVALID_INPUT_MESSAGE: &str =
    "Please send a valid YouTube URL or a keyword wrapped in 「」.";
pub const UPSTREAM_ERROR_MESSAGE: &str = "An error occurred while fetching the video.";
pub const NO_STREAM_MESSAGE: &str = "No stream URL was found for this video.";
pub const SEARCHING_MESSAGE: &str = "Searching, please wait a moment...";

/// Who and where to answer. Mirrors the webhook event fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    pub account_id: String,
    pub room_id: String,
    pub message_id: String,
}

/// Final artifact handed to the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub room_id: String,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Video {
        mirror: String,
        video_id: String,
        metadata: VideoMetadata,
        others: Vec<SearchHit>,
    },
    NoHealthyMirror,
    NotFound,
    InvalidInput,
    UpstreamError,
}

fn reply_header(target: &ReplyTarget) -> String {
    format!(
        "[rp aid={} to={}-{}]",
        target.account_id, target.room_id, target.message_id
    )
}

fn notice(target: &ReplyTarget, message: &str) -> ChatReply {
    ChatReply {
        text: format!(
            "{}[pname:{}]\n{}",
            reply_header(target),
            target.account_id,
            message
        ),
        room_id: target.room_id.clone(),
    }
}

pub fn watch_url(mirror: &str, video_id: &str) -> String {
    format!("{}/watch?v={}", mirror, video_id)
}

/// Interim notice sent before a paced search.
pub fn searching(target: &ReplyTarget) -> ChatReply {
    notice(target, SEARCHING_MESSAGE)
}

pub fn format_reply(target: &ReplyTarget, outcome: &Outcome) -> ChatReply {
    match outcome {
        Outcome::NoHealthyMirror => notice(target, NO_MIRROR_MESSAGE),
        Outcome::NotFound => notice(target, NOT_FOUND_MESSAGE),
        Outcome::InvalidInput => notice(target, INVALID_INPUT_MESSAGE),
        Outcome::UpstreamError => notice(target, UPSTREAM_ERROR_MESSAGE),
        Outcome::Video {
            mirror,
            video_id,
            metadata,
            others,
        } => {
            let mut text = format!("{}\n", reply_header(target));
            text.push_str(&format!("{} - {}\n", metadata.title, metadata.author));
            match metadata.hls_url.as_deref().filter(|url| !url.is_empty()) {
                Some(hls) => text.push_str(&format!("[code]{}[/code]\n", hls)),
                None => text.push_str(&format!("{}\n", NO_STREAM_MESSAGE)),
            }
            text.push_str("Watch on Invidious\n");
            text.push_str(&watch_url(mirror, video_id));

            if !others.is_empty() {
                text.push_str("\n\nOther results:");
                for hit in others {
                    let id = hit.video_id.as_deref().unwrap_or_default();
                    match &hit.author {
                        Some(author) => text.push_str(&format!("\n{} - {}", hit.title, author)),
                        None => text.push_str(&format!("\n{}", hit.title)),
                    }
                    text.push_str(&format!("\n{}", watch_url(mirror, id)));
                }
            }

            ChatReply {
                text,
                room_id: target.room_id.clone(),
            }
        }
    }
}
