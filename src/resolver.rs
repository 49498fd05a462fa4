// resolver.rs - Video Resolver
// Turns command text into a video id. A quoted 「keyword」 is searched on the
// selected mirror; a YouTube link is parsed locally.
//
// Used by: pipeline.rs

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::invidious::{ApiError, MirrorApi, SearchHit};

static KEYWORD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)「(.*?)」").expect("Invalid keyword regex pattern"));

static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex pattern"));

static YOUTUBE_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:https?://)?(?:www\.)?youtu(?:\.be/|be\.com/(?:watch\?v=|embed/|v/|shorts/))([A-Za-z0-9_-]+)",
    )
    .expect("Invalid YouTube URL regex pattern")
});

/// Terminal failures of one request. Each maps to exactly one reply.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no healthy mirror available")]
    NoHealthyMirror,
    #[error("command is neither a quoted keyword nor a YouTube URL")]
    InvalidInput,
    #[error("search returned no videos")]
    NotFound,
    #[error("upstream API error: {0}")]
    Upstream(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Keyword(String),
    Url(String),
    Invalid,
}

struct MatchRule {
    name: &'static str,
    matcher: fn(&str) -> Option<Command>,
}

// Evaluated in order; the first rule that matches decides the mode.
const RULES: [MatchRule; 2] = [
    MatchRule {
        name: "keyword",
        matcher: match_keyword,
    },
    MatchRule {
        name: "youtube-url",
        matcher: match_youtube_url,
    },
];

fn match_keyword(text: &str) -> Option<Command> {
    let keyword = KEYWORD_REGEX.captures(text)?.get(1)?.as_str().trim();
    (!keyword.is_empty()).then(|| Command::Keyword(keyword.to_string()))
}

fn match_youtube_url(text: &str) -> Option<Command> {
    extract_video_id(text).map(Command::Url)
}

/// Video id from the first YouTube link in `text`, if any.
pub fn extract_video_id(text: &str) -> Option<String> {
    YOUTUBE_URL_REGEX
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Collapse every whitespace run (line breaks included) to one space.
pub fn normalize(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text.trim(), " ").into_owned()
}

pub fn classify(text: &str) -> Command {
    let text = normalize(text);
    for rule in &RULES {
        if let Some(command) = (rule.matcher)(&text) {
            debug!("🔎 Command matched rule '{}'", rule.name);
            return command;
        }
    }
    Command::Invalid
}

/// A resolved video plus any further search hits to list alongside it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub video_id: String,
    pub others: Vec<SearchHit>,
}

/// Resolve a classified command against `mirror`. URL commands never touch
/// the network; keyword commands run one search and keep up to
/// `result_count` video hits.
pub async fn resolve(
    api: &dyn MirrorApi,
    mirror: &str,
    command: &Command,
    result_count: usize,
) -> Result<Resolution, ResolveError> {
    match command {
        Command::Invalid => Err(ResolveError::InvalidInput),
        Command::Url(id) => Ok(Resolution {
            video_id: id.clone(),
            others: Vec::new(),
        }),
        Command::Keyword(query) => {
            let hits = api.search(mirror, query).await?;
            let mut videos = hits
                .into_iter()
                .filter(SearchHit::is_video)
                .take(result_count.max(1));
            let Some(top) = videos.next() else {
                info!("🔍 No videos found for '{}'", query);
                return Err(ResolveError::NotFound);
            };
            let video_id = top.video_id.unwrap_or_default();
            info!("🔍 '{}' resolved to {}", query, video_id);
            Ok(Resolution {
                video_id,
                others: videos.collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invidious::VideoMetadata;
    use async_trait::async_trait;
    use std::time::Duration;

    struct CannedSearch(Result<Vec<SearchHit>, fn() -> ApiError>);

    #[async_trait]
    impl MirrorApi for CannedSearch {
        async fn probe(&self, _mirror: &str, _video_id: &str, _timeout: Duration) -> bool {
            true
        }

        async fn search(&self, _mirror: &str, _query: &str) -> Result<Vec<SearchHit>, ApiError> {
            match &self.0 {
                Ok(hits) => Ok(hits.clone()),
                Err(make) => Err(make()),
            }
        }

        async fn video(&self, _mirror: &str, _video_id: &str) -> Result<VideoMetadata, ApiError> {
            unreachable!("resolver never fetches metadata")
        }
    }

    fn decode_error() -> ApiError {
        ApiError::Decode(serde_json::from_str::<u8>("x").unwrap_err())
    }

    fn hit(kind: &str, id: Option<&str>, title: &str) -> SearchHit {
        SearchHit {
            kind: kind.to_string(),
            video_id: id.map(str::to_string),
            title: title.to_string(),
            author: None,
        }
    }

    #[test]
    fn test_keyword_takes_precedence_over_url() {
        let command = classify("「test song」 https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(command, Command::Keyword("test song".to_string()));
    }

    #[test]
    fn test_url_shapes_yield_the_same_id() {
        let inputs = [
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42",
            "http://youtube.com/embed/dQw4w9WgXcQ",
            "youtube.com/v/dQw4w9WgXcQ",
            "look at this https://www.youtube.com/shorts/dQw4w9WgXcQ?feature=share",
        ];
        for input in inputs {
            assert_eq!(
                classify(input),
                Command::Url("dQw4w9WgXcQ".to_string()),
                "input: {}",
                input
            );
        }
    }

    #[test]
    fn test_invalid_commands() {
        assert_eq!(classify("play something nice"), Command::Invalid);
        assert_eq!(classify("「 」"), Command::Invalid);
        assert_eq!(classify("https://vimeo.com/12345"), Command::Invalid);
        assert_eq!(classify(""), Command::Invalid);
    }

    #[test]
    fn test_keyword_spanning_lines_is_normalized() {
        assert_eq!(
            classify("「test\nsong」"),
            Command::Keyword("test song".to_string())
        );
        assert_eq!(
            classify("[To:123] bot\r\n「  test \r\n\t song 」\n"),
            Command::Keyword("test song".to_string())
        );
        assert_eq!(classify("「\n」"), Command::Invalid);
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  a\n\n b\tc  "), "a b c");
        assert_eq!(normalize("https://youtu.be/dQw4w9WgXcQ"), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_keyword_is_non_greedy() {
        assert_eq!(
            classify("「first」 and 「second」"),
            Command::Keyword("first".to_string())
        );
    }

    #[tokio::test]
    async fn test_url_resolution_needs_no_search() {
        let api = CannedSearch(Err(decode_error));
        let resolution = resolve(&api, "https://m", &Command::Url("abc".to_string()), 1)
            .await
            .unwrap();
        assert_eq!(resolution.video_id, "abc");
        assert!(resolution.others.is_empty());
    }

    #[tokio::test]
    async fn test_keyword_skips_non_videos_and_limits_results() {
        let api = CannedSearch(Ok(vec![
            hit("channel", None, "A channel"),
            hit("video", Some("v1"), "One"),
            hit("playlist", None, "A list"),
            hit("video", Some("v2"), "Two"),
            hit("video", Some("v3"), "Three"),
        ]));
        let command = Command::Keyword("q".to_string());

        let single = resolve(&api, "https://m", &command, 1).await.unwrap();
        assert_eq!(single.video_id, "v1");
        assert!(single.others.is_empty());

        let multi = resolve(&api, "https://m", &command, 2).await.unwrap();
        assert_eq!(multi.video_id, "v1");
        assert_eq!(multi.others.len(), 1);
        assert_eq!(multi.others[0].video_id.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_empty_search_is_not_found() {
        let api = CannedSearch(Ok(vec![hit("channel", None, "only a channel")]));
        let err = resolve(&api, "https://m", &Command::Keyword("q".to_string()), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound));
    }

    #[tokio::test]
    async fn test_search_failure_is_upstream() {
        let api = CannedSearch(Err(decode_error));
        let err = resolve(&api, "https://m", &Command::Keyword("q".to_string()), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_invalid_command_is_rejected() {
        let api = CannedSearch(Ok(Vec::new()));
        let err = resolve(&api, "https://m", &Command::Invalid, 1).await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidInput));
    }
}
