#![forbid(unsafe_code)]

//! YouTube Data API v3 access.
//!
//! [`VideoPlatform`] is the seam the lookup code depends on. [`YouTubeClient`]
//! implements it with a blocking `ureq` agent bound to one API key; tests swap
//! in an in-memory platform instead.
//!
//! Only the fields the lookup needs are modelled. Everything else in the API
//! payloads is ignored by serde.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// `part` used for the starting video.
pub const VIDEO_DETAIL_PARTS: &str = "snippet,contentDetails,statistics";
/// `part` used for each following video.
pub const VIDEO_SNIPPET_PART: &str = "snippet";

/// Largest page the `playlistItems` endpoint hands out.
pub const PLAYLIST_PAGE_SIZE: u32 = 50;

/// Envelope shared by every `*.list` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl<T> ListResponse<T> {
    pub fn first(self) -> Option<T> {
        self.items.into_iter().next()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoItem {
    pub id: String,
    #[serde(default)]
    pub snippet: Option<VideoSnippet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: Option<String>,
    pub channel_id: Option<String>,
    pub channel_title: Option<String>,
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
}

impl Thumbnails {
    /// Medium, then default. Blank URLs are skipped.
    pub fn preferred_url(&self) -> Option<&str> {
        [self.medium.as_ref(), self.default.as_ref()]
            .into_iter()
            .flatten()
            .map(|thumb| thumb.url.as_str())
            .find(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelItem {
    pub id: String,
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemContentDetails {
    pub video_id: String,
}

/// The three Data API calls the lookup performs.
pub trait VideoPlatform: Send + Sync {
    /// `videos.list(part, id)`.
    fn list_videos(&self, video_id: &str, part: &str) -> Result<ListResponse<VideoItem>>;

    /// `channels.list(part=contentDetails, id)`.
    fn list_channels(&self, channel_id: &str) -> Result<ListResponse<ChannelItem>>;

    /// `playlistItems.list(part=contentDetails, playlistId, maxResults=50, pageToken)`.
    fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListResponse<PlaylistItem>>;
}

/// Blocking Data API client. Built once at startup and shared.
pub struct YouTubeClient {
    agent: ureq::Agent,
    api_key: String,
    api_base: String,
}

impl YouTubeClient {
    pub fn with_base(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn api_get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.api_base, endpoint);
        let mut request = self.agent.get(&url).query("key", &self.api_key);
        for (name, value) in params {
            request = request.query(name, value);
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(anyhow!("{endpoint} returned status {status}: {body}"));
            }
            Err(err) => {
                return Err(anyhow::Error::new(err).context(format!("requesting {endpoint}")));
            }
        };

        response
            .into_json::<T>()
            .with_context(|| format!("parsing {endpoint} response"))
    }
}

impl VideoPlatform for YouTubeClient {
    fn list_videos(&self, video_id: &str, part: &str) -> Result<ListResponse<VideoItem>> {
        self.api_get("videos", &[("part", part), ("id", video_id)])
    }

    fn list_channels(&self, channel_id: &str) -> Result<ListResponse<ChannelItem>> {
        self.api_get("channels", &[("part", "contentDetails"), ("id", channel_id)])
    }

    fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListResponse<PlaylistItem>> {
        let page_size = PLAYLIST_PAGE_SIZE.to_string();
        let mut params = vec![
            ("part", "contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", page_size.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        self.api_get("playlistItems", &params)
    }
}
