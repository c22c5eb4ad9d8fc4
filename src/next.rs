#![forbid(unsafe_code)]

//! Picks the uploads that follow a given video and assembles the response.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{LookupResult, NextVideosError};
use crate::extract::extract_video_id;
use crate::uploads::{ChannelUploads, resolve_uploads};
use crate::youtube::{VIDEO_DETAIL_PARTS, VIDEO_SNIPPET_PART, VideoItem, VideoPlatform};

pub const MIN_COUNT: i64 = 1;
pub const MAX_COUNT: i64 = 15;
pub const DEFAULT_COUNT: i64 = 1;

pub const UNTITLED: &str = "No title";
pub const NOT_IN_UPLOADS_MESSAGE: &str = "Video not found in uploads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub channel_id: String,
    pub channel_title: String,
}

impl VideoMetadata {
    fn from_item(item: VideoItem) -> Self {
        let snippet = item.snippet.unwrap_or_default();
        let thumbnail_url = snippet
            .thumbnails
            .as_ref()
            .and_then(|thumbs| thumbs.preferred_url())
            .unwrap_or_default()
            .to_string();
        Self {
            video_id: item.id,
            title: snippet.title.unwrap_or_else(|| UNTITLED.to_string()),
            thumbnail_url,
            channel_id: snippet.channel_id.unwrap_or_default(),
            channel_title: snippet.channel_title.unwrap_or_default(),
        }
    }

    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextVideo {
    pub url: String,
    pub title: String,
    pub thumbnail: String,
}

impl From<VideoMetadata> for NextVideo {
    fn from(meta: VideoMetadata) -> Self {
        Self {
            url: meta.watch_url(),
            title: meta.title,
            thumbnail: meta.thumbnail_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextVideosResult {
    #[serde(rename = "channel")]
    pub channel_title: String,
    pub videos: Vec<NextVideo>,
}

/// Either the follow-up videos, or a note that the start video is missing from
/// its own channel's uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NextVideosOutcome {
    Found(NextVideosResult),
    NotInUploads { message: &'static str },
}

impl NextVideosOutcome {
    pub fn not_in_uploads() -> Self {
        Self::NotInUploads {
            message: NOT_IN_UPLOADS_MESSAGE,
        }
    }
}

pub fn validate_count(count: i64) -> LookupResult<usize> {
    if (MIN_COUNT..=MAX_COUNT).contains(&count) {
        Ok(count as usize)
    } else {
        Err(NextVideosError::InvalidCount(count))
    }
}

/// Metadata for up to `count` uploads after `start_video_id`.
///
/// `None` when the start video is not in `uploads`. Ids the platform has no
/// data for are skipped, so the result can be shorter than `count`.
pub fn select_next(
    platform: &dyn VideoPlatform,
    uploads: &ChannelUploads,
    start_video_id: &str,
    count: usize,
) -> LookupResult<Option<Vec<VideoMetadata>>> {
    let Some(start) = uploads.position_of(start_video_id) else {
        return Ok(None);
    };

    let mut selected = Vec::with_capacity(count);
    for offset in 1..=count {
        let Some(entry) = uploads.get(start + offset) else {
            break;
        };
        match platform
            .list_videos(&entry.video_id, VIDEO_SNIPPET_PART)?
            .first()
        {
            Some(item) => selected.push(VideoMetadata::from_item(item)),
            None => warn!(video_id = %entry.video_id, "no metadata for upload, skipping"),
        }
    }
    Ok(Some(selected))
}

/// Full lookup: URL, start video, channel uploads, then the following videos.
pub fn get_next_videos(
    platform: &dyn VideoPlatform,
    url: &str,
    count: i64,
) -> LookupResult<NextVideosOutcome> {
    let count = validate_count(count)?;
    let reference = extract_video_id(url)?;
    let video_id = reference.video_id();

    let current = platform
        .list_videos(video_id, VIDEO_DETAIL_PARTS)?
        .first()
        .map(VideoMetadata::from_item)
        .ok_or(NextVideosError::VideoNotFound)?;
    if current.channel_id.is_empty() {
        return Err(NextVideosError::ChannelNotFound);
    }
    debug!(video_id, channel_id = %current.channel_id, "resolved start video");

    let uploads = resolve_uploads(platform, &current.channel_id)?;
    let outcome = match select_next(platform, &uploads, video_id, count)? {
        Some(videos) => NextVideosOutcome::Found(NextVideosResult {
            channel_title: current.channel_title,
            videos: videos.into_iter().map(NextVideo::from).collect(),
        }),
        None => NextVideosOutcome::not_in_uploads(),
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploads::tests::FakePlatform;
    use crate::youtube::{Thumbnail, Thumbnails, VideoSnippet};
    use serde_json::json;

    fn video_item(id: &str, channel_id: &str) -> VideoItem {
        VideoItem {
            id: id.to_string(),
            snippet: Some(VideoSnippet {
                title: Some(format!("Title {id}")),
                channel_id: Some(channel_id.to_string()),
                channel_title: Some(format!("Channel {channel_id}")),
                thumbnails: Some(Thumbnails {
                    default: Some(Thumbnail {
                        url: format!("https://i.ytimg.com/vi/{id}/default.jpg"),
                    }),
                    medium: Some(Thumbnail {
                        url: format!("https://i.ytimg.com/vi/{id}/mqdefault.jpg"),
                    }),
                }),
            }),
        }
    }

    /// Channel `UC1` with the given uploads (oldest first), all with metadata.
    fn channel_with(oldest_first: &[&str]) -> FakePlatform {
        let newest_first: Vec<&str> = oldest_first.iter().rev().copied().collect();
        let mut platform = FakePlatform::with_uploads("UC1", &newest_first);
        for id in oldest_first {
            platform
                .videos
                .insert(id.to_string(), video_item(id, "UC1"));
        }
        platform
    }

    fn selected_ids(selected: &[VideoMetadata]) -> Vec<&str> {
        selected.iter().map(|meta| meta.video_id.as_str()).collect()
    }

    #[test]
    fn selects_following_uploads_in_order() {
        let ids: Vec<String> = (0..10).map(|n| format!("v{n}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let platform = channel_with(&refs);
        let uploads = ChannelUploads::from_oldest_first(refs.clone());

        let selected = select_next(&platform, &uploads, "v5", 3).unwrap().unwrap();
        assert_eq!(selected_ids(&selected), ["v6", "v7", "v8"]);
    }

    #[test]
    fn start_at_last_upload_yields_nothing() {
        let platform = channel_with(&["a", "b", "c"]);
        let uploads = ChannelUploads::from_oldest_first(["a", "b", "c"]);
        let selected = select_next(&platform, &uploads, "c", 5).unwrap().unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn stops_at_end_without_padding() {
        let platform = channel_with(&["a", "b", "c"]);
        let uploads = ChannelUploads::from_oldest_first(["a", "b", "c"]);
        let selected = select_next(&platform, &uploads, "a", 15).unwrap().unwrap();
        assert_eq!(selected_ids(&selected), ["b", "c"]);
        assert_eq!(
            platform.calls(),
            ["videos:snippet:b", "videos:snippet:c"]
        );
    }

    #[test]
    fn missing_start_is_not_an_error() {
        let platform = channel_with(&["a", "b"]);
        let uploads = ChannelUploads::from_oldest_first(["a", "b"]);
        assert!(select_next(&platform, &uploads, "zzz", 1).unwrap().is_none());
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn metadata_gaps_are_skipped() {
        let mut platform = channel_with(&["a", "b", "c", "d"]);
        platform.videos.remove("c");
        let uploads = ChannelUploads::from_oldest_first(["a", "b", "c", "d"]);
        let selected = select_next(&platform, &uploads, "a", 3).unwrap().unwrap();
        assert_eq!(selected_ids(&selected), ["b", "d"]);
    }

    #[test]
    fn metadata_falls_back_to_placeholders() {
        let bare: VideoItem = serde_json::from_value(json!({"id": "x", "snippet": {}})).unwrap();
        let meta = VideoMetadata::from_item(bare);
        assert_eq!(meta.title, UNTITLED);
        assert_eq!(meta.thumbnail_url, "");

        let default_thumb: VideoItem = serde_json::from_value(json!({
            "id": "y",
            "snippet": {"title": "", "thumbnails": {"default": {"url": "d.jpg"}}}
        }))
        .unwrap();
        let meta = VideoMetadata::from_item(default_thumb);
        assert_eq!(meta.title, "");
        assert_eq!(meta.thumbnail_url, "d.jpg");
    }

    #[test]
    fn count_bounds_are_enforced() {
        for bad in [0, 16, -1] {
            assert!(matches!(
                validate_count(bad),
                Err(NextVideosError::InvalidCount(value)) if value == bad
            ));
        }
        assert_eq!(validate_count(1).unwrap(), 1);
        assert_eq!(validate_count(15).unwrap(), 15);
    }

    #[test]
    fn count_is_checked_before_any_lookup() {
        let platform = channel_with(&["ABC123"]);
        let err = get_next_videos(&platform, "https://youtu.be/ABC123", 16).unwrap_err();
        assert!(matches!(err, NextVideosError::InvalidCount(16)));
        assert!(platform.calls().is_empty());

        let err = get_next_videos(&platform, "not a url", 1).unwrap_err();
        assert!(matches!(err, NextVideosError::InvalidUrl));
    }

    #[test]
    fn end_to_end_returns_following_videos() {
        let platform = channel_with(&["X", "Y", "ABC123", "Z", "W"]);
        let outcome = get_next_videos(&platform, "https://youtu.be/ABC123", 2).unwrap();
        let NextVideosOutcome::Found(result) = outcome else {
            panic!("expected videos, got {outcome:?}");
        };
        assert_eq!(result.channel_title, "Channel UC1");
        assert_eq!(
            result.videos,
            [
                NextVideo {
                    url: "https://www.youtube.com/watch?v=Z".into(),
                    title: "Title Z".into(),
                    thumbnail: "https://i.ytimg.com/vi/Z/mqdefault.jpg".into(),
                },
                NextVideo {
                    url: "https://www.youtube.com/watch?v=W".into(),
                    title: "Title W".into(),
                    thumbnail: "https://i.ytimg.com/vi/W/mqdefault.jpg".into(),
                },
            ]
        );
        assert_eq!(
            platform.calls(),
            [
                "videos:snippet,contentDetails,statistics:ABC123",
                "channels:UC1",
                "playlistItems:UU-UC1:-",
                "videos:snippet:Z",
                "videos:snippet:W",
            ]
        );
    }

    #[test]
    fn count_limits_are_accepted_end_to_end() {
        let platform = channel_with(&["ABC123", "Z"]);
        for count in [MIN_COUNT, MAX_COUNT] {
            let outcome =
                get_next_videos(&platform, "https://www.youtube.com/watch?v=ABC123", count)
                    .unwrap();
            assert!(matches!(outcome, NextVideosOutcome::Found(ref r) if r.videos.len() == 1));
        }
    }

    #[test]
    fn unknown_video_is_reported() {
        let platform = channel_with(&["a"]);
        let err = get_next_videos(&platform, "https://youtu.be/ghost", 1).unwrap_err();
        assert!(matches!(err, NextVideosError::VideoNotFound));
    }

    #[test]
    fn unknown_channel_is_reported() {
        let mut platform = channel_with(&["a"]);
        platform
            .videos
            .insert("orphan".into(), video_item("orphan", "UC-gone"));
        let err = get_next_videos(&platform, "https://youtu.be/orphan", 1).unwrap_err();
        assert!(matches!(err, NextVideosError::ChannelNotFound));
    }

    #[test]
    fn video_absent_from_uploads_is_signalled() {
        let mut platform = channel_with(&["a", "b"]);
        platform
            .videos
            .insert("private".into(), video_item("private", "UC1"));
        let outcome = get_next_videos(&platform, "https://youtu.be/private", 1).unwrap();
        assert_eq!(outcome, NextVideosOutcome::not_in_uploads());
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"message": "Video not found in uploads"})
        );
    }

    #[test]
    fn found_outcome_serializes_channel_and_videos() {
        let outcome = NextVideosOutcome::Found(NextVideosResult {
            channel_title: "Chan".into(),
            videos: vec![NextVideo {
                url: "u".into(),
                title: "t".into(),
                thumbnail: "th".into(),
            }],
        });
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"channel": "Chan", "videos": [{"url": "u", "title": "t", "thumbnail": "th"}]})
        );
    }
}
