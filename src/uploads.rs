#![forbid(unsafe_code)]

//! Rebuilds a channel's upload history in publish order.
//!
//! The uploads playlist comes back newest first, one page at a time. We walk
//! every page, then flip the list so index 0 is the oldest upload.

use anyhow::Result;
use tracing::debug;

use crate::error::{LookupResult, NextVideosError};
use crate::youtube::VideoPlatform;

/// One video in a channel's upload history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEntry {
    pub video_id: String,
    /// Zero-based, oldest first.
    pub position: usize,
}

/// Every upload of one channel, oldest first. Duplicate ids are kept as-is.
#[derive(Debug, Clone, Default)]
pub struct ChannelUploads {
    entries: Vec<UploadEntry>,
}

impl ChannelUploads {
    /// Builds the list from ids already in chronological order.
    pub fn from_oldest_first<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = ids
            .into_iter()
            .enumerate()
            .map(|(position, id)| UploadEntry {
                video_id: id.into(),
                position,
            })
            .collect();
        Self { entries }
    }

    /// Builds the list from ids in playlist order (newest first).
    pub fn from_newest_first(mut ids: Vec<String>) -> Self {
        ids.reverse();
        Self::from_oldest_first(ids)
    }

    /// First position holding `video_id`.
    pub fn position_of(&self, video_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.video_id == video_id)
    }

    pub fn get(&self, position: usize) -> Option<&UploadEntry> {
        self.entries.get(position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[UploadEntry] {
        &self.entries
    }
}

/// Lazily walks an uploads playlist, yielding the video ids of each page.
///
/// Ends after the first page without a continuation token, or right after an
/// error.
pub struct UploadPages<'a> {
    platform: &'a dyn VideoPlatform,
    playlist_id: &'a str,
    next_token: Option<String>,
    finished: bool,
}

impl<'a> UploadPages<'a> {
    pub fn new(platform: &'a dyn VideoPlatform, playlist_id: &'a str) -> Self {
        Self {
            platform,
            playlist_id,
            next_token: None,
            finished: false,
        }
    }
}

impl Iterator for UploadPages<'_> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let page = match self
            .platform
            .list_playlist_items(self.playlist_id, self.next_token.as_deref())
        {
            Ok(page) => page,
            Err(err) => {
                self.finished = true;
                return Some(Err(err));
            }
        };

        self.next_token = page.next_page_token.filter(|token| !token.is_empty());
        self.finished = self.next_token.is_none();
        debug!(
            playlist_id = self.playlist_id,
            items = page.items.len(),
            more = !self.finished,
            "fetched uploads page"
        );

        Some(Ok(page
            .items
            .into_iter()
            .map(|item| item.content_details.video_id)
            .collect()))
    }
}

/// Id of the playlist holding every upload of `channel_id`.
pub fn uploads_playlist_id(
    platform: &dyn VideoPlatform,
    channel_id: &str,
) -> LookupResult<String> {
    let channel = platform
        .list_channels(channel_id)?
        .first()
        .ok_or(NextVideosError::ChannelNotFound)?;
    Ok(channel.content_details.related_playlists.uploads)
}

pub fn resolve_uploads(
    platform: &dyn VideoPlatform,
    channel_id: &str,
) -> LookupResult<ChannelUploads> {
    let playlist_id = uploads_playlist_id(platform, channel_id)?;

    let mut newest_first = Vec::new();
    for page in UploadPages::new(platform, &playlist_id) {
        newest_first.extend(page?);
    }
    debug!(channel_id, total = newest_first.len(), "resolved channel uploads");

    Ok(ChannelUploads::from_newest_first(newest_first))
}
