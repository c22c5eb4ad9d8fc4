#![forbid(unsafe_code)]

//! Turns a pasted watch or short link into a video id.

use url::{ParseError, Url};

use crate::error::{LookupResult, NextVideosError};

/// Host marker for `https://youtu.be/<id>` links.
const SHORT_LINK_HOST: &str = "youtu.be";

/// Placeholder origin for links pasted without a scheme.
const SCHEMELESS_BASE: &str = "https://invalid.";

/// Identifier addressing a single video through the Data API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference {
    video_id: String,
}

impl VideoReference {
    pub fn video_id(&self) -> &str {
        &self.video_id
    }
}

/// Accepts `...?v=<id>` on any host, or `youtu.be/<id>`.
///
/// Input without a scheme (`www.youtube.com/watch?v=<id>`) has no host, so
/// only the `v=` rule applies to it.
pub fn extract_video_id(raw: &str) -> LookupResult<VideoReference> {
    let raw = raw.trim();
    let parsed = match Url::parse(raw) {
        Ok(parsed) => parsed,
        Err(ParseError::RelativeUrlWithoutBase) => {
            let joined = Url::parse(SCHEMELESS_BASE)
                .and_then(|base| base.join(raw))
                .map_err(|_| NextVideosError::InvalidUrl)?;
            return query_video_id(&joined).ok_or(NextVideosError::InvalidUrl);
        }
        Err(_) => return Err(NextVideosError::InvalidUrl),
    };

    if let Some(reference) = query_video_id(&parsed) {
        return Ok(reference);
    }

    if let Some(host) = parsed.host_str()
        && host.contains(SHORT_LINK_HOST)
    {
        let video_id = parsed.path().trim_start_matches('/');
        if !video_id.is_empty() {
            return Ok(VideoReference {
                video_id: video_id.to_string(),
            });
        }
    }

    Err(NextVideosError::InvalidUrl)
}

/// First non-blank `v=` value.
fn query_video_id(url: &Url) -> Option<VideoReference> {
    url.query_pairs()
        .find(|(key, value)| key == "v" && !value.is_empty())
        .map(|(_, value)| VideoReference {
            video_id: value.into_owned(),
        })
}
