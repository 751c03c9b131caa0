//! Active-tab URL inspection: is the page a video page, and which video.

use std::fmt;

use url::Url;

/// Host substring an active tab's origin must contain to be dispatched.
pub const DEFAULT_VIDEO_HOST: &str = "youtube.com";

/// Query parameter holding the video identifier on watch pages.
const VIDEO_ID_PARAM: &str = "v";

/// Why a trigger did nothing. None of these are errors; the trigger is a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The host gave no URL for the active tab (e.g. missing permission).
    NoActiveUrl,
    /// The active tab's URL could not be parsed.
    UnparseableUrl,
    /// The active tab's origin does not contain the video host.
    NotVideoHost,
    /// The page is on the video host but has no `v` parameter.
    MissingVideoId,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SkipReason::NoActiveUrl => "active tab has no URL",
            SkipReason::UnparseableUrl => "active tab URL is not a valid URL",
            SkipReason::NotVideoHost => "active tab is not a video page",
            SkipReason::MissingVideoId => "active tab has no video id",
        };
        f.write_str(msg)
    }
}

/// True if the serialized origin of `url` contains `video_host`.
///
/// This is a substring test on `scheme://host[:port]`, so `music.youtube.com`
/// and `www.youtube.com` both match `youtube.com`. Opaque origins
/// (`about:`, `data:`, `file:`) serialize as `null` and never match.
pub fn origin_matches(url: &Url, video_host: &str) -> bool {
    url.origin().ascii_serialization().contains(video_host)
}

/// Extracts the first non-empty `v` query parameter.
pub fn video_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key == VIDEO_ID_PARAM && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Decides whether the active tab can be dispatched, returning its video id.
pub fn inspect_page(page_url: Option<&str>, video_host: &str) -> Result<String, SkipReason> {
    let raw = page_url
        .filter(|u| !u.is_empty())
        .ok_or(SkipReason::NoActiveUrl)?;
    let url = Url::parse(raw).map_err(|_| SkipReason::UnparseableUrl)?;
    if !origin_matches(&url, video_host) {
        return Err(SkipReason::NotVideoHost);
    }
    video_id(&url).ok_or(SkipReason::MissingVideoId)
}
