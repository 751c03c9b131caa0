//! Download request model and dispatch URL construction.
//!
//! A dispatch URL has the fixed shape
//! `{server_base}/download?v={video_id}&s={0|1}&a={0|1}&d={0|1}`. The download
//! server reads the parameters by name, but the order and the presence of all
//! four is kept stable so older servers keep working.

use serde::{Deserialize, Serialize};
use url::Url;

/// Path on the download server that accepts trigger requests.
pub const DOWNLOAD_PATH: &str = "/download";

/// Which parts of a video the download server should produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadOptions {
    /// Fetch subtitles alongside the media (`s`).
    pub subtitles: bool,
    /// Produce an audio file (`a`).
    pub audio: bool,
    /// Produce a video file (`d`).
    pub video: bool,
}

/// One trigger's worth of work for the download server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub video_id: String,
    pub options: DownloadOptions,
}

/// Error when a configured server address cannot serve as a dispatch base.
#[derive(Debug, thiserror::Error)]
pub enum ServerBaseError {
    #[error("invalid server address {address:?}: {source}")]
    Parse {
        address: String,
        #[source]
        source: url::ParseError,
    },
    #[error("server address {0:?} must use http or https")]
    Scheme(String),
}

/// Error when reading a dispatch URL back into a request.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RequestParseError {
    #[error("not a download URL (path {0:?})")]
    WrongPath(String),
    #[error("download URL has no `v` parameter")]
    MissingVideoId,
    #[error("flag `{name}` is not an integer: {value:?}")]
    BadFlag { name: &'static str, value: String },
}

/// Parses and checks the configured download server address.
pub fn parse_server_base(address: &str) -> Result<Url, ServerBaseError> {
    let url = Url::parse(address.trim()).map_err(|source| ServerBaseError::Parse {
        address: address.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ServerBaseError::Scheme(address.to_string())),
    }
}

fn flag(set: bool) -> &'static str {
    if set {
        "1"
    } else {
        "0"
    }
}

impl DownloadRequest {
    pub fn new(video_id: impl Into<String>, options: DownloadOptions) -> Self {
        Self {
            video_id: video_id.into(),
            options,
        }
    }

    /// Builds the URL that, once navigated to, makes the server queue this request.
    ///
    /// `/download` is appended to whatever path `base` already has, so a server
    /// mounted under a prefix (`http://host:8908/yt`) works too. Any query or
    /// fragment on `base` is dropped.
    pub fn dispatch_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        let path = format!("{}{}", base.path().trim_end_matches('/'), DOWNLOAD_PATH);
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);
        url.query_pairs_mut()
            .append_pair("v", &self.video_id)
            .append_pair("s", flag(self.options.subtitles))
            .append_pair("a", flag(self.options.audio))
            .append_pair("d", flag(self.options.video));
        url
    }

    /// Reads a dispatch URL the way the download server does.
    ///
    /// The first occurrence of each parameter wins. A missing or empty flag is
    /// `false`; any non-zero integer is `true`. An empty `v` counts as missing.
    pub fn from_dispatch_url(url: &Url) -> Result<Self, RequestParseError> {
        if !url.path().ends_with(DOWNLOAD_PATH) {
            return Err(RequestParseError::WrongPath(url.path().to_string()));
        }

        let mut video_id = None;
        let mut raw_flags: [Option<String>; 3] = [None, None, None];
        for (key, value) in url.query_pairs() {
            let slot = match key.as_ref() {
                "v" => {
                    if video_id.is_none() && !value.is_empty() {
                        video_id = Some(value.into_owned());
                    }
                    continue;
                }
                "s" => &mut raw_flags[0],
                "a" => &mut raw_flags[1],
                "d" => &mut raw_flags[2],
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }

        let video_id = video_id.ok_or(RequestParseError::MissingVideoId)?;
        let [s, a, d] = raw_flags;
        Ok(Self {
            video_id,
            options: DownloadOptions {
                subtitles: parse_flag("s", s)?,
                audio: parse_flag("a", a)?,
                video: parse_flag("d", d)?,
            },
        })
    }
}

fn parse_flag(name: &'static str, raw: Option<String>) -> Result<bool, RequestParseError> {
    match raw {
        None => Ok(false),
        Some(value) => match value.trim().parse::<i64>() {
            Ok(n) => Ok(n != 0),
            Err(_) => Err(RequestParseError::BadFlag { name, value }),
        },
    }
}
