pub mod config;
pub mod logging;

pub mod bridge;
pub mod cleanup;
pub mod dispatcher;
pub mod host;
pub mod request;
pub mod tracked;
pub mod video_url;
