//! Native-messaging bridge between the browser extension and ytdt.
//!
//! The extension keeps only thin glue: it forwards the popup's trigger and
//! every `tabs.onUpdated` event, and executes the tab calls ytdt asks for.
//! All dispatch and cleanup decisions happen here.

mod frame;
mod manifest;
mod message;
mod native_host;
mod session;

pub use frame::{
    encode_message, read_frame, read_message, write_frame, write_message, FrameError,
    MAX_INBOUND_LEN, MAX_OUTBOUND_LEN,
};
pub use manifest::{is_browser_launch, is_valid_extension_id, HostManifest, NATIVE_HOST_NAME};
pub use message::{HostCall, Inbound, Outbound};
pub use native_host::NativeHost;
pub use session::{run_bridge, BridgeSummary, SessionEnd};
