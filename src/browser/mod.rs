//! Browser management
//!
//! Launching or attaching to Chrome and picking the tab to watch.

pub mod config;
pub mod session;

pub use config::{ConnectionOptions, IDLE_BROWSER_TIMEOUT, LaunchOptions};
pub use session::BrowserSession;
