//! # auto-rerun
//!
//! Watches an AI-generation web application (Google AI Studio by default) over
//! the Chrome DevTools Protocol and clicks the "rerun" control when a
//! generation fails, so long sessions recover without user intervention.
//!
//! ## How it works
//!
//! - An injected `MutationObserver` queues changes under `<body>`; the
//!   [`Monitor`] drains it on a fixed interval.
//! - Each changed subtree goes through the [`ErrorClassifier`] (error text,
//!   error CSS class plus keyword, or error-red computed style).
//! - A detection is handed to the [`RecoveryOrchestrator`], which applies the
//!   enabled/in-progress/cooldown gates, waits for the UI to settle, and then
//!   locates the control ([`ButtonLocator`]) and clicks it
//!   ([`InteractionSimulator`]) with exponential backoff between attempts.
//!
//! ## Running the watcher
//!
//! ```bash
//! # Launch Chrome with a persistent profile and watch AI Studio
//! cargo run --bin auto-rerun -- watch https://aistudio.google.com/ --headed --user-data-dir ~/.auto-rerun
//!
//! # Check what the heuristics make of a saved snapshot
//! cargo run --bin auto-rerun -- scan snapshot.json
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use auto_rerun::{BrowserSession, ChromePage, Config, LaunchOptions, Monitor, SystemClock};
//! use std::sync::atomic::AtomicBool;
//!
//! # fn main() -> auto_rerun::Result<()> {
//! let session = BrowserSession::launch(LaunchOptions::new().headless(false))?;
//! session.navigate("https://aistudio.google.com/")?;
//!
//! let page = ChromePage::from_session(&session)?;
//! let mut monitor = Monitor::new(Config::default(), page, SystemClock::new())?;
//!
//! let shutdown = AtomicBool::new(false);
//! monitor.run(&shutdown)?;
//! # Ok(())
//! # }
//! ```
//!
//! Everything above the [`Page`] trait is browser-independent; [`MemoryPage`]
//! and [`ManualClock`] run the same logic against an in-memory tree in
//! virtual time.
//!
//! ## Module Overview
//!
//! - [`browser`]: Chrome launch/connect and tab selection
//! - [`config`]: configuration, validation and the JSON file store
//! - [`dom`]: DOM snapshots, node paths and attribute selectors
//! - [`page`]: the [`Page`] boundary with Chrome and in-memory implementations
//! - [`detect`]: error classification and rerun-control discovery
//! - [`interact`]: hover/click simulation and verification
//! - [`recovery`]: the orchestrator, its state and clocks
//! - [`monitor`]: the polling loop
//! - [`error`]: error types and result aliases

pub mod browser;
pub mod config;
pub mod detect;
pub mod dom;
pub mod error;
pub mod interact;
pub mod monitor;
pub mod page;
pub mod recovery;

pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions};
pub use config::{Config, ConfigStore, UrlMatcher};
pub use detect::{ButtonCandidate, ButtonLocator, DetectionMethod, DetectionResult, ErrorClassifier, LocateStrategy};
pub use dom::{BoundingBox, DomTree, ElementNode, NodeRef};
pub use error::{RerunError, Result};
pub use interact::InteractionSimulator;
pub use monitor::Monitor;
pub use page::{ChromePage, ClickMethod, MemoryPage, MutationRecord, Page, RecoveryStatus};
pub use recovery::{Clock, CycleOutcome, ManualClock, RecoveryOrchestrator, RecoveryState, SystemClock};
