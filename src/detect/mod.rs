//! Failure detection and rerun-control discovery
//!
//! [`ErrorClassifier`] decides whether a node is a generation-failure banner;
//! [`ButtonLocator`] finds the control that resubmits the request.

pub mod classifier;
pub mod locator;

pub use classifier::{DetectionMethod, DetectionResult, ErrorClassifier, ErrorType};
pub use locator::{ButtonCandidate, ButtonLocator, LocateStrategy, is_actionable};
