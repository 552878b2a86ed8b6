use crate::config::Config;
use crate::detect::{ButtonCandidate, ButtonLocator, DetectionResult, ErrorClassifier};
use crate::error::Result;
use crate::interact::InteractionSimulator;
use crate::page::{Page, RecoveryStatus};
use crate::recovery::{Clock, RecoveryState};
use serde::Serialize;
use std::time::Duration;

/// Why a detection was dropped without a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    InProgress,
    Cooldown { remaining_ms: u64 },
}

/// Result of handing one detection to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    Disabled,
    Skipped(SkipReason),
    Recovered { attempts: u32 },
    Exhausted { attempts: u32 },
    Aborted { reason: String },
}

impl CycleOutcome {
    /// A cycle actually ran (as opposed to being gated)
    pub fn ran(&self) -> bool {
        matches!(self, CycleOutcome::Recovered { .. } | CycleOutcome::Exhausted { .. } | CycleOutcome::Aborted { .. })
    }
}

/// Wait after failed attempt `attempt` (0-based): 1 s, 2 s, 4 s, ...
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(2u64.saturating_pow(attempt).saturating_mul(1000))
}

/// Turns detections into gated, retried recovery cycles
pub struct RecoveryOrchestrator {
    config: Config,
    classifier: ErrorClassifier,
    locator: ButtonLocator,
    simulator: InteractionSimulator,
}

impl RecoveryOrchestrator {
    pub fn new(config: Config) -> Self {
        Self {
            classifier: ErrorClassifier::from_config(&config),
            locator: ButtonLocator::from_config(&config),
            simulator: InteractionSimulator::new(),
            config,
        }
    }

    /// Builder method: replace the interaction simulator
    pub fn with_simulator(mut self, simulator: InteractionSimulator) -> Self {
        self.simulator = simulator;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub fn locator(&self) -> &ButtonLocator {
        &self.locator
    }

    /// Run one recovery cycle for `detection` unless disabled, busy or cooling down.
    ///
    /// State is reset and the detection marked processed whenever a cycle
    /// runs, whatever its outcome.
    pub fn handle(
        &self,
        state: &mut RecoveryState,
        page: &dyn Page,
        clock: &dyn Clock,
        detection: &mut DetectionResult,
    ) -> CycleOutcome {
        if !self.config.enabled {
            log::debug!("Ignoring detection at {}: disabled", detection.source);
            return CycleOutcome::Disabled;
        }
        if state.in_progress {
            log::debug!("Ignoring detection at {}: recovery in progress", detection.source);
            return CycleOutcome::Skipped(SkipReason::InProgress);
        }
        if let Some(remaining_ms) = state.cooldown_remaining(clock.now_ms(), self.config.cooldown_ms) {
            log::debug!("Ignoring detection at {}: cooling down for {} ms", detection.source, remaining_ms);
            return CycleOutcome::Skipped(SkipReason::Cooldown { remaining_ms });
        }

        log::info!("Generation failure detected via {}: {}", detection.method, detection.message);
        state.begin();
        self.indicate(page, RecoveryStatus::Recovering);

        let outcome = match self.run_cycle(state, page, clock) {
            Ok(Some(attempts)) => CycleOutcome::Recovered { attempts },
            Ok(None) => CycleOutcome::Exhausted { attempts: self.config.max_attempts() },
            Err(e) => CycleOutcome::Aborted { reason: e.to_string() },
        };

        state.finish(clock.now_ms());
        detection.processed = true;

        match &outcome {
            CycleOutcome::Recovered { attempts } => {
                log::info!("Recovered after {} attempt(s)", attempts);
                self.indicate(page, RecoveryStatus::Recovered);
            }
            CycleOutcome::Exhausted { attempts } => {
                log::warn!("Recovery failed after {} attempt(s); leaving the error for the user", attempts);
                self.indicate(page, RecoveryStatus::Failed);
            }
            CycleOutcome::Aborted { reason } => {
                log::error!("Recovery aborted: {}", reason);
                self.indicate(page, RecoveryStatus::Failed);
            }
            CycleOutcome::Disabled | CycleOutcome::Skipped(_) => {}
        }

        outcome
    }

    /// Delay, then locate and interact until verified; `Some(attempts)` on success
    fn run_cycle(&self, state: &mut RecoveryState, page: &dyn Page, clock: &dyn Clock) -> Result<Option<u32>> {
        clock.sleep(Duration::from_millis(self.config.response_delay_ms));

        let max_attempts = self.config.max_attempts();
        for attempt in 0..max_attempts {
            state.retry_count = attempt;
            match self.find_control(page, clock)? {
                Some(candidate) => {
                    if self.simulator.interact(page, clock, &candidate, &self.classifier) {
                        return Ok(Some(attempt + 1));
                    }
                    log::debug!("Attempt {}/{}: interaction with {} not verified", attempt + 1, max_attempts, candidate.node);
                }
                None => log::debug!("Attempt {}/{}: no rerun control found", attempt + 1, max_attempts),
            }

            if attempt + 1 < max_attempts {
                clock.sleep(backoff(attempt));
            }
        }

        state.retry_count = max_attempts;
        Ok(None)
    }

    /// Locate the control, hovering message areas and searching again when
    /// nothing is found at first
    fn find_control(&self, page: &dyn Page, clock: &dyn Clock) -> Result<Option<ButtonCandidate>> {
        let tree = page.snapshot()?;
        if let Some(candidate) = self.locator.locate(&tree, &self.classifier) {
            return Ok(Some(candidate));
        }

        let areas = self.locator.message_areas(&tree);
        if !self.simulator.reveal(page, clock, &areas) {
            return Ok(None);
        }
        let revealed = page.snapshot()?;
        Ok(self.locator.locate(&revealed, &self.classifier))
    }

    fn indicate(&self, page: &dyn Page, status: RecoveryStatus) {
        if !self.config.show_indicator {
            return;
        }
        if let Err(e) = page.show_status(status) {
            log::debug!("Status indicator not updated: {}", e);
        }
    }
}
