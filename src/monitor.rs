use crate::config::{Config, UrlMatcher};
use crate::error::Result;
use crate::page::{MutationRecord, Page, RecoveryStatus};
use crate::recovery::{Clock, CycleOutcome, RecoveryOrchestrator, RecoveryState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Watches one page and hands detected failures to the orchestrator
pub struct Monitor<P: Page, C: Clock> {
    page: P,
    clock: C,
    orchestrator: RecoveryOrchestrator,
    urls: UrlMatcher,
    state: RecoveryState,
}

impl<P: Page, C: Clock> Monitor<P, C> {
    pub fn new(config: Config, page: P, clock: C) -> Result<Self> {
        let urls = UrlMatcher::new(&config.match_urls)?;
        Ok(Self { page, clock, orchestrator: RecoveryOrchestrator::new(config), urls, state: RecoveryState::new() })
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn state(&self) -> &RecoveryState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        self.orchestrator.config()
    }

    /// Attach to the page if its URL is watched; returns whether it is
    pub fn start(&mut self) -> Result<bool> {
        let url = self.page.url()?;
        if !self.urls.matches(&url) {
            log::info!("Not watching {}: URL does not match", url);
            return Ok(false);
        }
        self.attach(&url)?;
        Ok(true)
    }

    /// Drain queued mutations and run a recovery cycle if one reveals a failure
    pub fn poll(&mut self) -> Result<Option<CycleOutcome>> {
        let url = self.page.url()?;
        if !self.urls.matches(&url) {
            if self.state.initialized {
                log::info!("Navigated away to {}; detaching", url);
                self.detach();
            }
            return Ok(None);
        }
        if !self.state.initialized {
            self.attach(&url)?;
            return Ok(None);
        }

        let batch = self.drain()?;
        if self.state.observers.is_empty() {
            log::info!("Observer lost on {}; reinstalling", url);
            self.attach(&url)?;
        }
        if batch.is_empty() {
            return Ok(None);
        }

        let tree = self.page.snapshot()?;
        let now = self.clock.now_ms();
        let classifier = self.orchestrator.classifier();
        let detection = batch
            .iter()
            .flat_map(MutationRecord::inspect_targets)
            .find_map(|target| classifier.classify_subtree(&tree, &target, now));

        let Some(mut detection) = detection else {
            return Ok(None);
        };

        let outcome = self.orchestrator.handle(&mut self.state, &self.page, &self.clock, &mut detection);
        if outcome.ran() {
            let discarded = self.drain()?.len();
            if discarded > 0 {
                log::debug!("Discarded {} mutation(s) queued during recovery", discarded);
            }
        }
        Ok(Some(outcome))
    }

    /// Poll every `poll_interval_ms` until `shutdown` is set, then detach
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        self.start()?;
        let interval = Duration::from_millis(self.config().poll_interval_ms);

        while !shutdown.load(Ordering::SeqCst) {
            if let Err(e) = self.poll() {
                log::warn!("Poll failed: {}", e);
            }
            self.clock.sleep(interval);
        }

        self.shutdown();
        Ok(())
    }

    /// Disconnect every observer and remove the indicator
    pub fn shutdown(&mut self) {
        self.detach();
        log::info!("Monitor stopped");
    }

    fn attach(&mut self, url: &str) -> Result<()> {
        let handle = self.page.install_observer()?;
        self.state.observers.insert(handle);
        self.state.initialized = true;
        log::info!("Watching {} with {}", url, handle);

        if self.config().show_indicator {
            if let Err(e) = self.page.show_status(RecoveryStatus::Idle) {
                log::debug!("Status indicator not drawn: {}", e);
            }
        }
        Ok(())
    }

    /// Take every observer's queue; vanished observers are forgotten
    fn drain(&mut self) -> Result<Vec<MutationRecord>> {
        let mut batch = Vec::new();
        for handle in self.state.observers.clone() {
            match self.page.drain_mutations(handle)? {
                Some(records) => batch.extend(records),
                None => {
                    log::debug!("{} no longer exists", handle);
                    self.state.observers.remove(&handle);
                }
            }
        }
        Ok(batch)
    }

    fn detach(&mut self) {
        for handle in std::mem::take(&mut self.state.observers) {
            if let Err(e) = self.page.disconnect_observer(handle) {
                log::debug!("Failed to disconnect {}: {}", handle, e);
            }
        }
        self.state.initialized = false;

        if let Err(e) = self.page.clear_status() {
            log::debug!("Status indicator not cleared: {}", e);
        }
    }
}
