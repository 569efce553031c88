//! Per-render resource accounting.
//!
//! A [`RenderGuard`] is created for every render call from the immutable
//! [`ProtectionSettings`] and owned by that render's
//! [`Context`](crate::context::Context). It is never shared, so concurrent
//! renders of one template cannot observe each other's counters.
//!
//! Checkpoints:
//! - every node boundary: elapsed time and output size
//! - every loop iteration: iteration count and elapsed time
//! - every block, loop body or partial entry: nesting depth
//! - every filter result and every `assign`/`capture`: size of the value

use std::time::Instant;

use crate::config::ProtectionSettings;
use crate::context::Value;
use crate::core::{LimitKind, RenderError};

/// Mutable counters for a single render.
#[derive(Debug)]
pub struct RenderGuard {
    settings: ProtectionSettings,
    started: Instant,
    depth: usize,
}

impl RenderGuard {
    /// Seed a guard from settings; the render-time clock starts now.
    pub fn new(settings: &ProtectionSettings) -> Self {
        Self {
            settings: *settings,
            started: Instant::now(),
            depth: 0,
        }
    }

    pub fn settings(&self) -> &ProtectionSettings {
        &self.settings
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Check the wall-clock budget.
    pub fn checkpoint(&self) -> Result<(), RenderError> {
        if !self.settings.enabled {
            return Ok(());
        }

        let elapsed = self.started.elapsed();
        if elapsed > self.settings.max_render_time() {
            let observed = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
            return Err(self.tripped(LimitKind::RenderTime, observed, self.settings.max_render_time_ms));
        }
        Ok(())
    }

    /// Enter a nested scope.
    ///
    /// On success the caller must pair this with [`exit`](Self::exit).
    /// On failure the depth is left unchanged.
    pub fn enter(&mut self) -> Result<(), RenderError> {
        let next = self.depth + 1;
        if self.settings.enabled && next > self.settings.max_depth {
            return Err(self.tripped(LimitKind::Depth, next as u64, self.settings.max_depth as u64));
        }
        self.depth = next;
        Ok(())
    }

    /// Leave a nested scope entered with [`enter`](Self::enter).
    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Check a loop before running its `iteration`-th pass (1-based).
    ///
    /// With a limit of `N`, iterations `1..=N` pass and `N + 1` fails.
    pub fn check_iteration(&self, iteration: usize) -> Result<(), RenderError> {
        if !self.settings.enabled {
            return Ok(());
        }
        if iteration > self.settings.max_iterations {
            return Err(self.tripped(
                LimitKind::Iterations,
                iteration as u64,
                self.settings.max_iterations as u64,
            ));
        }
        self.checkpoint()
    }

    /// Check the size of the output produced so far.
    pub fn check_output(&self, len: usize) -> Result<(), RenderError> {
        if self.settings.enabled && len > self.settings.max_output_bytes {
            return Err(self.tripped(
                LimitKind::OutputSize,
                len as u64,
                self.settings.max_output_bytes as u64,
            ));
        }
        Ok(())
    }

    /// Check a value built during the render.
    ///
    /// Strings count against the output limit and arrays against the
    /// iteration limit, so values cannot outgrow what the render could emit
    /// or loop over.
    pub fn check_value(&self, value: &Value) -> Result<(), RenderError> {
        match value {
            Value::Str(s) => self.check_output(s.len()),
            Value::Array(items) if self.settings.enabled && items.len() > self.settings.max_iterations => {
                Err(self.tripped(
                    LimitKind::Iterations,
                    items.len() as u64,
                    self.settings.max_iterations as u64,
                ))
            }
            _ => Ok(()),
        }
    }

    fn tripped(&self, limit: LimitKind, observed: u64, max: u64) -> RenderError {
        tracing::warn!(%limit, observed, max, depth = self.depth, "Render aborted by protection limit");
        RenderError::LimitExceeded {
            limit,
            observed,
            max,
        }
    }
}
