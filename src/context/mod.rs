//! Per-render evaluation state.
//!
//! A [`Context`] holds the scope chain, the render's [`RenderGuard`] and the
//! registers that tags keep between invocations (counters, cycle positions,
//! the last `ifchanged` output, a pending `break`/`continue`). One context is
//! created for every render call and dropped when it returns.
//!
//! Scope chain:
//! - frame 0 is the render data
//! - [`Context::nested`] pushes a frame for the duration of a closure and
//!   always pops it again, also when the closure fails
//! - lookups walk the frames innermost first

mod value;

pub use value::{Object, Value};

pub(crate) use value::range_len;

use std::collections::HashMap;

use crate::config::{Flavor, ProtectionSettings};
use crate::guard::RenderGuard;
use crate::registry::Registry;
use crate::core::RenderError;

/// Loop control requested by `break` or `continue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Break,
    Continue,
}

/// Evaluation state of one render.
#[derive(Debug)]
pub struct Context<'a> {
    frames: Vec<Object>,
    flavor: Flavor,
    registry: &'a Registry,
    guard: RenderGuard,
    counters: HashMap<String, i64>,
    cycles: HashMap<String, usize>,
    last_ifchanged: Option<String>,
    interrupt: Option<Interrupt>,
}

impl<'a> Context<'a> {
    /// Start a render over `data`.
    pub fn new(
        data: Object,
        flavor: Flavor,
        registry: &'a Registry,
        protection: &ProtectionSettings,
    ) -> Self {
        Self {
            frames: vec![data],
            flavor,
            registry,
            guard: RenderGuard::new(protection),
            counters: HashMap::new(),
            cycles: HashMap::new(),
            last_ifchanged: None,
            interrupt: None,
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn guard(&self) -> &RenderGuard {
        &self.guard
    }

    /// Look `name` up, innermost frame first.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Bind a variable the way `assign` and `capture` do.
    ///
    /// Strict templates bind in the innermost frame; Liquid templates bind
    /// render-wide so values assigned inside blocks and loops survive them.
    /// Inner bindings of the same name, such as a loop variable, keep
    /// shadowing the render-wide one until their frame ends.
    ///
    /// # Errors
    ///
    /// [`RenderError::LimitExceeded`] when the value is larger than the
    /// render's protection limits allow.
    pub fn assign(&mut self, name: impl Into<String>, value: Value) -> Result<(), RenderError> {
        self.guard.check_value(&value)?;
        let name = name.into();
        if self.flavor.is_strict() {
            self.set_local(name, value);
        } else if let Some(root) = self.frames.first_mut() {
            root.insert(name, value);
        }
        Ok(())
    }

    /// Bind a variable in the innermost frame only.
    pub fn set_local(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Run `f` inside a new scope frame one nesting level deeper.
    ///
    /// The frame and the depth counter are restored whatever `f` returns.
    pub fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, RenderError>,
    ) -> Result<T, RenderError> {
        self.guard.enter()?;
        self.frames.push(Object::new());
        let result = f(self);
        self.frames.pop();
        self.guard.exit();
        result
    }

    /// Number of frames in the scope chain, including the data frame.
    pub fn scope_depth(&self) -> usize {
        self.frames.len()
    }

    /// All bound names, innermost first and without duplicates.
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for frame in self.frames.iter().rev() {
            for name in frame.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Return the counter value and advance it by `step`.
    ///
    /// `increment` reads before stepping, `decrement` reads after.
    pub fn step_counter(&mut self, name: &str, step: i64) -> i64 {
        let counter = self.counters.entry(name.to_string()).or_insert(0);
        let before = *counter;
        *counter = before.saturating_add(step);
        before
    }

    /// Position of the next value in cycle group `key`, then advance it.
    pub fn next_cycle(&mut self, key: &str, len: usize) -> usize {
        let position = self.cycles.entry(key.to_string()).or_insert(0);
        let current = *position % len.max(1);
        *position = current + 1;
        current
    }

    /// Record `output` as the latest `ifchanged` body; true when it differs
    /// from the previous one.
    pub fn ifchanged(&mut self, output: &str) -> bool {
        if self.last_ifchanged.as_deref() == Some(output) {
            return false;
        }
        self.last_ifchanged = Some(output.to_string());
        true
    }

    pub fn interrupt(&mut self, interrupt: Interrupt) {
        self.interrupt = Some(interrupt);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_some()
    }

    /// Clear and return the pending interrupt.
    pub fn take_interrupt(&mut self) -> Option<Interrupt> {
        self.interrupt.take()
    }
}
