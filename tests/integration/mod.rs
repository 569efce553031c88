//! Integration test suite for liqrs
//!
//! End-to-end tests that go from template source to rendered output through
//! the public API only.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **concurrency**: shared templates rendered from many tasks
//! - **config**: TOML configuration and the [`liqrs::Engine`]
//! - **filters**: standard filters through full templates
//! - **flavor**: strict versus Liquid behavior
//! - **partials**: `include` with linked and late-bound partials
//! - **protection**: resource limits
//! - **tags**: standard tags working together
//! - **whitespace**: trim markers, global stripping and line endings

mod concurrency;
mod config;
mod filters;
mod flavor;
mod partials;
mod protection;
mod tags;
mod whitespace;
