//! # Shift Testing Utils
//!
//! Shared testing utilities for the shift ingest service.
//! This crate provides mock implementations of all domain ports so the
//! other crates in the workspace can unit test without a database, a
//! message broker or a live platform instance.
//!
//! ## Usage
//!
//! Add this crate as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! shift-testing-utils = { path = "../testing-utils" }
//! ```
//!
//! Then use the mocks in your tests:
//!
//! ```rust
//! use shift_testing_utils::mocks::*;
//! ```

pub mod mocks;

pub use mocks::{
    MockJobQueue, MockPlatformDirectory, MockTaskStore, RecordingExtension,
};
