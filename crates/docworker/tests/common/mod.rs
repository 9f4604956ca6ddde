//! Shared test utilities for docworker integration tests.
//!
//! This module provides:
//! - `TestHarness`: an in-memory store wired to a `Pipeline`
//! - Scripted extraction and recording notifier fakes

pub mod fakes;
pub mod harness;

pub use fakes::{RecordingNotifier, Script, ScriptedExtraction};
pub use harness::TestHarness;
