//! quadcomp - composite density correction for quad calibration
//!
//! Loads a session file (channels, base curves, measurement), runs the
//! composite density solver and keeps the diagnostics of the last run.
//! This library exposes modules for integration testing.

pub mod assets;
pub mod error;
pub mod models;
pub mod services;
