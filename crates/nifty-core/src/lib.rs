//! Measurement engine for absorption features in 1-D spectra.
//!
//! [`workbench::Workbench`] is the usual entry point: it owns the spectral
//! model and the measurement session of one input set.

pub mod common;
pub mod domain;
pub mod io;
pub mod measurement;
pub mod numerics;
pub mod selection;
pub mod spectrum;
pub mod synth;
pub mod workbench;
