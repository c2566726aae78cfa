//! Kp Index Space Weather Monitor
//!
//! Tracks the ensemble Kp geomagnetic forecast published by GFZ Potsdam,
//! evaluates it against an operator-defined alert threshold, and sends
//! email alerts when storm conditions are forecast — at most once per
//! cooldown window.
//!
//! The pipeline per invocation is:
//! fetch → `ingest::forecast::parse` → `analysis::evaluation::evaluate`
//! → `alert::cooldown::check_and_update` → (if fired) `notify`.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod dev_mode;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod notify;
