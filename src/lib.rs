//! Bookkeeping for an asynchronous audio-processing pipeline.
//!
//! - [`reconcile`] removes stored outputs whose job record is gone.
//! - [`job::TransitionDetector`] turns a before/after status pair into at most
//!   one completion or failure notification.
//! - [`stats`] tallies job records per status.
//!
//! Storage and registry access goes through the traits in [`backend`].

pub mod backend;
pub mod config;
pub mod error;
pub mod job;
pub mod notify;
pub mod reconcile;
pub mod report;
pub mod stats;

pub use error::{KeeperError, NotifyError};
