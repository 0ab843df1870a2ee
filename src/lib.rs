//! Inkpost - consistency core for a content-management backend.
//!
//! Keeps denormalized counters (comment counts, like counts, per-category and
//! per-tag post counts, website totals) in step across independently-owned
//! modules through an in-process publish/subscribe bus, and owns the
//! comment/reply moderation state machine that is the bus's main producer.

pub mod app;
pub mod bus;
pub mod config;
pub mod domain;
pub mod events;
pub mod notify;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
