//! Domain model for lesson templates and their deployed copies.
//!
//! # Responsibility
//! - Define the template header, its ordered parts/activities and the
//!   assignment instance shape that snapshots them.
//! - Keep ownership explicit: a part belongs to exactly one template or one
//!   instance, an activity to exactly one part.
//!
//! # Invariants
//! - Part positions are dense and 1-based within their owner.
//! - Activity positions are dense and 1-based within their part.

pub mod instance;
pub mod reference;
pub mod template;

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
