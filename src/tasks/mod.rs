//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache
//! engine is in use.
//!
//! # Tasks
//! - Idle Reaper: closes pooled connections past the idle timeout

mod reaper;

pub use reaper::spawn_reaper_task;
