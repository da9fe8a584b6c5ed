//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - Sweep: Removes expired and evictable entries at a configured interval

mod sweep;

pub use sweep::{spawn_sweep_task, Sweep};
