// src/scheduler/mod.rs - Resample cadence and timers
pub mod poll;
pub mod timer;

pub use poll::{PollScheduler, PollState};
pub use timer::Timer;
