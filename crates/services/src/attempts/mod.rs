mod service;
mod timer;

pub use service::{Attempt, AttemptService, AttemptSnapshot, DEFAULT_TICK_PERIOD};
pub use timer::{SessionTimer, SharedSession};
