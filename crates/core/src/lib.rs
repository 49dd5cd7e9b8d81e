pub mod model;
pub mod scoring;
pub mod session;
pub mod time;

pub use time::Clock;
