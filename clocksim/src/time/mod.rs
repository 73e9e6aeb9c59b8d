mod logical_clock;
mod tick;

pub use logical_clock::LogicalClock;
pub use tick::Tick;
