#![forbid(unsafe_code)]

pub mod completion;
pub mod evaluator;
pub mod generator;
pub mod input;
pub mod model;
pub mod stats;
pub mod time;

pub use time::Clock;
