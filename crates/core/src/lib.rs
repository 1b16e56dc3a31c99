#![forbid(unsafe_code)]

pub mod analysis;
pub mod error;
pub mod merge;
pub mod model;
pub mod time;

pub use error::Error;
pub use time::Clock;
