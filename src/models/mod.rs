//! Data models for the LeitnerBox backend.
//!
//! Wire format is camelCase JSON; timestamps are RFC 3339 UTC.

mod leitner;
mod level;
mod question;
mod statistic;
mod synonym;
mod tag;

pub use leitner::*;
pub use level::*;
pub use question::*;
pub use statistic::*;
pub use synonym::*;
pub use tag::*;
