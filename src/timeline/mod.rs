//! Day timeline: status derivation, merging, summaries and the reducer that
//! owns live state.

mod aggregate;
pub mod reducer;
mod status;
mod summary;

pub use aggregate::*;
pub use reducer::{TimelineEvent, TimelineHandle, TimelineState};
pub use status::*;
pub use summary::*;
