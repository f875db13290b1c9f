//! # Walker Module
//!
//! Walks a track's token tree and produces timed events.
//!
//! ## Sub-modules
//! - `types` - result types (`SubtrackResult`, `TrackResult`, notation marks)
//! - `repeat` - repeat/volta/coda expansion of subtrack content
//! - `track` - token dispatch, bar bookkeeping and merging of nested walks
//!
//! ## Bars
//!
//! Beats accumulate in `bar_first` until the first bar closes and in
//! `bar_last` afterwards. A bar line closes the open accumulator only when it
//! holds beats, so repeated or leading bar lines don't count as bars.
//!
//! ```text
//! | 1 1 1 1 | 1 1 1 1 | 1 1
//!   bar_first  bar_last   bar_last (open, never checked at the end)
//! ```
//!
//! A nested walk starts with its own counters. When it returns, its first bar
//! is joined onto whatever the parent had open:
//!
//! ```text
//! parent:  1 1 { 1 1 | 1 1 1 1 | 1 }
//!          └──┬──┘ └─┘
//!             └─ checked together against Bar
//! ```
//!
//! Inside a nested walk the first bar is never checked on its own; only the
//! parent knows how many beats came before it.

mod repeat;
mod track;
mod types;


pub use repeat::expand;
pub(crate) use track::SubtrackWalker;
pub use track::TrackWalker;
pub use types::{NotationBuckets, NotationMark, SubtrackResult, TrackResult};
