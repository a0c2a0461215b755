//! The scan loop: sanitize, classify, then extract or expand, then organize.
//!
//! [`scan`] enumerates the scan root lazily and handles files concurrently.
//! Archives are expanded in place with nothing else in flight, after which
//! enumeration starts over so the new members are picked up. The
//! [`ScanState`] carries the pass counter and the set of visited paths from
//! one pass to the next.

pub mod error;
mod file;
mod first_level;
mod state;
mod stream;

pub use self::file::{FileReport, Handling, OrganizeOutcome, handle_file};
pub use self::first_level::expand_first_level;
pub use self::state::{Phase, ScanState, Visited};
pub use self::stream::{ScanEvent, Summary, scan};
