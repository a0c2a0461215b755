//! Filesystem primitives shared by the rest of rummage.
//!
//! - [`sanitize`]: rewrite file names into a safe character set.
//! - [`walk()`]: lazily enumerate files underneath a scan root.
//! - [`Organizer`]: move files into the processed / error / unsupported trees.
//! - [`remove_empty_dirs`]: collapse empty directories once files have left.

pub mod cleanup;
pub mod error;
pub mod organize;
mod path;
pub mod sanitize;
mod walk;

pub use crate::cleanup::remove_empty_dirs;
pub use crate::organize::{Destination, DestinationRoots, Organizer, move_file, unique_destination};
pub use crate::path::{MAX_PATH, extended as extended_path, relative_to, validate as validate_path};
pub use crate::sanitize::{Sanitized, safe_name, sanitize};
pub use crate::walk::{PathStream, STAGING_PREFIX, walk};
