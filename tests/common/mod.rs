//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestLibrary, TrackTags};
//!
//! #[test]
//! fn test_index_one_track() {
//!     let lib = TestLibrary::new();
//!     lib.add_track("a/song.wav", &TrackTags::new("Song", "Artist", "Album"));
//!
//!     let report = lib.index();
//!     assert_eq!(report.tracks_indexed, 1);
//! }
//! ```

mod fixtures;
mod library;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use fixtures::{write_corrupt, write_tagged_wav, write_wav, TrackTags};
pub use library::TestLibrary;
