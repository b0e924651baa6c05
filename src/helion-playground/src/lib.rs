//! Playground for Helion: sample datasets and print helpers used by the
//! demo binaries.

pub mod data;
pub mod utils;

pub use data::{create_collision_sample, create_scan_sample};
pub use utils::{print_header, print_section};
