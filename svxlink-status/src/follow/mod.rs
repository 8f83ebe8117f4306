//! Rotation-aware log following
//!
//! Implements `tail -F` style reading of a single log file: only lines written
//! after the follower attaches are returned, and the file is reopened when it
//! is replaced (new inode) or truncated.

pub mod file_id;
pub mod follower;

pub use file_id::FileId;
pub use follower::{Follow, LogFollower};
