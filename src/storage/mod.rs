//!  Storage is organized through [key_value::KeyValueStore].
//!  The basic idea is:
//!   - There is a directory acting as a local key-value storage, one file per key.
//!   - All habits live under a single key as one JSON array, see [habit_store::HabitStore].
//!   - Writes always replace the whole list.

use std::path::{Path, PathBuf};

pub mod entities;
pub mod habit_store;
pub mod key_value;

/// Directory of the key-value storage inside the application directory.
pub fn store_dir(application_dir: &Path) -> PathBuf {
    application_dir.join("store")
}
