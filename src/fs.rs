//! Filesystem capability consumed by the loader.
//!
//! Mount points, caches, and the settings file all resolve against this
//! trait rather than `std::fs` directly, so tests can interpose counting or
//! fault-injecting wrappers and hosts can supply virtual filesystems.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Durable text storage with existence checks, write-time queries, and
/// one-level directory listing.
pub trait Filesystem: Send + Sync {
    /// Read a file as UTF-8 text, returning `default` if it does not exist.
    ///
    /// A file that exists but cannot be read (locked, permission denied) is
    /// an error, not the default.
    fn read_to_string_or(&self, path: &Path, default: &str) -> io::Result<String>;

    /// Write UTF-8 text, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Last-write time of the file at `path`, if it exists and the
    /// underlying store tracks one.
    fn last_write_time_utc(&self, path: &Path) -> Option<DateTime<Utc>>;

    /// List the files (not directories) directly inside `dir`.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// [`Filesystem`] backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalFileSystem;

impl Filesystem for PhysicalFileSystem {
    fn read_to_string_or(&self, path: &Path, default: &str) -> io::Result<String> {
        if !path.exists() {
            return Ok(default.to_string());
        }
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn last_write_time_utc(&self, path: &Path) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(path).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}
