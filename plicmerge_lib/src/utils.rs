//! Internal helper functions and types

use anyhow::Context;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Useful extension methods for iterators
pub(crate) trait IteratorExt {
    /// Tries to collect the items of the iterator into a `Vec` that reserves the given capacity and stops as soon as an error is encountered
    ///
    /// Motivation: <https://github.com/rust-lang/rust/issues/48994>
    fn try_collect_with_capacity<T, E>(self, capacity: usize) -> Result<Vec<T>, E>
    where
        Self: Sized + Iterator<Item = Result<T, E>>;
}

impl<Iter: Iterator> IteratorExt for Iter {
    fn try_collect_with_capacity<T, E>(mut self, capacity: usize) -> Result<Vec<T>, E>
    where
        Self: Sized + Iterator<Item = Result<T, E>>,
    {
        self.try_fold(Vec::with_capacity(capacity), |mut vec, item| {
            vec.push(item?);
            Ok(vec)
        })
    }
}

/// Returns the path of the temporary sibling file used while writing `path`
pub(crate) fn temporary_path(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().map(OsString::from).unwrap_or_default();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}

/// Flushes the directory entry of `path` to disk so that a preceding rename is persisted
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<(), anyhow::Error> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(parent)
        .and_then(|dir| dir.sync_all())
        .with_context(|| format!("Unable to sync directory \"{}\"", parent.display()))
}

/// Directories cannot be opened as files on this platform, the rename is left to the OS
#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Writes a file by writing to a temporary sibling first and renaming it to the final path afterwards
///
/// The final path either keeps its previous content or receives the complete new content. If writing
/// fails, the temporary file is removed again.
pub(crate) fn write_atomically<P, F>(path: P, write_content: F) -> Result<(), anyhow::Error>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<File>) -> Result<(), anyhow::Error>,
{
    let path = path.as_ref();
    let temp_path = temporary_path(path);

    let result = (|| -> Result<(), anyhow::Error> {
        let file = File::create(&temp_path).with_context(|| {
            format!("Unable to create temporary file \"{}\"", temp_path.display())
        })?;
        let mut writer = BufWriter::new(file);
        write_content(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&temp_path, path).with_context(|| {
            format!(
                "Unable to move temporary file \"{}\" to \"{}\"",
                temp_path.display(),
                path.display()
            )
        })?;

        sync_parent_dir(path)
    })();

    if result.is_err() && temp_path.exists() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}
