// Transient upload storage
//
// Uploaded audio is written to a scratch directory under a sanitized name,
// decoded, and removed again. Concurrent uploads with the same name claim
// distinct paths through `create_new`, and `ScratchFile` deletes its file
// when dropped so every exit path cleans up.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Upper bound on `-N` suffixes tried before giving up
const MAX_NAME_ATTEMPTS: usize = 10_000;

/// Stem used when nothing of the client's stem survives sanitizing
pub const FALLBACK_STEM: &str = "upload";

/// Reduce a client-supplied filename to a safe single path component
///
/// Keeps ASCII alphanumerics, `.`, `_` and `-`; whitespace and path
/// separators become `_`; anything else is dropped. Leading and trailing
/// dots and underscores are stripped, so `../../x.wav` becomes `x.wav`.
pub fn sanitize_filename(name: &str) -> String {
    let mapped: String = name
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() => Some(c),
            '.' | '_' | '-' => Some(c),
            '/' | '\\' => Some('_'),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    // A separator replaced by `_` must not leave a `.._` prefix behind
    let trimmed = mapped.trim_matches(|c| c == '.' || c == '_');
    trimmed
        .split('_')
        .filter(|part| !part.chars().all(|c| c == '.'))
        .collect::<Vec<_>>()
        .join("_")
}

/// Split `name` into stem and lower-cased extension
///
/// Returns `None` when there is no extension or the stem is empty.
pub fn split_extension(name: &str) -> Option<(&str, String)> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some((stem, ext.to_ascii_lowercase()))
}

/// Whether `name` carries one of the `allowed` extensions (case-insensitive)
pub fn is_allowed_extension(name: &str, allowed: &[String]) -> bool {
    split_extension(name)
        .map(|(_, ext)| allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
        .unwrap_or(false)
}

/// Sanitized stem and lower-cased extension to store `filename` under
///
/// A stem with no safe characters left (`Ω.wav`) becomes `upload`.
/// `None` when the name has no extension.
pub fn storage_name(filename: &str) -> Option<(String, String)> {
    let (stem, ext) = split_extension(filename)?;
    let ext = sanitize_filename(&ext);
    if ext.is_empty() {
        return None;
    }
    let stem = match sanitize_filename(stem) {
        stem if stem.is_empty() => FALLBACK_STEM.to_string(),
        stem => stem,
    };
    Some((stem, ext))
}

/// Scratch directory for uploads in flight
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Create the store, making the directory if needed
    pub fn new<P: Into<PathBuf>>(dir: P) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under the first free name among `base.ext`,
    /// `base-1.ext`, `base-2.ext`, ...
    pub fn persist(&self, base: &str, ext: &str, bytes: &[u8]) -> io::Result<ScratchFile> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{}.{}", base, ext)
            } else {
                format!("{}-{}.{}", base, attempt, ext)
            };
            let path = self.dir.join(name);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err),
            };

            // From here on the path is ours; drop removes it on any failure
            let scratch = ScratchFile { path };
            file.write_all(bytes)?;
            file.flush()?;
            log::debug!(
                "[Uploads] Stored {} bytes at {:?}",
                bytes.len(),
                scratch.path
            );
            return Ok(scratch);
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free upload name for {}.{}", base, ext),
        ))
    }
}

/// An uploaded file that is deleted when dropped
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => log::warn!("[Uploads] Failed to remove {:?}: {}", self.path, err),
        }
    }
}
