use crate::{JournalError, Result};

use std::path::{Path, PathBuf};

/// Works out which file an `include` directive points at.
pub(crate) struct IncludeResolver<'r> {
    /// Directory context handed down by whoever started this parse.
    pub(crate) parent_dir: &'r Path,
    /// The file containing the directive, when reading from a file.
    pub(crate) including_file: Option<&'r Path>,
}

impl<'r> IncludeResolver<'r> {
    /// The raw path is taken relative to the including file first. If that
    /// doesn't land in the parent directory it is joined onto it; absolute
    /// paths survive the join untouched.
    pub(crate) fn resolve(&self, raw: &str) -> Result<PathBuf> {
        let candidate = match self.including_file.and_then(Path::parent) {
            Some(dir) => dir.join(raw),
            None => PathBuf::from(raw),
        };

        let resolved = if candidate.parent() != Some(self.parent_dir) {
            self.parent_dir.join(&candidate)
        } else {
            candidate
        };

        if !resolved.is_file() {
            return Err(JournalError::MissingIncludeFile {
                raw: raw.to_string(),
                resolved,
            });
        }
        Ok(resolved)
    }
}
