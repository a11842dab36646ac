//! Writing generated files

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::SchemaError;

/// A rendered file, with a path relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Write every file below `dir`, creating directories as needed.
///
/// Existing files are overwritten.
pub fn write_all(files: &[GeneratedFile], dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.contents)?;
        debug!(path = ?path, bytes = file.contents.len(), "Wrote file");
        written.push(path);
    }

    info!(dir = ?dir, files = written.len(), "Output written");
    Ok(written)
}

/// Write a single file, creating its parent directory
pub fn write_file(path: &Path, contents: &str) -> Result<(), SchemaError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    debug!(path = ?path, bytes = contents.len(), "Wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_all_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested/out");
        let files = vec![
            GeneratedFile::new("a.h", "// a\n"),
            GeneratedFile::new("sub/b.cc", "// b\n"),
        ];

        let written = write_all(&files, &out).unwrap();

        assert_eq!(written, [out.join("a.h"), out.join("sub/b.cc")]);
        assert_eq!(fs::read_to_string(out.join("a.h")).unwrap(), "// a\n");
        assert_eq!(fs::read_to_string(out.join("sub/b.cc")).unwrap(), "// b\n");
    }

    #[test]
    fn test_write_all_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.h"), "old").unwrap();

        write_all(&[GeneratedFile::new("a.h", "new")], tmp.path()).unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("a.h")).unwrap(), "new");
    }

    #[test]
    fn test_write_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sql/schema.sql");
        write_file(&path, "CREATE TABLE x;\n").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "CREATE TABLE x;\n");
    }
}
