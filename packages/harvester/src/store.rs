//! Durable sinks for harvested records.
//!
//! [`DirectoryRecordStore`] writes one file per record and metadata format,
//! named `{identifier}.{prefix}.xml` with the name percent-escaped so any
//! provider identifier maps to a safe path below the destination.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use crate::error::Result;
use crate::record::Record;

/// Destination for harvested records.
pub trait RecordStore {
    /// Persist a live record, replacing any earlier version.
    fn write(&mut self, record: &Record, metadata_prefix: &str) -> Result<()>;

    /// Remove a record. Removing something that is not there succeeds.
    fn delete(&mut self, record: &Record, metadata_prefix: &str) -> Result<()>;
}

/// How identifiers are mapped onto sub-directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubdirMode {
    /// Every record lands directly in the destination directory.
    #[default]
    Flat,
    /// Each occurrence of the character starts a new directory level.
    Split(char),
}

impl SubdirMode {
    /// Mode for the legacy `--create-subdirs` flag: split on `/`.
    pub fn slashes() -> Self {
        Self::Split('/')
    }
}

/// Stores each record as a file in a directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryRecordStore {
    directory: PathBuf,
    subdirs: SubdirMode,
}

impl DirectoryRecordStore {
    pub fn new(directory: impl Into<PathBuf>, subdirs: SubdirMode) -> Self {
        Self {
            directory: directory.into(),
            subdirs,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file holding `identifier` in `metadata_prefix` format.
    ///
    /// # Examples
    /// ```
    /// use std::path::Path;
    /// use oaiharvest_harvester::store::{DirectoryRecordStore, SubdirMode};
    ///
    /// let store = DirectoryRecordStore::new("out", SubdirMode::Flat);
    /// let path = store.output_path("oai:repo:1 2", "oai_dc");
    /// # #[cfg(unix)]
    /// assert_eq!(path, Path::new("out/oai:repo:1%202.oai_dc.xml"));
    /// ```
    pub fn output_path(&self, identifier: &str, metadata_prefix: &str) -> PathBuf {
        let filename = format!("{identifier}.{metadata_prefix}.xml");
        let mut path = self.directory.clone();

        match self.subdirs {
            SubdirMode::Flat => path.push(escape_segment(&filename)),
            SubdirMode::Split(separator) => {
                let filename = filename.replace(separator, &MAIN_SEPARATOR.to_string());
                filename
                    .split(MAIN_SEPARATOR)
                    .filter(|segment| !segment.is_empty())
                    .for_each(|segment| path.push(escape_segment(segment)));
            }
        }

        path
    }
}

impl RecordStore for DirectoryRecordStore {
    fn write(&mut self, record: &Record, metadata_prefix: &str) -> Result<()> {
        let output_file = self.output_path(&record.identifier, metadata_prefix);
        let output_dir = output_file.parent().unwrap_or(&self.directory);
        if !output_dir.is_dir() {
            tracing::debug!(directory = %output_dir.display(), "Creating target directory");
            fs::create_dir_all(output_dir)?;
        }

        let file_name = output_file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_file = output_dir.join(format!(".{file_name}.tmp"));

        tracing::debug!(path = %output_file.display(), "Writing record");
        {
            let mut file = File::create(&temp_file)?;
            file.write_all(record.metadata.as_deref().unwrap_or_default().as_bytes())?;
            file.sync_all()?;
        }

        // On Windows, rename fails if the destination already exists
        #[cfg(target_os = "windows")]
        if output_file.exists() {
            fs::remove_file(&output_file)?;
        }

        fs::rename(&temp_file, &output_file)?;
        Ok(())
    }

    fn delete(&mut self, record: &Record, metadata_prefix: &str) -> Result<()> {
        let output_file = self.output_path(&record.identifier, metadata_prefix);
        match fs::remove_file(&output_file) {
            Ok(()) => {
                tracing::debug!(path = %output_file.display(), "Removed deleted record");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %output_file.display(), "Deleted record was never stored");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Percent-escape one path segment.
///
/// ASCII alphanumerics and `_ . - ~` are kept, as is `:` outside Windows.
/// Segments that would name the current or parent directory are escaped
/// in full.
fn escape_segment(segment: &str) -> String {
    let escaped = if cfg!(windows) {
        urlencoding::encode(segment).into_owned()
    } else {
        segment
            .split(':')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join(":")
    };

    match escaped.as_str() {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => escaped,
    }
}
