//! Snapshot archive reader
//!
//! Reads `.tar.zst` snapshots and validates their structure. Every read
//! path decompresses the whole zstd frame so the frame checksum is checked.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path};

use boardkeep_core::{BoardError, BoardResult};
use tar::Archive;

/// Summary of a structurally valid snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotVerifyInfo {
    /// Number of file entries
    pub entry_count: usize,
    /// Sum of uncompressed entry sizes
    pub uncompressed_bytes: u64,
    /// Archive size on disk
    pub archive_bytes: u64,
}

/// Reader for snapshot archives
pub struct SnapshotReader;

impl SnapshotReader {
    /// Check that an archive exists, is non-empty, decompresses cleanly and
    /// that every entry can be read to its end.
    pub fn verify(path: &Path) -> BoardResult<SnapshotVerifyInfo> {
        let archive_bytes = fs::metadata(path)
            .map_err(|e| BoardError::io(path, e))?
            .len();
        if archive_bytes == 0 {
            return Err(BoardError::archive(format!(
                "{} is empty",
                path.display()
            )));
        }

        let mut entry_count = 0usize;
        let mut uncompressed_bytes = 0u64;
        Self::for_each_entry(path, |_, entry| {
            uncompressed_bytes += io::copy(entry, &mut io::sink())
                .map_err(|e| BoardError::archive(format!("read entry: {}", e)))?;
            entry_count += 1;
            Ok(())
        })?;

        Ok(SnapshotVerifyInfo {
            entry_count,
            uncompressed_bytes,
            archive_bytes,
        })
    }

    /// Relative paths of every file entry, in archive order
    pub fn list_entries(path: &Path) -> BoardResult<Vec<String>> {
        let mut names = Vec::new();
        Self::for_each_entry(path, |name, _| {
            names.push(name.to_string());
            Ok(())
        })?;
        Ok(names)
    }

    /// Contents of one entry, or `None` if the archive does not hold it
    pub fn read_entry(path: &Path, relative: &str) -> BoardResult<Option<Vec<u8>>> {
        let mut found = None;
        Self::for_each_entry(path, |name, entry| {
            if found.is_none() && name == relative {
                let mut data = Vec::new();
                entry
                    .read_to_end(&mut data)
                    .map_err(|e| BoardError::archive(format!("read {}: {}", relative, e)))?;
                found = Some(data);
            }
            Ok(())
        })?;
        Ok(found)
    }

    /// All entries as relative path → bytes
    pub fn read_all(path: &Path) -> BoardResult<BTreeMap<String, Vec<u8>>> {
        let mut files = BTreeMap::new();
        Self::for_each_entry(path, |name, entry| {
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| BoardError::archive(format!("read {}: {}", name, e)))?;
            files.insert(name.to_string(), data);
            Ok(())
        })?;
        Ok(files)
    }

    /// Visit each regular-file entry. Entry paths are validated to be
    /// relative and free of `..` before the callback sees them, and the
    /// stream is drained afterwards so trailing corruption is detected.
    fn for_each_entry<F>(path: &Path, mut f: F) -> BoardResult<()>
    where
        F: FnMut(&str, &mut dyn Read) -> BoardResult<()>,
    {
        let file = File::open(path).map_err(|e| BoardError::io(path, e))?;
        let decoder = zstd::Decoder::new(BufReader::new(file))
            .map_err(|e| BoardError::compression(format!("zstd decode: {}", e)))?;
        let mut archive = Archive::new(decoder);

        let entries = archive
            .entries()
            .map_err(|e| BoardError::archive(format!("{}: {}", path.display(), e)))?;
        for entry in entries {
            let mut entry =
                entry.map_err(|e| BoardError::archive(format!("{}: {}", path.display(), e)))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = {
                let entry_path = entry
                    .path()
                    .map_err(|e| BoardError::archive(format!("entry path: {}", e)))?;
                validate_relative(&entry_path)?;
                entry_path.to_string_lossy().replace('\\', "/")
            };
            f(&name, &mut entry)?;
        }

        let mut decoder = archive.into_inner();
        io::copy(&mut decoder, &mut io::sink())
            .map_err(|e| BoardError::compression(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}

fn validate_relative(path: &Path) -> BoardResult<()> {
    let ok = path.components().all(|c| matches!(c, Component::Normal(_)));
    if ok && path.components().next().is_some() {
        Ok(())
    } else {
        Err(BoardError::archive(format!(
            "unsafe entry path '{}'",
            path.display()
        )))
    }
}
