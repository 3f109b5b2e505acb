//! Container Index: ranked lookup across one or more ZIP archives.

use crate::error::{AnalyzerError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

fn normalize(name: &str) -> String {
    name.replace('\\', "/").to_lowercase()
}

struct OpenedArchive {
    archive: ZipArchive<File>,
    /// normalized name -> entry index, built once at open time so repeated
    /// find_entry calls never rescan the central directory.
    index: HashMap<String, usize>,
}

/// Opens and indexes a ranked list of archives; `find_entry` consults them
/// in input order and returns the first hit.
pub struct ContainerIndex {
    archives: Vec<OpenedArchive>,
}

impl ContainerIndex {
    /// Opens every existing path as a ZIP archive. Missing paths are skipped.
    /// Zero openable archives is fatal.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut archives = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                tracing::warn!(path = %path.display(), "container path does not exist, skipping");
                continue;
            }
            let file = match File::open(path) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not open container");
                    continue;
                }
            };
            let mut archive = match ZipArchive::new(file) {
                Ok(a) => a,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "not a valid zip container");
                    continue;
                }
            };
            let mut index = HashMap::with_capacity(archive.len());
            for i in 0..archive.len() {
                if let Ok(entry) = archive.by_index(i) {
                    index.insert(normalize(entry.name()), i);
                }
            }
            archives.push(OpenedArchive { archive, index });
        }

        if archives.is_empty() {
            return Err(AnalyzerError::no_containers(
                "no archive in the input list could be opened",
            ));
        }

        Ok(Self { archives })
    }

    /// First-hit-wins lookup across archives in open order, case-insensitive
    /// with backslashes normalized to forward slashes.
    pub fn find_entry(&mut self, path: &str) -> Option<Vec<u8>> {
        let key = normalize(path);
        for opened in &mut self.archives {
            if let Some(&idx) = opened.index.get(&key) {
                let mut entry = match opened.archive.by_index(idx) {
                    Ok(e) => e,
                    Err(_) => continue,
                };
                let mut buf = Vec::with_capacity(entry.size() as usize);
                if entry.read_to_end(&mut buf).is_ok() {
                    return Some(buf);
                }
            }
        }
        None
    }

    /// Iterates (archive_index, normalized_name) across all open archives.
    pub fn iter_entries(&self) -> impl Iterator<Item = (usize, &str)> {
        self.archives.iter().enumerate().flat_map(|(i, opened)| {
            opened.index.keys().map(move |name| (i, name.as_str()))
        })
    }

    pub fn archive_count(&self) -> usize {
        self.archives.len()
    }
}
