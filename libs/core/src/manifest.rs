use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use failure::Error;
use log::{debug, trace};
use serde_derive::{Deserialize, Serialize};

use crate::tag::CompoundTag;
use crate::utils::{sha256_hex, write_atomically, write_json_atomically};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub hash: String,
    pub size: u64,
}

/// Remembers the hash of every output written, so unchanged outputs are not rewritten.
#[derive(Debug)]
pub struct Manifest {
    location: PathBuf,
    entries: IndexMap<String, ManifestEntry>,
}
impl Manifest {
    pub fn load(location: PathBuf) -> Result<Manifest, Error> {
        let entries = if location.exists() {
            ::serde_json::from_reader(BufReader::new(File::open(&location)?))?
        } else {
            IndexMap::new()
        };
        Ok(Manifest { location, entries })
    }
    #[inline]
    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.get(key)
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn save(&self) -> Result<(), Error> {
        write_json_atomically(&self.location, &self.entries)
    }
    /// Serialize `tag` to `path` unless an identical output is already there.
    ///
    /// Returns whether the file was written. The manifest is saved after every write.
    pub fn write_tag(&mut self, key: &str, path: &Path, tag: &CompoundTag) -> Result<bool, Error> {
        let bytes = tag.to_bytes()?;
        let entry = ManifestEntry { hash: sha256_hex(&bytes), size: bytes.len() as u64 };
        if path.exists() && self.entries.get(key) == Some(&entry) {
            debug!("{}: Unchanged, skipping write", key);
            return Ok(false)
        }
        write_atomically(path, &bytes)?;
        trace!("{}: Wrote {} bytes to {}", key, entry.size, path.display());
        self.entries.insert(key.to_string(), entry);
        self.save()?;
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tag::Tag;

    #[test]
    fn skips_unchanged_outputs() {
        let dir = ::tempfile::tempdir().unwrap();
        let manifest_path = dir.path().join("manifest.json");
        let output = dir.path().join("mappings-1.19to1.20.nbt");
        let mut tag = CompoundTag::new();
        tag.put("v", Tag::Int(1));

        let mut manifest = Manifest::load(manifest_path.clone()).unwrap();
        assert!(manifest.write_tag("1.19to1.20", &output, &tag).unwrap());
        assert!(!manifest.write_tag("1.19to1.20", &output, &tag).unwrap());

        // Reloading keeps the hashes
        let mut manifest = Manifest::load(manifest_path).unwrap();
        assert_eq!(manifest.len(), 1);
        assert!(!manifest.write_tag("1.19to1.20", &output, &tag).unwrap());
        tag.put("extra", Tag::Int(2));
        assert!(manifest.write_tag("1.19to1.20", &output, &tag).unwrap());
        // A deleted output is written again
        ::std::fs::remove_file(&output).unwrap();
        assert!(manifest.write_tag("1.19to1.20", &output, &tag).unwrap());
    }
}
