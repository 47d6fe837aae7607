use std::fs;
use std::path::{Path, PathBuf};

use failure::Error;
use failure_derive::Fail;
use itertools::Itertools;

use crate::identifiers::MappingsFile;
use crate::overrides::DiffFile;

const MAPPING_FILE_PREFIX: &str = "mapping-";
const JSON_SUFFIX: &str = ".json";

#[derive(Debug, Fail)]
#[fail(display = "Mapping file for version {} does not exist at {}", version, location)]
pub struct MissingMappingsFile {
    pub version: String,
    pub location: String,
}

/// Where identifier files are read from and compacted outputs are written to.
#[derive(Clone, Debug)]
pub struct MappingsLayout {
    mappings_dir: PathBuf,
    output_dir: PathBuf,
}
impl MappingsLayout {
    pub fn setup(mappings_dir: PathBuf, output_dir: PathBuf) -> Result<MappingsLayout, Error> {
        fs::create_dir_all(&mappings_dir)?;
        fs::create_dir_all(output_dir.join("backwards"))?;
        Ok(MappingsLayout { mappings_dir, output_dir })
    }
    #[inline]
    pub fn mappings_dir(&self) -> &Path {
        &self.mappings_dir
    }
    #[inline]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
    #[inline]
    pub fn mapping_file(&self, version: &str) -> PathBuf {
        self.mappings_dir.join(format!("{}{}{}", MAPPING_FILE_PREFIX, version, JSON_SUFFIX))
    }
    #[inline]
    pub fn diff_file(&self, from: &str, to: &str) -> PathBuf {
        self.mappings_dir.join(format!("diff/mapping-{}to{}.json", from, to))
    }
    pub fn output_file(&self, from: &str, to: &str, backwards: bool) -> PathBuf {
        let name = format!("mappings-{}to{}.nbt", from, to);
        if backwards {
            self.output_dir.join("backwards").join(name)
        } else {
            self.output_dir.join(name)
        }
    }
    #[inline]
    pub fn identifiers_file(&self, version: &str) -> PathBuf {
        self.output_dir.join(format!("identifiers-{}.nbt", version))
    }
    #[inline]
    pub fn registry_file(&self) -> PathBuf {
        self.output_dir.join("identifier-table.json")
    }
    #[inline]
    pub fn registry_table_file(&self) -> PathBuf {
        self.output_dir.join("identifier-table.nbt")
    }
    #[inline]
    pub fn manifest_file(&self) -> PathBuf {
        self.output_dir.join("manifest.json")
    }
    /// Load the identifiers of `version`, which must exist.
    pub fn load_mappings(&self, version: &str) -> Result<MappingsFile, Error> {
        let location = self.mapping_file(version);
        match MappingsFile::load(&location)? {
            Some(file) => Ok(file),
            None => Err(MissingMappingsFile {
                version: version.into(),
                location: location.display().to_string()
            }.into())
        }
    }
    #[inline]
    pub fn load_diff(&self, from: &str, to: &str) -> Result<Option<DiffFile>, Error> {
        DiffFile::load(&self.diff_file(from, to))
    }
    /// Every version with a `mapping-<version>.json` file, in directory order.
    pub fn discover_versions(&self) -> Result<Vec<String>, Error> {
        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.mappings_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue
            }
            let name = entry.file_name();
            let name = match name.to_str() {
                Some(name) => name,
                None => continue
            };
            if name.starts_with(MAPPING_FILE_PREFIX) && name.ends_with(JSON_SUFFIX) {
                versions.push(name[MAPPING_FILE_PREFIX.len()..(name.len() - JSON_SUFFIX.len())].to_string());
            }
        }
        Ok(versions.into_iter().sorted().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn file_names() {
        let layout = MappingsLayout {
            mappings_dir: PathBuf::from("mappings"),
            output_dir: PathBuf::from("output")
        };
        assert_eq!(layout.mapping_file("1.20.3"), PathBuf::from("mappings/mapping-1.20.3.json"));
        assert_eq!(layout.diff_file("1.20.3", "1.20.5"), PathBuf::from("mappings/diff/mapping-1.20.3to1.20.5.json"));
        assert_eq!(layout.output_file("1.20.5", "1.20.3", true), PathBuf::from("output/backwards/mappings-1.20.5to1.20.3.nbt"));
        assert_eq!(layout.output_file("1.20.3", "1.20.5", false), PathBuf::from("output/mappings-1.20.3to1.20.5.nbt"));
    }
    #[test]
    fn missing_mappings_are_fatal() {
        let dir = ::tempfile::tempdir().unwrap();
        let layout = MappingsLayout::setup(dir.path().join("mappings"), dir.path().join("output")).unwrap();
        let error = layout.load_mappings("1.20").unwrap_err();
        assert!(error.downcast_ref::<MissingMappingsFile>().is_some());
    }
    #[test]
    fn discover() {
        let dir = ::tempfile::tempdir().unwrap();
        let layout = MappingsLayout::setup(dir.path().join("mappings"), dir.path().join("output")).unwrap();
        for name in &["mapping-1.20.json", "mapping-1.19.4.json", "notes.txt"] {
            fs::write(layout.mappings_dir().join(name), "{}").unwrap();
        }
        fs::create_dir_all(layout.mappings_dir().join("diff")).unwrap();
        assert_eq!(layout.discover_versions().unwrap(), vec!["1.19.4".to_string(), "1.20".to_string()]);
    }
}
