use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use failure::Error;
use log::{debug, info};

use mappings::{CompoundTag, IdentifierIndex, Tag, write_json_atomically};

use crate::resolver::{self, ErrorStrategy, ResolvedMapping};

/// Identifiers of every version ever seen, per category.
///
/// Entries are only ever appended, so a global index stays valid forever.
#[derive(Debug)]
pub struct GlobalRegistry {
    location: PathBuf,
    categories: IndexMap<String, IndexSet<String>>,
    dirty: bool,
}
impl GlobalRegistry {
    pub fn load(location: PathBuf) -> Result<GlobalRegistry, Error> {
        let categories = if location.exists() {
            ::serde_json::from_reader(BufReader::new(File::open(&location)?))?
        } else {
            IndexMap::new()
        };
        Ok(GlobalRegistry { location, categories, dirty: false })
    }
    #[inline]
    pub fn category(&self, category: &str) -> Option<&IndexSet<String>> {
        self.categories.get(category)
    }
    #[inline]
    pub fn global_index(&self, category: &str, identifier: &str) -> Option<usize> {
        self.categories.get(category)?.get_index_of(identifier)
    }
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
    /// Append the identifiers not yet known, returning how many were added.
    pub fn register<S: AsRef<str>>(&mut self, identifiers: &[S], category: &str) -> usize {
        let known = self.categories.entry(category.to_string()).or_insert_with(IndexSet::new);
        let before = known.len();
        for identifier in identifiers {
            if !known.contains(identifier.as_ref()) {
                known.insert(identifier.as_ref().to_string());
            }
        }
        let added = known.len() - before;
        if added != 0 {
            debug!("{}: Registered {} new identifiers", category, added);
            self.dirty = true;
        }
        added
    }
    /// Register `identifiers` and map them onto their global indices.
    ///
    /// The result has no mapped size, since the registry may grow without anything changing.
    pub fn register_and_compress<S: AsRef<str>>(&mut self, identifiers: &[S], category: &str) -> Result<ResolvedMapping, Error> {
        self.register(identifiers, category);
        let names: Vec<&str> = self.categories[category].iter().map(String::as_str).collect();
        let mut result = resolver::resolve(identifiers, &IdentifierIndex::build(&names), None, ErrorStrategy::Error)?;
        result.mapped_size = None;
        Ok(result)
    }
    /// Persist the registry if it grew since it was loaded or last saved.
    pub fn save(&mut self) -> Result<bool, Error> {
        if !self.dirty {
            return Ok(false)
        }
        write_json_atomically(&self.location, &self.categories)?;
        info!("Saved global identifier table to {}", self.location.display());
        self.dirty = false;
        Ok(true)
    }
    /// Every category as a list of strings.
    pub fn to_tag(&self) -> CompoundTag {
        let mut tag = CompoundTag::new();
        for (category, identifiers) in &self.categories {
            tag.put(category.clone(), identifiers.iter()
                .map(|identifier| Tag::String(identifier.clone()))
                .collect::<Vec<Tag>>());
        }
        tag
    }
}
