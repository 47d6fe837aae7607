//! Ordered identifier lists and the lookup index built over them.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indexmap::IndexMap;
use failure::{Error, bail};
use serde_json::Value;

/// The identifiers of one category in one version.
///
/// Modern categories are dense arrays where the position is the numeric id.
/// Legacy categories are objects keyed by decimal id, which may have gaps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentifierList {
    Dense(Vec<String>),
    Sparse(IndexMap<i32, String>),
}
impl IdentifierList {
    /// Parse a json array of strings or an object of decimal id to string.
    ///
    /// Returns `None` for anything else, which callers treat as a non-identifier field.
    pub fn from_json(value: &Value) -> Option<IdentifierList> {
        match *value {
            Value::Array(ref elements) => {
                elements.iter()
                    .map(|element| element.as_str().map(String::from))
                    .collect::<Option<Vec<String>>>()
                    .map(IdentifierList::Dense)
            },
            Value::Object(ref object) if !object.is_empty() => {
                let mut entries = IndexMap::with_capacity(object.len());
                for (key, value) in object {
                    let id = key.parse::<i32>().ok().filter(|&id| id >= 0)?;
                    entries.insert(id, value.as_str()?.to_string());
                }
                Some(IdentifierList::Sparse(entries))
            },
            _ => None
        }
    }
    #[inline]
    pub fn len(&self) -> usize {
        match *self {
            IdentifierList::Dense(ref names) => names.len(),
            IdentifierList::Sparse(ref entries) => entries.len(),
        }
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    #[inline]
    pub fn as_dense(&self) -> Option<&[String]> {
        match *self {
            IdentifierList::Dense(ref names) => Some(names),
            IdentifierList::Sparse(_) => None,
        }
    }
    /// Every `(id, name)` pair in list order.
    pub fn entries<'a>(&'a self) -> Box<dyn Iterator<Item=(i32, &'a str)> + 'a> {
        match *self {
            IdentifierList::Dense(ref names) => {
                Box::new(names.iter().enumerate().map(|(id, name)| (id as i32, name.as_str())))
            },
            IdentifierList::Sparse(ref entries) => {
                Box::new(entries.iter().map(|(&id, name)| (id, name.as_str())))
            }
        }
    }
    /// The same identifiers keyed by id, converting a dense list if needed.
    pub fn to_sparse(&self) -> IndexMap<i32, String> {
        self.entries().map(|(id, name)| (id, name.to_string())).collect()
    }
    #[inline]
    pub fn index(&self) -> IdentifierIndex {
        match *self {
            IdentifierList::Dense(ref names) => IdentifierIndex::build(names),
            IdentifierList::Sparse(ref entries) => IdentifierIndex::from_sparse(entries),
        }
    }
}

/// Maps an identifier back to its numeric id.
#[derive(Clone, Debug, Default)]
pub struct IdentifierIndex {
    positions: IndexMap<String, i32>,
    size: usize,
}
impl IdentifierIndex {
    pub fn build<S: AsRef<str>>(names: &[S]) -> IdentifierIndex {
        let mut positions = IndexMap::with_capacity(names.len());
        for (id, name) in names.iter().enumerate() {
            positions.insert(name.as_ref().to_string(), id as i32);
        }
        IdentifierIndex { positions, size: names.len() }
    }
    pub fn from_sparse(entries: &IndexMap<i32, String>) -> IdentifierIndex {
        let mut positions = IndexMap::with_capacity(entries.len());
        for (&id, name) in entries {
            positions.insert(name.clone(), id);
        }
        IdentifierIndex { positions, size: entries.len() }
    }
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<i32> {
        self.positions.get(name).cloned()
    }
    /// The length of the list this index was built from.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// The `mapping-<version>.json` file holding every category of one version.
#[derive(Clone, Debug, Default)]
pub struct MappingsFile {
    fields: IndexMap<String, Value>,
    lists: IndexMap<String, IdentifierList>,
}
impl MappingsFile {
    /// Load the file at `path`, or `None` if there is no such file.
    pub fn load(path: &Path) -> Result<Option<MappingsFile>, Error> {
        if !path.exists() {
            return Ok(None)
        }
        let value: Value = ::serde_json::from_reader(BufReader::new(File::open(path)?))?;
        Ok(Some(MappingsFile::from_json(value)?))
    }
    pub fn from_json(value: Value) -> Result<MappingsFile, Error> {
        let object = match value {
            Value::Object(object) => object,
            other => bail!("Expected a mappings object, got {}", other),
        };
        let mut result = MappingsFile::default();
        for (key, value) in object {
            if let Some(list) = IdentifierList::from_json(&value) {
                result.lists.insert(key.clone(), list);
            }
            result.fields.insert(key, value);
        }
        Ok(result)
    }
    #[inline]
    pub fn identifiers(&self, key: &str) -> Option<&IdentifierList> {
        self.lists.get(key)
    }
    #[inline]
    pub fn dense(&self, key: &str) -> Option<&[String]> {
        self.identifiers(key).and_then(IdentifierList::as_dense)
    }
    #[inline]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }
    /// Every top level field, identifier list or not, in file order.
    pub fn fields(&self) -> impl Iterator<Item=(&str, &Value)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }
}
