//! Curated override tables, stored in `diff/mapping-<from>to<to>.json`.
//!
//! Each category of a diff file maps either an identifier or a decimal source id
//! to a directive string:
//! - `""` explicitly maps to nothing, without any warnings
//! - `"id:<N>"` forces the target id `N`
//! - anything else is the identifier to look up in the target version instead.
//!   When it ends with `[`, the properties of the source block state are kept.
use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use indexmap::map::Entry;
use failure::{Error, bail};
use failure_derive::Fail;
use serde_json::{Map, Value};

const FORCE_ID_PREFIX: &str = "id:";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OverrideDirective {
    NoMapping,
    ForceId(i32),
    RenameTo(String),
}

/// Append the bracketed properties of `source` to `name` if `name` ends with `[`.
///
/// `restore_properties("stone_wall[", "brick_wall[east=true]")` is `stone_wall[east=true]`.
pub fn restore_properties<'a>(name: &'a str, source: &str) -> Cow<'a, str> {
    match source.find('[') {
        Some(index) if name.ends_with('[') => {
            Cow::Owned(format!("{}{}", name, &source[(index + 1)..]))
        },
        _ => Cow::Borrowed(name)
    }
}

impl FromStr for OverrideDirective {
    type Err = InvalidOverrideDirective;

    fn from_str(s: &str) -> Result<OverrideDirective, InvalidOverrideDirective> {
        if s.is_empty() {
            Ok(OverrideDirective::NoMapping)
        } else if s.starts_with(FORCE_ID_PREFIX) {
            match s[FORCE_ID_PREFIX.len()..].parse::<i32>() {
                Ok(id) if id >= 0 => Ok(OverrideDirective::ForceId(id)),
                _ => Err(InvalidOverrideDirective(s.into()))
            }
        } else {
            Ok(OverrideDirective::RenameTo(s.into()))
        }
    }
}
impl Display for OverrideDirective {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            OverrideDirective::NoMapping => Ok(()),
            OverrideDirective::ForceId(id) => write!(f, "{}{}", FORCE_ID_PREFIX, id),
            OverrideDirective::RenameTo(ref name) => f.write_str(name),
        }
    }
}
#[derive(Debug, Fail)]
#[fail(display = "Invalid override directive {:?}", _0)]
pub struct InvalidOverrideDirective(pub String);

/// The override directives of a single category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverrideTable {
    entries: IndexMap<String, OverrideDirective>
}
impl OverrideTable {
    #[inline]
    pub fn new() -> OverrideTable {
        OverrideTable::default()
    }
    pub fn from_json(object: &Map<String, Value>) -> Result<OverrideTable, Error> {
        let mut entries = IndexMap::with_capacity(object.len());
        for (key, value) in object {
            let directive = match value.as_str() {
                Some(s) => s.parse::<OverrideDirective>()?,
                None => bail!("Expected a string directive for {:?}, got {}", key, value),
            };
            entries.insert(key.clone(), directive);
        }
        Ok(OverrideTable { entries })
    }
    pub fn to_json(&self) -> Value {
        Value::Object(self.entries.iter()
            .map(|(key, directive)| (key.clone(), Value::String(directive.to_string())))
            .collect())
    }
    #[inline]
    pub fn get(&self, key: &str) -> Option<&OverrideDirective> {
        self.entries.get(key)
    }
    /// Find the directive for an identifier, falling back to its numeric source id.
    pub fn find(&self, name: &str, id: i32) -> Option<&OverrideDirective> {
        self.entries.get(name)
            .or_else(|| self.entries.get(&id.to_string()))
    }
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
    /// Insert `directive` unless `key` already has one, returning whether it was added.
    pub fn insert_if_absent(&mut self, key: String, directive: OverrideDirective) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(directive);
                true
            }
        }
    }
    #[inline]
    pub fn insert(&mut self, key: String, directive: OverrideDirective) -> Option<OverrideDirective> {
        self.entries.insert(key, directive)
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item=(&str, &OverrideDirective)> {
        self.entries.iter().map(|(key, directive)| (key.as_str(), directive))
    }
}

/// Curated tag groups: registry type -> tag name -> member identifiers.
pub type TagGroups = IndexMap<String, IndexMap<String, Vec<String>>>;

/// Display names keyed by identifier, like `itemnames`.
pub type NameTable = IndexMap<String, String>;

/// Sections holding names rather than override directives end with this.
const NAMES_SUFFIX: &str = "names";

#[derive(Clone, Debug, PartialEq)]
pub enum DiffSection {
    Overrides(OverrideTable),
    Names(NameTable),
    Tags(TagGroups),
    Other(Value),
}
impl DiffSection {
    fn to_json(&self) -> Value {
        match *self {
            DiffSection::Overrides(ref table) => table.to_json(),
            DiffSection::Names(ref names) => Value::Object(names.iter()
                .map(|(key, name)| (key.clone(), Value::String(name.clone())))
                .collect()),
            DiffSection::Tags(ref groups) => {
                ::serde_json::to_value(groups).unwrap_or(Value::Null)
            },
            DiffSection::Other(ref value) => value.clone(),
        }
    }
}

/// A whole diff file, keyed by category.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiffFile {
    sections: IndexMap<String, DiffSection>
}
impl DiffFile {
    pub fn load(path: &Path) -> Result<Option<DiffFile>, Error> {
        if !path.exists() {
            return Ok(None)
        }
        let value: Value = ::serde_json::from_reader(BufReader::new(File::open(path)?))?;
        Ok(Some(DiffFile::from_json(value)?))
    }
    pub fn from_json(value: Value) -> Result<DiffFile, Error> {
        let object = match value {
            Value::Object(object) => object,
            other => bail!("Expected a diff object, got {}", other),
        };
        let mut sections = IndexMap::with_capacity(object.len());
        for (key, value) in object {
            let section = match value {
                Value::Object(ref object) if key == "tags" => {
                    DiffSection::Tags(::serde_json::from_value(Value::Object(object.clone()))?)
                },
                Value::Object(ref object) if key.ends_with(NAMES_SUFFIX) && object.values().all(Value::is_string) => {
                    DiffSection::Names(object.iter()
                        .filter_map(|(key, name)| name.as_str().map(|name| (key.clone(), name.to_string())))
                        .collect())
                },
                Value::Object(ref object) if object.values().all(Value::is_string) => {
                    DiffSection::Overrides(OverrideTable::from_json(object)?)
                },
                other => DiffSection::Other(other)
            };
            sections.insert(key, section);
        }
        Ok(DiffFile { sections })
    }
    pub fn to_json(&self) -> Value {
        Value::Object(self.sections.iter()
            .map(|(key, section)| (key.clone(), section.to_json()))
            .collect())
    }
    #[inline]
    pub fn overrides(&self, key: &str) -> Option<&OverrideTable> {
        match self.sections.get(key) {
            Some(DiffSection::Overrides(table)) => Some(table),
            _ => None
        }
    }
    /// The plain string entries of `key`, either names or the rendered override directives.
    pub fn strings(&self, key: &str) -> Option<Vec<(&str, Cow<str>)>> {
        match self.sections.get(key) {
            Some(DiffSection::Names(names)) => Some(names.iter()
                .map(|(key, name)| (key.as_str(), Cow::Borrowed(name.as_str())))
                .collect()),
            Some(DiffSection::Overrides(table)) => Some(table.iter()
                .map(|(key, directive)| (key, Cow::Owned(directive.to_string())))
                .collect()),
            _ => None
        }
    }
    /// The override table for `key`, created if missing.
    ///
    /// Fails if `key` already holds something other than overrides.
    pub fn overrides_mut(&mut self, key: &str) -> Result<&mut OverrideTable, Error> {
        let section = self.sections.entry(key.to_string())
            .or_insert_with(|| DiffSection::Overrides(OverrideTable::new()));
        match *section {
            DiffSection::Overrides(ref mut table) => Ok(table),
            _ => bail!("Diff section {:?} is not an override table", key)
        }
    }
    #[inline]
    pub fn tags(&self) -> Option<&TagGroups> {
        match self.sections.get("tags") {
            Some(DiffSection::Tags(groups)) => Some(groups),
            _ => None
        }
    }
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.sections.contains_key(key)
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
    pub fn sections(&self) -> impl Iterator<Item=(&str, &DiffSection)> {
        self.sections.iter().map(|(key, section)| (key.as_str(), section))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_directives() {
        assert_eq!(OverrideDirective::NoMapping, "".parse().unwrap());
        assert_eq!(OverrideDirective::ForceId(42), "id:42".parse().unwrap());
        assert_eq!(
            OverrideDirective::RenameTo("stone_wall[".into()),
            "stone_wall[".parse().unwrap()
        );
        assert!("id:stone".parse::<OverrideDirective>().is_err());
        // Only -1 means unmapped, and that is spelled ""
        assert!("id:-5".parse::<OverrideDirective>().is_err());
        assert!("id:-1".parse::<OverrideDirective>().is_err());
        assert_eq!(OverrideDirective::ForceId(i32::MAX), "id:2147483647".parse().unwrap());
    }
    #[test]
    fn display_directives() {
        for &text in &["", "id:7", "oak_planks", "stone_wall["] {
            let directive: OverrideDirective = text.parse().unwrap();
            assert_eq!(directive.to_string(), text);
        }
    }
    #[test]
    fn restores_properties() {
        assert_eq!(restore_properties("stone_wall[", "brick_wall[east=true]"), "stone_wall[east=true]");
        // Nothing to keep without brackets in the source
        assert_eq!(restore_properties("stone_wall[", "brick_wall"), "stone_wall[");
        assert_eq!(restore_properties("stone", "granite[snowy=true]"), "stone");
    }
    #[test]
    fn find_by_name_then_id() {
        let table = OverrideTable::from_json(json!({
            "old_item": "new_item",
            "3": "",
        }).as_object().unwrap()).unwrap();
        assert_eq!(table.find("old_item", 0), Some(&OverrideDirective::RenameTo("new_item".into())));
        assert_eq!(table.find("whatever", 3), Some(&OverrideDirective::NoMapping));
        assert_eq!(table.find("whatever", 4), None);
    }
    #[test]
    fn diff_file_sections() {
        let diff = DiffFile::from_json(json!({
            "items": {"a": "b", "c": ""},
            "tags": {"block": {"minecraft:walls": ["minecraft:stone_wall"]}},
            "weird": [1, 2]
        })).unwrap();
        assert_eq!(diff.overrides("items").unwrap().len(), 2);
        assert_eq!(diff.tags().unwrap()["block"]["minecraft:walls"], vec!["minecraft:stone_wall".to_string()]);
        assert!(diff.overrides("weird").is_none());
        assert_eq!(diff.to_json(), json!({
            "items": {"a": "b", "c": ""},
            "tags": {"block": {"minecraft:walls": ["minecraft:stone_wall"]}},
            "weird": [1, 2]
        }));
    }
    #[test]
    fn name_sections_are_plain_strings() {
        let diff = DiffFile::from_json(json!({
            "itemnames": {"stone": "id:Stone", "air": ""},
            "sounds": {"boom": "click"}
        })).unwrap();
        assert!(diff.overrides("itemnames").is_none());
        let names = diff.strings("itemnames").unwrap();
        assert_eq!(names, vec![("stone", Cow::Borrowed("id:Stone")), ("air", Cow::Borrowed(""))]);
        assert_eq!(diff.strings("sounds").unwrap(), vec![("boom", Cow::Borrowed("click"))]);
        assert!(diff.strings("tags").is_none());
        assert_eq!(diff.to_json(), json!({
            "itemnames": {"stone": "id:Stone", "air": ""},
            "sounds": {"boom": "click"}
        }));
    }
    #[test]
    fn insert_never_overwrites() {
        let mut diff = DiffFile::default();
        let table = diff.overrides_mut("items").unwrap();
        assert!(table.insert_if_absent("a".into(), OverrideDirective::RenameTo("b".into())));
        assert!(!table.insert_if_absent("a".into(), OverrideDirective::NoMapping));
        assert_eq!(table.get("a"), Some(&OverrideDirective::RenameTo("b".into())));
    }
}
