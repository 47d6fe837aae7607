use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use indexmap::IndexMap;
use failure::Error;
use failure_derive::Fail;
use log::warn;
use serde_derive::{Deserialize, Serialize};

use mappings::{IdentifierIndex, OverrideDirective, OverrideTable};
use mappings::overrides::restore_properties;

/// What to do when an identifier can't be mapped to the target version.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStrategy {
    /// Silently map to `-1`
    Ignore,
    /// Log a warning and map to `-1`
    Warn,
    /// Abort
    Error,
}
impl ErrorStrategy {
    pub fn apply(self, missing: MissingMapping) -> Result<(), MissingMapping> {
        match self {
            ErrorStrategy::Ignore => Ok(()),
            ErrorStrategy::Warn => {
                warn!("{}", missing);
                Ok(())
            },
            ErrorStrategy::Error => Err(missing),
        }
    }
}
impl Default for ErrorStrategy {
    #[inline]
    fn default() -> ErrorStrategy {
        ErrorStrategy::Warn
    }
}
impl FromStr for ErrorStrategy {
    type Err = InvalidErrorStrategy;

    fn from_str(s: &str) -> Result<ErrorStrategy, InvalidErrorStrategy> {
        Ok(match s {
            "ignore" => ErrorStrategy::Ignore,
            "warn" => ErrorStrategy::Warn,
            "error" => ErrorStrategy::Error,
            _ => return Err(InvalidErrorStrategy(s.into()))
        })
    }
}
impl Display for ErrorStrategy {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match *self {
            ErrorStrategy::Ignore => "ignore",
            ErrorStrategy::Warn => "warn",
            ErrorStrategy::Error => "error",
        })
    }
}
#[derive(Debug, Fail)]
#[fail(display = "Invalid error strategy {:?}, expected ignore, warn or error", _0)]
pub struct InvalidErrorStrategy(String);

#[derive(Debug, Fail)]
pub enum MissingMapping {
    #[fail(display = "No direct mapping or diff file for {}", _0)]
    NoOverrides(String),
    #[fail(display = "No mapping for {}", _0)]
    Unresolved(String),
}

/// An override that renames to an identifier the target version doesn't have.
#[derive(Debug, Fail)]
#[fail(display = "Override for {} points to unknown identifier {}", identifier, target)]
pub struct MalformedOverrideEntry {
    pub identifier: String,
    pub target: String,
}

/// A resolved int to int table along with the statistics used to pick its encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedMapping {
    /// The target id of every source id, or `-1`
    pub mappings: Vec<i32>,
    /// The size of the target list, if it should be written
    pub mapped_size: Option<i32>,
    pub empty_mappings: usize,
    pub identity_mappings: usize,
    /// How often a mapped id isn't the previous mapped id + 1
    pub shift_changes: usize,
}
impl ResolvedMapping {
    #[inline]
    pub fn with_capacity(capacity: usize, mapped_size: Option<i32>) -> ResolvedMapping {
        ResolvedMapping {
            mappings: Vec::with_capacity(capacity),
            mapped_size,
            empty_mappings: 0,
            identity_mappings: 0,
            shift_changes: 0
        }
    }
    pub fn from_mappings(mappings: &[i32], mapped_size: Option<i32>) -> ResolvedMapping {
        let mut result = ResolvedMapping::with_capacity(mappings.len(), mapped_size);
        for &mapped in mappings {
            result.push(mapped);
        }
        result
    }
    /// Append the mapping of the next source id, updating the statistics.
    pub fn push(&mut self, mapped: i32) {
        let id = self.mappings.len() as i32;
        if mapped == -1 {
            self.empty_mappings += 1;
        } else if mapped == id {
            self.identity_mappings += 1;
        }
        // Compares against the literal previous value, even if that was -1
        let expected = self.mappings.last().map_or(0, |&previous| previous.wrapping_add(1));
        if mapped != expected {
            self.shift_changes += 1;
        }
        self.mappings.push(mapped);
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
    /// The number of source ids not mapped to themselves.
    #[inline]
    pub fn changed_mappings(&self) -> usize {
        self.mappings.len() - self.identity_mappings
    }
    #[inline]
    pub fn has_changes(&self) -> bool {
        self.changed_mappings() != 0 || self.empty_mappings != 0
    }
}

/// Find the override for `name`, by name, by numeric id, and finally by the name
/// without its bracketed properties.
pub fn find_directive<'a>(overrides: &'a OverrideTable, name: &str, id: i32) -> Option<&'a OverrideDirective> {
    overrides.find(name, id).or_else(|| {
        name.find('[').and_then(|index| overrides.get(&name[..index]))
    })
}

fn apply_directive(name: &str, directive: &OverrideDirective, target: &IdentifierIndex) -> i32 {
    match *directive {
        OverrideDirective::NoMapping => -1,
        OverrideDirective::ForceId(mapped) => mapped,
        OverrideDirective::RenameTo(ref renamed) => {
            let renamed = restore_properties(renamed, name);
            match target.lookup(&renamed) {
                Some(mapped) => mapped,
                None => {
                    warn!("{}", MalformedOverrideEntry { identifier: name.into(), target: renamed.into_owned() });
                    -1
                }
            }
        }
    }
}

/// Resolve the target id of a single identifier, or `-1`.
pub fn resolve_entry(
    id: i32,
    name: &str,
    target: &IdentifierIndex,
    overrides: Option<&OverrideTable>,
    strategy: ErrorStrategy
) -> Result<i32, MissingMapping> {
    if let Some(mapped) = target.lookup(name) {
        return Ok(mapped)
    }
    let overrides = match overrides {
        Some(overrides) => overrides,
        None => {
            strategy.apply(MissingMapping::NoOverrides(name.into()))?;
            return Ok(-1)
        }
    };
    match find_directive(overrides, name, id) {
        Some(directive) => Ok(apply_directive(name, directive, target)),
        None => {
            strategy.apply(MissingMapping::Unresolved(name.into()))?;
            Ok(-1)
        }
    }
}

/// Resolve every identifier of a dense source list against the target version.
pub fn resolve<S: AsRef<str>>(
    source: &[S],
    target: &IdentifierIndex,
    overrides: Option<&OverrideTable>,
    strategy: ErrorStrategy
) -> Result<ResolvedMapping, Error> {
    let mut result = ResolvedMapping::with_capacity(source.len(), Some(target.len() as i32));
    for (id, name) in source.iter().enumerate() {
        result.push(resolve_entry(id as i32, name.as_ref(), target, overrides, strategy)?);
    }
    Ok(result)
}

/// Resolve a sparse source keyed by id, keeping its order.
pub fn resolve_sparse(
    source: &IndexMap<i32, String>,
    target: &IdentifierIndex,
    overrides: Option<&OverrideTable>,
    strategy: ErrorStrategy
) -> Result<Vec<(i32, i32)>, Error> {
    let mut result = Vec::with_capacity(source.len());
    for (&id, name) in source {
        result.push((id, resolve_entry(id, name, target, overrides, strategy)?));
    }
    Ok(result)
}
