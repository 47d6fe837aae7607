use indexmap::IndexSet;
use failure::Error;
use log::debug;

use mappings::{DiffFile, IdentifierIndex, MappingsFile, OverrideDirective};

use crate::resolver::{ErrorStrategy, resolve_entry};

/// Build a diff file with an empty override for every identifier that still resolves to nothing.
///
/// Identifiers whose overrides point nowhere are stubbed too, so they can be curated.
/// Curated entries of `existing` are kept as they are, only missing keys are added.
/// Returns `None` if there is nothing to add.
pub fn diff_stub(
    unmapped: &MappingsFile,
    mapped: &MappingsFile,
    existing: Option<&DiffFile>,
    ignore: &IndexSet<String>
) -> Result<Option<DiffFile>, Error> {
    let mut result = existing.cloned().unwrap_or_default();
    let mut added = 0;
    for (key, _) in unmapped.fields() {
        if ignore.contains(key) {
            continue
        }
        let (source, target) = match (unmapped.dense(key), mapped.dense(key)) {
            (Some(source), Some(target)) => (source, IdentifierIndex::build(target)),
            _ => continue
        };
        let overrides = existing.and_then(|diff| diff.overrides(key));
        let mut missing = Vec::new();
        for (id, name) in source.iter().enumerate() {
            if resolve_entry(id as i32, name, &target, overrides, ErrorStrategy::Ignore)? == -1 {
                missing.push(name);
            }
        }
        if missing.is_empty() {
            continue
        }
        let table = result.overrides_mut(key)?;
        let mut stubbed = 0;
        for name in missing {
            if table.insert_if_absent(name.clone(), OverrideDirective::NoMapping) {
                stubbed += 1;
            }
        }
        debug!("{}: Added {} diff stubs", key, stubbed);
        added += stubbed;
    }
    Ok(if added == 0 { None } else { Some(result) })
}
