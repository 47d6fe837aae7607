//! The compact encodings of an int to int table.
//!
//! Every encoding is a compound with a byte `id` naming the layout:
//!
//! | id | layout | fields |
//! |----|--------|--------|
//! | 0  | direct | `val`: every mapped id |
//! | 1  | shifts | `size`, `at`/`to`: where the +1 sequence breaks and what it restarts with |
//! | 2  | changes | `size`, `at`/`val`: every id that isn't mapped to itself |
//! | 3  | identity | `size` |
//!
//! All of them carry `mappedSize` unless the table is against the global registry.
//! Sparse tables use the changes layout with a `nofill` byte, meaning missing ids are
//! unmapped instead of mapped to themselves.
use failure::{Error, bail, format_err};
use failure_derive::Fail;
use itertools::Itertools;
use log::debug;

use mappings::{CompoundTag, Tag};

use crate::resolver::ResolvedMapping;

pub const DIRECT_ID: i8 = 0;
pub const SHIFTS_ID: i8 = 1;
pub const CHANGES_ID: i8 = 2;
pub const IDENTITY_ID: i8 = 3;
/// Approximate size of the extra fields of the array based encodings
const ENCODING_OVERHEAD: usize = 10;

/// The number of emitted entries disagrees with the precomputed statistics.
#[derive(Debug, Fail)]
#[fail(display = "Invariant violated: {}", _0)]
pub struct InvariantViolation(pub String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MappingEncoding {
    Identity {
        size: i32,
        mapped_size: Option<i32>,
    },
    Changes {
        size: i32,
        mapped_size: Option<i32>,
        at: Vec<i32>,
        val: Vec<i32>,
    },
    Shifts {
        size: i32,
        mapped_size: Option<i32>,
        at: Vec<i32>,
        to: Vec<i32>,
    },
    Direct {
        mapped_size: Option<i32>,
        val: Vec<i32>,
    },
    ChangesNoFill {
        size: i32,
        mapped_size: Option<i32>,
        at: Vec<i32>,
        val: Vec<i32>,
    },
}
impl MappingEncoding {
    /// Pick the smallest encoding of `result`.
    ///
    /// Returns `None` if nothing changed, unless `always_identity` is set.
    pub fn select(result: &ResolvedMapping, always_identity: bool) -> Result<Option<MappingEncoding>, Error> {
        let mapped_size = result.mapped_size;
        let size = result.len() as i32;
        if !result.has_changes() {
            return Ok(if always_identity {
                Some(MappingEncoding::Identity { size, mapped_size })
            } else {
                None
            })
        }
        let changed_cost = result.changed_mappings() * 2 + ENCODING_OVERHEAD;
        let shift_cost = result.shift_changes * 2 + ENCODING_OVERHEAD;
        let plain_cost = result.len();
        Ok(Some(if changed_cost < plain_cost && changed_cost < shift_cost {
            let (at, val) = changed_entries(&result.mappings);
            if at.len() != result.changed_mappings() {
                return Err(InvariantViolation(format!(
                    "Found {} changed entries, expected {}",
                    at.len(), result.changed_mappings()
                )).into())
            }
            MappingEncoding::Changes { size, mapped_size, at, val }
        } else if shift_cost < changed_cost && shift_cost < plain_cost {
            let (at, to) = shift_entries(&result.mappings);
            if at.len() != result.shift_changes {
                return Err(InvariantViolation(format!(
                    "Found {} shifts, expected {}",
                    at.len(), result.shift_changes
                )).into())
            }
            MappingEncoding::Shifts { size, mapped_size, at, to }
        } else {
            MappingEncoding::Direct { mapped_size, val: result.mappings.clone() }
        }))
    }
    /// Encode a sparse table, keeping the entries in their given order.
    pub fn changes_no_fill(entries: &[(i32, i32)], size: i32, mapped_size: Option<i32>) -> MappingEncoding {
        let (at, val) = entries.iter().cloned().unzip();
        MappingEncoding::ChangesNoFill { size, mapped_size, at, val }
    }
    pub fn name(&self) -> &'static str {
        match *self {
            MappingEncoding::Identity { .. } => "identity",
            MappingEncoding::Changes { .. } => "changes",
            MappingEncoding::Shifts { .. } => "shifts",
            MappingEncoding::Direct { .. } => "direct",
            MappingEncoding::ChangesNoFill { .. } => "changes without fill",
        }
    }
    #[inline]
    pub fn id(&self) -> i8 {
        match *self {
            MappingEncoding::Identity { .. } => IDENTITY_ID,
            MappingEncoding::Changes { .. } | MappingEncoding::ChangesNoFill { .. } => CHANGES_ID,
            MappingEncoding::Shifts { .. } => SHIFTS_ID,
            MappingEncoding::Direct { .. } => DIRECT_ID,
        }
    }
    #[inline]
    pub fn mapped_size(&self) -> Option<i32> {
        match *self {
            MappingEncoding::Identity { mapped_size, .. } |
            MappingEncoding::Changes { mapped_size, .. } |
            MappingEncoding::Shifts { mapped_size, .. } |
            MappingEncoding::Direct { mapped_size, .. } |
            MappingEncoding::ChangesNoFill { mapped_size, .. } => mapped_size,
        }
    }
    pub fn to_tag(&self) -> CompoundTag {
        let mut tag = CompoundTag::new();
        if let MappingEncoding::ChangesNoFill { .. } = *self {
            tag.put("id", self.id());
            tag.put("nofill", 1i8);
        } else {
            if let Some(mapped_size) = self.mapped_size() {
                tag.put("mappedSize", mapped_size);
            }
            tag.put("id", self.id());
        }
        match *self {
            MappingEncoding::Identity { size, .. } => {
                tag.put("size", size);
            },
            MappingEncoding::Changes { size, ref at, ref val, .. } => {
                tag.put("size", size);
                tag.put("at", at.clone());
                tag.put("val", val.clone());
            },
            MappingEncoding::Shifts { size, ref at, ref to, .. } => {
                tag.put("size", size);
                tag.put("at", at.clone());
                tag.put("to", to.clone());
            },
            MappingEncoding::Direct { ref val, .. } => {
                tag.put("val", val.clone());
            },
            MappingEncoding::ChangesNoFill { size, mapped_size, ref at, ref val } => {
                tag.put("size", size);
                if let Some(mapped_size) = mapped_size {
                    tag.put("mappedSize", mapped_size);
                }
                tag.put("at", at.clone());
                tag.put("val", val.clone());
            },
        }
        tag
    }
    /// Read an encoding back from its tag.
    ///
    /// Fails if the tag is inconsistent, so the result can always be expanded.
    pub fn from_tag(tag: &CompoundTag) -> Result<MappingEncoding, Error> {
        fn int(tag: &CompoundTag, key: &str) -> Result<i32, Error> {
            tag.get(key).and_then(Tag::as_int)
                .ok_or_else(|| format_err!("Missing int field {:?}", key))
        }
        fn ints(tag: &CompoundTag, key: &str) -> Result<Vec<i32>, Error> {
            tag.get(key).and_then(Tag::as_int_array)
                .map(|values| values.to_vec())
                .ok_or_else(|| format_err!("Missing int array field {:?}", key))
        }
        let mapped_size = tag.get("mappedSize").and_then(Tag::as_int);
        let id = tag.get("id").and_then(Tag::as_byte)
            .ok_or_else(|| format_err!("Missing encoding id"))?;
        let encoding = match id {
            IDENTITY_ID => MappingEncoding::Identity { size: int(tag, "size")?, mapped_size },
            DIRECT_ID => MappingEncoding::Direct { mapped_size, val: ints(tag, "val")? },
            SHIFTS_ID => MappingEncoding::Shifts {
                size: int(tag, "size")?,
                mapped_size,
                at: ints(tag, "at")?,
                to: ints(tag, "to")?
            },
            CHANGES_ID => {
                let size = int(tag, "size")?;
                let (at, val) = (ints(tag, "at")?, ints(tag, "val")?);
                if tag.get("nofill").and_then(Tag::as_byte) == Some(1) {
                    MappingEncoding::ChangesNoFill { size, mapped_size, at, val }
                } else {
                    MappingEncoding::Changes { size, mapped_size, at, val }
                }
            },
            _ => bail!("Unknown encoding id {}", id)
        };
        encoding.validate()?;
        Ok(encoding)
    }
    fn validate(&self) -> Result<(), Error> {
        match *self {
            MappingEncoding::Identity { size, .. } => check_size(size),
            MappingEncoding::Direct { .. } => Ok(()),
            MappingEncoding::Changes { size, ref at, ref val, .. } => {
                check_size(size)?;
                check_positions(at, val.len(), Some(size))
            },
            MappingEncoding::Shifts { size, ref at, ref to, .. } => {
                check_size(size)?;
                check_positions(at, to.len(), Some(size))
            },
            MappingEncoding::ChangesNoFill { size, ref at, ref val, .. } => {
                // Sparse ids keep their source order and may lie beyond the entry count
                check_size(size)?;
                check_positions(at, val.len(), None)
            },
        }
    }
    /// Decode back into a dense table.
    ///
    /// Ids missing from a table without fill are `-1`.
    pub fn expand(&self) -> Vec<i32> {
        match *self {
            MappingEncoding::Identity { size, .. } => (0..size).collect(),
            MappingEncoding::Direct { ref val, .. } => val.clone(),
            MappingEncoding::Changes { size, ref at, ref val, .. } => {
                let mut result: Vec<i32> = (0..size).collect();
                for (&id, &mapped) in at.iter().zip(val) {
                    result[id as usize] = mapped;
                }
                result
            },
            MappingEncoding::ChangesNoFill { size, ref at, ref val, .. } => {
                let mut result = vec![-1; size.max(0) as usize];
                for (&id, &mapped) in at.iter().zip(val) {
                    let id = id as usize;
                    if id >= result.len() {
                        result.resize(id + 1, -1);
                    }
                    result[id] = mapped;
                }
                result
            },
            MappingEncoding::Shifts { size, ref at, ref to, .. } => {
                let mut result = Vec::with_capacity(size as usize);
                let mut shifts = at.iter().zip(to).peekable();
                for id in 0..size {
                    let next_shift = shifts.peek().map(|&(&shift_at, &shift_to)| (shift_at, shift_to));
                    let mapped = match next_shift {
                        Some((shift_at, shift_to)) if shift_at == id => {
                            shifts.next();
                            shift_to
                        },
                        _ => result.last().map_or(0, |&previous: &i32| previous.wrapping_add(1)),
                    };
                    result.push(mapped);
                }
                result
            },
        }
    }
}

fn check_size(size: i32) -> Result<(), Error> {
    if size < 0 {
        bail!("Negative table size {}", size)
    }
    Ok(())
}

/// Check `at` lines up with its values, lies in `0..size` and ascends if `size` is given.
fn check_positions(at: &[i32], values: usize, size: Option<i32>) -> Result<(), Error> {
    if at.len() != values {
        bail!("Found {} positions for {} values", at.len(), values)
    }
    if let Some(&id) = at.iter().find(|&&id| id < 0 || size.map_or(false, |size| id >= size)) {
        bail!("Position {} out of bounds", id)
    }
    if size.is_some() && at.iter().tuple_windows().any(|(previous, next)| previous >= next) {
        bail!("Positions aren't ascending")
    }
    Ok(())
}

fn changed_entries(mappings: &[i32]) -> (Vec<i32>, Vec<i32>) {
    mappings.iter().enumerate()
        .filter(|&(id, &mapped)| mapped != id as i32)
        .map(|(id, &mapped)| (id as i32, mapped))
        .unzip()
}

fn shift_entries(mappings: &[i32]) -> (Vec<i32>, Vec<i32>) {
    let mut at = Vec::new();
    let mut to = Vec::new();
    let mut expected = 0;
    for (id, &mapped) in mappings.iter().enumerate() {
        if mapped != expected {
            at.push(id as i32);
            to.push(mapped);
        }
        expected = mapped.wrapping_add(1);
    }
    (at, to)
}

/// Select and serialize the encoding of `result`, logging the decision under `key`.
pub fn encode(key: &str, result: &ResolvedMapping, always_identity: bool) -> Result<Option<CompoundTag>, Error> {
    match MappingEncoding::select(result, always_identity)? {
        Some(encoding) => {
            debug!("{}: Storing as {}", key, encoding.name());
            Ok(Some(encoding.to_tag()))
        },
        None => {
            debug!("{}: Skipped due to no relevant id changes", key);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn select(mappings: &[i32]) -> MappingEncoding {
        let result = ResolvedMapping::from_mappings(mappings, Some(mappings.len() as i32 + 5));
        MappingEncoding::select(&result, false).unwrap().unwrap()
    }

    #[test]
    fn unchanged_tables() {
        let result = ResolvedMapping::from_mappings(&[0, 1, 2, 3], Some(4));
        assert_eq!(MappingEncoding::select(&result, false).unwrap(), None);
        let identity = MappingEncoding::select(&result, true).unwrap().unwrap();
        assert_eq!(identity, MappingEncoding::Identity { size: 4, mapped_size: Some(4) });
        let tag = identity.to_tag();
        assert_eq!(tag.get("id"), Some(&Tag::Byte(IDENTITY_ID)));
        assert_eq!(tag.get("size"), Some(&Tag::Int(4)));
        assert_eq!(tag.get("mappedSize"), Some(&Tag::Int(4)));
        assert_eq!(tag.len(), 3);
    }
    #[test]
    fn rotation_ties_fall_through_to_direct() {
        let encoding = select(&[2, 0, 1]);
        assert_eq!(encoding, MappingEncoding::Direct { mapped_size: Some(8), val: vec![2, 0, 1] });
        assert!(encoding.to_tag().get("size").is_none());
    }
    #[test]
    fn few_changes() {
        // One removal in a long table shifts everything after it
        let mut mappings: Vec<i32> = (0..100).collect();
        mappings[40] = 77;
        let encoding = select(&mappings);
        match encoding {
            MappingEncoding::Changes { size, ref at, ref val, .. } => {
                assert_eq!(size, 100);
                assert_eq!(at, &vec![40]);
                assert_eq!(val, &vec![77]);
            },
            ref other => panic!("Unexpected encoding {:?}", other),
        }
        assert_eq!(encoding.expand(), mappings);
    }
    #[test]
    fn insertion_shifts() {
        let mappings: Vec<i32> = (0..100).map(|id| if id < 30 { id } else { id + 3 }).collect();
        let encoding = select(&mappings);
        match encoding {
            MappingEncoding::Shifts { size, ref at, ref to, .. } => {
                assert_eq!(size, 100);
                assert_eq!(at, &vec![30]);
                assert_eq!(to, &vec![33]);
            },
            ref other => panic!("Unexpected encoding {:?}", other),
        }
        assert_eq!(encoding.expand(), mappings);
    }
    #[test]
    fn removals_expand_to_empty_mappings() {
        let mut mappings: Vec<i32> = (0..50).collect();
        mappings[10] = -1;
        mappings[11] = -1;
        let encoding = select(&mappings);
        assert_eq!(encoding.expand(), mappings);
        let mut shifted: Vec<i32> = (0..50).map(|id| if id < 20 { id } else { id - 1 }).collect();
        shifted[19] = -1;
        let encoding = select(&shifted);
        assert_eq!(encoding.expand(), shifted);
    }
    #[test]
    fn sparse_tables() {
        let encoding = MappingEncoding::changes_no_fill(&[(16, 2), (1, 1)], 2, Some(3));
        let tag = encoding.to_tag();
        assert_eq!(tag.get("nofill"), Some(&Tag::Byte(1)));
        assert_eq!(tag.get("id"), Some(&Tag::Byte(CHANGES_ID)));
        assert_eq!(tag.get("at"), Some(&Tag::IntArray(vec![16, 1])));
        assert_eq!(tag.get("val"), Some(&Tag::IntArray(vec![2, 1])));
        assert_eq!(MappingEncoding::from_tag(&tag).unwrap(), encoding);
        let expanded = encoding.expand();
        assert_eq!(expanded.len(), 17);
        assert_eq!(expanded[1], 1);
        assert_eq!(expanded[16], 2);
        assert_eq!(expanded[0], -1);
    }
    #[test]
    fn rejects_inconsistent_tags() {
        let changes = |size: i32, at: Vec<i32>, val: Vec<i32>| {
            MappingEncoding::Changes { size, mapped_size: None, at, val }.to_tag()
        };
        assert!(MappingEncoding::from_tag(&changes(2, vec![5], vec![1])).is_err());
        assert!(MappingEncoding::from_tag(&changes(2, vec![-1], vec![1])).is_err());
        assert!(MappingEncoding::from_tag(&changes(4, vec![1, 2], vec![1])).is_err());
        assert!(MappingEncoding::from_tag(&changes(4, vec![2, 1], vec![1, 2])).is_err());
        assert_eq!(MappingEncoding::from_tag(&changes(4, vec![1, 2], vec![2, 1])).unwrap().expand(), vec![0, 2, 1, 3]);
        let shifts = MappingEncoding::Shifts { size: -1, mapped_size: None, at: vec![], to: vec![] };
        assert!(MappingEncoding::from_tag(&shifts.to_tag()).is_err());
        let identity = MappingEncoding::Identity { size: -3, mapped_size: Some(1) };
        assert!(MappingEncoding::from_tag(&identity.to_tag()).is_err());
        let sparse = MappingEncoding::changes_no_fill(&[(16, 2), (-4, 1)], 2, None);
        assert!(MappingEncoding::from_tag(&sparse.to_tag()).is_err());
    }
    #[test]
    fn shifts_past_the_last_id() {
        let mut mappings: Vec<i32> = (0..40).collect();
        mappings[20] = i32::MAX;
        let encoding = MappingEncoding::Shifts {
            size: 40,
            mapped_size: None,
            at: vec![20, 21],
            to: vec![i32::MAX, 21]
        };
        assert_eq!(MappingEncoding::from_tag(&encoding.to_tag()).unwrap().expand(), mappings);
        assert_eq!(shift_entries(&mappings), (vec![20, 21], vec![i32::MAX, 21]));
    }
    #[test]
    fn registry_tables_omit_mapped_size() {
        let result = ResolvedMapping::from_mappings(&[3, 1], None);
        let tag = MappingEncoding::select(&result, true).unwrap().unwrap().to_tag();
        assert!(!tag.contains_key("mappedSize"));
        assert_eq!(MappingEncoding::from_tag(&tag).unwrap().expand(), vec![3, 1]);
    }
}
