//! The data that flows through the mappings compactor.
//!
//! - [`MappingsFile`] holds the identifier lists of one version, keyed by category
//!   (`blockstates`, `items`, `sounds`, ...). Positions are the numeric protocol ids.
//! - [`DiffFile`] holds the curated [`OverrideTable`]s for a pair of versions.
//! - [`CompoundTag`] is the tree the compacted tables are serialized as.
//! - [`MappingsLayout`] and [`Manifest`] decide where files live and whether they changed.
extern crate indexmap;
extern crate failure;
extern crate failure_derive;
extern crate serde;
extern crate serde_json;
extern crate serde_derive;
extern crate itertools;
extern crate byteorder;
extern crate log;

pub mod identifiers;
pub mod overrides;
pub mod tag;
pub mod layout;
pub mod manifest;
mod version;
mod utils;

pub use self::version::{MinecraftVersion, InvalidMinecraftVersion};
pub use self::identifiers::{IdentifierIndex, IdentifierList, MappingsFile};
pub use self::overrides::{DiffFile, NameTable, OverrideDirective, OverrideTable, TagGroups};
pub use self::tag::{CompoundTag, Tag};
pub use self::layout::{MappingsLayout, MissingMappingsFile};
pub use self::manifest::Manifest;
pub use self::utils::{write_atomically, write_json_atomically};
