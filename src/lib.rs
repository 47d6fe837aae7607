//! Compacts per-version identifier lists into int to int mapping tables.
//!
//! The data model lives in [`mappings`], the resolution and encoding in [`engine`].
//! Most users only need [`run_all`] with a [`GeneratorConfig`].
pub use mappings::{
    CompoundTag, DiffFile, IdentifierIndex, IdentifierList, Manifest, MappingsFile,
    MappingsLayout, MinecraftVersion, OverrideDirective, OverrideTable, Tag
};
pub use engine::{
    BatchState, ErrorStrategy, GeneratorConfig, GlobalRegistry, MappingEncoding,
    MappingsOptimizer, ResolvedMapping, RunSummary, run_all, run_pair
};
pub use mappings;
pub use engine;
