use indexmap::IndexSet;
use failure::{Error, bail};
use failure_derive::Fail;
use log::{debug, error, info, warn};

use mappings::{
    CompoundTag, DiffFile, IdentifierIndex, IdentifierList, Manifest, MappingsFile,
    MappingsLayout, MinecraftVersion, Tag, write_json_atomically
};

use crate::config::{DEFAULT_IGNORE_MISSING, string_set};
use crate::encoding::{self, MappingEncoding};
use crate::registry::GlobalRegistry;
use crate::resolver::{self, ErrorStrategy};
use crate::stubs::diff_stub;

/// The version of the output format, stored in every output file
pub const FORMAT_VERSION: i32 = 1;
/// Identifier categories compacted for every pair, in output order.
///
/// Block states are always written, even if nothing changed.
pub const MAPPED_CATEGORIES: &[&str] = &[
    "blockstates", "blocks", "items", "sounds", "blockentities", "enchantments",
    "paintings", "entities", "particles", "argumenttypes", "statistics", "menus",
    "attributes", "recipe_serializers", "slot_displays", "data_component_type",
];
const ALWAYS_IDENTITY: &str = "blockstates";
const MINECRAFT_NAMESPACE: &str = "minecraft:";

#[derive(Debug, Fail)]
#[fail(display = "Registry type not supported: {}", _0)]
pub struct UnsupportedTagRegistry(pub String);

/// Whether `key` is a field the optimizer knows how to handle.
pub fn is_standard_field(key: &str) -> bool {
    key == "tags" || MAPPED_CATEGORIES.contains(&key)
}

/// Whether mapping `from` onto `to` goes back in time.
///
/// Versions that aren't releases, like april fools snapshots, only ever map forwards.
pub fn is_backwards(from: &str, to: &str) -> bool {
    match (from.parse::<MinecraftVersion>(), to.parse::<MinecraftVersion>()) {
        (Ok(from), Ok(to)) => from.is_backwards(to),
        _ => false,
    }
}

/// The state shared by every pair of a batch.
pub struct BatchState {
    pub manifest: Manifest,
    pub registry: GlobalRegistry,
    identifier_categories: Vec<String>,
    saved_identifiers: IndexSet<String>,
}
impl BatchState {
    pub fn open(layout: &MappingsLayout, identifier_categories: Vec<String>) -> Result<BatchState, Error> {
        Ok(BatchState {
            manifest: Manifest::load(layout.manifest_file())?,
            registry: GlobalRegistry::load(layout.registry_file())?,
            identifier_categories,
            saved_identifiers: IndexSet::new(),
        })
    }
    /// Write the identifiers of `version` against the global identifier table, once per batch.
    pub fn save_identifiers(&mut self, layout: &MappingsLayout, version: &str, file: &MappingsFile) -> Result<bool, Error> {
        if !self.saved_identifiers.insert(version.to_string()) {
            return Ok(false)
        }
        let mut tag = CompoundTag::new();
        for category in &self.identifier_categories {
            let identifiers = match file.dense(category) {
                Some(identifiers) => identifiers,
                None => continue
            };
            let result = self.registry.register_and_compress(identifiers, category)?;
            if let Some(encoded) = encoding::encode(category, &result, true)? {
                tag.put(category.clone(), encoded);
            }
        }
        let key = format!("identifiers-{}.nbt", version);
        self.manifest.write_tag(&key, &layout.identifiers_file(version), &tag)
    }
    /// Persist the global identifier table if it grew and export it alongside the outputs.
    pub fn flush(&mut self, layout: &MappingsLayout) -> Result<(), Error> {
        self.registry.save()?;
        let table = self.registry.to_tag();
        self.manifest.write_tag("identifier-table.nbt", &layout.registry_table_file(), &table)?;
        Ok(())
    }
}

/// Compacts the identifiers of one version pair into a single output file.
pub struct MappingsOptimizer<'a> {
    layout: &'a MappingsLayout,
    from: String,
    to: String,
    unmapped: MappingsFile,
    mapped: MappingsFile,
    diff: Option<DiffFile>,
    output: CompoundTag,
    error_strategy: ErrorStrategy,
    ignore_missing: IndexSet<String>,
    keep_unknown_fields: bool,
}
impl<'a> MappingsOptimizer<'a> {
    /// Load the identifiers of both versions and the diff between them, if any.
    ///
    /// Fails if either identifier file is missing.
    pub fn new(layout: &'a MappingsLayout, from: &str, to: &str) -> Result<MappingsOptimizer<'a>, Error> {
        let unmapped = layout.load_mappings(from)?;
        let mapped = layout.load_mappings(to)?;
        let diff = layout.load_diff(from, to)?;
        let mut output = CompoundTag::new();
        output.put("version", FORMAT_VERSION);
        Ok(MappingsOptimizer {
            layout,
            from: from.into(),
            to: to.into(),
            unmapped,
            mapped,
            diff,
            output,
            error_strategy: ErrorStrategy::default(),
            ignore_missing: string_set(DEFAULT_IGNORE_MISSING),
            keep_unknown_fields: false,
        })
    }
    #[inline]
    pub fn set_error_strategy(&mut self, strategy: ErrorStrategy) {
        self.error_strategy = strategy;
    }
    /// Don't report or stub missing mappings of `key`.
    #[inline]
    pub fn ignore_missing_mappings_for(&mut self, key: &str) {
        self.ignore_missing.insert(key.to_string());
    }
    /// Copy fields the optimizer doesn't know into the output unchanged.
    #[inline]
    pub fn keep_unknown_fields(&mut self) {
        self.keep_unknown_fields = true;
    }
    #[inline]
    pub fn is_backwards(&self) -> bool {
        is_backwards(&self.from, &self.to)
    }
    #[inline]
    pub fn output(&self) -> &CompoundTag {
        &self.output
    }
    #[inline]
    pub fn diff(&self) -> Option<&DiffFile> {
        self.diff.as_ref()
    }
    /// Write empty overrides for everything that needs manual mapping into the diff file.
    ///
    /// The extended diff is used for the rest of this pair.
    /// Returns false if there was nothing to stub.
    pub fn write_diff_stubs(&mut self) -> Result<bool, Error> {
        match diff_stub(&self.unmapped, &self.mapped, self.diff.as_ref(), &self.ignore_missing)? {
            Some(diff) => {
                info!("Writing diff stubs for versions {} -> {}", self.from, self.to);
                write_json_atomically(&self.layout.diff_file(&self.from, &self.to), &diff.to_json())?;
                self.diff = Some(diff);
                Ok(true)
            },
            None => Ok(false)
        }
    }
    /// Build the whole output of this pair.
    pub fn optimize(&mut self) -> Result<(), Error> {
        if self.keep_unknown_fields {
            self.handle_unknown_fields()?;
        }
        for &key in MAPPED_CATEGORIES {
            self.mappings(key == ALWAYS_IDENTITY, key)?;
        }
        if self.diff.is_some() {
            self.names("items", "itemnames");
            self.full_names("entitynames", "entitynames");
            if self.is_backwards() {
                self.full_names("sounds", "soundnames");
            }
            self.tags()?;
        }
        Ok(())
    }
    /// Write the output through the manifest, returning whether the file changed.
    pub fn write(&self, manifest: &mut Manifest) -> Result<bool, Error> {
        let backwards = self.is_backwards();
        let path = self.layout.output_file(&self.from, &self.to, backwards);
        let name = format!("mappings-{}to{}.nbt", self.from, self.to);
        let key = if backwards { format!("backwards/{}", name) } else { name };
        manifest.write_tag(&key, &path, &self.output)
    }
    /// Compact the pair, write it and save the identifiers of both versions.
    pub fn optimize_and_write(mut self, state: &mut BatchState) -> Result<bool, Error> {
        info!("Compacting json mapping files for versions {} -> {}...", self.from, self.to);
        self.optimize()?;
        let written = self.write(&mut state.manifest)?;
        state.save_identifiers(self.layout, &self.from, &self.unmapped)?;
        state.save_identifiers(self.layout, &self.to, &self.mapped)?;
        Ok(written)
    }
    /// Copy every non standard field into the output unchanged.
    pub fn handle_unknown_fields(&mut self) -> Result<(), Error> {
        for (key, value) in self.unmapped.fields() {
            if is_standard_field(key) {
                continue
            }
            warn!("Non-standard field {}, writing it to the file without changes", key);
            self.output.put(key, Tag::from_json(value)?);
        }
        Ok(())
    }
    fn strategy_for(&self, key: &str) -> ErrorStrategy {
        if self.ignore_missing.contains(key) {
            ErrorStrategy::Ignore
        } else {
            self.error_strategy
        }
    }
    /// Compact the identifiers of `key` into the output.
    ///
    /// Categories missing from either version are skipped.
    pub fn mappings(&mut self, always_identity: bool, key: &str) -> Result<(), Error> {
        let (source, target) = match (self.unmapped.identifiers(key), self.mapped.identifiers(key)) {
            (Some(source), Some(target)) => (source, target),
            _ => return Ok(())
        };
        if source == target && !always_identity {
            debug!("{}: Skipped", key);
            return Ok(())
        }
        debug!("Mapping {}: {} -> {}", key, source.len(), target.len());
        let strategy = self.strategy_for(key);
        let overrides = self.diff.as_ref().and_then(|diff| diff.overrides(key));
        let encoded = match (source, target) {
            (IdentifierList::Dense(source), IdentifierList::Dense(target)) => {
                let result = resolver::resolve(source, &IdentifierIndex::build(target), overrides, strategy)?;
                encoding::encode(key, &result, always_identity)?
            },
            _ => {
                // Legacy ids have gaps, so only the present entries are stored
                let entries = resolver::resolve_sparse(&source.to_sparse(), &target.index(), overrides, strategy)?;
                let encoding = MappingEncoding::changes_no_fill(
                    &entries,
                    source.len() as i32,
                    Some(target.len() as i32)
                );
                debug!("{}: Storing as {}", key, encoding.name());
                Some(encoding.to_tag())
            }
        };
        if let Some(encoded) = encoded {
            self.output.put(key, encoded);
        }
        Ok(())
    }
    /// Write the display names of `names_key` keyed by the source id of the identifier in `key`.
    pub fn names(&mut self, key: &str, names_key: &str) {
        let index = match self.unmapped.identifiers(key) {
            Some(identifiers) => identifiers.index(),
            None => return
        };
        let names = match self.diff.as_ref().and_then(|diff| diff.strings(names_key)) {
            Some(names) => names,
            None => return
        };
        let mut tag = CompoundTag::new();
        for (identifier, name) in names {
            match index.lookup(identifier) {
                Some(id) => {
                    tag.put(id.to_string(), name.into_owned());
                },
                None => warn!("{}: Unknown identifier {}", names_key, identifier),
            }
        }
        self.output.put(names_key, tag);
    }
    /// Copy the string to string table `key` of the diff into `output_key`.
    pub fn full_names(&mut self, key: &str, output_key: &str) {
        let names = match self.diff.as_ref().and_then(|diff| diff.strings(key)) {
            Some(names) => names,
            None => return
        };
        let mut tag = CompoundTag::new();
        for (identifier, name) in names {
            tag.put(identifier, name.into_owned());
        }
        self.output.put(output_key, tag);
    }
    /// Write the target ids of every tag member, per registry type.
    pub fn tags(&mut self) -> Result<(), Error> {
        let groups = match self.diff.as_ref().and_then(DiffFile::tags) {
            Some(groups) => groups,
            None => return Ok(())
        };
        let mut tags = CompoundTag::new();
        for (registry_type, entries) in groups {
            let key = match registry_type.as_str() {
                "block" => "blocks",
                "item" => "items",
                "entity_types" => "entities",
                _ => return Err(UnsupportedTagRegistry(registry_type.clone()).into())
            };
            let index = match self.mapped.identifiers(key) {
                Some(identifiers) => identifiers.index(),
                None => bail!("Tags of {} need the {} of version {}", registry_type, key, self.to)
            };
            let mut tag = CompoundTag::new();
            for (name, members) in entries {
                let mut ids = Vec::with_capacity(members.len());
                for member in members {
                    let identifier = member.replace(MINECRAFT_NAMESPACE, "");
                    match index.lookup(&identifier) {
                        Some(id) => ids.push(id),
                        None => error!("Could not find id for {}", member),
                    }
                }
                tag.put(name.clone(), ids);
            }
            tags.put(registry_type.clone(), tag);
        }
        if !tags.is_empty() {
            self.output.put("tags", tags);
        }
        Ok(())
    }
}
