use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use failure::Error;
use serde_derive::{Deserialize, Serialize};

use crate::resolver::ErrorStrategy;

/// Settings of a generator run, loaded from json.
///
/// Every field is optional and falls back to its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub mappings_dir: PathBuf,
    pub output_dir: PathBuf,
    pub error_strategy: ErrorStrategy,
    /// Categories whose unmapped identifiers are neither reported nor stubbed
    pub ignore_missing: IndexSet<String>,
    /// Categories stored against the global identifier table
    pub identifier_categories: Vec<String>,
    /// Versions only ever mapped to their predecessor
    pub backwards_only: IndexSet<String>,
    /// Extra versions mapped forward onto a release, in order
    pub special_versions: IndexMap<String, String>,
    pub keep_unknown_fields: bool,
    pub generate_diff_stubs: bool,
}
impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<GeneratorConfig, Error> {
        Ok(::serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }
}
impl Default for GeneratorConfig {
    fn default() -> GeneratorConfig {
        GeneratorConfig {
            mappings_dir: PathBuf::from("mappings"),
            output_dir: PathBuf::from("output"),
            error_strategy: ErrorStrategy::Warn,
            ignore_missing: string_set(DEFAULT_IGNORE_MISSING),
            identifier_categories: DEFAULT_IDENTIFIER_CATEGORIES.iter().map(|&s| s.to_string()).collect(),
            backwards_only: string_set(DEFAULT_BACKWARDS_ONLY),
            special_versions: IndexMap::new(),
            keep_unknown_fields: false,
            generate_diff_stubs: false,
        }
    }
}

pub const DEFAULT_IGNORE_MISSING: &[&str] = &["blocks", "statistics"];
pub const DEFAULT_IDENTIFIER_CATEGORIES: &[&str] = &["entities", "particles", "argumenttypes"];
const DEFAULT_BACKWARDS_ONLY: &[&str] = &["1.9.4", "1.10", "1.11"];

pub(crate) fn string_set(values: &[&str]) -> IndexSet<String> {
    values.iter().map(|&s| s.to_string()).collect()
}
