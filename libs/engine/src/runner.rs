use failure::Error;
use itertools::Itertools;
use log::{info, warn};

use mappings::{MappingsLayout, MinecraftVersion};

use crate::config::GeneratorConfig;
use crate::optimizer::{BatchState, MappingsOptimizer};

/// What a batch run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Every pair processed, in order
    pub pairs: Vec<(String, String)>,
    /// How many of their outputs actually changed
    pub written: usize,
}

/// Compact a single pair with the settings of `config`.
///
/// `extra_ignored` categories don't report missing mappings on top of the configured ones.
pub fn run_pair(
    layout: &MappingsLayout,
    config: &GeneratorConfig,
    state: &mut BatchState,
    from: &str,
    to: &str,
    extra_ignored: &[&str]
) -> Result<bool, Error> {
    let mut optimizer = MappingsOptimizer::new(layout, from, to)?;
    optimizer.set_error_strategy(config.error_strategy);
    for key in config.ignore_missing.iter().map(String::as_str).chain(extra_ignored.iter().cloned()) {
        optimizer.ignore_missing_mappings_for(key);
    }
    if config.keep_unknown_fields {
        optimizer.keep_unknown_fields();
    }
    if config.generate_diff_stubs {
        optimizer.write_diff_stubs()?;
    }
    let written = optimizer.optimize_and_write(state)?;
    state.flush(layout)?;
    Ok(written)
}

/// Compact every adjacent pair of versions in the mappings directory, both ways.
///
/// Backwards only versions are only mapped onto their predecessor, special versions
/// are mapped forwards onto their release last.
pub fn run_all(config: &GeneratorConfig) -> Result<RunSummary, Error> {
    let layout = MappingsLayout::setup(config.mappings_dir.clone(), config.output_dir.clone())?;
    let mut state = BatchState::open(&layout, config.identifier_categories.clone())?;
    let mut versions = Vec::new();
    for name in layout.discover_versions()? {
        if config.special_versions.contains_key(&name) {
            continue
        }
        match name.parse::<MinecraftVersion>() {
            Ok(version) => versions.push((version, name)),
            Err(cause) => warn!("Skipping mappings of unknown version: {}", cause),
        }
    }
    versions.sort();
    info!("Found {} versions", versions.len());

    let mut summary = RunSummary::default();
    let mut run = |from: &str, to: &str, extra_ignored: &[&str]| -> Result<(), Error> {
        if run_pair(&layout, config, &mut state, from, to, extra_ignored)? {
            summary.written += 1;
        }
        summary.pairs.push((from.to_string(), to.to_string()));
        Ok(())
    };
    for ((_, from), (_, to)) in versions.iter().tuple_windows() {
        let backwards_only = config.backwards_only.contains(from);
        if !backwards_only {
            run(from, to, &[])?;
        }
        let extra_ignored: &[&str] = if backwards_only { &["sounds"] } else { &[] };
        run(to, from, extra_ignored)?;
    }
    for (special, release) in &config.special_versions {
        run(special, release, &[])?;
    }
    Ok(summary)
}
