#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate failure;
extern crate log;

use std::env;
use std::path::{Path, PathBuf};

use failure::Error;
use log::{info, LevelFilter};

use mappings::MappingsLayout;
use engine::{BatchState, ErrorStrategy, GeneratorConfig, MappingsOptimizer};

fn app() -> clap::App<'static, 'static> {
    clap_app!(minecraft_id_mappings =>
        (version: crate_version!())
        (author: crate_authors!())
        (about: "Compacts per-version identifier lists into int to int mapping tables")
        (@setting SubcommandRequiredElseHelp)
        (@arg config: --config +takes_value "A json file with the generator settings")
        (@arg mappings_dir: --mappings +takes_value "The directory containing the mapping and diff files")
        (@arg output_dir: --out +takes_value "The output directory to place compacted mappings")
        (@arg errors: --errors +takes_value possible_value[ignore warn error] "What to do with missing mappings")
        (@arg verbose: -v --verbose "Log every encoding decision")
        (@subcommand optimize =>
            (about: "Compacts the mappings between two versions")
            (@arg from: +required "The version to map from")
            (@arg to: +required "The version to map to")
            (@arg generate_diff_stubs: --("generate-diff-stubs") "Add empty overrides for everything needing manual mapping")
            (@arg keep_unknown_fields: --("keep-unknown-fields") "Copy non-standard fields into the output unchanged")
        )
        (@subcommand stubs =>
            (about: "Writes diff stubs for two versions without compacting them")
            (@arg from: +required "The version to map from")
            (@arg to: +required "The version to map to")
        )
        (@subcommand all =>
            (about: "Compacts every adjacent pair of versions in the mappings directory")
        )
    )
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter(None, if verbose { LevelFilter::Debug } else { LevelFilter::Info });
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse(&filters);
    }
    builder.init();
}

fn main() -> Result<(), Error> {
    let matches = app().get_matches();
    init_logging(matches.is_present("verbose"));
    let mut config = match matches.value_of("config") {
        Some(path) => GeneratorConfig::load(Path::new(path))?,
        None => GeneratorConfig::default(),
    };
    if let Some(dir) = matches.value_of("mappings_dir") {
        config.mappings_dir = PathBuf::from(dir);
    }
    if let Some(dir) = matches.value_of("output_dir") {
        config.output_dir = PathBuf::from(dir);
    }
    if matches.is_present("errors") {
        config.error_strategy = value_t!(matches, "errors", ErrorStrategy)
            .unwrap_or_else(|e| e.exit());
    }
    match matches.subcommand() {
        ("optimize", Some(sub)) => {
            let from = sub.value_of("from").unwrap();
            let to = sub.value_of("to").unwrap();
            config.generate_diff_stubs |= sub.is_present("generate_diff_stubs");
            config.keep_unknown_fields |= sub.is_present("keep_unknown_fields");
            let layout = MappingsLayout::setup(config.mappings_dir.clone(), config.output_dir.clone())?;
            let mut state = BatchState::open(&layout, config.identifier_categories.clone())?;
            if engine::run_pair(&layout, &config, &mut state, from, to, &[])? {
                info!("Wrote mappings {} -> {}", from, to);
            } else {
                info!("Mappings {} -> {} are up to date", from, to);
            }
        },
        ("stubs", Some(sub)) => {
            let from = sub.value_of("from").unwrap();
            let to = sub.value_of("to").unwrap();
            let layout = MappingsLayout::setup(config.mappings_dir.clone(), config.output_dir.clone())?;
            let mut optimizer = MappingsOptimizer::new(&layout, from, to)?;
            for key in &config.ignore_missing {
                optimizer.ignore_missing_mappings_for(key);
            }
            if !optimizer.write_diff_stubs()? {
                info!("Nothing to stub for {} -> {}", from, to);
            }
        },
        ("all", _) => {
            let summary = engine::run_all(&config)?;
            info!("Compacted {} pairs, {} changed", summary.pairs.len(), summary.written);
        },
        _ => unreachable!()
    }
    Ok(())
}
