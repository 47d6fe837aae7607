//! Compacts the identifiers of two versions into an int to int table.
//!
//! Every identifier of the source version is looked up in the target version, first by name
//! and then through the curated overrides of the diff file between them:
//! - `""` - The identifier was removed, and maps to `-1` without any complaint
//! - `id:<N>` - Maps straight to the target id `N`
//! - `<name>` - Maps to `name` instead.
//!   - If `name` ends with `[`, the bracketed properties of the source are kept,
//!     so `"brick_wall": "stone_wall["` maps `brick_wall[east=true]` to `stone_wall[east=true]`.
//!   - Overrides of a name without properties apply to all of its states.
//!
//! Anything still missing is handled according to the [`ErrorStrategy`].
//! The resulting table is then stored in the smallest of several [`MappingEncoding`]s.
extern crate indexmap;
extern crate failure;
extern crate failure_derive;
extern crate itertools;
extern crate log;
extern crate serde;
extern crate serde_derive;
extern crate serde_json;

pub mod resolver;
pub mod encoding;
pub mod stubs;
pub mod registry;
pub mod optimizer;
pub mod runner;
mod config;

pub use self::resolver::{ErrorStrategy, MissingMapping, MalformedOverrideEntry, ResolvedMapping, resolve, resolve_sparse};
pub use self::encoding::{MappingEncoding, InvariantViolation};
pub use self::stubs::diff_stub;
pub use self::registry::GlobalRegistry;
pub use self::optimizer::{BatchState, MappingsOptimizer, UnsupportedTagRegistry};
pub use self::runner::{RunSummary, run_all, run_pair};
pub use self::config::GeneratorConfig;
