//! Layered configuration documents.
//!
//! Documents declare a `config` mapping and optionally the `parents` it builds on. Loading
//! merges the inheritance chains of every given document, applies command-line overrides
//! and computes lazy values. See [`cfgx_tree`] for the tree operations themselves.

pub mod cli;
pub mod format;
pub mod loader;

pub use cfgx_tree::{ConfigError, ConfigResult, Lazy, Mapping, Value};
pub use format::{FormatOptions, FormatStyle, dump, dumps, format};
pub use loader::{
    ConfigSource, ConfigSpec, FileSource, LoadOptions, MemorySource, SourceDocument,
    collect_config_specs, load, load_from,
};
