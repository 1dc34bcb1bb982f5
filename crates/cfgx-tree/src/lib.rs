//! Layered configuration trees.
//!
//! A configuration is a [`Value`] tree. Layers are combined with [`merge`]/[`merge_all`],
//! adjusted with command-line style overrides ([`apply_overrides`]) and finally have their
//! [`Lazy`] values computed against the finished tree ([`resolve_lazy`]).
//!
//! ```
//! use cfgx_tree::{Lazy, Value, apply_overrides, merge, parse_literal, resolve_lazy};
//!
//! let base = parse_literal("{'trainer': {'max_steps': 1000}}").unwrap();
//! let mut layer = parse_literal("{'trainer': {}}").unwrap();
//! layer.as_map_mut().unwrap()["trainer"]
//!     .as_map_mut()
//!     .unwrap()
//!     .insert("warmup".into(), Lazy::expr("c.trainer.max_steps * 0.1").unwrap().into());
//!
//! let mut cfg = merge(&base, &layer);
//! apply_overrides(&mut cfg, ["trainer.max_steps=5000"]).unwrap();
//! resolve_lazy(&mut cfg).unwrap();
//! assert_eq!(cfg.get("trainer.warmup"), Some(&Value::Float(500.0)));
//! ```

pub mod errors;
pub mod eval;
pub mod literal;
pub mod merge;
pub mod overrides;
pub mod path;
pub mod resolve;
pub mod value;

#[cfg(test)]
mod tests;

pub use errors::{ConfigError, ConfigResult};
pub use literal::{infer_value, literal_value, parse_literal};
pub use merge::{merge, merge_all};
pub use overrides::{
    Override, OverrideOp, append_to_nested, apply_overrides, delete_nested, parse_override,
    remove_value_from_list, set_nested, split_override,
};
pub use path::{Path, Segment, parse_key_path};
pub use resolve::{Resolved, Resolver, View, resolve_lazy};
pub use value::{Lazy, Mapping, Value};
