//! FilterTube Settings Compiler
//!
//! This crate turns raw settings objects into compiled `FilterState`,
//! reusing cached keyword regexes and channel indexes across passes.

pub mod parser;
pub mod optimizer;
pub mod cache;
pub mod builder;

pub use builder::{build_filter_state, normalize_settings, NormalizeReport};
pub use cache::{CacheContext, CacheStats};
pub use optimizer::{optimize_settings, OptimizeStats};
pub use parser::{parse_settings, parse_settings_str, Settings, SettingsError};
