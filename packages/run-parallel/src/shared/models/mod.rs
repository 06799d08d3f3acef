//! Shared models

pub mod fn_path;

pub use fn_path::{ancestor_modules, join_path, split_path, FnPath, PATH_SEP};
