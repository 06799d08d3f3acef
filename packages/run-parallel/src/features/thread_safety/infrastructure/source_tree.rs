//! Loading a crate's source tree into a registry
//!
//! File layout maps to module paths the way rustc resolves them:
//! `lib.rs`/`main.rs` → crate root, `a.rs` and `a/mod.rs` → `root::a`,
//! `a/b.rs` → `root::a::b`.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::source_registry::SourceRegistry;
use crate::errors::{Result, RunParallelError};
use crate::shared::models::{join_path, split_path};

const ROOT_FILES: &[&str] = &["lib.rs", "main.rs"];

/// Module path of a source file relative to the crate's source directory
pub fn module_path_for(crate_name: &str, relative: &Path) -> Option<String> {
    if relative.extension()? != "rs" {
        return None;
    }

    let mut segments: Vec<String> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_str()?.to_string()),
            _ => return None,
        }
    }

    let file = segments.pop()?;
    let is_root_file = segments.is_empty() && ROOT_FILES.contains(&file.as_str());
    if !is_root_file && file != "mod.rs" {
        segments.push(file.trim_end_matches(".rs").to_string());
    }

    Some(
        segments
            .iter()
            .fold(crate_name.to_string(), |path, segment| join_path(&path, segment)),
    )
}

/// Register every `.rs` file under `dir`
///
/// Files that fail to read or parse are logged and skipped.
pub fn load_source_tree(dir: &Path, crate_name: &str) -> Result<SourceRegistry> {
    if !dir.is_dir() {
        return Err(RunParallelError::registry(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut modules: Vec<(String, PathBuf)> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(dir).ok()?;
            let module = module_path_for(crate_name, relative)?;
            Some((module, entry.into_path()))
        })
        .collect();
    // Parents first: registering a module replaces everything beneath it
    modules.sort_by(|(a, _), (b, _)| split_path(a).len().cmp(&split_path(b).len()).then_with(|| a.cmp(b)));

    let mut registry = SourceRegistry::new();
    let mut files = 0usize;
    for (module, path) in modules {
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) => {
                tracing::warn!("Skipping {}: {}", path.display(), err);
                continue;
            }
        };
        match registry.register_module(&module, &source) {
            Ok(_) => files += 1,
            Err(err) => tracing::warn!("Skipping {}: {}", path.display(), err),
        }
    }

    tracing::info!(
        "Loaded {} files ({} functions) from {}",
        files,
        registry.len(),
        dir.display()
    );
    Ok(registry)
}
