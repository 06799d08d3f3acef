//! Thread-Safety Analyzer
//!
//! Memoized entry point over the source registry. Results are cached per
//! `(function, skip set, level)` for the analyzer's lifetime; there is no
//! invalidation because registered sources are not expected to change
//! during a run.

use std::sync::Arc;

use dashmap::DashMap;

use crate::features::thread_safety::domain::{AnalysisResult, Blocklist, Callable, SkipSet};
use crate::features::thread_safety::infrastructure::{
    AliasMap, AttributeDetector, FnItem, SourceRegistry, ThreadUnsafeVisitor,
};
use crate::features::thread_safety::ports::PropertyTestDetector;
use crate::shared::models::FnPath;

type CacheKey = (FnPath, SkipSet, u8);

pub struct ThreadSafetyAnalyzer {
    registry: SourceRegistry,
    detectors: Vec<Arc<dyn PropertyTestDetector>>,
    cache: DashMap<CacheKey, AnalysisResult>,
    blocklists: DashMap<SkipSet, Arc<Blocklist>>,
}

impl ThreadSafetyAnalyzer {
    /// Analyzer with the default property-test detector
    pub fn new(registry: SourceRegistry) -> Self {
        Self::with_detectors(registry, vec![Arc::new(AttributeDetector)])
    }

    pub fn with_detectors(
        registry: SourceRegistry,
        detectors: Vec<Arc<dyn PropertyTestDetector>>,
    ) -> Self {
        Self {
            registry,
            detectors,
            cache: DashMap::new(),
            blocklists: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Number of memoized verdicts
    pub fn cached_results(&self) -> usize {
        self.cache.len()
    }

    /// Decide whether calling `callable` concurrently is unsafe
    ///
    /// `skip_set` widens the default blocklist. Never fails: missing or
    /// unparsable source is reported as safe.
    pub fn identify_thread_unsafe(&self, callable: &Callable, skip_set: &SkipSet) -> AnalysisResult {
        match callable {
            Callable::Registered(path) => self.analyze_path(path, skip_set, 0),
            Callable::Detached {
                namespace,
                name,
                source,
            } => match FnItem::from_source(namespace, name, source) {
                Some(item) => self.analyze_item(&item, skip_set, 0),
                None => AnalysisResult::safe(),
            },
        }
    }

    /// `(is_unsafe, reason)` form of [`Self::identify_thread_unsafe`]
    pub fn identify(&self, callable: &Callable, skip_set: &SkipSet) -> (bool, Option<String>) {
        self.identify_thread_unsafe(callable, skip_set).into_parts()
    }

    fn analyze_path(&self, path: &FnPath, skip_set: &SkipSet, level: u8) -> AnalysisResult {
        let key = (path.clone(), skip_set.clone(), level);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!("Analysis cache hit: {} (level {})", path, level);
            return hit.value().clone();
        }

        let result = match self.registry.function(path) {
            Some(item) => {
                let item = Arc::clone(item);
                self.analyze_item(&item, skip_set, level)
            }
            None => {
                tracing::debug!("No source registered for {}, assuming safe", path);
                AnalysisResult::safe()
            }
        };

        self.cache.insert(key, result.clone());
        result
    }

    fn analyze_item(&self, item: &FnItem, skip_set: &SkipSet, level: u8) -> AnalysisResult {
        if let Some(framework) = self.detectors.iter().find_map(|d| d.detect(item)) {
            return AnalysisResult::thread_unsafe(format!("uses {}", framework));
        }

        let blocklist = self.blocklist(skip_set);
        let aliases = AliasMap::build(
            &item.scope,
            self.registry.namespace(&item.scope).map(|ns| ns.as_ref()),
            item.owner.as_deref(),
            &blocklist,
        );
        let recurse = |callee: &FnPath, next: u8| self.analyze_path(callee, skip_set, next);

        let result = ThreadUnsafeVisitor::new(
            item,
            &aliases,
            &blocklist,
            &self.registry,
            level,
            &recurse,
        )
        .analyze();

        if result.is_thread_unsafe {
            tracing::debug!(
                "{} is thread-unsafe at level {}: {}",
                item.path,
                level,
                result.reason.as_deref().unwrap_or_default()
            );
        }
        result
    }

    fn blocklist(&self, skip_set: &SkipSet) -> Arc<Blocklist> {
        if let Some(blocklist) = self.blocklists.get(skip_set) {
            return Arc::clone(&blocklist);
        }
        let blocklist = Arc::new(Blocklist::new(skip_set));
        self.blocklists
            .insert(skip_set.clone(), Arc::clone(&blocklist));
        blocklist
    }
}
