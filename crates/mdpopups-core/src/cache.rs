use std::rc::Rc;
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::error;

use crate::highlight::Highlighter;
use crate::scheme::SchemeTheme;
use crate::settings::{DebugLevel, Settings};

/// Expiry and capacity rules, read from settings on every cache access.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CachePolicy {
    pub refresh: Duration,
    pub limit: usize,
    pub debug: DebugLevel,
}

impl CachePolicy {
    pub fn from_settings(settings: &Settings<'_>) -> Self {
        Self {
            refresh: Duration::from_secs(settings.cache_refresh_minutes().saturating_mul(60)),
            limit: settings.cache_limit(),
            debug: settings.debug_level(),
        }
    }

    pub fn is_expired(&self, inserted_at: Instant, now: Instant) -> bool {
        self.refresh.is_zero() || now.saturating_duration_since(inserted_at) >= self.refresh
    }
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Insertion-ordered cache with time based expiry.
///
/// Lookups use `peek`, so the LRU order is the insertion order and eviction
/// always removes the oldest inserted entry.
pub struct ExpiringCache<V> {
    entries: LruCache<String, CacheEntry<V>>,
}

impl<V: Clone> ExpiringCache<V> {
    pub fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns a live entry, or `None` if missing, expired or `is_stale`.
    pub fn lookup(
        &self,
        key: &str,
        now: Instant,
        policy: &CachePolicy,
        is_stale: impl Fn(&V) -> bool,
    ) -> Option<V> {
        let entry = self.entries.peek(key)?;
        if policy.is_expired(entry.inserted_at, now) || is_stale(&entry.value) {
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn insert(&mut self, key: &str, value: V, now: Instant, policy: &CachePolicy) {
        self.entries.pop(key);
        self.prune(policy.limit.saturating_sub(1));
        self.entries.push(
            key.to_string(),
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    pub fn get_or_build<E>(
        &mut self,
        key: &str,
        now: Instant,
        policy: &CachePolicy,
        is_stale: impl Fn(&V) -> bool,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        // The limit can shrink between accesses.
        self.prune(policy.limit);
        if let Some(value) = self.lookup(key, now, policy, is_stale) {
            return Ok(value);
        }
        let value = build()?;
        self.insert(key, value.clone(), now, policy);
        Ok(value)
    }

    /// Evicts oldest entries until at most `limit` remain.
    fn prune(&mut self, limit: usize) {
        while self.entries.len() > limit {
            if self.entries.pop_lru().is_none() {
                break;
            }
        }
    }

    /// Keys from oldest to newest insertion.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().rev().map(|(key, _)| key.clone()).collect()
    }
}

impl<V: Clone> Default for ExpiringCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct CachedScheme {
    pub theme: Rc<dyn SchemeTheme>,
    pub user_css: Rc<str>,
}

/// Scheme id to derived theme and user CSS.
#[derive(Default)]
pub struct SchemeCache {
    cache: ExpiringCache<CachedScheme>,
}

impl SchemeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `use_builtin` is the current highlighter selection; an entry built for
    /// the other selection is rebuilt. Build failures are logged and give
    /// `None`.
    pub fn get_or_build<E: std::error::Error>(
        &mut self,
        scheme: &str,
        now: Instant,
        policy: &CachePolicy,
        use_builtin: bool,
        build: impl FnOnce() -> Result<CachedScheme, E>,
    ) -> Option<CachedScheme> {
        let stale = |cached: &CachedScheme| cached.theme.uses_builtin_highlighter() != use_builtin;
        match self.cache.get_or_build(scheme, now, policy, stale, build) {
            Ok(cached) => Some(cached),
            Err(err) => {
                error!(scheme, "failed to convert/retrieve scheme to CSS");
                log_chain(policy.debug, &err);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.cache.keys()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Scheme id to scheme highlighter.
#[derive(Default)]
pub struct HighlighterCache {
    cache: ExpiringCache<Rc<dyn Highlighter>>,
}

impl HighlighterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build<E: std::error::Error>(
        &mut self,
        scheme: &str,
        now: Instant,
        policy: &CachePolicy,
        build: impl FnOnce() -> Result<Rc<dyn Highlighter>, E>,
    ) -> Option<Rc<dyn Highlighter>> {
        match self.cache.get_or_build(scheme, now, policy, |_| false, build) {
            Ok(highlighter) => Some(highlighter),
            Err(err) => {
                error!(scheme, "failed to get scheme highlighter");
                log_chain(policy.debug, &err);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Logs the full source chain of `err` when the debug level allows errors.
pub(crate) fn log_chain(debug: DebugLevel, err: &dyn std::error::Error) {
    if debug < DebugLevel::Error {
        return;
    }
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str("\n  caused by: ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    error!("{}", message);
}

#[cfg(test)]
mod tests {
    use super::{CachePolicy, ExpiringCache};
    use crate::settings::{CACHE_REFRESH_TIME, DebugLevel, JsonSettings, Settings};
    use std::convert::Infallible;
    use std::time::{Duration, Instant};

    fn policy(minutes: u64, limit: usize) -> CachePolicy {
        CachePolicy {
            refresh: Duration::from_secs(minutes * 60),
            limit,
            debug: DebugLevel::Off,
        }
    }

    #[test]
    fn evicts_oldest_inserted_first() {
        let mut cache = ExpiringCache::new();
        let now = Instant::now();
        let policy = policy(30, 3);
        for key in ["a", "b", "c"] {
            cache.insert(key, key.to_string(), now, &policy);
        }
        // Reading must not change eviction order.
        assert!(cache.lookup("a", now, &policy, |_| false).is_some());
        cache.insert("d", "d".to_string(), now, &policy);

        assert_eq!(cache.keys(), vec!["b", "c", "d"]);
    }

    #[test]
    fn entries_expire_after_refresh_interval() {
        let mut cache = ExpiringCache::new();
        let start = Instant::now();
        let policy = policy(30, 10);
        cache.insert("a", 1, start, &policy);

        let almost = start + Duration::from_secs(30 * 60 - 1);
        assert_eq!(cache.lookup("a", almost, &policy, |_| false), Some(1));
        let expired = start + Duration::from_secs(30 * 60);
        assert_eq!(cache.lookup("a", expired, &policy, |_| false), None);
    }

    #[test]
    fn zero_refresh_always_expires() {
        let mut cache = ExpiringCache::new();
        let now = Instant::now();
        let policy = policy(0, 10);
        let mut builds = 0;
        for _ in 0..3 {
            let value = cache.get_or_build("a", now, &policy, |_| false, || {
                builds += 1;
                Ok::<_, Infallible>(builds)
            });
            assert_eq!(value, Ok(builds));
        }
        assert_eq!(builds, 3);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn rebuilding_a_key_moves_it_to_the_newest_end() {
        let mut cache = ExpiringCache::new();
        let start = Instant::now();
        let policy = policy(1, 10);
        cache.insert("a", 1, start, &policy);
        cache.insert("b", 2, start, &policy);
        let later = start + Duration::from_secs(120);
        let rebuilt = cache.get_or_build("a", later, &policy, |_| false, || Ok::<_, Infallible>(3));

        assert_eq!(rebuilt, Ok(3));
        assert_eq!(cache.keys(), vec!["b", "a"]);
    }

    #[test]
    fn huge_refresh_time_saturates() {
        let source = JsonSettings::new();
        source.set(CACHE_REFRESH_TIME, u64::MAX);
        let policy = CachePolicy::from_settings(&Settings::new(&source));
        assert_eq!(policy.refresh, Duration::from_secs(u64::MAX));

        let mut cache = ExpiringCache::new();
        let start = Instant::now();
        cache.insert("a", 1, start, &policy);
        let later = start + Duration::from_secs(365 * 24 * 3600);
        assert_eq!(cache.lookup("a", later, &policy, |_| false), Some(1));
    }

    #[test]
    fn lowered_limit_prunes_on_next_access() {
        let mut cache = ExpiringCache::new();
        let now = Instant::now();
        let wide = policy(30, 4);
        for key in ["a", "b", "c", "d"] {
            cache.insert(key, key.to_string(), now, &wide);
        }

        let narrow = policy(30, 2);
        let hit = cache.get_or_build("d", now, &narrow, |_| false, || {
            Ok::<_, Infallible>("rebuilt".to_string())
        });

        assert_eq!(hit, Ok("d".to_string()));
        assert_eq!(cache.keys(), vec!["c", "d"]);
    }

    #[test]
    fn failed_build_leaves_cache_untouched() {
        let mut cache: ExpiringCache<i32> = ExpiringCache::new();
        let now = Instant::now();
        let policy = policy(30, 10);
        let result = cache.get_or_build("a", now, &policy, |_| false, || Err("boom"));
        assert_eq!(result, Err("boom"));
        assert!(cache.is_empty());
    }
}
