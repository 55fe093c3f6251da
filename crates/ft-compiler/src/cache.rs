//! Compiled-Index Cache
//!
//! Keyword regexes and channel indexes are only rebuilt when the list they
//! were built from actually changed. Entries are validated by comparing the
//! stored signature with one computed from the live list.
//!
//! Two scopes are consulted in order:
//! - by list: the address and length of the slice handed in, which hits when
//!   the caller passes the same list again
//! - by owner: a caller-chosen name for the settings object, which hits when a
//!   new list with identical contents replaces the old one

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use ft_core::channel::channel_list_signature;
use ft_core::keyword::keyword_list_signature;
use ft_core::{ChannelFilter, ChannelIndex, CompiledKeywords, KeywordFilter};

/// Upper bound on list-scoped entries before that scope is reset.
const MAX_LIST_ENTRIES: usize = 64;

/// A compiled structure that remembers the signature of its source list.
pub trait Signed {
    fn signature(&self) -> &str;
}

impl Signed for CompiledKeywords {
    fn signature(&self) -> &str {
        CompiledKeywords::signature(self)
    }
}

impl Signed for ChannelIndex {
    fn signature(&self) -> &str {
        ChannelIndex::signature(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ListKey {
    addr: usize,
    len: usize,
}

impl ListKey {
    fn of<T>(list: &[T]) -> Self {
        Self {
            addr: list.as_ptr() as usize,
            len: list.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    List,
    Owner,
    Built,
}

#[derive(Debug)]
struct ScopedCache<T> {
    by_list: HashMap<ListKey, Arc<T>>,
    by_owner: HashMap<String, Arc<T>>,
}

impl<T> Default for ScopedCache<T> {
    fn default() -> Self {
        Self {
            by_list: HashMap::new(),
            by_owner: HashMap::new(),
        }
    }
}

impl<T: Signed> ScopedCache<T> {
    fn get_or_build<E>(
        &mut self,
        owner: Option<&str>,
        list: &[E],
        signature: &str,
        build: impl FnOnce() -> T,
    ) -> (Arc<T>, Lookup) {
        let list_key = ListKey::of(list);

        if let Some(hit) = self.by_list.get(&list_key).filter(|v| v.signature() == signature) {
            return (Arc::clone(hit), Lookup::List);
        }

        let owned = owner.and_then(|o| self.by_owner.get(o)).filter(|v| v.signature() == signature);
        let (value, lookup) = match owned {
            Some(hit) => (Arc::clone(hit), Lookup::Owner),
            None => (Arc::new(build()), Lookup::Built),
        };

        if self.by_list.len() >= MAX_LIST_ENTRIES && !self.by_list.contains_key(&list_key) {
            self.by_list.clear();
        }
        self.by_list.insert(list_key, Arc::clone(&value));
        if let Some(owner) = owner {
            self.by_owner.insert(owner.to_string(), Arc::clone(&value));
        }

        (value, lookup)
    }

    fn clear(&mut self) {
        self.by_list.clear();
        self.by_owner.clear();
    }

    fn invalidate_owner(&mut self, owner: &str) {
        if let Some(value) = self.by_owner.remove(owner) {
            self.by_list.retain(|_, v| !Arc::ptr_eq(v, &value));
        }
    }
}

/// Counters for observing cache behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub list_hits: usize,
    pub owner_hits: usize,
    pub keyword_compiles: usize,
    pub index_builds: usize,
}

impl CacheStats {
    fn record(&mut self, lookup: Lookup) {
        match lookup {
            Lookup::List => self.list_hits += 1,
            Lookup::Owner => self.owner_hits += 1,
            Lookup::Built => {}
        }
    }
}

/// Caller-owned cache of compiled keyword lists and channel indexes.
#[derive(Debug, Default)]
pub struct CacheContext {
    keywords: ScopedCache<CompiledKeywords>,
    channels: ScopedCache<ChannelIndex>,
    stats: CacheStats,
}

impl CacheContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compiled_keywords(&mut self, owner: Option<&str>, list: &[KeywordFilter]) -> Arc<CompiledKeywords> {
        let signature = keyword_list_signature(list);
        let (value, lookup) = self
            .keywords
            .get_or_build(owner, list, &signature, || CompiledKeywords::compile(list));

        self.stats.record(lookup);
        if lookup == Lookup::Built {
            self.stats.keyword_compiles += 1;
            log::debug!("Compiled {} keywords ({} dropped)", value.len(), value.dropped());
        }
        value
    }

    pub fn channel_index(&mut self, owner: Option<&str>, list: &[ChannelFilter]) -> Arc<ChannelIndex> {
        let signature = channel_list_signature(list);
        let (value, lookup) = self
            .channels
            .get_or_build(owner, list, &signature, || ChannelIndex::build(list));

        self.stats.record(lookup);
        if lookup == Lookup::Built {
            self.stats.index_builds += 1;
            log::debug!("Built channel index with {} entries", value.len());
        }
        value
    }

    #[inline]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop every cached entry. Counters are kept.
    pub fn clear(&mut self) {
        self.keywords.clear();
        self.channels.clear();
    }

    /// Drop entries cached for one settings owner.
    pub fn invalidate_owner(&mut self, owner: &str) {
        self.keywords.invalidate_owner(owner);
        self.channels.invalidate_owner(owner);
    }
}
