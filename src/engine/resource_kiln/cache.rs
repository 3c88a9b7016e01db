use crate::resource::{ResourceHandle, ResourceInner, ResourceKey, ResourceKind};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Weak;

pub(crate) enum Reconciled<K: ResourceKind>
{
    // Cached and the backing file is unchanged
    Fresh(ResourceHandle<K>),
    // Cached but the backing file changed; the entry has been marked
    // outdated and will not be returned by further lookups
    Stale(ResourceHandle<K>),
    Absent,
}

struct CacheEntry<K: ResourceKind>
{
    resource: Weak<ResourceInner<K>>,
    serial: u64,
}

// (vfs, path) -> resource. Entries are weak: the cache never keeps a
// resource alive, destruction is driven by the last external handle, and a
// dead entry reads as absent.
pub(crate) struct IdentityCache<K: ResourceKind>
{
    entries: HashMap<ResourceKey, CacheEntry<K>>,
}
impl<K: ResourceKind> Default for IdentityCache<K>
{
    fn default() -> Self
    {
        Self { entries: HashMap::new() }
    }
}
impl<K: ResourceKind> IdentityCache<K>
{
    // The live, non-outdated resource registered for this exact key
    #[must_use]
    pub fn lookup(&self, key: &ResourceKey) -> Option<ResourceHandle<K>>
    {
        let inner = self.entries.get(key)?.resource.upgrade()?;
        if inner.is_outdated() { return None; }
        Some(ResourceHandle { inner })
    }

    // Compare the cached entry against the file's current modification time.
    // A changed file transitions the entry to outdated rather than destroying
    // it - holders keep a valid, if stale, resource.
    #[must_use]
    pub fn reconcile(&mut self, key: &ResourceKey, current: DateTime<Utc>) -> Reconciled<K>
    {
        let Some(existing) = self.lookup(key) else { return Reconciled::Absent; };

        if existing.modification_time() == Some(current)
        {
            Reconciled::Fresh(existing)
        }
        else
        {
            existing.mark_outdated();
            Reconciled::Stale(existing)
        }
    }

    // Register under its key, superseding any outdated/dead entry there.
    // At most one non-outdated resource is ever registered per key.
    pub fn publish(&mut self, key: ResourceKey, resource: &ResourceHandle<K>)
    {
        debug_assert!(self.lookup(&key).is_none(), "publishing over a live entry for {key:?}");
        self.entries.insert(key, CacheEntry
        {
            resource: std::sync::Arc::downgrade(&resource.inner),
            serial: resource.serial(),
        });
    }

    // Deregister, but only if the entry still belongs to that resource.
    // Idempotent: absent entries and superseded serials are no-ops.
    pub fn remove(&mut self, key: &ResourceKey, serial: u64) -> bool
    {
        match self.entries.get(key)
        {
            Some(entry) if entry.serial == serial =>
            {
                self.entries.remove(key);
                true
            },
            _ => false,
        }
    }

    // Names of entries still referenced from outside, then forget the whole
    // membership. Nothing is freed here; see the manager's teardown notes.
    pub fn drain_leak_report(&mut self) -> Vec<String>
    {
        let mut leaked = Vec::new();
        for (key, entry) in self.entries.iter()
        {
            if entry.resource.strong_count() > 0
            {
                leaked.push(key.path.as_str().to_string());
            }
        }
        self.entries.clear();
        leaked
    }

    // Every live, non-outdated resource currently registered
    #[must_use]
    pub fn live(&self) -> Vec<ResourceHandle<K>>
    {
        self.entries.values()
            .filter_map(|entry| entry.resource.upgrade())
            .filter(|inner| !inner.is_outdated())
            .map(|inner| ResourceHandle { inner })
            .collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.entries.len() }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::kinds::Sound;
    use chrono::Utc;
    use std::sync::Weak;
    use vfs_kiln::{VfsPath, VirtualFileSystem};

    fn key_for(path: &str) -> ResourceKey
    {
        // each test vfs id is unique, which is fine for cache-local tests
        ResourceKey { vfs: VirtualFileSystem::new().id(), path: VfsPath::parse(path).unwrap() }
    }

    fn resource(key: &ResourceKey, modified: DateTime<Utc>) -> ResourceHandle<Sound>
    {
        ResourceHandle::new_loading(Weak::new(), key.clone(), modified)
    }

    #[test]
    fn lookup_misses_outdated_and_dead()
    {
        let mut cache = IdentityCache::<Sound>::default();
        let key = key_for("/a.wav");
        let now = Utc::now();

        assert!(cache.lookup(&key).is_none());

        let res = resource(&key, now);
        cache.publish(key.clone(), &res);
        assert!(cache.lookup(&key).is_some());

        res.mark_outdated();
        assert!(cache.lookup(&key).is_none());

        drop(res);
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn reconcile_detects_staleness()
    {
        let mut cache = IdentityCache::<Sound>::default();
        let key = key_for("/a.wav");
        let now = Utc::now();

        assert!(matches!(cache.reconcile(&key, now), Reconciled::Absent));

        let res = resource(&key, now);
        cache.publish(key.clone(), &res);

        let Reconciled::Fresh(same) = cache.reconcile(&key, now) else { panic!("expected fresh"); };
        assert_eq!(same, res);

        let later = now + chrono::TimeDelta::seconds(1);
        let Reconciled::Stale(stale) = cache.reconcile(&key, later) else { panic!("expected stale"); };
        assert_eq!(stale, res);
        assert!(res.is_outdated());

        // outdated entries are invisible from then on
        assert!(matches!(cache.reconcile(&key, later), Reconciled::Absent));
    }

    #[test]
    fn publish_supersedes_outdated_entry()
    {
        let mut cache = IdentityCache::<Sound>::default();
        let key = key_for("/a.wav");
        let now = Utc::now();

        let first = resource(&key, now);
        cache.publish(key.clone(), &first);
        first.mark_outdated();

        let second = resource(&key, now + chrono::TimeDelta::seconds(1));
        cache.publish(key.clone(), &second);

        // only one non-outdated resource per key
        assert_eq!(Some(second.clone()), cache.lookup(&key));
        assert_eq!(1, cache.len());

        // the superseded resource's removal must not evict its successor
        assert!(!cache.remove(&key, first.serial()));
        assert!(cache.lookup(&key).is_some());
    }

    #[test]
    fn remove_is_idempotent()
    {
        let mut cache = IdentityCache::<Sound>::default();
        let key = key_for("/a.wav");

        let res = resource(&key, Utc::now());
        cache.publish(key.clone(), &res);

        assert!(cache.remove(&key, res.serial()));
        assert!(!cache.remove(&key, res.serial()));
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn leak_report_names_live_entries_only()
    {
        let mut cache = IdentityCache::<Sound>::default();
        let held_key = key_for("/held.wav");
        let dropped_key = key_for("/dropped.wav");
        let now = Utc::now();

        let held = resource(&held_key, now);
        cache.publish(held_key.clone(), &held);

        let dropped = resource(&dropped_key, now);
        cache.publish(dropped_key.clone(), &dropped);
        // entry outlives the resource if drop-deregistration is unavailable
        // (no manager backpointer in these tests)
        drop(dropped);

        let leaked = cache.drain_leak_report();
        assert_eq!(vec!["/held.wav".to_string()], leaked);
        assert_eq!(0, cache.len());

        // the held resource is untouched by teardown
        assert!(!held.is_outdated());
    }
}
