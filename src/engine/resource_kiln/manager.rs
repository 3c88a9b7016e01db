use crate::cache::{IdentityCache, Reconciled};
use crate::error::LoadError;
use crate::kinds::AudioDecode;
use crate::loader::{LoadListener, LoaderShared, ResourceLoadTask, ResourceLoader, TaskOutcome};
use crate::module::{FormatModule, ModuleSet};
use crate::peer::PeerLoader;
use crate::resource::{ResourceHandle, ResourceKey, ResourceKind, ResourceState};
use crate::tracker::{DecoderTicket, DecoderTracker};
use nab_kiln::ShortTypeName;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};
use vfs_kiln::{VfsPath, VirtualFileSystem};

pub(crate) struct PendingLoad<K: ResourceKind>
{
    placeholder: ResourceHandle<K>,
    listeners: Vec<LoadListener<K>>,
}

pub(crate) struct ManagerShared<K: ResourceKind>
{
    pub cache: Mutex<IdentityCache<K>>,
    pub in_flight: Mutex<HashMap<ResourceKey, PendingLoad<K>>>,
    pub tracker: Mutex<DecoderTracker>,
    pub modules: ModuleSet<K>,
    pub peer_loaders: RwLock<Vec<Arc<dyn PeerLoader<K>>>>,
    pub loader: Arc<LoaderShared>,
}
impl<K: ResourceKind> ManagerShared<K>
{
    // Idempotent cache deregistration; also the resource destructor's path
    pub fn deregister(&self, key: &ResourceKey, serial: u64)
    {
        self.cache.lock().remove(key, serial);
    }

    pub fn take_in_flight(&self, key: &ResourceKey) -> Vec<LoadListener<K>>
    {
        self.in_flight.lock().remove(key).map(|p| p.listeners).unwrap_or_default()
    }

    // Peer loaders run outside all manager locks
    pub fn attach_peers(&self, resource: &ResourceHandle<K>) -> Result<(), LoadError>
    {
        let loaders: Vec<_> = self.peer_loaders.read().clone();
        for peer_loader in loaders
        {
            peer_loader.attach(resource).map_err(|source| LoadError::Decode
            {
                path: resource.display_name().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

// Single entry point for one resource kind: cache lookup, module selection,
// construction, peer attachment, decoder tracking, teardown.
pub struct ResourceManager<K: ResourceKind>
{
    shared: Arc<ManagerShared<K>>,
}
impl<K: ResourceKind> ResourceManager<K>
{
    #[must_use]
    pub fn new(loader: &ResourceLoader) -> Self
    {
        Self
        {
            shared: Arc::new(ManagerShared
            {
                cache: Mutex::new(IdentityCache::default()),
                in_flight: Mutex::new(HashMap::new()),
                tracker: Mutex::new(DecoderTracker::default()),
                modules: ModuleSet::default(),
                peer_loaders: RwLock::new(Vec::new()),
                loader: loader.shared().clone(),
            }),
        }
    }

    pub fn add_module(&self, module: Arc<dyn FormatModule<K>>)
    {
        self.shared.modules.add(module);
    }

    pub fn add_peer_loader(&self, peer_loader: Arc<dyn PeerLoader<K>>)
    {
        self.shared.peer_loaders.write().push(peer_loader);
    }

    // Swap the peer loader for one subsystem (backend module hot-swap) and
    // re-attach its peer on every live cached resource
    pub fn replace_peer_loader(&self, peer_loader: Arc<dyn PeerLoader<K>>)
    {
        let subsystem = peer_loader.subsystem();
        {
            let mut loaders = self.shared.peer_loaders.write();
            loaders.retain(|l| l.subsystem() != subsystem);
            loaders.push(peer_loader.clone());
        }

        let live = self.shared.cache.lock().live();
        for resource in live
        {
            if let Err(err) = peer_loader.attach(&resource)
            {
                log::error!("Failed to re-attach {subsystem:?} peer on {resource:?}: {err}");
            }
        }
    }

    // Load synchronously; blocks for header parse and peer attachment.
    // An unchanged cached resource is returned without any IO.
    pub fn load(
        &self,
        vfs: &Arc<VirtualFileSystem>,
        path: &str,
        base: &VfsPath) -> Result<ResourceHandle<K>, LoadError>
    {
        let (key, modified) = self.locate(vfs, path, base)?;

        // the guard must not outlive this statement: dropping a stale
        // handle can re-enter the cache lock through deregistration
        let reconciled = self.shared.cache.lock().reconcile(&key, modified);
        match reconciled
        {
            Reconciled::Fresh(existing) => return Ok(existing),
            Reconciled::Stale(existing) =>
                log::warn!("{existing:?} changed on disk; reloading"),
            Reconciled::Absent => { },
        }

        // module header parsing happens outside the cache lock
        let module = self.shared.modules.select(&key.path)?;
        let mut reader = vfs.open_for_reading(&key.path)
            .map_err(|err| LoadError::from_vfs(err, path, base.as_str()))?;
        let info = module.init_load(reader.as_mut()).map_err(|source| LoadError::Decode
        {
            path: key.path.as_str().to_string(),
            source,
        })?;
        drop(reader);

        let resource = ResourceHandle::new_loading(Arc::downgrade(&self.shared), key.clone(), modified);
        resource.set_info(info);

        {
            let mut cache = self.shared.cache.lock();
            // a parallel load may have won the slot while we parsed
            if let Some(winner) = cache.lookup(&key)
            {
                return Ok(winner);
            }
            cache.publish(key.clone(), &resource);
        }

        if let Err(err) = self.shared.attach_peers(&resource)
        {
            resource.mark_state(ResourceState::Failed);
            self.shared.deregister(&key, resource.serial());
            return Err(err);
        }

        resource.mark_state(ResourceState::Ready);
        Ok(resource)
    }

    // Load off the request path. Returns a placeholder immediately; await it
    // or pass a listener, and drive ResourceLoader::update for completion.
    // A second request for the same path while in flight attaches to the
    // running task instead of starting a duplicate.
    pub fn load_async(
        &self,
        vfs: &Arc<VirtualFileSystem>,
        path: &str,
        base: &VfsPath,
        listener: Option<LoadListener<K>>) -> Result<ResourceHandle<K>, LoadError>
    {
        let (key, modified) = self.locate(vfs, path, base)?;

        let mut in_flight = self.shared.in_flight.lock();
        if let Some(pending) = in_flight.get_mut(&key)
        {
            if let Some(listener) = listener
            {
                pending.listeners.push(listener);
            }
            return Ok(pending.placeholder.clone());
        }

        // in_flight stays locked across the reconcile so no concurrent
        // request can start a duplicate task for this key; the cache guard
        // itself must not outlive the reconcile statement (see load)
        let reconciled = self.shared.cache.lock().reconcile(&key, modified);
        match reconciled
        {
            Reconciled::Fresh(existing) =>
                return Ok(self.adopt_existing(&mut in_flight, vfs, key, existing, listener)),
            Reconciled::Stale(existing) =>
                log::warn!("{existing:?} changed on disk; reloading"),
            Reconciled::Absent => { },
        }

        let placeholder = ResourceHandle::new_loading(Arc::downgrade(&self.shared), key.clone(), modified);
        {
            // a synchronous load never touches in_flight, so it can publish
            // for this key between the reconcile above and here; the earlier
            // publication owns the cache slot
            let mut cache = self.shared.cache.lock();
            match cache.lookup(&key)
            {
                Some(winner) =>
                {
                    drop(cache);
                    return Ok(self.adopt_existing(&mut in_flight, vfs, key, winner, listener));
                },
                None => cache.publish(key.clone(), &placeholder),
            }
        }
        in_flight.insert(key.clone(), PendingLoad
        {
            placeholder: placeholder.clone(),
            listeners: listener.into_iter().collect(),
        });
        drop(in_flight);

        let task = Box::new(ResourceLoadTask
        {
            shared: self.shared.clone(),
            vfs: vfs.clone(),
            key: key.clone(),
            placeholder: placeholder.clone(),
            outcome: TaskOutcome::NotRun,
            notify: self.shared.loader.notification_sender(),
        });
        if !self.shared.loader.enqueue(task)
        {
            placeholder.mark_state(ResourceState::Failed);
            self.shared.deregister(&key, placeholder.serial());
            for listener in self.shared.take_in_flight(&key)
            {
                listener(Err(Arc::new(LoadError::Shutdown)));
            }
            return Err(LoadError::Shutdown);
        }

        Ok(placeholder)
    }

    // Route an async request at an already-published resource: no IO, the
    // listeners still fire from a Finished step on the next update
    fn adopt_existing(
        &self,
        in_flight: &mut HashMap<ResourceKey, PendingLoad<K>>,
        vfs: &Arc<VirtualFileSystem>,
        key: ResourceKey,
        existing: ResourceHandle<K>,
        listener: Option<LoadListener<K>>) -> ResourceHandle<K>
    {
        in_flight.insert(key.clone(), PendingLoad
        {
            placeholder: existing.clone(),
            listeners: listener.into_iter().collect(),
        });
        self.shared.loader.schedule_finished(Box::new(ResourceLoadTask
        {
            shared: self.shared.clone(),
            vfs: vfs.clone(),
            key,
            placeholder: existing.clone(),
            outcome: TaskOutcome::AlreadyLoaded(existing.clone()),
            notify: self.shared.loader.notification_sender(),
        }));
        existing
    }

    // Always blocks; there is no asynchronous save path
    pub fn save(
        &self,
        vfs: &Arc<VirtualFileSystem>,
        resource: &ResourceHandle<K>,
        path: &str,
        base: &VfsPath) -> Result<(), LoadError>
    {
        let absolute = base.resolve(path)
            .map_err(|err| LoadError::from_vfs(err.into(), path, base.as_str()))?;
        let module = self.shared.modules.select(&absolute)?;
        let mut writer = vfs.open_for_writing(&absolute)
            .map_err(|err| LoadError::from_vfs(err, path, base.as_str()))?;

        // the writer closes when it drops, error or not
        module.save(writer.as_mut(), resource).map_err(|source| LoadError::Decode
        {
            path: absolute.as_str().to_string(),
            source,
        })
    }

    // Memory-constructed resource: empty filename, never cached, exempt
    // from staleness checks
    #[must_use]
    pub fn create_temporary(&self, info: K::Info) -> ResourceHandle<K>
    {
        ResourceHandle::new_temporary(info)
    }

    pub fn create_decoder(
        &self,
        vfs: &Arc<VirtualFileSystem>,
        resource: &ResourceHandle<K>) -> Result<TrackedDecoder<K, K::Decoder>, LoadError>
    {
        let (module, reader) = self.open_decode_stream(vfs, resource)?;
        let inner = module.create_decoder(resource, reader).map_err(|source| LoadError::Decode
        {
            path: resource.display_name().to_string(),
            source,
        })?;
        Ok(self.track_decoder(inner, resource))
    }

    // Decoder for an embedded audio stream; None when the format has none
    pub fn create_audio_decoder(
        &self,
        vfs: &Arc<VirtualFileSystem>,
        resource: &ResourceHandle<K>) -> Result<Option<TrackedDecoder<K, dyn AudioDecode>>, LoadError>
    {
        let (module, reader) = self.open_decode_stream(vfs, resource)?;
        let maybe = module.create_audio_decoder(resource, reader).map_err(|source| LoadError::Decode
        {
            path: resource.display_name().to_string(),
            source,
        })?;
        Ok(maybe.map(|inner| self.track_decoder(inner, resource)))
    }

    // First the helper list, then the resource cache. Warnings only; the
    // objects themselves stay alive with whoever still references them.
    pub fn release_leaking_resources(&self) -> (usize, usize)
    {
        let helpers = self.shared.tracker.lock().release_leaking();

        let leaked = self.shared.cache.lock().drain_leak_report();
        for name in &leaked
        {
            log::warn!("{} resource still referenced at shutdown: {name}", K::media_type());
        }

        (leaked.len(), helpers)
    }

    #[must_use]
    pub fn num_cached_resources(&self) -> usize
    {
        // bind the handles so none can drop (and deregister, re-entering
        // the cache lock) while the lock guard is still alive
        let live = self.shared.cache.lock().live();
        live.len()
    }

    fn locate(
        &self,
        vfs: &Arc<VirtualFileSystem>,
        path: &str,
        base: &VfsPath) -> Result<(ResourceKey, chrono::DateTime<chrono::Utc>), LoadError>
    {
        let found = vfs.find_file_for_reading(path, base)
            .map_err(|err| LoadError::from_vfs(err, path, base.as_str()))?;
        let modified = vfs.modification_time(&found)
            .map_err(|err| LoadError::from_vfs(err, path, base.as_str()))?;
        Ok((ResourceKey { vfs: vfs.id(), path: found }, modified))
    }

    fn open_decode_stream(
        &self,
        vfs: &Arc<VirtualFileSystem>,
        resource: &ResourceHandle<K>)
        -> Result<(Arc<dyn FormatModule<K>>, Box<dyn vfs_kiln::VfsRead>), LoadError>
    {
        let Some(key) = resource.key() else
        {
            // temporary resources have no backing stream to decode from
            return Err(LoadError::FileNotFound { path: "<temporary>".to_string(), base: String::new() });
        };

        let module = self.shared.modules.select(&key.path)?;
        let reader = vfs.open_for_reading(&key.path)
            .map_err(|err| LoadError::from_vfs(err, key.path.as_str(), "/"))?;
        Ok((module, reader))
    }

    fn track_decoder<D: ?Sized + Send>(
        &self,
        inner: Box<D>,
        resource: &ResourceHandle<K>) -> TrackedDecoder<K, D>
    {
        // only the list splice happens under the tracker lock
        let ticket = self.shared.tracker.lock().track(resource.display_name().to_string());
        TrackedDecoder
        {
            inner,
            resource: resource.clone(),
            ticket,
            shared: Arc::downgrade(&self.shared),
        }
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<ManagerShared<K>>
    {
        &self.shared
    }
}

// A tracked transient decode helper. Holds its owning resource alive and
// deregisters from the manager's helper list on drop (a no-op if the
// manager released it as leaking first).
pub struct TrackedDecoder<K: ResourceKind, D: ?Sized + Send>
{
    inner: Box<D>,
    resource: ResourceHandle<K>,
    ticket: DecoderTicket,
    shared: Weak<ManagerShared<K>>,
}
impl<K: ResourceKind, D: ?Sized + Send> TrackedDecoder<K, D>
{
    #[inline] #[must_use]
    pub fn resource(&self) -> &ResourceHandle<K>
    {
        &self.resource
    }
}
impl<K: ResourceKind, D: ?Sized + Send> Deref for TrackedDecoder<K, D>
{
    type Target = D;
    fn deref(&self) -> &D { &self.inner }
}
impl<K: ResourceKind, D: ?Sized + Send> DerefMut for TrackedDecoder<K, D>
{
    fn deref_mut(&mut self) -> &mut D { &mut self.inner }
}
impl<K: ResourceKind, D: ?Sized + Send> std::fmt::Debug for TrackedDecoder<K, D>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "{}({:?})", D::short_type_name(), self.resource)
    }
}
impl<K: ResourceKind, D: ?Sized + Send> Drop for TrackedDecoder<K, D>
{
    fn drop(&mut self)
    {
        let Some(shared) = self.shared.upgrade() else { return; };
        if let Err(err) = shared.tracker.lock().untrack(self.ticket)
        {
            // cannot propagate from drop; loudly flag the corruption instead
            log::error!("{err} while untracking decoder for {:?}", self.resource);
            nab_kiln::debug_panic!("{err} while untracking decoder for {:?}", self.resource);
        }
    }
}

pub type Decoder<K> = TrackedDecoder<K, <K as ResourceKind>::Decoder>;
pub type AudioDecoder<K> = TrackedDecoder<K, dyn AudioDecode>;

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::kinds::{Sound, SoundInfo};
    use crate::peer::Subsystem;
    use crate::test_support::{FakePeer, FakePeerLoader, FakeSoundModule, fixture};
    use chrono::TimeDelta;
    use std::sync::atomic::Ordering;

    fn sound_manager() -> (ResourceLoader, ResourceManager<Sound>, Arc<FakeSoundModule>)
    {
        let loader = ResourceLoader::new();
        let manager = ResourceManager::new(&loader);
        let module = FakeSoundModule::new();
        manager.add_module(module.clone());
        (loader, manager, module)
    }

    #[test]
    fn load_returns_one_resource_per_path()
    {
        let f = fixture();
        f.files.write_file("click.wav", *b"\x01\x02\x03\x04");
        let (_loader, manager, module) = sound_manager();

        let a = manager.load(&f.vfs, "click.wav", &f.base).unwrap();
        let b = manager.load(&f.vfs, "click.wav", &f.base).unwrap();

        assert_eq!(a, b);
        assert_eq!(1, module.num_init_calls());
        assert!(a.is_ready());
        assert!(!a.is_temporary());
        assert_eq!("/data/click.wav", a.filename());
        assert_eq!(Some(&SoundInfo
        {
            bytes_per_sample: 2,
            sample_rate: 44100,
            sample_count: 2,
            channel_count: 1,
        }), a.info());
    }

    #[test]
    fn changed_file_loads_a_new_resource()
    {
        let f = fixture();
        f.files.write_file("click.wav", *b"\x01\x02");
        let (_loader, manager, module) = sound_manager();

        let old = manager.load(&f.vfs, "click.wav", &f.base).unwrap();
        assert!(f.files.touch("click.wav", old.modification_time().unwrap() + TimeDelta::seconds(5)));
        let new = manager.load(&f.vfs, "click.wav", &f.base).unwrap();

        assert_ne!(old, new);
        assert_eq!(2, module.num_init_calls());
        // holders of the old resource keep a usable, if stale, resource
        assert!(old.is_outdated());
        assert!(old.is_ready());
        assert!(!new.is_outdated());
        assert_ne!(old.modification_time(), new.modification_time());
    }

    #[test]
    fn superseded_handle_deregistration_leaves_current_entry()
    {
        let f = fixture();
        f.files.write_file("click.wav", *b"\x01\x02");
        let (_loader, manager, module) = sound_manager();

        let old = manager.load(&f.vfs, "click.wav", &f.base).unwrap();
        f.files.touch("click.wav", old.modification_time().unwrap() + TimeDelta::seconds(5));
        let new = manager.load(&f.vfs, "click.wav", &f.base).unwrap();

        // the old resource's destructor must not evict its replacement
        drop(old);
        let again = manager.load(&f.vfs, "click.wav", &f.base).unwrap();
        assert_eq!(new, again);
        assert_eq!(2, module.num_init_calls());
    }

    #[test]
    fn unknown_extension_is_an_error()
    {
        let f = fixture();
        f.files.write_file("movie.ogv", *b"junk");
        let (_loader, manager, _module) = sound_manager();

        let err = manager.load(&f.vfs, "movie.ogv", &f.base).unwrap_err();
        assert!(matches!(err, LoadError::NoCapableModule { .. }), "{err}");
        assert_eq!(0, manager.num_cached_resources());
    }

    #[test]
    fn missing_file_is_an_error()
    {
        let f = fixture();
        let (_loader, manager, _module) = sound_manager();

        let err = manager.load(&f.vfs, "absent.wav", &f.base).unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound { .. }), "{err}");
    }

    #[test]
    fn failed_header_parse_is_not_cached()
    {
        let f = fixture();
        f.files.write_file("click.wav", *b"\x01\x02");
        let (_loader, manager, module) = sound_manager();

        module.fail_init.store(true, Ordering::Release);
        let err = manager.load(&f.vfs, "click.wav", &f.base).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }), "{err}");
        assert_eq!(0, manager.num_cached_resources());

        // the failure left nothing behind; a corrected module loads cleanly
        module.fail_init.store(false, Ordering::Release);
        let resource = manager.load(&f.vfs, "click.wav", &f.base).unwrap();
        assert!(resource.is_ready());
    }

    #[test]
    fn peers_attach_on_load()
    {
        let f = fixture();
        f.files.write_file("click.wav", *b"\x01\x02");
        let (_loader, manager, _module) = sound_manager();
        let peer_loader = FakePeerLoader::new(Subsystem::Audio, 7);
        manager.add_peer_loader(peer_loader.clone());

        let resource = manager.load(&f.vfs, "click.wav", &f.base).unwrap();

        assert_eq!(1, peer_loader.attach_calls.load(Ordering::Acquire));
        let peer = resource.peer(Subsystem::Audio).unwrap();
        assert_eq!(7, peer.as_any().downcast_ref::<FakePeer>().unwrap().tag);
        assert!(resource.peer(Subsystem::Graphic).is_none());
    }

    #[test]
    fn peer_attach_failure_fails_the_load()
    {
        let f = fixture();
        f.files.write_file("click.wav", *b"\x01\x02");
        let (_loader, manager, _module) = sound_manager();
        let peer_loader = FakePeerLoader::new(Subsystem::Audio, 7);
        peer_loader.fail.store(true, Ordering::Release);
        manager.add_peer_loader(peer_loader.clone());

        let err = manager.load(&f.vfs, "click.wav", &f.base).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }), "{err}");
        assert_eq!(0, manager.num_cached_resources());

        peer_loader.fail.store(false, Ordering::Release);
        assert!(manager.load(&f.vfs, "click.wav", &f.base).is_ok());
    }

    #[test]
    fn replacing_a_peer_loader_reattaches_live_resources()
    {
        let f = fixture();
        f.files.write_file("click.wav", *b"\x01\x02");
        let (_loader, manager, _module) = sound_manager();
        manager.add_peer_loader(FakePeerLoader::new(Subsystem::Audio, 1));

        let resource = manager.load(&f.vfs, "click.wav", &f.base).unwrap();
        let peer = resource.peer(Subsystem::Audio).unwrap();
        assert_eq!(1, peer.as_any().downcast_ref::<FakePeer>().unwrap().tag);

        let replacement = FakePeerLoader::new(Subsystem::Audio, 2);
        manager.replace_peer_loader(replacement.clone());

        assert_eq!(1, replacement.attach_calls.load(Ordering::Acquire));
        let peer = resource.peer(Subsystem::Audio).unwrap();
        assert_eq!(2, peer.as_any().downcast_ref::<FakePeer>().unwrap().tag);
    }

    #[test]
    fn save_writes_through_the_module()
    {
        let f = fixture();
        f.files.write_file("click.wav", *b"\x01\x02\x03\x04");
        let (_loader, manager, module) = sound_manager();

        let resource = manager.load(&f.vfs, "click.wav", &f.base).unwrap();
        manager.save(&f.vfs, &resource, "copy.wav", &f.base).unwrap();

        assert_eq!(1, module.save_calls.load(Ordering::Acquire));
        assert_eq!(2u64.to_le_bytes().as_slice(), &*f.files.read_file("copy.wav").unwrap());
    }

    #[test]
    fn decoders_track_until_dropped()
    {
        let f = fixture();
        f.files.write_file("click.wav", *b"\x01\x02\x03\x04");
        let (_loader, manager, module) = sound_manager();
        let resource = manager.load(&f.vfs, "click.wav", &f.base).unwrap();

        let mut decoder = manager.create_decoder(&f.vfs, &resource).unwrap();
        assert_eq!(1, module.decoder_calls.load(Ordering::Acquire));
        assert_eq!(1, manager.shared().tracker.lock().count());

        let mut samples = [0u8; 8];
        assert_eq!(4, decoder.read_samples(&mut samples).unwrap());
        assert_eq!(b"\x01\x02\x03\x04", &samples[..4]);

        // sounds have no separate embedded audio stream
        assert!(manager.create_audio_decoder(&f.vfs, &resource).unwrap().is_none());

        drop(decoder);
        assert_eq!(0, manager.shared().tracker.lock().count());
    }

    #[test]
    fn decoding_a_temporary_resource_is_an_error()
    {
        let f = fixture();
        let (_loader, manager, _module) = sound_manager();

        let temporary = manager.create_temporary(SoundInfo::default());
        assert!(temporary.is_temporary());
        assert!(temporary.is_ready());
        assert_eq!("", temporary.filename());
        assert_eq!(0, manager.num_cached_resources());

        assert!(manager.create_decoder(&f.vfs, &temporary).is_err());
    }

    #[test]
    fn release_reports_leaks_and_disarms_decoders()
    {
        let f = fixture();
        f.files.write_file("click.wav", *b"\x01\x02");
        let (_loader, manager, _module) = sound_manager();

        let resource = manager.load(&f.vfs, "click.wav", &f.base).unwrap();
        let decoder = manager.create_decoder(&f.vfs, &resource).unwrap();

        assert_eq!((1, 1), manager.release_leaking_resources());
        assert_eq!(0, manager.num_cached_resources());

        // a decoder outliving the sweep unregisters as a no-op
        drop(decoder);
        assert_eq!(0, manager.shared().tracker.lock().count());

        // a clean manager reports nothing
        drop(resource);
        assert_eq!((0, 0), manager.release_leaking_resources());
    }
}
