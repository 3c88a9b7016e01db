use crate::manager::ManagerShared;
use crate::peer::{ResourcePeer, Subsystem};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt::{Debug, Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::task::{Context, Poll, Waker};
use vfs_kiln::{VfsId, VfsPath};

// Media families served by the manager family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MediaType
{
    Sound,
    Video,
    Archive,
    Synthesizer,
}
impl Display for MediaType
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        f.write_str(match self
        {
            Self::Sound => "sound",
            Self::Video => "video",
            Self::Archive => "archive",
            Self::Synthesizer => "synthesizer",
        })
    }
}

// One loadable resource family (sound, video, ...). All managers are the same
// generic machinery parameterized over this.
pub trait ResourceKind: Send + Sync + 'static
{
    // Structural metadata a module parses from the stream header alone
    type Info: Send + Sync + 'static;
    // Trait-object type a module's create_decoder produces
    type Decoder: ?Sized + Send + 'static;

    fn media_type() -> MediaType;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResourceState
{
    Loading = 0,
    Ready = 1,
    Failed = 2,
}
impl ResourceState
{
    fn from_u8(v: u8) -> Self
    {
        match v
        {
            0 => Self::Loading,
            1 => Self::Ready,
            _ => Self::Failed,
        }
    }
}

// Identity of a file-backed resource: which filesystem, which normalized path
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct ResourceKey
{
    pub vfs: VfsId,
    pub path: VfsPath,
}
impl Debug for ResourceKey
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "{:?}:{}", self.vfs, self.path)
    }
}

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

pub(crate) struct ResourceInner<K: ResourceKind>
{
    serial: u64,
    source: Option<ResourceKey>,
    modification_time: Option<DateTime<Utc>>,
    info: OnceLock<K::Info>,
    state: AtomicU8,
    outdated: AtomicBool,
    peers: Mutex<[Option<Arc<dyn ResourcePeer>>; Subsystem::COUNT]>,
    ready_waker: Mutex<Option<Waker>>,
    manager: Weak<ManagerShared<K>>,
}
impl<K: ResourceKind> ResourceInner<K>
{
    #[inline]
    pub fn serial(&self) -> u64 { self.serial }

    #[inline]
    pub fn is_outdated(&self) -> bool { self.outdated.load(Ordering::Acquire) }

    #[inline]
    pub fn state(&self) -> ResourceState { ResourceState::from_u8(self.state.load(Ordering::Acquire)) }

    pub fn display_name(&self) -> &str
    {
        match &self.source
        {
            Some(key) => key.path.as_str(),
            None => "<temporary>",
        }
    }
}
impl<K: ResourceKind> Drop for ResourceInner<K>
{
    // The last handle is gone; pull the cache entry if it is still ours.
    // The manager may already have dropped this entry (leak teardown) or
    // replaced it (staleness) - deregistration is idempotent either way.
    fn drop(&mut self)
    {
        if let (Some(key), Some(manager)) = (&self.source, self.manager.upgrade())
        {
            manager.deregister(key, self.serial);
        }
    }
}

// A shared handle to a loaded (or still-loading) resource. Cheap to clone;
// the backing resource is destroyed when the last handle drops.
pub struct ResourceHandle<K: ResourceKind>
{
    pub(crate) inner: Arc<ResourceInner<K>>,
}

// A more convenient alias for ResourceHandle<K>
pub type Resh<K> = ResourceHandle<K>;

impl<K: ResourceKind> ResourceHandle<K>
{
    pub(crate) fn new_loading(
        manager: Weak<ManagerShared<K>>,
        key: ResourceKey,
        modification_time: DateTime<Utc>) -> Self
    {
        Self
        {
            inner: Arc::new(ResourceInner
            {
                serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
                source: Some(key),
                modification_time: Some(modification_time),
                info: OnceLock::new(),
                state: AtomicU8::new(ResourceState::Loading as u8),
                outdated: AtomicBool::new(false),
                peers: Mutex::new([const { None }; Subsystem::COUNT]),
                ready_waker: Mutex::new(None),
                manager,
            }),
        }
    }

    // Memory-constructed resource; never cached, exempt from staleness
    pub(crate) fn new_temporary(info: K::Info) -> Self
    {
        let inner = ResourceInner
        {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            source: None,
            modification_time: None,
            info: OnceLock::new(),
            state: AtomicU8::new(ResourceState::Ready as u8),
            outdated: AtomicBool::new(false),
            peers: Mutex::new([const { None }; Subsystem::COUNT]),
            ready_waker: Mutex::new(None),
            manager: Weak::new(),
        };
        let _ = inner.info.set(info);
        Self { inner: Arc::new(inner) }
    }

    // The resource's normalized virtual path, or "" for temporary resources
    #[must_use]
    pub fn filename(&self) -> &str
    {
        match &self.inner.source
        {
            Some(key) => key.path.as_str(),
            None => "",
        }
    }

    #[must_use]
    pub fn vfs_id(&self) -> Option<VfsId>
    {
        self.inner.source.as_ref().map(|key| key.vfs)
    }

    #[inline] #[must_use]
    pub fn is_temporary(&self) -> bool { self.inner.source.is_none() }

    #[must_use]
    pub fn modification_time(&self) -> Option<DateTime<Utc>>
    {
        self.inner.modification_time
    }

    #[inline] #[must_use]
    pub fn state(&self) -> ResourceState { self.inner.state() }

    #[inline] #[must_use]
    pub fn is_ready(&self) -> bool { self.state() == ResourceState::Ready }

    // Superseded by a fresher on-disk version; still valid for holders,
    // invisible to new lookups
    #[inline] #[must_use]
    pub fn is_outdated(&self) -> bool { self.inner.is_outdated() }

    // Header metadata; present once loading got past the header parse
    #[must_use]
    pub fn info(&self) -> Option<&K::Info>
    {
        self.inner.info.get()
    }

    #[must_use]
    pub fn peer(&self, subsystem: Subsystem) -> Option<Arc<dyn ResourcePeer>>
    {
        self.inner.peers.lock()[subsystem.index()].clone()
    }

    pub fn set_peer(&self, subsystem: Subsystem, peer: Option<Arc<dyn ResourcePeer>>)
    {
        self.inner.peers.lock()[subsystem.index()] = peer;
    }

    pub(crate) fn key(&self) -> Option<&ResourceKey>
    {
        self.inner.source.as_ref()
    }

    #[inline]
    pub(crate) fn serial(&self) -> u64 { self.inner.serial }

    pub(crate) fn display_name(&self) -> &str { self.inner.display_name() }

    pub(crate) fn mark_outdated(&self)
    {
        self.inner.outdated.store(true, Ordering::Release);
    }

    pub(crate) fn set_info(&self, info: K::Info)
    {
        let _ = self.inner.info.set(info);
    }

    pub(crate) fn mark_state(&self, state: ResourceState)
    {
        self.inner.state.store(state as u8, Ordering::Release);
        if state != ResourceState::Loading
        {
            let mut locked = self.inner.ready_waker.lock();
            if let Some(waker) = locked.take()
            {
                waker.wake();
            }
        }
    }
}
impl<K: ResourceKind> Clone for ResourceHandle<K>
{
    fn clone(&self) -> Self
    {
        Self { inner: self.inner.clone() }
    }
}
impl<K: ResourceKind> PartialEq for ResourceHandle<K>
{
    fn eq(&self, other: &Self) -> bool
    {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
impl<K: ResourceKind> Eq for ResourceHandle<K> { }
impl<K: ResourceKind> Debug for ResourceHandle<K>
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "{}:{}", K::media_type(), self.inner.display_name())
    }
}
impl<K: ResourceKind> Future for &ResourceHandle<K>
{
    type Output = ResourceState;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output>
    {
        match self.state()
        {
            ResourceState::Loading =>
            {
                let mut locked = self.inner.ready_waker.lock();
                *locked = Some(cx.waker().clone());
                drop(locked);

                // re-check: the load may have finished before the waker landed
                match self.state()
                {
                    ResourceState::Loading => Poll::Pending,
                    done => Poll::Ready(done),
                }
            },
            done => Poll::Ready(done),
        }
    }
}
