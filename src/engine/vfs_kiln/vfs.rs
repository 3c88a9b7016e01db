use crate::{VfsContainer, VfsError, VfsPath, VfsRead, VfsWrite};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// Identifies one VirtualFileSystem instance for the lifetime of the process.
// Resource caches key on this, so two filesystems never alias each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VfsId(u64);

static NEXT_VFS_ID: AtomicU64 = AtomicU64::new(1);

struct Mount
{
    point: VfsPath,
    container: Arc<dyn VfsContainer>,
}

// An ordered set of containers mounted at virtual directories. Later mounts
// shadow earlier ones at the same path.
pub struct VirtualFileSystem
{
    id: VfsId,
    mounts: RwLock<Vec<Mount>>,
}
impl VirtualFileSystem
{
    #[must_use]
    pub fn new() -> Arc<Self>
    {
        Arc::new(Self
        {
            id: VfsId(NEXT_VFS_ID.fetch_add(1, Ordering::Relaxed)),
            mounts: RwLock::new(Vec::new()),
        })
    }

    #[inline] #[must_use]
    pub fn id(&self) -> VfsId { self.id }

    pub fn mount(&self, point: VfsPath, container: Arc<dyn VfsContainer>)
    {
        log::debug!("vfs {:?}: mounting container at {point}", self.id);
        self.mounts.write().push(Mount { point, container });
    }

    #[must_use]
    pub fn exists(&self, path: &VfsPath) -> bool
    {
        self.with_reader(path, |_, _| true).unwrap_or(false)
    }

    // Resolve `path` (possibly relative to `base`) to an absolute virtual path
    // that some mounted container can open for reading
    pub fn find_file_for_reading(&self, path: &str, base: &VfsPath) -> Result<VfsPath, VfsError>
    {
        let absolute = base.resolve(path)?;
        if self.exists(&absolute)
        {
            Ok(absolute)
        }
        else
        {
            Err(VfsError::NotFound { path: absolute.as_str().to_string() })
        }
    }

    pub fn modification_time(&self, path: &VfsPath) -> Result<DateTime<Utc>, VfsError>
    {
        self.with_reader(path, |container, rel| container.modification_time(rel))
            .ok_or_else(|| VfsError::NotFound { path: path.as_str().to_string() })?
            .map_err(|err| VfsError::Io { path: path.as_str().to_string(), source: err })
    }

    pub fn open_for_reading(&self, path: &VfsPath) -> Result<Box<dyn VfsRead>, VfsError>
    {
        self.with_reader(path, |container, rel| container.open_for_reading(rel))
            .ok_or_else(|| VfsError::NotFound { path: path.as_str().to_string() })?
            .map_err(|err| VfsError::Io { path: path.as_str().to_string(), source: err })
    }

    pub fn open_for_writing(&self, path: &VfsPath) -> Result<Box<dyn VfsWrite>, VfsError>
    {
        let mounts = self.mounts.read();
        for mount in mounts.iter().rev()
        {
            let Some(rel) = path.strip_prefix(&mount.point) else { continue; };
            if !mount.container.can_write() { continue; }

            return mount.container.open_for_writing(rel)
                .map_err(|err| VfsError::Io { path: path.as_str().to_string(), source: err });
        }
        Err(VfsError::NotWritable { path: path.as_str().to_string() })
    }

    // Apply `func` on the most recent mount that contains `path`
    fn with_reader<R>(&self, path: &VfsPath, func: impl FnOnce(&dyn VfsContainer, &str) -> R) -> Option<R>
    {
        let mounts = self.mounts.read();
        for mount in mounts.iter().rev()
        {
            let Some(rel) = path.strip_prefix(&mount.point) else { continue; };
            if mount.container.exists(rel)
            {
                return Some(func(mount.container.as_ref(), rel));
            }
        }
        None
    }
}
