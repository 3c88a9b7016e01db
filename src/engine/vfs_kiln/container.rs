use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::PathBuf;
use std::sync::Arc;

pub trait VfsRead: Read + Seek + Send { }
impl<T: Read + Seek + Send> VfsRead for T { }

pub trait VfsWrite: Write + Send { }
impl<T: Write + Send> VfsWrite for T { }

// One mounted provider of files. Paths handed to containers are
// container-relative, '/'-separated and never begin with a separator.
pub trait VfsContainer: Send + Sync
{
    fn exists(&self, path: &str) -> bool;

    fn can_write(&self) -> bool { false }

    fn modification_time(&self, path: &str) -> std::io::Result<DateTime<Utc>>;

    fn open_for_reading(&self, path: &str) -> std::io::Result<Box<dyn VfsRead>>;

    fn open_for_writing(&self, _path: &str) -> std::io::Result<Box<dyn VfsWrite>>
    {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Container is read-only"))
    }
}

// Maps a host directory into the virtual filesystem
pub struct DirectoryContainer
{
    root: PathBuf,
    writable: bool,
}
impl DirectoryContainer
{
    pub fn new(root: impl Into<PathBuf>, writable: bool) -> std::io::Result<Self>
    {
        let root = root.into();
        let meta = fs::metadata(&root)?;
        if !meta.is_dir()
        {
            return Err(std::io::Error::new(std::io::ErrorKind::NotADirectory, "Container root is not a directory"));
        }
        Ok(Self { root, writable })
    }

    fn host_path(&self, path: &str) -> PathBuf
    {
        let mut host = self.root.clone();
        host.extend(path.split('/'));
        host
    }
}
impl VfsContainer for DirectoryContainer
{
    fn exists(&self, path: &str) -> bool
    {
        fs::metadata(self.host_path(path)).map(|m| m.is_file()).unwrap_or(false)
    }

    fn can_write(&self) -> bool { self.writable }

    fn modification_time(&self, path: &str) -> std::io::Result<DateTime<Utc>>
    {
        let modified = fs::metadata(self.host_path(path))?.modified()?;
        Ok(modified.into())
    }

    fn open_for_reading(&self, path: &str) -> std::io::Result<Box<dyn VfsRead>>
    {
        Ok(Box::new(fs::File::open(self.host_path(path))?))
    }

    fn open_for_writing(&self, path: &str) -> std::io::Result<Box<dyn VfsWrite>>
    {
        if !self.writable
        {
            return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Container is read-only"));
        }
        let host = self.host_path(path);
        if let Some(parent) = host.parent()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(Box::new(fs::File::create(host)?))
    }
}

struct MemoryFile
{
    data: Arc<[u8]>,
    modified: DateTime<Utc>,
}

type MemoryFileMap = Arc<Mutex<HashMap<String, MemoryFile>>>;

// In-memory container. Writable; also the primary fixture for tests since
// modification times can be set directly.
#[derive(Default)]
pub struct MemoryContainer
{
    files: MemoryFileMap,
}
impl MemoryContainer
{
    #[must_use]
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn write_file(&self, path: &str, data: impl Into<Arc<[u8]>>)
    {
        let mut files = self.files.lock();
        files.insert(path.to_string(), MemoryFile { data: data.into(), modified: Utc::now() });
    }

    // Bump a file's modification time without touching its contents
    pub fn touch(&self, path: &str, modified: DateTime<Utc>) -> bool
    {
        let mut files = self.files.lock();
        match files.get_mut(path)
        {
            Some(file) => { file.modified = modified; true },
            None => false,
        }
    }

    #[must_use]
    pub fn read_file(&self, path: &str) -> Option<Arc<[u8]>>
    {
        self.files.lock().get(path).map(|f| f.data.clone())
    }
}
impl VfsContainer for MemoryContainer
{
    fn exists(&self, path: &str) -> bool
    {
        self.files.lock().contains_key(path)
    }

    fn can_write(&self) -> bool { true }

    fn modification_time(&self, path: &str) -> std::io::Result<DateTime<Utc>>
    {
        self.files.lock().get(path)
            .map(|f| f.modified)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }

    fn open_for_reading(&self, path: &str) -> std::io::Result<Box<dyn VfsRead>>
    {
        let files = self.files.lock();
        let file = files.get(path).ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        Ok(Box::new(Cursor::new(file.data.to_vec())))
    }

    fn open_for_writing(&self, path: &str) -> std::io::Result<Box<dyn VfsWrite>>
    {
        Ok(Box::new(MemoryFileWriter
        {
            files: self.files.clone(),
            path: path.to_string(),
            buf: Vec::new(),
        }))
    }
}

// Commits the written bytes back into the owning container on drop
struct MemoryFileWriter
{
    files: MemoryFileMap,
    path: String,
    buf: Vec<u8>,
}
impl Write for MemoryFileWriter
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize>
    {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
}
impl Drop for MemoryFileWriter
{
    fn drop(&mut self)
    {
        let mut files = self.files.lock();
        files.insert(std::mem::take(&mut self.path), MemoryFile
        {
            data: std::mem::take(&mut self.buf).into(),
            modified: Utc::now(),
        });
    }
}
