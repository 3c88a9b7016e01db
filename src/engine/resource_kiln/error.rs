use crate::MediaType;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use vfs_kiln::VfsError;

pub type ModuleError = Box<dyn Error + Send + Sync>;

// Per-request failures. Fatal to this one load/save, never to the process.
#[derive(Debug)]
pub enum LoadError
{
    FileNotFound { path: String, base: String },
    NoCapableModule { media: MediaType, path: String },
    Decode { path: String, source: ModuleError },
    Io { path: String, source: std::io::Error },
    Shutdown,
}
impl LoadError
{
    pub(crate) fn from_vfs(err: VfsError, path: &str, base: &str) -> Self
    {
        match err
        {
            VfsError::NotFound { .. } | VfsError::Path(_) =>
                Self::FileNotFound { path: path.to_string(), base: base.to_string() },
            VfsError::NotWritable { path } =>
                Self::Io { path, source: std::io::Error::from(std::io::ErrorKind::PermissionDenied) },
            VfsError::Io { path, source } => Self::Io { path, source },
        }
    }
}
impl Display for LoadError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Self::FileNotFound { path, base } =>
                write!(f, "File {path:?} (base {base:?}) not found for reading"),
            Self::NoCapableModule { media, path } =>
                write!(f, "No {media} module able to handle {path:?}"),
            Self::Decode { path, source } =>
                write!(f, "Failed to decode {path:?}: {source}"),
            Self::Io { path, source } =>
                write!(f, "IO failure on {path:?}: {source}"),
            Self::Shutdown =>
                f.write_str("Resource loader has been shut down"),
        }
    }
}
impl Error for LoadError
{
    fn source(&self) -> Option<&(dyn Error + 'static)>
    {
        match self
        {
            Self::Decode { source, .. } => Some(source.as_ref()),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// Internal bookkeeping gone inconsistent (double-untrack, corrupted links).
// A programming error, not a data error; propagated, never swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvariantViolation
{
    pub detail: &'static str,
}
impl Display for InvariantViolation
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "Tracker invariant violated: {}", self.detail)
    }
}
impl Error for InvariantViolation { }
