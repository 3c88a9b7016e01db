use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError
{
    Empty,
    NotAbsolute,
    EscapesRoot,
}
impl Display for PathError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}
impl Error for PathError { }

#[derive(Debug)]
pub enum VfsError
{
    NotFound { path: String },
    NotWritable { path: String },
    Path(PathError),
    Io { path: String, source: std::io::Error },
}
impl Display for VfsError
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            Self::NotFound { path } => write!(f, "No file at {path:?} in any mounted container"),
            Self::NotWritable { path } => write!(f, "No writable container mounted for {path:?}"),
            Self::Path(err) => write!(f, "Malformed virtual path: {err}"),
            Self::Io { path, source } => write!(f, "IO failure on {path:?}: {source}"),
        }
    }
}
impl Error for VfsError
{
    fn source(&self) -> Option<&(dyn Error + 'static)>
    {
        match self
        {
            Self::Path(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
impl From<PathError> for VfsError
{
    fn from(err: PathError) -> Self { Self::Path(err) }
}
