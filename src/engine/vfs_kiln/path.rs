use crate::PathError;
use std::fmt::{Debug, Display, Formatter};

// An absolute, normalized, '/'-separated virtual path. The root is "/".
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VfsPath(String);

impl VfsPath
{
    #[must_use]
    pub fn root() -> Self { Self("/".to_string()) }

    // Parse an absolute path, folding '.', '..' and repeated separators
    pub fn parse(path: &str) -> Result<Self, PathError>
    {
        if path.is_empty() { return Err(PathError::Empty); }
        if !path.starts_with('/') { return Err(PathError::NotAbsolute); }
        Self::build(&[], path)
    }

    // Resolve a possibly-relative path against this one (treated as a directory)
    pub fn resolve(&self, path: &str) -> Result<Self, PathError>
    {
        if path.is_empty() { return Err(PathError::Empty); }
        if path.starts_with('/') { return Self::parse(path); }
        let base: Vec<&str> = self.components().collect();
        Self::build(&base, path)
    }

    fn build(base: &[&str], path: &str) -> Result<Self, PathError>
    {
        let mut parts: Vec<&str> = base.to_vec();
        for comp in path.split('/')
        {
            match comp
            {
                "" | "." => { },
                ".." =>
                {
                    if parts.pop().is_none() { return Err(PathError::EscapesRoot); }
                },
                c => parts.push(c),
            }
        }

        if parts.is_empty() { return Ok(Self::root()); }

        let mut joined = String::with_capacity(path.len() + 1);
        for p in &parts
        {
            joined.push('/');
            joined.push_str(p);
        }
        Ok(Self(joined))
    }

    #[inline] #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }

    #[inline] #[must_use]
    pub fn is_root(&self) -> bool { self.0.len() == 1 }

    pub fn components(&self) -> impl Iterator<Item = &str>
    {
        self.0.split('/').filter(|c| !c.is_empty())
    }

    // Final component ("" at the root)
    #[must_use]
    pub fn file_name(&self) -> &str
    {
        match self.0.rfind('/')
        {
            Some(i) => &self.0[(i + 1)..],
            None => "",
        }
    }

    // Extension of the final component, without the dot
    #[must_use]
    pub fn extension(&self) -> Option<&str>
    {
        let name = self.file_name();
        match name.rfind('.')
        {
            Some(i) if i > 0 => Some(&name[(i + 1)..]),
            _ => None,
        }
    }

    // The remainder of this path under `prefix`, if it lives there ("" if equal)
    #[must_use]
    pub fn strip_prefix(&self, prefix: &VfsPath) -> Option<&str>
    {
        if prefix.is_root() { return Some(&self.0[1..]); }

        let rest = self.0.strip_prefix(prefix.0.as_str())?;
        match rest.strip_prefix('/')
        {
            Some(r) => Some(r),
            None if rest.is_empty() => Some(""),
            None => None, // prefix matched mid-component
        }
    }
}
impl Display for VfsPath
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}
impl Debug for VfsPath
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(&self.0, f) }
}
