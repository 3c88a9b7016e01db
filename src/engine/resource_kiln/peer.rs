use crate::error::ModuleError;
use crate::resource::{ResourceHandle, ResourceKind};
use std::any::Any;

// Engine subsystems that attach private per-resource representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Subsystem
{
    Graphic = 0,
    Audio = 1,
    Physics = 2,
    Synthesizer = 3,
}
impl Subsystem
{
    pub const COUNT: usize = 4;

    #[inline] #[must_use]
    pub fn index(self) -> usize { self as usize }
}

// Type-erased subsystem-private payload attached to a resource
pub trait ResourcePeer: Send + Sync
{
    fn as_any(&self) -> &dyn Any;
}
impl<T: Any + Send + Sync> ResourcePeer for T
{
    fn as_any(&self) -> &dyn Any { self }
}

// One engine subsystem's hook for attaching (or replacing) its peer on a
// resource. Called at initial load and again when the subsystem's backend
// module is hot-swapped.
pub trait PeerLoader<K: ResourceKind>: Send + Sync
{
    fn subsystem(&self) -> Subsystem;

    fn attach(&self, resource: &ResourceHandle<K>) -> Result<(), ModuleError>;
}
