use crate::error::{LoadError, ModuleError};
use crate::kinds::AudioDecode;
use crate::resource::{ResourceHandle, ResourceKind};
use parking_lot::RwLock;
use std::sync::Arc;
use unicase::UniCase;
use vfs_kiln::{VfsPath, VfsRead, VfsWrite};

// A pluggable format implementation for one resource kind. Modules declare
// the extensions they handle; format correctness depends on an exact match,
// so selection never falls back to an arbitrary module.
pub trait FormatModule<K: ResourceKind>: Send + Sync
{
    fn name(&self) -> &str;

    fn extensions(&self) -> &[UniCase<&'static str>];

    fn can_load(&self, path: &VfsPath) -> bool
    {
        match path.extension()
        {
            Some(ext) => self.extensions().iter().any(|e| *e == UniCase::new(ext)),
            None => false,
        }
    }

    // Inspect the stream header only and return structural metadata; bulk
    // decoding happens later through decoders
    fn init_load(&self, reader: &mut dyn VfsRead) -> Result<K::Info, ModuleError>;

    fn save(&self, writer: &mut dyn VfsWrite, resource: &ResourceHandle<K>) -> Result<(), ModuleError>;

    fn create_decoder(
        &self,
        resource: &ResourceHandle<K>,
        reader: Box<dyn VfsRead>) -> Result<Box<K::Decoder>, ModuleError>;

    // Decoder for an embedded audio stream, for kinds that can carry one
    // (e.g. a video's soundtrack). None if this format has no audio.
    fn create_audio_decoder(
        &self,
        _resource: &ResourceHandle<K>,
        _reader: Box<dyn VfsRead>) -> Result<Option<Box<dyn AudioDecode>>, ModuleError>
    {
        Ok(None)
    }
}

// Registered format modules for one manager; first capable module wins,
// in registration order
pub(crate) struct ModuleSet<K: ResourceKind>
{
    modules: RwLock<Vec<Arc<dyn FormatModule<K>>>>,
}
impl<K: ResourceKind> Default for ModuleSet<K>
{
    fn default() -> Self
    {
        Self { modules: RwLock::new(Vec::new()) }
    }
}
impl<K: ResourceKind> ModuleSet<K>
{
    pub fn add(&self, module: Arc<dyn FormatModule<K>>)
    {
        log::debug!("Registering {} module {:?}", K::media_type(), module.name());
        self.modules.write().push(module);
    }

    pub fn select(&self, path: &VfsPath) -> Result<Arc<dyn FormatModule<K>>, LoadError>
    {
        let modules = self.modules.read();
        modules.iter()
            .find(|m| m.can_load(path))
            .cloned()
            .ok_or_else(|| LoadError::NoCapableModule
            {
                media: K::media_type(),
                path: path.as_str().to_string(),
            })
    }
}
