use crate::kinds::{Archive, Sound, Synthesizer, Video};
use crate::loader::ResourceLoader;
use crate::manager::ResourceManager;

// Owns the loader and one manager per media type. Passed (by reference)
// wherever resources are loaded; there is no global instance.
pub struct Engine
{
    loader: ResourceLoader,
    sounds: ResourceManager<Sound>,
    videos: ResourceManager<Video>,
    archives: ResourceManager<Archive>,
    synthesizers: ResourceManager<Synthesizer>,
}
impl Engine
{
    #[must_use]
    pub fn new() -> Self
    {
        let loader = ResourceLoader::new();
        let sounds = ResourceManager::new(&loader);
        let videos = ResourceManager::new(&loader);
        let archives = ResourceManager::new(&loader);
        let synthesizers = ResourceManager::new(&loader);
        Self { loader, sounds, videos, archives, synthesizers }
    }

    #[inline] #[must_use] pub fn loader(&self) -> &ResourceLoader { &self.loader }
    #[inline] #[must_use] pub fn sounds(&self) -> &ResourceManager<Sound> { &self.sounds }
    #[inline] #[must_use] pub fn videos(&self) -> &ResourceManager<Video> { &self.videos }
    #[inline] #[must_use] pub fn archives(&self) -> &ResourceManager<Archive> { &self.archives }
    #[inline] #[must_use] pub fn synthesizers(&self) -> &ResourceManager<Synthesizer> { &self.synthesizers }

    // Call once per frame from the owning thread to complete finished loads
    pub fn update(&self)
    {
        self.loader.update();
    }
}
impl Default for Engine
{
    fn default() -> Self { Self::new() }
}
impl Drop for Engine
{
    fn drop(&mut self)
    {
        // stop the workers before sweeping so no load can finish mid-report
        self.loader.shutdown();

        let mut resources = 0;
        let mut helpers = 0;
        for (r, h) in [
            self.sounds.release_leaking_resources(),
            self.videos.release_leaking_resources(),
            self.archives.release_leaking_resources(),
            self.synthesizers.release_leaking_resources()]
        {
            resources += r;
            helpers += h;
        }

        if resources + helpers > 0
        {
            log::warn!("Engine shut down with {resources} resources and {helpers} decode helpers still alive");
        }
    }
}
