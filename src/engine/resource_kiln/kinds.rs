use crate::error::ModuleError;
use crate::resource::{MediaType, ResourceKind};
use vfs_kiln::VfsContainer;

// Incrementally produces interleaved PCM from an open stream. Sounds decode
// through this directly; videos may expose one for their soundtrack.
pub trait AudioDecode: Send
{
    // Fill `out` with decoded sample bytes; short reads happen at end of
    // stream, a zero read means exhausted
    fn read_samples(&mut self, out: &mut [u8]) -> Result<usize, ModuleError>;

    fn seek_sample(&mut self, position: u64) -> Result<(), ModuleError>;
}

// Incrementally produces decoded frames from an open stream
pub trait VideoDecode: Send
{
    // Decode the next frame into `target`; false once past the last frame
    fn decode_frame(&mut self, target: &mut [u8]) -> Result<bool, ModuleError>;

    fn seek_frame(&mut self, frame: u64) -> Result<(), ModuleError>;
}

pub enum Sound { }
impl ResourceKind for Sound
{
    type Info = SoundInfo;
    type Decoder = dyn AudioDecode;

    fn media_type() -> MediaType { MediaType::Sound }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SoundInfo
{
    pub bytes_per_sample: u32,
    pub sample_rate: u32,
    pub sample_count: u64,
    pub channel_count: u32,
}

pub enum Video { }
impl ResourceKind for Video
{
    type Info = VideoInfo;
    type Decoder = dyn VideoDecode;

    fn media_type() -> MediaType { MediaType::Video }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct VideoInfo
{
    pub width: u32,
    pub height: u32,
    pub frame_count: u64,
    pub frame_rate: f32,
    pub has_audio: bool,
}

pub enum Archive { }
impl ResourceKind for Archive
{
    // An archive's decoder is a container view of its contents, so a loaded
    // archive can be mounted straight back into a VirtualFileSystem
    type Info = ArchiveInfo;
    type Decoder = dyn VfsContainer;

    fn media_type() -> MediaType { MediaType::Archive }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveInfo
{
    pub entry_count: u64,
}

pub enum Synthesizer { }
impl ResourceKind for Synthesizer
{
    type Info = SynthesizerInfo;
    type Decoder = dyn AudioDecode;

    fn media_type() -> MediaType { MediaType::Synthesizer }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SynthesizerInfo
{
    pub channel_count: u32,
    pub sample_rate: u32,
    pub sample_count: u64,
}
