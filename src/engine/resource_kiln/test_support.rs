use crate::error::ModuleError;
use crate::kinds::{AudioDecode, Sound, SoundInfo};
use crate::module::FormatModule;
use crate::peer::{PeerLoader, Subsystem};
use crate::resource::ResourceHandle;
use parking_lot::{Condvar, Mutex};
use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use unicase::UniCase;
use vfs_kiln::{MemoryContainer, VfsPath, VfsRead, VfsWrite, VirtualFileSystem};

pub fn init_logging()
{
    nab_kiln::debugging::init_logging();
}

// One memory-backed mount at /data
pub struct Fixture
{
    pub vfs: Arc<VirtualFileSystem>,
    pub files: Arc<MemoryContainer>,
    pub base: VfsPath,
}

pub fn fixture() -> Fixture
{
    init_logging();
    let vfs = VirtualFileSystem::new();
    let files = MemoryContainer::new();
    let base = VfsPath::parse("/data").unwrap();
    vfs.mount(base.clone(), files.clone());
    Fixture { vfs, files, base }
}

// Holds a worker mid-load until a test opens it
pub struct Gate
{
    open: Mutex<bool>,
    signal: Condvar,
}
impl Gate
{
    pub fn new_closed() -> Arc<Self>
    {
        Arc::new(Self { open: Mutex::new(false), signal: Condvar::new() })
    }

    pub fn open(&self)
    {
        *self.open.lock() = true;
        self.signal.notify_all();
    }

    pub fn wait(&self)
    {
        let mut open = self.open.lock();
        while !*open
        {
            self.signal.wait(&mut open);
        }
    }
}

// Sound module over ".wav" files: 16-bit mono, one sample per two payload
// bytes. Counts calls and can be made to block or fail.
pub struct FakeSoundModule
{
    extensions: Vec<UniCase<&'static str>>,
    pub init_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
    pub decoder_calls: AtomicUsize,
    pub fail_init: AtomicBool,
    init_gate: Mutex<Option<Arc<Gate>>>,
}
impl FakeSoundModule
{
    pub fn new() -> Arc<Self>
    {
        Arc::new(Self
        {
            extensions: vec![UniCase::new("wav")],
            init_calls: AtomicUsize::new(0),
            save_calls: AtomicUsize::new(0),
            decoder_calls: AtomicUsize::new(0),
            fail_init: AtomicBool::new(false),
            init_gate: Mutex::new(None),
        })
    }

    // Every subsequent init_load blocks on this gate until it opens
    pub fn hold_loads(&self, gate: Arc<Gate>)
    {
        *self.init_gate.lock() = Some(gate);
    }

    // Loads already waiting on a gate stay blocked until it opens
    pub fn clear_holds(&self)
    {
        *self.init_gate.lock() = None;
    }

    pub fn num_init_calls(&self) -> usize
    {
        self.init_calls.load(Ordering::Acquire)
    }
}
impl FormatModule<Sound> for FakeSoundModule
{
    fn name(&self) -> &str { "fake-sound" }

    fn extensions(&self) -> &[UniCase<&'static str>] { &self.extensions }

    fn init_load(&self, reader: &mut dyn VfsRead) -> Result<SoundInfo, ModuleError>
    {
        self.init_calls.fetch_add(1, Ordering::AcqRel);

        let gate = self.init_gate.lock().clone();
        if let Some(gate) = gate
        {
            gate.wait();
        }

        if self.fail_init.load(Ordering::Acquire)
        {
            return Err("forced header failure".into());
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(SoundInfo
        {
            bytes_per_sample: 2,
            sample_rate: 44100,
            sample_count: (data.len() / 2) as u64,
            channel_count: 1,
        })
    }

    fn save(&self, writer: &mut dyn VfsWrite, resource: &ResourceHandle<Sound>) -> Result<(), ModuleError>
    {
        self.save_calls.fetch_add(1, Ordering::AcqRel);
        let info = resource.info().ok_or("resource has no info")?;
        writer.write_all(&info.sample_count.to_le_bytes())?;
        Ok(())
    }

    fn create_decoder(
        &self,
        _resource: &ResourceHandle<Sound>,
        mut reader: Box<dyn VfsRead>) -> Result<Box<dyn AudioDecode>, ModuleError>
    {
        self.decoder_calls.fetch_add(1, Ordering::AcqRel);
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Box::new(FakeAudioDecoder { data, position: 0 }))
    }
}

pub struct FakeAudioDecoder
{
    data: Vec<u8>,
    position: usize,
}
impl AudioDecode for FakeAudioDecoder
{
    fn read_samples(&mut self, out: &mut [u8]) -> Result<usize, ModuleError>
    {
        let n = out.len().min(self.data.len() - self.position);
        out[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    fn seek_sample(&mut self, position: u64) -> Result<(), ModuleError>
    {
        self.position = (position as usize * 2).min(self.data.len());
        Ok(())
    }
}

// Carries a tag so tests can tell which loader produced a peer
pub struct FakePeer
{
    pub tag: u32,
}

pub struct FakePeerLoader
{
    subsystem: Subsystem,
    pub tag: u32,
    pub attach_calls: AtomicUsize,
    pub fail: AtomicBool,
}
impl FakePeerLoader
{
    pub fn new(subsystem: Subsystem, tag: u32) -> Arc<Self>
    {
        Arc::new(Self
        {
            subsystem,
            tag,
            attach_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        })
    }
}
impl PeerLoader<Sound> for FakePeerLoader
{
    fn subsystem(&self) -> Subsystem { self.subsystem }

    fn attach(&self, resource: &ResourceHandle<Sound>) -> Result<(), ModuleError>
    {
        self.attach_calls.fetch_add(1, Ordering::AcqRel);
        if self.fail.load(Ordering::Acquire)
        {
            return Err("peer attach refused".into());
        }
        resource.set_peer(self.subsystem, Some(Arc::new(FakePeer { tag: self.tag })));
        Ok(())
    }
}
