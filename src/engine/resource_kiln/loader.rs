use crate::error::LoadError;
use crate::manager::ManagerShared;
use crate::resource::{MediaType, ResourceHandle, ResourceKey, ResourceKind, ResourceState};
use crossbeam::channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};
use vfs_kiln::VirtualFileSystem;

const NUM_LOAD_WORKERS: usize = 2;

// Invoked once when an asynchronous load reaches its terminal state, from
// the thread driving ResourceLoader::update
pub type LoadListener<K> = Box<dyn FnOnce(Result<ResourceHandle<K>, Arc<LoadError>>) + Send>;

#[derive(Debug, Clone)]
pub enum LoadNotification
{
    Finished { media: MediaType, path: String, succeeded: bool },
}

// A cancellation-free unit of async load work: Run executes on a worker,
// Finish reconciles on the loader owner's thread.
pub(crate) trait LoadTask: Send
{
    fn run(&mut self);
    fn abort(&mut self);
    fn finish(self: Box<Self>);
}

enum WorkerCommand
{
    Run(Box<dyn LoadTask>),
    Stop,
}

pub(crate) struct LoaderShared
{
    queue: Sender<WorkerCommand>,
    finished: (Sender<Box<dyn LoadTask>>, Receiver<Box<dyn LoadTask>>),
    notifications: (Sender<LoadNotification>, Receiver<LoadNotification>),
}
impl LoaderShared
{
    // false if the workers have been stopped
    #[must_use]
    pub fn enqueue(&self, task: Box<dyn LoadTask>) -> bool
    {
        self.queue.send(WorkerCommand::Run(task)).is_ok()
    }

    // Skip the workers entirely; the task is terminal already
    pub fn schedule_finished(&self, task: Box<dyn LoadTask>)
    {
        let _ = self.finished.0.send(task);
    }

    pub fn notification_sender(&self) -> Sender<LoadNotification>
    {
        self.notifications.0.clone()
    }
}

// Fixed worker pool executing load tasks plus the serial reconciliation
// context all Finished steps funnel through
pub struct ResourceLoader
{
    shared: Arc<LoaderShared>,
    workers: Vec<Option<JoinHandle<()>>>,
}
impl ResourceLoader
{
    #[must_use]
    pub fn new() -> Self
    {
        let (queue_send, queue_recv) = unbounded::<WorkerCommand>();
        let shared = Arc::new(LoaderShared
        {
            queue: queue_send,
            finished: unbounded(),
            notifications: unbounded(),
        });

        let workers = (0..NUM_LOAD_WORKERS).map(|i|
        {
            let recv = queue_recv.clone();
            let queue = shared.queue.clone();
            let finished = shared.finished.0.clone();
            let thread = Builder::new()
                .name(format!("Resource load worker {i}"))
                .spawn(move || Self::worker_fn(recv, queue, finished))
                .expect("Failed to create resource load worker thread");
            Some(thread)
        }).collect();

        Self { shared, workers }
    }

    fn worker_fn(
        recv: Receiver<WorkerCommand>,
        queue: Sender<WorkerCommand>,
        finished: Sender<Box<dyn LoadTask>>)
    {
        log::debug!("Starting resource load worker thread");
        'worker: loop
        {
            match recv.recv()
            {
                Ok(WorkerCommand::Run(mut task)) =>
                {
                    task.run();
                    if finished.send(task).is_err()
                    {
                        break 'worker;
                    }
                },
                Ok(WorkerCommand::Stop) =>
                {
                    log::debug!("Shutting down resource load worker thread");

                    // surface any final queued loads as shutdown failures.
                    // One Stop is sent per worker; a second Stop pulled here
                    // belongs to a still-busy worker and must go back on the
                    // queue or that worker never wakes and join() hangs
                    loop
                    {
                        match recv.try_recv()
                        {
                            Ok(WorkerCommand::Run(mut task)) =>
                            {
                                task.abort();
                                let _ = finished.send(task);
                            },
                            Ok(WorkerCommand::Stop) =>
                            {
                                let _ = queue.send(WorkerCommand::Stop);
                                break;
                            },
                            Err(_) => break,
                        }
                    }
                    break 'worker;
                },
                Err(err) =>
                {
                    log::error!("Terminating resource load worker thread: {err}");
                    break 'worker;
                },
            }
        }
    }

    // Drive all Finished reconciliation steps that are due. Must be called
    // from the thread that owns this loader; cache publication and peer
    // attachment for async loads happen here.
    pub fn update(&self)
    {
        while let Ok(task) = self.shared.finished.1.try_recv()
        {
            task.finish();
        }
    }

    pub fn subscribe_notifications(&self) -> Receiver<LoadNotification>
    {
        self.shared.notifications.1.clone()
    }

    // Stop accepting loads and join the workers; queued tasks surface as
    // shutdown failures through one final update
    pub fn shutdown(&mut self)
    {
        for _ in &self.workers
        {
            let _ = self.shared.queue.send(WorkerCommand::Stop);
        }
        for worker in &mut self.workers
        {
            if let Some(thread) = worker.take()
            {
                let _ = thread.join();
            }
        }
        self.update();
    }

    pub(crate) fn shared(&self) -> &Arc<LoaderShared>
    {
        &self.shared
    }
}
impl Default for ResourceLoader
{
    fn default() -> Self { Self::new() }
}
impl Drop for ResourceLoader
{
    fn drop(&mut self)
    {
        self.shutdown();
    }
}

pub(crate) enum TaskOutcome<K: ResourceKind>
{
    NotRun,
    // A fully loaded resource already existed at creation; no IO performed
    AlreadyLoaded(ResourceHandle<K>),
    Parsed(K::Info),
    Failed(LoadError),
}

pub(crate) struct ResourceLoadTask<K: ResourceKind>
{
    pub shared: Arc<ManagerShared<K>>,
    pub vfs: Arc<VirtualFileSystem>,
    pub key: ResourceKey,
    pub placeholder: ResourceHandle<K>,
    pub outcome: TaskOutcome<K>,
    pub notify: Sender<LoadNotification>,
}
impl<K: ResourceKind> ResourceLoadTask<K>
{
    fn notify_finished(&self, succeeded: bool)
    {
        let _ = self.notify.send(LoadNotification::Finished
        {
            media: K::media_type(),
            path: self.key.path.as_str().to_string(),
            succeeded,
        });
    }

    fn deliver(listeners: Vec<LoadListener<K>>, result: Result<&ResourceHandle<K>, &Arc<LoadError>>)
    {
        for listener in listeners
        {
            listener(result.map(Clone::clone).map_err(Clone::clone));
        }
    }
}
impl<K: ResourceKind> LoadTask for ResourceLoadTask<K>
{
    // Header parse off the request path. Never touches the cache; that
    // waits for finish() on the reconciliation context.
    fn run(&mut self)
    {
        if !matches!(self.outcome, TaskOutcome::NotRun) { return; }

        let module = match self.shared.modules.select(&self.key.path)
        {
            Ok(module) => module,
            Err(err) => { self.outcome = TaskOutcome::Failed(err); return; },
        };

        let mut reader = match self.vfs.open_for_reading(&self.key.path)
        {
            Ok(reader) => reader,
            Err(err) =>
            {
                self.outcome = TaskOutcome::Failed(LoadError::from_vfs(err, self.key.path.as_str(), "/"));
                return;
            },
        };

        match module.init_load(reader.as_mut())
        {
            Ok(info) => self.outcome = TaskOutcome::Parsed(info),
            Err(source) => self.outcome = TaskOutcome::Failed(LoadError::Decode
            {
                path: self.key.path.as_str().to_string(),
                source,
            }),
        }
    }

    fn abort(&mut self)
    {
        if matches!(self.outcome, TaskOutcome::NotRun)
        {
            self.outcome = TaskOutcome::Failed(LoadError::Shutdown);
        }
    }

    fn finish(mut self: Box<Self>)
    {
        let listeners = self.shared.take_in_flight(&self.key);

        match std::mem::replace(&mut self.outcome, TaskOutcome::NotRun)
        {
            TaskOutcome::AlreadyLoaded(existing) =>
            {
                self.notify_finished(true);
                Self::deliver(listeners, Ok(&existing));
            },
            TaskOutcome::Parsed(info) =>
            {
                // another load may have published this path while we ran;
                // first finished wins the cache slot, we adopt its resource
                let published = self.shared.cache.lock().lookup(&self.key);
                if let Some(winner) = published.filter(|p| *p != self.placeholder)
                {
                    log::debug!("Discarding placeholder for {:?}; adopting already-published resource", self.key);
                    self.placeholder.mark_outdated();
                    self.placeholder.mark_state(ResourceState::Failed);
                    self.notify_finished(true);
                    Self::deliver(listeners, Ok(&winner));
                    return;
                }

                self.placeholder.set_info(info);
                match self.shared.attach_peers(&self.placeholder)
                {
                    Ok(()) =>
                    {
                        self.placeholder.mark_state(ResourceState::Ready);
                        self.notify_finished(true);
                        Self::deliver(listeners, Ok(&self.placeholder));
                    },
                    Err(err) =>
                    {
                        log::error!("Failed to attach peers for {:?}: {err}", self.placeholder);
                        self.placeholder.mark_state(ResourceState::Failed);
                        self.shared.deregister(&self.key, self.placeholder.serial());
                        self.notify_finished(false);
                        Self::deliver(listeners, Err(&Arc::new(err)));
                    },
                }
            },
            TaskOutcome::Failed(err) =>
            {
                log::error!("Failed to load {:?}: {err}", self.placeholder);
                self.placeholder.mark_state(ResourceState::Failed);
                self.shared.deregister(&self.key, self.placeholder.serial());
                self.notify_finished(false);
                Self::deliver(listeners, Err(&Arc::new(err)));
            },
            TaskOutcome::NotRun =>
            {
                nab_kiln::debug_panic!("Load task for {:?} finished without running", self.key);
                self.placeholder.mark_state(ResourceState::Failed);
                self.shared.deregister(&self.key, self.placeholder.serial());
                self.notify_finished(false);
                Self::deliver(listeners, Err(&Arc::new(LoadError::Shutdown)));
            },
        }
    }
}
