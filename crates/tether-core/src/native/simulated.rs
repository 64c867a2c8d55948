//! # Simulated Engine
//!
//! An in-process native engine with the same threading behaviour as a real
//! one: every `begin` call is queued to a dedicated engine thread, and the
//! completion callback fires from that thread.
//!
//! The simulated device keeps a process table in memory:
//!
//! - `spawn` creates a suspended process with a fresh pid
//! - `resume` only accepts suspended processes
//! - `kill` removes a process
//! - `attach` opens a session on any known process
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use tether_core::native::simulated::{SimulatedConfig, SimulatedDevice};
//! use tether_core::native::NativeDevice;
//!
//! let device: Arc<dyn NativeDevice> = Arc::new(SimulatedDevice::with_config(SimulatedConfig {
//!     device_name: "Bench Rig".to_string(),
//!     ..SimulatedConfig::default()
//! }));
//! assert_eq!(device.name(), "Bench Rig");
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::{
    AsyncResult, Completion, DeviceType, NativeApplication, NativeDevice, NativeDeviceManager, NativeError,
    NativeErrorCode, NativeIcon, NativeList, NativeProcess, NativeResult, NativeSession,
};

/// First pid handed out by `spawn` when the process table is empty
const FIRST_SPAWNED_PID: u32 = 1000;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker thread executing queued engine jobs in order
struct Engine
{
    jobs: mpsc::Sender<Job>,
    latency: Duration,
}

impl Engine
{
    fn start(name: &str, latency: Duration) -> Self
    {
        let (jobs, queue) = mpsc::channel::<Job>();
        let spawned = thread::Builder::new().name(format!("{name}-engine")).spawn(move || {
            while let Ok(job) = queue.recv() {
                job();
            }
            trace!("engine thread exiting");
        });
        if let Err(err) = spawned {
            // The receiver is gone with the failed thread; submit falls back to inline execution.
            warn!(error = %err, "failed to start engine thread");
        }
        Self { jobs, latency }
    }

    /// Run `work` on the engine thread and complete `done` with its outcome.
    fn submit<T, W>(&self, done: Completion<T>, work: W)
    where
        T: Send + 'static,
        W: FnOnce() -> NativeResult<T> + Send + 'static,
    {
        let latency = self.latency;
        let job: Job = Box::new(move || {
            if !latency.is_zero() {
                thread::sleep(latency);
            }
            done(AsyncResult::from(work()));
        });

        if let Err(mpsc::SendError(job)) = self.jobs.send(job) {
            debug!("engine thread unavailable, completing inline");
            job();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T>
{
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn process_not_found(pid: u32) -> NativeError
{
    NativeError::new(NativeErrorCode::ProcessNotFound, format!("Unable to find process with pid {pid}"))
}

/// Behaviour of a [`SimulatedDevice`]
#[derive(Debug, Clone)]
pub struct SimulatedConfig
{
    pub device_id: u32,
    pub device_name: String,
    pub device_type: DeviceType,
    pub icon: Option<NativeIcon>,
    /// Delay before each call completes
    pub latency: Duration,
    pub applications: Vec<NativeApplication>,
    pub processes: Vec<NativeProcess>,
    /// Identifier of the application in the foreground, if any
    pub frontmost: Option<String>,
}

impl Default for SimulatedConfig
{
    fn default() -> Self
    {
        Self {
            device_id: 1,
            device_name: "Local System".to_string(),
            device_type: DeviceType::Local,
            icon: None,
            latency: Duration::ZERO,
            applications: Vec::new(),
            processes: vec![NativeProcess {
                pid: 1,
                name: "init".to_string(),
                small_icon: None,
                large_icon: None,
            }],
            frontmost: None,
        }
    }
}

struct ProcessEntry
{
    process: Arc<NativeProcess>,
    suspended: bool,
}

struct DeviceState
{
    applications: Vec<Arc<NativeApplication>>,
    processes: BTreeMap<u32, ProcessEntry>,
    frontmost: Option<String>,
    /// `None` once every pid up to `u32::MAX` has been handed out
    next_pid: Option<u32>,
}

/// In-memory device driven by an engine thread
pub struct SimulatedDevice
{
    id: u32,
    name: String,
    device_type: DeviceType,
    icon: Option<NativeIcon>,
    state: Arc<Mutex<DeviceState>>,
    engine: Engine,
}

impl SimulatedDevice
{
    /// Device with the default configuration.
    #[must_use]
    pub fn new() -> Self
    {
        Self::with_config(SimulatedConfig::default())
    }

    #[must_use]
    pub fn with_config(config: SimulatedConfig) -> Self
    {
        let processes: BTreeMap<u32, ProcessEntry> = config
            .processes
            .into_iter()
            .map(|process| {
                (
                    process.pid,
                    ProcessEntry {
                        process: Arc::new(process),
                        suspended: false,
                    },
                )
            })
            .collect();
        let next_pid = processes
            .keys()
            .next_back()
            .map_or(Some(FIRST_SPAWNED_PID), |pid| pid.checked_add(1).map(|next| next.max(FIRST_SPAWNED_PID)));

        Self {
            id: config.device_id,
            engine: Engine::start(&format!("device-{}", config.device_id), config.latency),
            name: config.device_name,
            device_type: config.device_type,
            icon: config.icon,
            state: Arc::new(Mutex::new(DeviceState {
                applications: config.applications.into_iter().map(Arc::new).collect(),
                processes,
                frontmost: config.frontmost,
                next_pid,
            })),
        }
    }

    /// Change which application is in the foreground.
    pub fn set_frontmost(&self, identifier: Option<&str>)
    {
        lock(&self.state).frontmost = identifier.map(str::to_string);
    }

    /// Whether `pid` exists and is still suspended.
    #[must_use]
    pub fn is_suspended(&self, pid: u32) -> Option<bool>
    {
        lock(&self.state).processes.get(&pid).map(|entry| entry.suspended)
    }
}

impl Default for SimulatedDevice
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl NativeDevice for SimulatedDevice
{
    fn id(&self) -> u32
    {
        self.id
    }

    fn name(&self) -> String
    {
        self.name.clone()
    }

    fn icon(&self) -> Option<NativeIcon>
    {
        self.icon.clone()
    }

    fn device_type(&self) -> DeviceType
    {
        self.device_type
    }

    fn get_frontmost_application(&self, done: Completion<Option<Arc<NativeApplication>>>)
    {
        let state = Arc::clone(&self.state);
        self.engine.submit(done, move || {
            let state = lock(&state);
            let frontmost = state.frontmost.as_deref().and_then(|identifier| {
                state
                    .applications
                    .iter()
                    .find(|application| application.identifier == identifier)
                    .map(Arc::clone)
            });
            Ok(frontmost)
        });
    }

    fn enumerate_applications(&self, done: Completion<NativeList<NativeApplication>>)
    {
        let state = Arc::clone(&self.state);
        self.engine
            .submit(done, move || Ok(lock(&state).applications.iter().map(Arc::clone).collect()));
    }

    fn enumerate_processes(&self, done: Completion<NativeList<NativeProcess>>)
    {
        let state = Arc::clone(&self.state);
        self.engine.submit(done, move || {
            Ok(lock(&state)
                .processes
                .values()
                .map(|entry| Arc::clone(&entry.process))
                .collect())
        });
    }

    fn spawn(&self, path: &str, argv: &[String], envp: &[String], done: Completion<u32>)
    {
        let state = Arc::clone(&self.state);
        let path = path.to_string();
        let argv = argv.to_vec();
        let env_count = envp.len();
        self.engine.submit(done, move || {
            if path.is_empty() {
                return Err(NativeError::new(
                    NativeErrorCode::ExecutableNotFound,
                    "Unable to find executable at ''",
                ));
            }
            let name = Path::new(&path)
                .file_name()
                .map_or_else(|| path.clone(), |name| name.to_string_lossy().into_owned());

            let mut state = lock(&state);
            let Some(pid) = state.next_pid else {
                return Err(NativeError::new(NativeErrorCode::InvalidOperation, "Out of process ids"));
            };
            state.next_pid = pid.checked_add(1);
            state.processes.insert(
                pid,
                ProcessEntry {
                    process: Arc::new(NativeProcess {
                        pid,
                        name,
                        small_icon: None,
                        large_icon: None,
                    }),
                    suspended: true,
                },
            );
            debug!(pid, path = %path, args = argv.len(), env = env_count, "spawned suspended process");
            Ok(pid)
        });
    }

    fn resume(&self, pid: u32, done: Completion<()>)
    {
        let state = Arc::clone(&self.state);
        self.engine.submit(done, move || {
            match lock(&state).processes.get_mut(&pid) {
                Some(entry) if entry.suspended => {
                    entry.suspended = false;
                    Ok(())
                }
                _ => Err(NativeError::new(
                    NativeErrorCode::InvalidArgument,
                    format!("Unable to find process with pid {pid}"),
                )),
            }
        });
    }

    fn kill(&self, pid: u32, done: Completion<()>)
    {
        let state = Arc::clone(&self.state);
        self.engine.submit(done, move || {
            lock(&state)
                .processes
                .remove(&pid)
                .map(|_| ())
                .ok_or_else(|| process_not_found(pid))
        });
    }

    fn attach(&self, pid: u32, done: Completion<Arc<NativeSession>>)
    {
        let state = Arc::clone(&self.state);
        self.engine.submit(done, move || {
            if lock(&state).processes.contains_key(&pid) {
                Ok(Arc::new(NativeSession::new(pid)))
            } else {
                Err(process_not_found(pid))
            }
        });
    }
}

/// In-memory device manager driven by an engine thread
pub struct SimulatedDeviceManager
{
    devices: Arc<Mutex<Vec<Arc<dyn NativeDevice>>>>,
    closed: Arc<AtomicBool>,
    engine: Engine,
}

impl SimulatedDeviceManager
{
    #[must_use]
    pub fn new(devices: Vec<Arc<dyn NativeDevice>>) -> Self
    {
        Self {
            devices: Arc::new(Mutex::new(devices)),
            closed: Arc::new(AtomicBool::new(false)),
            engine: Engine::start("device-manager", Duration::ZERO),
        }
    }

    /// Whether `close` has completed.
    #[must_use]
    pub fn is_closed(&self) -> bool
    {
        self.closed.load(Ordering::SeqCst)
    }
}

impl NativeDeviceManager for SimulatedDeviceManager
{
    fn enumerate_devices(&self, done: Completion<NativeList<dyn NativeDevice>>)
    {
        let devices = Arc::clone(&self.devices);
        let closed = Arc::clone(&self.closed);
        self.engine.submit(done, move || {
            if closed.load(Ordering::SeqCst) {
                return Err(NativeError::new(NativeErrorCode::InvalidOperation, "Device manager is closed"));
            }
            Ok(lock(&devices).iter().map(Arc::clone).collect())
        });
    }

    fn close(&self, done: Completion<()>)
    {
        let devices = Arc::clone(&self.devices);
        let closed = Arc::clone(&self.closed);
        self.engine.submit(done, move || {
            if closed.swap(true, Ordering::SeqCst) {
                return Err(NativeError::new(NativeErrorCode::InvalidOperation, "Device manager is already closed"));
            }
            lock(&devices).clear();
            Ok(())
        });
    }
}
