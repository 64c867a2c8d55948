//! Scripted native engine shared by the integration tests.
//!
//! Every `begin` call is recorded and parked; tests decide when, in which
//! order, and from which thread each call completes.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;

use tether_core::native::{
    AsyncResult, Completion, DeviceType, NativeApplication, NativeDevice, NativeIcon, NativeList, NativeProcess,
    NativeResult, NativeSession,
};
use tether_core::{Device, EventLoop};

/// A native call as the engine saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call
{
    Frontmost,
    EnumerateApplications,
    EnumerateProcesses,
    Spawn
    {
        path: String,
        argv: Vec<String>,
        env_len: usize,
    },
    Resume(u32),
    Kill(u32),
    Attach(u32),
}

/// What a test completes a parked call with
pub enum Reply
{
    Frontmost(Option<Arc<NativeApplication>>),
    Applications(NativeList<NativeApplication>),
    Processes(NativeList<NativeProcess>),
    Pid(u32),
    Done,
    Session(Arc<NativeSession>),
}

type Responder = Box<dyn FnOnce(NativeResult<Reply>) + Send>;

#[derive(Default)]
pub struct ScriptedDevice
{
    calls: Mutex<Vec<Call>>,
    parked: Mutex<Vec<Responder>>,
}

impl ScriptedDevice
{
    /// Every native begin call so far, in issue order.
    pub fn calls(&self) -> Vec<Call>
    {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls still waiting for completion.
    pub fn parked(&self) -> usize
    {
        self.parked.lock().unwrap().len()
    }

    /// Complete the `index`-th parked call on the current thread.
    pub fn complete(&self, index: usize, outcome: NativeResult<Reply>)
    {
        let responder = self.parked.lock().unwrap().remove(index);
        responder(outcome);
    }

    /// Complete the `index`-th parked call from a fresh thread.
    pub fn complete_from_thread(self: &Arc<Self>, index: usize, outcome: NativeResult<Reply>)
    {
        let engine = Arc::clone(self);
        thread::spawn(move || engine.complete(index, outcome)).join().unwrap();
    }

    fn park<T: Send + 'static>(&self, call: Call, done: Completion<T>, extract: fn(Reply) -> Option<T>)
    {
        self.calls.lock().unwrap().push(call);
        self.parked.lock().unwrap().push(Box::new(move |outcome| {
            let result = outcome.map(|reply| extract(reply).expect("reply does not match the parked call"));
            done(AsyncResult::from(result));
        }));
    }
}

impl NativeDevice for ScriptedDevice
{
    fn id(&self) -> u32
    {
        7
    }

    fn name(&self) -> String
    {
        "Scripted".to_string()
    }

    fn icon(&self) -> Option<NativeIcon>
    {
        None
    }

    fn device_type(&self) -> DeviceType
    {
        DeviceType::Tether
    }

    fn get_frontmost_application(&self, done: Completion<Option<Arc<NativeApplication>>>)
    {
        self.park(Call::Frontmost, done, |reply| match reply {
            Reply::Frontmost(application) => Some(application),
            _ => None,
        });
    }

    fn enumerate_applications(&self, done: Completion<NativeList<NativeApplication>>)
    {
        self.park(Call::EnumerateApplications, done, |reply| match reply {
            Reply::Applications(list) => Some(list),
            _ => None,
        });
    }

    fn enumerate_processes(&self, done: Completion<NativeList<NativeProcess>>)
    {
        self.park(Call::EnumerateProcesses, done, |reply| match reply {
            Reply::Processes(list) => Some(list),
            _ => None,
        });
    }

    fn spawn(&self, path: &str, argv: &[String], envp: &[String], done: Completion<u32>)
    {
        let call = Call::Spawn {
            path: path.to_string(),
            argv: argv.to_vec(),
            env_len: envp.len(),
        };
        self.park(call, done, |reply| match reply {
            Reply::Pid(pid) => Some(pid),
            _ => None,
        });
    }

    fn resume(&self, pid: u32, done: Completion<()>)
    {
        self.park(Call::Resume(pid), done, |reply| matches!(reply, Reply::Done).then_some(()));
    }

    fn kill(&self, pid: u32, done: Completion<()>)
    {
        self.park(Call::Kill(pid), done, |reply| matches!(reply, Reply::Done).then_some(()));
    }

    fn attach(&self, pid: u32, done: Completion<Arc<NativeSession>>)
    {
        self.park(Call::Attach(pid), done, |reply| match reply {
            Reply::Session(session) => Some(session),
            _ => None,
        });
    }
}

/// Event loop, scripted engine, and a device wrapping it.
pub fn fixture() -> (EventLoop, Arc<ScriptedDevice>, Device)
{
    let event_loop = EventLoop::new();
    let engine = Arc::new(ScriptedDevice::default());
    let raw: Arc<dyn NativeDevice> = engine.clone();
    let device = Device::new(&event_loop.handle(), &raw);
    (event_loop, engine, device)
}

pub fn application(identifier: &str, name: &str) -> Arc<NativeApplication>
{
    Arc::new(NativeApplication {
        identifier: identifier.to_string(),
        name: name.to_string(),
        pid: 0,
        small_icon: None,
        large_icon: None,
    })
}

pub fn process(pid: u32, name: &str) -> Arc<NativeProcess>
{
    Arc::new(NativeProcess {
        pid,
        name: name.to_string(),
        small_icon: None,
        large_icon: None,
    })
}
