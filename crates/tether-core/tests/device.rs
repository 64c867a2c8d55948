//! Tests for the device control surface against a scripted engine

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{application, fixture, process, Call, Reply};
use tether_core::native::{NativeDevice, NativeError, NativeErrorCode, NativeList, NativeSession};
use tether_core::{Device, DeviceType, TetherError, Value};

fn native_error(code: NativeErrorCode, message: &str) -> NativeError
{
    NativeError::new(code, message)
}

#[test]
fn test_device_properties()
{
    let (_event_loop, _engine, device) = fixture();
    assert_eq!(device.id(), 7);
    assert_eq!(device.name(), "Scripted");
    assert_eq!(device.device_type(), DeviceType::Tether);
    assert!(device.icon().is_none());
}

#[test]
fn test_from_raw_rejects_missing_handle()
{
    let (event_loop, engine, _device) = fixture();
    let result = Device::from_raw(&event_loop.handle(), None);
    match result.unwrap_err() {
        TetherError::InvalidArgument(message) => assert!(message.contains("expected raw handle")),
        other => panic!("Expected InvalidArgument, got {other:?}"),
    }

    let raw: Arc<dyn NativeDevice> = engine.clone();
    let device = Device::from_raw(&event_loop.handle(), Some(&raw)).unwrap();
    assert_eq!(device.id(), 7);
}

#[test]
fn test_resume_resolves_for_each_pid()
{
    let (mut event_loop, engine, device) = fixture();

    for pid in [1_u32, 42, 65535] {
        let mut pending = device.resume(pid).unwrap();
        engine.complete(0, Ok(Reply::Done));
        assert_eq!(event_loop.run_pending(), 1);
        assert!(pending.try_take().unwrap().is_ok());
    }

    assert_eq!(engine.calls(), vec![Call::Resume(1), Call::Resume(42), Call::Resume(65535)]);
}

#[test]
fn test_resume_rejects_with_native_message()
{
    let (mut event_loop, engine, device) = fixture();

    let mut pending = device.resume(42).unwrap();
    engine.complete(
        0,
        Err(native_error(NativeErrorCode::InvalidArgument, "Unable to find process with pid 42")),
    );
    event_loop.run_pending();

    let err = pending.try_take().unwrap().unwrap_err();
    assert_eq!(err.to_string(), "Unable to find process with pid 42");
    assert_eq!(err.native().map(|e| e.code), Some(NativeErrorCode::InvalidArgument));
}

#[test]
fn test_kill_resolves_and_rejects()
{
    let (mut event_loop, engine, device) = fixture();

    let mut killed = device.kill(100).unwrap();
    let mut missing = device.kill(101).unwrap();
    engine.complete(0, Ok(Reply::Done));
    engine.complete(0, Err(native_error(NativeErrorCode::ProcessNotFound, "no such process")));
    assert_eq!(event_loop.run_pending(), 2);

    assert!(killed.try_take().unwrap().is_ok());
    let err = missing.try_take().unwrap().unwrap_err();
    assert_eq!(err.to_string(), "no such process");
    assert_eq!(engine.calls(), vec![Call::Kill(100), Call::Kill(101)]);
}

#[test]
fn test_invalid_pids_reject_without_native_call()
{
    let (_event_loop, engine, device) = fixture();
    let invalid = [
        Value::from(0),
        Value::from(-5),
        Value::from("42"),
        Value::Null,
        Value::Undefined,
        Value::from(true),
        Value::Number(0.5),
        Value::Number(f64::NAN),
        Value::Number(1.0e12),
        Value::from(vec![1]),
    ];

    for value in &invalid {
        for result in [
            device.resume(value).map(|_| ()),
            device.kill(value).map(|_| ()),
            device.attach(value).map(|_| ()),
        ] {
            match result.unwrap_err() {
                TetherError::InvalidArgument(message) => assert_eq!(message, "Bad argument, expected pid"),
                other => panic!("Expected InvalidArgument for {value:?}, got {other:?}"),
            }
        }
    }

    assert!(device.resume(0_u32).is_err());
    assert!(device.kill(-1_i64).is_err());
    assert!(engine.calls().is_empty());
}

#[test]
fn test_fractional_pid_is_truncated()
{
    let (_event_loop, engine, device) = fixture();
    let _pending = device.kill(Value::Number(12.9)).unwrap();
    assert_eq!(engine.calls(), vec![Call::Kill(12)]);
}

#[test]
fn test_spawn_rejects_bad_argv_without_native_call()
{
    let (_event_loop, engine, device) = fixture();
    let invalid = [
        Value::Array(Vec::new()),
        Value::from("/bin/ls"),
        Value::Null,
        Value::Array(vec![Value::from("/bin/ls"), Value::from(3)]),
        Value::Array(vec![Value::Null]),
    ];

    for value in &invalid {
        match device.spawn(value).unwrap_err() {
            TetherError::InvalidArgument(message) => {
                assert_eq!(message, "Bad argument, expected argv as an array of strings");
            }
            other => panic!("Expected InvalidArgument for {value:?}, got {other:?}"),
        }
    }

    assert!(device.spawn(Vec::<String>::new()).is_err());
    assert!(engine.calls().is_empty());
}

#[test]
fn test_spawn_copies_argv_and_passes_host_environment()
{
    let (mut event_loop, engine, device) = fixture();
    let mut args = Value::from(vec!["/bin/echo", "hello"]);

    let mut pending = device.spawn(&args).unwrap();
    if let Value::Array(items) = &mut args {
        items[1] = Value::from("changed");
        items.clear();
    }

    assert_eq!(
        engine.calls(),
        vec![Call::Spawn {
            path: "/bin/echo".to_string(),
            argv: vec!["/bin/echo".to_string(), "hello".to_string()],
            env_len: std::env::vars_os()
                .filter(|(key, value)| key.to_str().is_some() && value.to_str().is_some())
                .count(),
        }]
    );

    engine.complete(0, Ok(Reply::Pid(4242)));
    event_loop.run_pending();
    assert_eq!(pending.try_take().unwrap().unwrap(), 4242);
}

#[test]
fn test_spawn_rejects_with_native_message()
{
    let (mut event_loop, engine, device) = fixture();

    let mut pending = device.spawn(["/does/not/exist"]).unwrap();
    engine.complete(
        0,
        Err(native_error(
            NativeErrorCode::ExecutableNotFound,
            "Unable to find executable at '/does/not/exist'",
        )),
    );
    event_loop.run_pending();

    let err = pending.try_take().unwrap().unwrap_err();
    assert_eq!(err.to_string(), "Unable to find executable at '/does/not/exist'");
}

#[test]
fn test_enumerate_applications_preserves_order_and_releases_elements()
{
    let (mut event_loop, engine, device) = fixture();
    let apps = vec![
        application("com.example.maps", "Maps"),
        application("com.example.mail", "Mail"),
        application("com.example.notes", "Notes"),
    ];
    let list: NativeList<_> = apps.iter().cloned().collect();
    assert!(apps.iter().all(|a| Arc::strong_count(a) == 2));

    let mut pending = device.enumerate_applications();
    engine.complete(0, Ok(Reply::Applications(list)));
    event_loop.run_pending();

    let applications = pending.try_take().unwrap().unwrap();
    let names: Vec<_> = applications.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Maps", "Mail", "Notes"]);
    assert!(applications.iter().all(|a| !a.is_running()));
    assert!(apps.iter().all(|a| Arc::strong_count(a) == 1));
}

#[test]
fn test_enumerate_processes_preserves_order_and_releases_elements()
{
    let (mut event_loop, engine, device) = fixture();
    let procs = vec![process(300, "zsh"), process(1, "init"), process(77, "sshd")];
    let list: NativeList<_> = procs.iter().cloned().collect();

    let mut pending = device.enumerate_processes();
    engine.complete(0, Ok(Reply::Processes(list)));
    event_loop.run_pending();

    let processes = pending.try_take().unwrap().unwrap();
    let pids: Vec<_> = processes.iter().map(|p| p.pid).collect();
    assert_eq!(pids, [300, 1, 77]);
    assert_eq!(processes[2].name, "sshd");
    assert!(procs.iter().all(|p| Arc::strong_count(p) == 1));
}

#[test]
fn test_enumerate_empty_list()
{
    let (mut event_loop, engine, device) = fixture();

    let mut pending = device.enumerate_processes();
    engine.complete(0, Ok(Reply::Processes(NativeList::new(Vec::new()))));
    event_loop.run_pending();

    assert!(pending.try_take().unwrap().unwrap().is_empty());
}

#[test]
fn test_frontmost_application()
{
    let (mut event_loop, engine, device) = fixture();
    let maps = application("com.example.maps", "Maps");

    let mut nothing = device.get_frontmost_application();
    let mut something = device.get_frontmost_application();
    engine.complete(0, Ok(Reply::Frontmost(None)));
    engine.complete(0, Ok(Reply::Frontmost(Some(Arc::clone(&maps)))));
    event_loop.run_pending();

    assert!(nothing.try_take().unwrap().unwrap().is_none());
    let frontmost = something.try_take().unwrap().unwrap().unwrap();
    assert_eq!(frontmost.identifier, "com.example.maps");
    assert_eq!(Arc::strong_count(&maps), 1);
    assert_eq!(engine.calls(), vec![Call::Frontmost, Call::Frontmost]);
}

#[test]
fn test_concurrent_operations_settle_independently()
{
    let (mut event_loop, engine, device) = fixture();

    let mut first = device.spawn(["/bin/first"]).unwrap();
    let mut second = device.spawn(["/bin/second"]).unwrap();
    assert_ne!(first.id(), second.id());

    // The engine finishes the second call first, from one of its own threads.
    engine.complete_from_thread(1, Ok(Reply::Pid(2002)));
    event_loop.run_pending();
    assert!(first.try_take().is_none());
    assert_eq!(second.try_take().unwrap().unwrap(), 2002);

    engine.complete_from_thread(0, Ok(Reply::Pid(1001)));
    event_loop.run_pending();
    assert_eq!(first.try_take().unwrap().unwrap(), 1001);
}

#[test]
fn test_completion_waits_for_the_loop()
{
    let (mut event_loop, engine, device) = fixture();

    let mut pending = device.resume(5).unwrap();
    engine.complete_from_thread(0, Ok(Reply::Done));

    // Completed on the engine side, not yet settled.
    assert!(pending.try_take().is_none());
    assert_eq!(event_loop.run_pending(), 1);
    assert!(pending.try_take().unwrap().is_ok());
}

#[test]
fn test_device_stays_alive_until_settled()
{
    let (mut event_loop, engine, device) = fixture();
    assert_eq!(Arc::strong_count(&engine), 2);

    let mut pending = device.attach(7).unwrap();
    drop(device);
    assert_eq!(Arc::strong_count(&engine), 2, "in-flight attach holds the device");

    engine.complete(0, Ok(Reply::Session(Arc::new(NativeSession::new(7)))));
    assert_eq!(Arc::strong_count(&engine), 2, "queued settlement holds the device");

    event_loop.run_pending();
    assert_eq!(Arc::strong_count(&engine), 1);
    assert_eq!(pending.try_take().unwrap().unwrap().pid(), 7);
}

#[test]
fn test_failed_operation_releases_the_device()
{
    let (mut event_loop, engine, device) = fixture();

    let mut pending = device.kill(9).unwrap();
    engine.complete(0, Err(native_error(NativeErrorCode::PermissionDenied, "")));
    event_loop.run_pending();

    assert_eq!(Arc::strong_count(&engine), 2);
    let err = pending.try_take().unwrap().unwrap_err();
    assert_eq!(err.to_string(), "Permission denied");
}

#[test]
fn test_attached_session_owns_its_reference()
{
    let (mut event_loop, engine, device) = fixture();
    let native = Arc::new(NativeSession::new(9));

    let mut pending = device.attach(9).unwrap();
    engine.complete(0, Ok(Reply::Session(Arc::clone(&native))));
    event_loop.run_pending();

    let session = pending.try_take().unwrap().unwrap();
    assert_eq!(session.pid(), 9);
    assert_eq!(Arc::strong_count(&native), 2);

    drop(session);
    assert_eq!(Arc::strong_count(&native), 1);
}

#[test]
fn test_dropped_loop_abandons_without_native_call()
{
    let (event_loop, engine, device) = fixture();
    drop(event_loop);

    let mut pending = device.resume(1).unwrap();
    assert!(matches!(pending.try_take(), Some(Err(TetherError::Abandoned))));
    assert!(engine.calls().is_empty());
}

#[test]
fn test_loop_dropped_while_in_flight_abandons()
{
    let (event_loop, engine, device) = fixture();

    let mut pending = device.kill(4).unwrap();
    drop(event_loop);
    engine.complete(0, Ok(Reply::Done));

    assert!(matches!(pending.try_take(), Some(Err(TetherError::Abandoned))));
    drop(device);
    assert_eq!(Arc::strong_count(&engine), 1);
}

#[tokio::test]
async fn test_drive_settles_completion_from_engine_thread()
{
    let (mut event_loop, engine, device) = fixture();

    let pending = device.kill(3).unwrap();
    let worker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        engine.complete(0, Ok(Reply::Done));
    });

    assert!(event_loop.drive(pending).await.is_ok());
    worker.join().unwrap();
}
