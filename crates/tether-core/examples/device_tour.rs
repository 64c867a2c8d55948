//! A tour of the device control surface against the simulated engine
//!
//! Walks through every operation once: discover devices, list processes and
//! applications, then spawn a process, attach to it, resume it and kill it.
//!
//! Behaviour is configured through the usual environment variables:
//!
//! ```text
//! RUST_LOG=tether_core=trace TETHER_ENGINE_LATENCY_MS=50 cargo run --example device_tour
//! ```

use std::sync::Arc;

use tether_core::native::simulated::{SimulatedConfig, SimulatedDevice, SimulatedDeviceManager};
use tether_core::native::{NativeApplication, NativeDevice, NativeDeviceManager};
use tether_core::{DeviceManager, EventLoop, TetherResult};
use tether_utils::{init_logging_from_settings, Settings};

fn simulated_device(settings: &Settings) -> Arc<dyn NativeDevice>
{
    let application = |identifier: &str, name: &str| NativeApplication {
        identifier: identifier.to_string(),
        name: name.to_string(),
        pid: 0,
        small_icon: None,
        large_icon: None,
    };

    Arc::new(SimulatedDevice::with_config(SimulatedConfig {
        device_name: settings.device_name.clone(),
        latency: settings.engine_latency,
        applications: vec![
            application("com.example.maps", "Maps"),
            application("com.example.notes", "Notes"),
        ],
        frontmost: Some("com.example.notes".to_string()),
        ..SimulatedConfig::default()
    }))
}

async fn tour(event_loop: &mut EventLoop, settings: &Settings) -> TetherResult<()>
{
    let raw: Arc<dyn NativeDeviceManager> = Arc::new(SimulatedDeviceManager::new(vec![simulated_device(settings)]));
    let manager = DeviceManager::new(&event_loop.handle(), &raw);

    let devices = event_loop.drive(manager.enumerate_devices()).await?;
    for device in &devices {
        tracing::info!(id = device.id(), name = %device.name(), kind = %device.device_type(), "found device");
    }
    let Some(device) = devices.first() else {
        tracing::warn!("no devices available");
        return Ok(());
    };

    let processes = event_loop.drive(device.enumerate_processes()).await?;
    for process in &processes {
        tracing::info!(pid = process.pid, name = %process.name, "process");
    }

    let applications = event_loop.drive(device.enumerate_applications()).await?;
    tracing::info!(count = applications.len(), "installed applications");

    match event_loop.drive(device.get_frontmost_application()).await? {
        Some(application) => tracing::info!(identifier = %application.identifier, "frontmost application"),
        None => tracing::info!("nothing in the foreground"),
    }

    let pid = event_loop.drive(device.spawn(["/usr/bin/yes", "tether"])?).await?;
    tracing::info!(pid, "spawned suspended");

    let session = event_loop.drive(device.attach(pid)?).await?;
    tracing::info!(pid = session.pid(), "attached");

    event_loop.drive(device.resume(pid)?).await?;
    tracing::info!(pid, "resumed");

    // A second resume is refused by the engine; the message comes through untouched.
    if let Err(err) = event_loop.drive(device.resume(pid)?).await {
        tracing::info!(error = %err, "second resume rejected");
    }

    event_loop.drive(device.kill(pid)?).await?;
    tracing::info!(pid, "killed");

    drop(session);
    event_loop.drive(manager.close()).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main()
{
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(2);
        }
    };
    init_logging_from_settings(&settings).expect("Failed to initialize logging");

    let mut event_loop = EventLoop::new();
    if let Err(err) = tour(&mut event_loop, &settings).await {
        tracing::error!(error = %err, "device tour failed");
        std::process::exit(1);
    }
}
