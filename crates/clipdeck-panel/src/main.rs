//! clipdeck-panel - operator console for vMix list inputs
//!
//! Wires the core services together and runs the single-threaded event
//! loop: operator command lines and service events multiplexed over one
//! select. A stdin reader thread feeds lines into the loop so reading
//! never blocks event handling.

mod app;

use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use clipdeck_core::config::{default_config_path, load_config};
use clipdeck_core::remote::VmixClient;
use clipdeck_core::services::{
    DirectoryWatchService, EventBus, SyncClient, SyncService, WatchClient, WatchServiceConfig,
};

use app::PanelApp;

fn main() {
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let config = load_config(&default_config_path());
    log::info!(
        "clipdeck-panel starting, engine target {}",
        config.target().api_url()
    );

    let event_bus = EventBus::default();
    let events = event_bus.subscribe();

    let watch_handle = match DirectoryWatchService::spawn(
        WatchServiceConfig {
            debounce: config.debounce(),
        },
        event_bus.sender(),
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("failed to start watch service: {e}");
            std::process::exit(1);
        }
    };

    let sync_handle =
        match SyncService::spawn(Arc::new(VmixClient::new()), event_bus.sender()) {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("failed to start sync service: {e}");
                std::process::exit(1);
            }
        };

    let watch_client = WatchClient::new(&watch_handle);
    let sync_client = SyncClient::new(&sync_handle);
    let mut app = PanelApp::new(watch_client, sync_client, config.target());

    // stdin reader thread; the channel closes when stdin does
    let (line_tx, line_rx) = crossbeam::channel::unbounded::<String>();
    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        })
        .expect("failed to spawn stdin reader");

    println!("clipdeck-panel ready (type 'help' for commands)");

    loop {
        crossbeam::select! {
            recv(line_rx) -> line => {
                match line {
                    Ok(line) => {
                        if !app.handle_line(line.trim()) {
                            break;
                        }
                    }
                    Err(_) => break, // stdin closed
                }
            }
            recv(events) -> event => {
                if let Ok(event) = event {
                    app.handle_event(event);
                }
            }
        }
    }

    // Orderly teardown: stop both services and wait for their threads,
    // which closes every live directory watch.
    let mut watch_handle = watch_handle;
    let mut sync_handle = sync_handle;
    let _ = WatchClient::new(&watch_handle).shutdown();
    let _ = SyncClient::new(&sync_handle).shutdown();
    watch_handle.join();
    sync_handle.join();

    log::info!("clipdeck-panel stopped");
}
