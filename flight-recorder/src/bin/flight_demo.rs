//! Flight Recorder demo
//!
//! Emits a numbered event from a background producer, records the last few
//! and prints them.
//!
//! Usage:
//!     flight-recorder-demo
//!     flight-recorder-demo --capacity 5 --interval-ms 100 --duration-ms 2000
//!     RUST_LOG=flight_recorder=debug flight-recorder-demo

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use flight_recorder::{format_message, EventHub, EventLevel, FlightRecorder, RawEvent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "flight-recorder-demo")]
#[command(about = "Record the last N events of a live event source")]
#[command(version)]
struct Args {
    /// Number of events to retain
    #[arg(short, long, default_value_t = 10)]
    capacity: usize,

    /// Delay between emitted events
    #[arg(long, default_value_t = 250)]
    interval_ms: u64,

    /// How long to record before printing the snapshot
    #[arg(long, default_value_t = 5000)]
    duration_ms: u64,

    /// Source name to emit and record
    #[arg(long, default_value = "Echo")]
    source: String,
}

fn describe(event: &RawEvent) -> String {
    format!(
        "[{}] {}/{}/{}: {}",
        event.timestamp.format("%Y-%m-%d %H:%M:%S%.4f"),
        event.source,
        event.display_name(),
        event.opcode,
        format_message(event)
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_recorder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let hub = Arc::new(EventHub::new());
    let recorder = FlightRecorder::new(args.capacity, hub.clone())?;
    recorder.enable(&args.source, EventLevel::Informational, describe)?;

    tracing::info!(
        capacity = args.capacity,
        source = %args.source,
        "recording for {}ms",
        args.duration_ms
    );

    let running = Arc::new(AtomicBool::new(true));
    let producer = {
        let running = running.clone();
        let echo = hub.source(args.source.clone());
        let interval = Duration::from_millis(args.interval_ms);
        thread::spawn(move || {
            let mut count: u64 = 0;
            while running.load(Ordering::Relaxed) {
                echo.write_event(
                    RawEvent::new(echo.name(), EventLevel::Informational)
                        .with_event(1, "Echo")
                        .with_message("Testing {0}")
                        .with_payload("count", count),
                );
                count += 1;
                thread::sleep(interval);
            }
            count
        })
    };

    thread::sleep(Duration::from_millis(args.duration_ms));
    running.store(false, Ordering::Relaxed);
    let emitted = producer
        .join()
        .map_err(|_| "producer thread panicked")?;

    let stats = recorder.stats();
    tracing::info!(
        captured = stats.capture.captured,
        failed = stats.capture.failed,
        overwritten = stats.buffer.overwritten,
        "recording stopped"
    );

    println!();
    println!(
        "Snapshot of events ({} emitted, {} kept, buffer {:.0}% full):",
        emitted,
        stats.buffer.len,
        stats.buffer.pressure() * 100.0
    );
    println!();
    for line in recorder.snapshot() {
        println!("- {}", line);
    }
    println!();

    recorder.dispose();
    Ok(())
}
