//! Firmware entry point.
//!
//! The full node runs a 100 ms scheduling loop: the SSR quantiser advances
//! every iteration, the safety/sensor/control ticks fire once a second in
//! strict priority order, and telemetry goes out every ten seconds. The
//! `battery-node` build replaces the loop with a single
//! wake/measure/report/sleep cycle.

use anyhow::Context;
use log::{info, warn};

use vivaria::adapters::{
    nvs, DeepSleepPower, HardwareAdapter, LogEventSink, MeshUplink, NvsStorage, SystemTime,
};
use vivaria::app::ports::TimePort;
use vivaria::app::AppService;
use vivaria::drivers::Watchdog;
use vivaria::events::{Event, EventQueue};

/// Scheduling loop period: one SSR quantiser tick.
const LOOP_PERIOD_MS: u64 = 100;

/// Loop iterations per control second.
const TICKS_PER_SEC: u32 = 10;

/// Loop iterations per telemetry frame.
const TICKS_PER_TELEMETRY: u32 = 100;

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!(
        "vivaria {} starting ({})",
        env!("CARGO_PKG_VERSION"),
        if cfg!(feature = "battery-node") {
            "battery node"
        } else {
            "full node"
        }
    );

    let collector = vivaria::adapters::mesh::DEFAULT_COLLECTOR
        .parse()
        .context("bad collector address")?;

    if cfg!(feature = "battery-node") {
        run_battery_node(collector)
    } else {
        run_full_node(collector)
    }
}

fn run_full_node(collector: std::net::SocketAddr) -> anyhow::Result<()> {
    let mut hw = HardwareAdapter::new(false).context("hardware bring-up failed")?;
    let mut storage = NvsStorage::open().context("nvs open failed")?;
    let preset = nvs::load_or_default(&mut storage);
    info!("active preset: {}", preset.species.as_str());

    let mut service = AppService::new(preset);
    let mut uplink = MeshUplink::new(collector);
    let mut sink = LogEventSink;
    let time = SystemTime;
    let mut watchdog = Watchdog::subscribe().context("watchdog subscribe failed")?;

    let mut queue = EventQueue::new();
    let mut tick: u32 = 0;
    let mut was_faulted = false;

    loop {
        hw.quantizer_tick(tick);

        if tick % TICKS_PER_SEC == 0 {
            // Enqueued in priority order; the drain below re-sorts anyway
            // so a late producer cannot starve the safety tick.
            enqueue(&mut queue, Event::SafetyTick);
            enqueue(&mut queue, Event::SensorTick);
            enqueue(&mut queue, Event::ControlTick);
        }
        if tick % TICKS_PER_TELEMETRY == 0 {
            enqueue(&mut queue, Event::TelemetryTick);
        }
        enqueue(&mut queue, Event::WatchdogTick);

        let mut batch: heapless::Vec<Event, { vivaria::events::EVENT_QUEUE_DEPTH }> =
            heapless::Vec::new();
        while let Some(event) = queue.dequeue() {
            // Queue and batch share a depth bound, the push cannot fail.
            let _ = batch.push(event);
        }
        batch.sort_unstable_by_key(Event::priority);

        for event in batch {
            let now_us = time.uptime_us();
            match event {
                Event::SafetyTick => service.safety_tick(now_us, &mut hw, &mut sink),
                Event::SensorTick => service.sensing_tick(&mut hw, now_us),
                Event::ControlTick => service.control_tick(time.local_time(), &mut hw),
                Event::TelemetryTick => service.telemetry_tick(&mut uplink, &mut sink),
                Event::CommandReceived(command) => {
                    service.handle_command(command, now_us, &mut hw, &mut storage, &mut sink);
                }
                Event::WatchdogTick => {
                    if let Err(e) = watchdog.feed() {
                        warn!("watchdog feed failed: {e}");
                    }
                }
            }
        }

        // Faults latch the SSR bank off; re-arm it once the status clears.
        let faulted = service.status().is_fault();
        if was_faulted && !faulted {
            hw.rearm();
        }
        was_faulted = faulted;

        if tick % TICKS_PER_SEC == 0 {
            service.maybe_persist_preset(time.uptime_us(), &mut storage, &mut sink);
        }

        tick = tick.wrapping_add(1);
        std::thread::sleep(std::time::Duration::from_millis(LOOP_PERIOD_MS));
    }
}

fn run_battery_node(collector: std::net::SocketAddr) -> anyhow::Result<()> {
    let mut hw = HardwareAdapter::new(true).context("hardware bring-up failed")?;
    let mut storage = NvsStorage::open().context("nvs open failed")?;
    let preset = nvs::load_or_default(&mut storage);

    let mut uplink = MeshUplink::new(collector);
    let mut power = DeepSleepPower::new();
    let time = SystemTime;

    let sleep_secs = vivaria::app::battery::run_wake_cycle(
        &preset,
        &mut hw,
        &mut uplink,
        &power,
        &mut storage,
        time.uptime_us(),
    );

    use vivaria::app::ports::PowerPort;
    power.enter_deep_sleep(sleep_secs);
    // Deep sleep does not return on target; the host build falls through.
    Ok(())
}

fn enqueue(queue: &mut EventQueue, event: Event) {
    if let Err(dropped) = queue.enqueue(event) {
        warn!("event queue full, dropping {dropped:?}");
    }
}
