//! The production entry point: wires a real MIDI port pair, session
//! autoload/autosave, and the four long-lived tasks to the engine
//! library. The control surface and LED driver are left at their inert
//! defaults, since this binary has no GPIO wiring attached; swap in a
//! real `ControlSurface`/`LedSurface` to drive actual hardware.

use clap::Parser;
use decaloop::config::Config;
use decaloop::control_surface::{ControlSurface, NullControlSurface};
use decaloop::controller;
use decaloop::engine::Engine;
use decaloop::led::{apply_led_state, compute_led_state, Indicator, LedSurface, NullLedSurface};
use decaloop::midi_io::{MidirMidiInput, MidirMidiOutput};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const INPUT_POLL_PERIOD: Duration = Duration::from_millis(50);
const LED_BLINK_PERIOD: Duration = Duration::from_millis(250);
const PORT_RETRY_FLASH: Duration = Duration::from_millis(100);

fn main() {
    env_logger::init();
    let config = Config::parse();
    let midi_in_filter = config.midi_in.clone();
    let midi_out_filter = config.midi_out.clone();

    let mut led_surface: Box<dyn LedSurface> = Box::new(NullLedSurface);

    let output = loop {
        match MidirMidiOutput::open(midi_out_filter.as_deref()) {
            Ok(output) => break output,
            Err(err) => {
                log::error!("midi output port unavailable: {err}");
                led_surface.flash(Indicator::DeleteAll, PORT_RETRY_FLASH);
            }
        }
    };

    let input = loop {
        match MidirMidiInput::open(midi_in_filter.as_deref()) {
            Ok(input) => break input,
            Err(err) => {
                log::error!("midi input port unavailable: {err}");
                led_surface.flash(Indicator::DeleteAll, PORT_RETRY_FLASH);
            }
        }
    };

    let engine = Engine::new(Arc::new(output), config);
    engine.load_active_session();
    log::info!("loaded session: {:?}", engine.status_report());

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        let shutdown_engine = Arc::clone(&engine);
        ctrlc::set_handler(move || {
            log::info!("shutdown requested");
            running.store(false, Ordering::SeqCst);
            shutdown_engine.midi.panic();
            shutdown_engine.autosave();
        })
        .expect("failed to install Ctrl-C handler");
    }

    // MIDI recorder: event-driven, suspends on the inbound channel.
    {
        let engine = Arc::clone(&engine);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                match input.receiver().recv_timeout(Duration::from_millis(200)) {
                    Ok(message) => engine.handle_inbound(message),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
    }

    // Input poll: control surface edges at ~20 Hz.
    {
        let engine = Arc::clone(&engine);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut surface: Box<dyn ControlSurface> = Box::new(NullControlSurface);
            while running.load(Ordering::SeqCst) {
                for edge in surface.poll() {
                    controller::handle_edge(&engine, edge);
                }
                thread::sleep(INPUT_POLL_PERIOD);
            }
        });
    }

    // LED indicator: blink phase at ~2 Hz.
    {
        let engine = Arc::clone(&engine);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut phase = false;
            while running.load(Ordering::SeqCst) {
                let mode = *engine.mode.lock().expect("mode mutex poisoned");
                let state = engine.transport.get();
                let idx = engine.current_track();
                let led_state =
                    compute_led_state(state, mode, idx, |i| !engine.store.is_empty(i), phase);
                apply_led_state(led_surface.as_mut(), &led_state);
                phase = !phase;
                thread::sleep(LED_BLINK_PERIOD);
            }
        });
    }

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }
}
