//! Demo: drive the full engine from a terminal keyboard instead of real
//! GPIO buttons/touch, and print LED indicator state instead of driving
//! real LEDs. Useful for exercising the Transport Controller state
//! machine without hardware. No MIDI port is required; `--midi-out`/
//! `--midi-in` name filters still apply if given.

use decaloop::config::Config;
use decaloop::control_surface::ControlEdge;
use decaloop::controller;
use decaloop::engine::Engine;
use decaloop::led::{compute_led_state, Indicator, LedSurface};
use decaloop::midi_io::{MidirMidiInput, MidirMidiOutput};
use clap::Parser;
use std::io::BufRead;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Prints each indicator transition instead of toggling a GPIO pin.
struct PrintingLedSurface;

impl LedSurface for PrintingLedSurface {
    fn set(&mut self, indicator: Indicator, on: bool) {
        println!("[led] {indicator:?} = {on}");
    }
}

/// Maps single keystrokes, typed then Enter, to control edges:
/// m=MODE, space=ACTION, a=LEFT, d=RIGHT, t=TOUCH.
fn spawn_keyboard_reader() -> Receiver<ControlEdge> {
    let (sender, receiver) = channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let edge = match line.trim() {
                "m" => Some(ControlEdge::Mode),
                " " | "" => Some(ControlEdge::Action),
                "a" => Some(ControlEdge::Left),
                "d" => Some(ControlEdge::Right),
                "t" => Some(ControlEdge::Touch),
                other => {
                    println!("unrecognized key {other:?} (use m/space/a/d/t)");
                    None
                }
            };
            if let Some(edge) = edge {
                if sender.send(edge).is_err() {
                    break;
                }
            }
        }
    });
    receiver
}

fn main() {
    env_logger::init();
    let config = Config::parse();

    let output: Arc<dyn decaloop::midi_io::MidiIo> = match MidirMidiOutput::open(config.midi_out.as_deref()) {
        Ok(output) => Arc::new(output),
        Err(err) => {
            println!("no MIDI output ({err}); events will only be logged");
            Arc::new(decaloop::midi_io::NullMidiIo)
        }
    };
    let input = MidirMidiInput::open(config.midi_in.as_deref()).ok();

    let engine = Engine::new(output, config);
    engine.load_active_session();
    println!("loaded session: {:?}", engine.status_report());
    println!("keys: m=mode  space=action  a=left  d=right  t=touch  (Ctrl-C to quit)");

    if let Some(input) = input {
        let engine = Arc::clone(&engine);
        thread::spawn(move || loop {
            match input.receiver().recv() {
                Ok(message) => engine.handle_inbound(message),
                Err(_) => break,
            }
        });
    }

    let mut led_surface = PrintingLedSurface;
    let edges = spawn_keyboard_reader();

    loop {
        while let Ok(edge) = edges.try_recv() {
            controller::handle_edge(&engine, edge);
        }
        let mode = *engine.mode.lock().expect("mode mutex poisoned");
        let state = engine.transport.get();
        let idx = engine.current_track();
        let led_state = compute_led_state(state, mode, idx, |i| !engine.store.is_empty(i), true);
        decaloop::led::apply_led_state(&mut led_surface, &led_state);
        thread::sleep(Duration::from_millis(500));
    }
}
