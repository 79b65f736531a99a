//! Demo: load a Standard MIDI File into track 0 and loop-play it
//! through an interactively chosen output port.

use decaloop::midi_io::MidirMidiOutput;
use decaloop::sequencer::Sequencer;
use decaloop::smf;
use decaloop::track::TrackStore;
use decaloop::transport::{TransportCell, TransportState};
use midir::MidiOutput;
use std::io::{stdin, stdout, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn main() {
    env_logger::init();
    let path = std::env::args()
        .nth(1)
        .expect("usage: smf_play_demo <file.mid>");
    let bytes = std::fs::read(&path).expect("failed to read MIDI file");
    let imported = smf::import(&bytes).expect("failed to parse MIDI file");
    println!(
        "loaded {} events, duration {:.3}s",
        imported.events.len(),
        imported.duration_s
    );

    let probe = MidiOutput::new("decaloop-smf-demo").expect("failed to init MIDI output");
    let ports = probe.ports();
    if ports.is_empty() {
        eprintln!("no MIDI output ports available");
        return;
    }
    println!("Available output ports:");
    for (i, port) in ports.iter().enumerate() {
        println!("{i}: {}", probe.port_name(port).unwrap_or_default());
    }
    print!("Select port: ");
    stdout().flush().ok();
    let mut choice = String::new();
    stdin().read_line(&mut choice).ok();
    let idx: usize = choice.trim().parse().unwrap_or(0).min(ports.len() - 1);
    let port_name = probe.port_name(&ports[idx]).unwrap_or_default();
    drop(probe);

    let output = MidirMidiOutput::open(Some(&port_name)).expect("failed to open output port");

    let store = TrackStore::new();
    store.replace(0, {
        let mut track = decaloop::track::Track::empty(0);
        for event in imported.events {
            track.append(event.offset_s, event.message.with_channel(0));
        }
        track.set_duration(imported.duration_s);
        track
    });

    let transport = TransportCell::new();
    transport.set(TransportState::Playing);
    let clock = Mutex::new(decaloop::clock::Clock::new());
    let current_idx = AtomicUsize::new(0);

    let running = Arc::new(AtomicBool::new(true));
    {
        let transport_flag = running.clone();
        ctrlc::set_handler(move || transport_flag.store(false, Ordering::SeqCst))
            .expect("failed to install Ctrl-C handler");
    }

    let mut sequencer = Sequencer::new(&clock, &store, &transport, &output, &current_idx);
    println!("playing; press Ctrl-C to stop");

    // Stop the Sequencer's run loop as soon as the signal handler fires
    // by racing a watcher thread against the tight playback loop.
    {
        let transport = &transport;
        std::thread::scope(|scope| {
            scope.spawn(|| {
                while running.load(Ordering::SeqCst) {
                    std::thread::sleep(std::time::Duration::from_millis(50));
                }
                transport.set(TransportState::Idle);
            });
            sequencer.run(false);
        });
    }
}
