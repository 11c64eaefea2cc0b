//! MIDI output for keyboard note events
//!
//! [`MidiNoteHandler`] plugs a [`MidiOutput`] into a keyboard as its note
//! handler. JACK is the only real backend; [`DummyMidiOutput`] logs instead.

use crate::config::MidiSettings;
use crate::error::{Error, Result};
use crate::registry::{ElementRef, NoteNumber};
use crate::tracker::NoteHandler;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Controller number of the "All Notes Off" channel mode message
pub const CC_ALL_NOTES_OFF: u8 = 123;

/// MIDI message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note on: channel, note, velocity
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note off: channel, note
    NoteOff { channel: u8, note: u8 },
    /// Control change: channel, controller, value
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiMessage {
    /// Convert to raw MIDI bytes
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            MidiMessage::NoteOn { channel, note, velocity } => {
                [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOff { channel, note } => [0x80 | (channel & 0x0F), note & 0x7F, 0],
            MidiMessage::ControlChange { channel, controller, value } => {
                [0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F]
            }
        }
    }
}

/// MIDI output trait
pub trait MidiOutput: Send {
    /// Send a message
    fn send(&self, message: MidiMessage);

    /// Get the port name
    fn port_name(&self) -> &str;
}

/// Sends keyboard note events to a MIDI output
pub struct MidiNoteHandler {
    output: Box<dyn MidiOutput>,
}

impl MidiNoteHandler {
    /// Wrap an output
    pub fn new(output: Box<dyn MidiOutput>) -> Self {
        Self { output }
    }

    /// Port the events go to
    pub fn port_name(&self) -> &str {
        self.output.port_name()
    }

    /// Send "All Notes Off" on a channel
    pub fn all_notes_off(&self, channel: u8) {
        self.output.send(MidiMessage::ControlChange {
            channel,
            controller: CC_ALL_NOTES_OFF,
            value: 0,
        });
    }
}

impl NoteHandler for MidiNoteHandler {
    fn note_on(&mut self, note: NoteNumber, channel: u8, velocity: u8, _source: &ElementRef) {
        self.output.send(MidiMessage::NoteOn { channel, note, velocity });
    }

    fn note_off(&mut self, note: NoteNumber, channel: u8, _source: Option<&ElementRef>) {
        self.output.send(MidiMessage::NoteOff { channel, note });
    }
}

/// JACK MIDI output
pub struct JackMidiOutput {
    /// Sender for MIDI messages to the JACK process callback
    tx: Sender<MidiMessage>,
    /// Port name
    port_name: String,
    /// Active client; dropping it closes the port
    client: jack::AsyncClient<(), JackMidiHandler>,
}

impl JackMidiOutput {
    /// Create a new JACK MIDI output
    pub fn new(client_name: &str, port_name: &str) -> Result<Self> {
        let (client, _status) = jack::Client::new(client_name, jack::ClientOptions::NO_START_SERVER)?;
        let midi_out = client.register_port(port_name, jack::MidiOut::default())?;
        // JACK may rename the client, so ask the port for its full name
        let full_name = midi_out.name()?;

        let (tx, rx) = unbounded();
        let handler = JackMidiHandler {
            midi_out,
            rx,
            dropped: 0,
        };
        let active_client = client.activate_async((), handler)?;

        Ok(Self {
            tx,
            port_name: full_name,
            client: active_client,
        })
    }

    /// Connect the output port to a JACK MIDI input
    pub fn connect(&self, destination: &str) -> Result<()> {
        self.client
            .as_client()
            .connect_ports_by_name(&self.port_name, destination)?;
        log::info!("Connected {} -> {}", self.port_name, destination);
        Ok(())
    }

    /// Create from settings
    pub fn from_settings(settings: &MidiSettings) -> Result<Self> {
        if !is_jack_running() {
            return Err(Error::Midi("JACK is not running".to_string()));
        }
        let output = Self::new(&settings.client_name, &settings.port_name)?;
        if let Some(ref destinations) = settings.auto_connect {
            connect_all(destinations, |dest| output.connect(dest));
        }
        Ok(output)
    }
}

impl MidiOutput for JackMidiOutput {
    fn send(&self, message: MidiMessage) {
        if self.tx.send(message).is_err() {
            log::warn!("JACK process callback is gone, dropping {:?}", message);
        }
    }

    fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// Try every destination, returning how many were connected
fn connect_all<F>(destinations: &[String], mut connect: F) -> usize
where
    F: FnMut(&str) -> Result<()>,
{
    let mut connected = 0;
    for dest in destinations {
        match connect(dest) {
            Ok(()) => connected += 1,
            Err(e) => log::warn!("Failed to connect to {}: {}", dest, e),
        }
    }
    connected
}

/// JACK process handler for MIDI output
struct JackMidiHandler {
    midi_out: jack::Port<jack::MidiOut>,
    rx: Receiver<MidiMessage>,
    /// Messages that did not fit into a period's buffer
    dropped: u64,
}

impl jack::ProcessHandler for JackMidiHandler {
    fn process(&mut self, _client: &jack::Client, ps: &jack::ProcessScope) -> jack::Control {
        let mut writer = self.midi_out.writer(ps);

        while let Ok(msg) = self.rx.try_recv() {
            let bytes = msg.to_bytes();
            let raw = jack::RawMidi {
                time: 0, // Immediate
                bytes: &bytes,
            };
            if let Err(e) = writer.write(&raw) {
                self.dropped += 1;
                log::trace!("dropped {:?} ({} so far): {}", msg, self.dropped, e);
            }
        }

        jack::Control::Continue
    }
}

/// Dummy MIDI output (logs instead of sending)
pub struct DummyMidiOutput;

impl MidiOutput for DummyMidiOutput {
    fn send(&self, message: MidiMessage) {
        log::debug!("MIDI {:?}", message);
    }

    fn port_name(&self) -> &str {
        "dummy"
    }
}

/// Check if JACK is running
pub fn is_jack_running() -> bool {
    jack::Client::new("piano-keys-probe", jack::ClientOptions::NO_START_SERVER).is_ok()
}

/// List available JACK MIDI ports
pub fn list_jack_midi_ports() -> Vec<String> {
    if let Ok((client, _)) = jack::Client::new("piano-keys-list", jack::ClientOptions::NO_START_SERVER) {
        client.ports(None, Some("midi"), jack::PortFlags::IS_INPUT)
    } else {
        Vec::new()
    }
}
