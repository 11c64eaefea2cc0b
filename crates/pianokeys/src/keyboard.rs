//! Keyboard construction
//!
//! Builds a row of key elements (piano keys or drum pads) for a note range
//! and ties them to a tracker and input normalizer.

use crate::error::{Error, Result};
use crate::input::{Disposition, ElementResolver, EventControl, InputEvent, InputNormalizer};
use crate::registry::{ContainerId, ElementId, ElementRef, KeyRegistry, NoteNumber};
use crate::tracker::{NoteHandler, NoteTracker};

/// MIDI note number for C4 (middle C)
pub const C4_MIDI: NoteNumber = 60;

/// Default velocity for key presses
pub const DEFAULT_VELOCITY: u8 = 100;

/// Default keyboard height in rows
pub const DEFAULT_HEIGHT: u16 = 12;

/// Highest valid note number
pub const MAX_NOTE: NoteNumber = 127;

/// Highest valid MIDI channel (0-based)
pub const MAX_CHANNEL: u8 = 15;

/// Tallest keyboard in rows
pub const MAX_HEIGHT: u16 = 1000;

/// Rows subtracted from every key for the gap below it
const KEY_MARGIN: u16 = 1;

/// Per-keyboard settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardConfig {
    /// Channel passed through to note events
    pub channel: u8,
    /// Velocity passed through to note-on
    pub velocity: u8,
    /// Keyboard height in rows
    pub height: u16,
    /// Lowest note (inclusive)
    pub note_low: NoteNumber,
    /// Highest note (inclusive)
    pub note_high: NoteNumber,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            velocity: DEFAULT_VELOCITY,
            height: DEFAULT_HEIGHT,
            note_low: C4_MIDI - 12,
            note_high: C4_MIDI + 12,
        }
    }
}

impl KeyboardConfig {
    /// Check the note range, channel, velocity and height
    pub fn validate(&self) -> Result<()> {
        if self.note_low > self.note_high || self.note_high > MAX_NOTE {
            return Err(Error::InvalidRange {
                low: self.note_low,
                high: self.note_high,
            });
        }
        if self.channel > MAX_CHANNEL {
            return Err(Error::Config(format!("channel {} out of range 0-{}", self.channel, MAX_CHANNEL)));
        }
        // Velocity 0 is a note-off on the wire
        if self.velocity == 0 || self.velocity > MAX_NOTE {
            return Err(Error::Config(format!("velocity {} out of range 1-127", self.velocity)));
        }
        if self.height > MAX_HEIGHT {
            return Err(Error::Config(format!("height {} exceeds {} rows", self.height, MAX_HEIGHT)));
        }
        Ok(())
    }

    /// Number of keys in the range
    pub fn key_count(&self) -> usize {
        (self.note_high as usize + 1).saturating_sub(self.note_low as usize)
    }
}

/// Visual class of a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    /// White piano key; `shift_back` when it follows a black key and
    /// slides under it
    White { shift_back: bool },
    /// Black piano key
    Black,
    /// Drum pad with its label
    Drum { label: String },
}

impl KeyKind {
    /// Check if this is a black piano key
    pub fn is_black(&self) -> bool {
        matches!(self, KeyKind::Black)
    }
}

/// One rendered key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyElement {
    /// Host element reference for this key
    pub element: ElementRef,
    /// Note played by this key
    pub note: NoteNumber,
    /// Visual class
    pub kind: KeyKind,
    /// Key height in rows
    pub height: u16,
}

/// Check if a note is a black key on a piano
pub fn is_black_key(note: NoteNumber) -> bool {
    matches!(note % 12, 1 | 3 | 6 | 8 | 10)
}

/// Builds [`Keyboard`]s
pub struct KeyboardBuilder {
    config: KeyboardConfig,
    labels: Option<Box<dyn Fn(NoteNumber) -> String>>,
}

impl KeyboardBuilder {
    /// Piano keyboard with black and white keys
    pub fn piano(config: KeyboardConfig) -> Self {
        Self { config, labels: None }
    }

    /// Row of drum pads labelled by `labels`
    pub fn drum_pad<F>(config: KeyboardConfig, labels: F) -> Self
    where
        F: Fn(NoteNumber) -> String + 'static,
    {
        Self {
            config,
            labels: Some(Box::new(labels)),
        }
    }

    /// Create the keys and wire them to `handler`
    pub fn build<H: NoteHandler>(self, handler: H) -> Result<Keyboard<H>> {
        self.config.validate()?;

        let root = ContainerId::next();
        let keys = self.make_keys(root);
        log::debug!(
            "built keyboard {} with {} keys ({}..={})",
            root.raw(),
            keys.len(),
            self.config.note_low,
            self.config.note_high
        );

        Ok(Keyboard {
            tracker: NoteTracker::new(handler, self.config.channel, self.config.velocity),
            registry: KeyRegistry::new(root),
            input: InputNormalizer::new(),
            drums: self.labels.is_some(),
            config: self.config,
            keys,
        })
    }

    fn make_keys(&self, root: ContainerId) -> Vec<KeyElement> {
        let height = self.config.height;
        let mut keys = Vec::with_capacity(self.config.key_count());
        let mut last_black = false;

        for (index, note) in (self.config.note_low..=self.config.note_high).enumerate() {
            let element = ElementRef::key(root, ElementId(index as u32), note);
            let (kind, factor) = match &self.labels {
                Some(labels) => (KeyKind::Drum { label: labels(note) }, 0.6),
                None if is_black_key(note) => (KeyKind::Black, 0.5),
                None => (KeyKind::White { shift_back: last_black }, 1.0),
            };
            last_black = kind.is_black();

            keys.push(KeyElement {
                element,
                note,
                kind,
                height: ((height as f32 * factor) as u16).saturating_sub(KEY_MARGIN),
            });
        }
        keys
    }
}

/// One keyboard instance: its keys and their input state
pub struct Keyboard<H: NoteHandler> {
    config: KeyboardConfig,
    registry: KeyRegistry,
    tracker: NoteTracker<H>,
    input: InputNormalizer,
    keys: Vec<KeyElement>,
    drums: bool,
}

impl<H: NoteHandler> Keyboard<H> {
    /// Feed one raw host event
    pub fn handle_event(
        &mut self,
        event: &InputEvent,
        resolver: &dyn ElementResolver,
        control: &mut dyn EventControl,
    ) -> Disposition {
        self.input
            .handle(event, &self.registry, &mut self.tracker, resolver, control)
    }

    /// Release every sounding note
    pub fn release_all(&mut self) {
        self.tracker.all_notes_up();
        self.input.reset();
    }

    /// The keys, lowest note first
    pub fn keys(&self) -> &[KeyElement] {
        &self.keys
    }

    /// Key playing `note`
    pub fn key(&self, note: NoteNumber) -> Option<&KeyElement> {
        let index = note.checked_sub(self.config.note_low)? as usize;
        self.keys.get(index)
    }

    /// Root container of the keys
    pub fn root(&self) -> ContainerId {
        self.registry.root()
    }

    /// The key registry
    pub fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    /// Press/release state
    pub fn tracker(&self) -> &NoteTracker<H> {
        &self.tracker
    }

    /// Check if a note is sounding
    pub fn is_note_pressed(&self, note: NoteNumber) -> bool {
        self.tracker.is_down(note)
    }

    /// Build settings
    pub fn config(&self) -> &KeyboardConfig {
        &self.config
    }

    /// Check if this is a drum pad
    pub fn is_drum_pad(&self) -> bool {
        self.drums
    }

    /// Number of white keys (all pads count as white)
    pub fn white_key_count(&self) -> usize {
        self.keys.iter().filter(|k| !k.kind.is_black()).count()
    }

    /// The host handler
    pub fn handler(&self) -> &H {
        self.tracker.handler()
    }

    /// The host handler, mutably
    pub fn handler_mut(&mut self) -> &mut H {
        self.tracker.handler_mut()
    }
}

impl<H: NoteHandler> Drop for Keyboard<H> {
    fn drop(&mut self) {
        self.tracker.all_notes_up();
    }
}

/// Convert a MIDI note number to a note name (60 = C4)
pub fn note_name(note: NoteNumber) -> String {
    let names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i8 - 1;
    let name = names[(note % 12) as usize];
    format!("{}{}", name, octave)
}

/// General MIDI percussion name for a note, or the note name outside the map
pub fn gm_drum_name(note: NoteNumber) -> String {
    let name = match note {
        35 => "Acoustic Bass Drum",
        36 => "Bass Drum",
        37 => "Side Stick",
        38 => "Snare",
        39 => "Hand Clap",
        40 => "Electric Snare",
        41 => "Low Floor Tom",
        42 => "Closed Hi-Hat",
        43 => "High Floor Tom",
        44 => "Pedal Hi-Hat",
        45 => "Low Tom",
        46 => "Open Hi-Hat",
        47 => "Low-Mid Tom",
        48 => "Hi-Mid Tom",
        49 => "Crash Cymbal",
        50 => "High Tom",
        51 => "Ride Cymbal",
        52 => "Chinese Cymbal",
        53 => "Ride Bell",
        54 => "Tambourine",
        55 => "Splash Cymbal",
        56 => "Cowbell",
        57 => "Crash Cymbal 2",
        58 => "Vibraslap",
        59 => "Ride Cymbal 2",
        60 => "Hi Bongo",
        61 => "Low Bongo",
        62 => "Mute Hi Conga",
        63 => "Open Hi Conga",
        64 => "Low Conga",
        65 => "High Timbale",
        66 => "Low Timbale",
        67 => "High Agogo",
        68 => "Low Agogo",
        69 => "Cabasa",
        70 => "Maracas",
        71 => "Short Whistle",
        72 => "Long Whistle",
        73 => "Short Guiro",
        74 => "Long Guiro",
        75 => "Claves",
        76 => "Hi Wood Block",
        77 => "Low Wood Block",
        78 => "Mute Cuica",
        79 => "Open Cuica",
        80 => "Mute Triangle",
        81 => "Open Triangle",
        _ => return note_name(note),
    };
    name.to_string()
}
