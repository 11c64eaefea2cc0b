//! pianokeys - On-screen musical keyboard input
//!
//! Turns pointer, mouse and touch input on a row of rendered keys (piano
//! keys or drum pads) into a deduplicated stream of note-on / note-off
//! events. Features include:
//!
//! - Duplicate presses from overlapping input sources are suppressed
//! - Every note-on is paired with a note-off, also when a drag leaves the keyboard
//! - Glide: dragging a held touch across keys retriggers at each key boundary
//! - Independent multi-touch
//! - Terminal front end with ratatui, crossterm mouse input and JACK MIDI output
//!
//! # Usage as a Library
//!
//! ```no_run
//! use pianokeys::{ElementRef, InputEvent, KeyboardBuilder, KeyboardConfig, NoteCallbacks, PointerSource, Uncontrolled};
//!
//! let callbacks = NoteCallbacks::new(
//!     |note, channel, velocity, _key: &ElementRef| println!("on {} ch {} vel {}", note, channel, velocity),
//!     |note, channel, _key: Option<&ElementRef>| println!("off {} ch {}", note, channel),
//! );
//! let mut keyboard = KeyboardBuilder::piano(KeyboardConfig::default()).build(callbacks)?;
//!
//! // The host resolves positions to elements; here nothing is under any point
//! let resolver = |_x: f32, _y: f32| -> Option<ElementRef> { None };
//! let target = keyboard.key(60).unwrap().element;
//! keyboard.handle_event(&InputEvent::ButtonDown { source: PointerSource::Mouse, target }, &resolver, &mut Uncontrolled);
//! keyboard.handle_event(&InputEvent::ButtonUp { source: PointerSource::Mouse, target }, &resolver, &mut Uncontrolled);
//! # Ok::<(), pianokeys::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod input;
pub mod keyboard;
pub mod midi;
pub mod registry;
pub mod terminal;
pub mod tracker;
pub mod ui;

// Re-export main types
pub use config::{Config, KeyboardMode, Theme};
pub use error::{Error, Result};
pub use input::{
    Buttons, Disposition, ElementResolver, EventControl, InputEvent, InputNormalizer, PointerSource, TouchId,
    TouchPoint, Uncontrolled,
};
pub use keyboard::{
    gm_drum_name, note_name, KeyElement, KeyKind, Keyboard, KeyboardBuilder, KeyboardConfig, C4_MIDI, DEFAULT_VELOCITY,
};
pub use midi::{MidiNoteHandler, MidiOutput};
pub use registry::{ContainerId, ElementId, ElementRef, KeyRegistry, NoteNumber};
pub use tracker::{NoteCallbacks, NoteHandler, NoteTracker};
pub use ui::{KeyboardLayout, KeyboardWidget};
