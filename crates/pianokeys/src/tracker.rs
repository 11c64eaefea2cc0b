//! Press/release tracking for one keyboard
//!
//! Keeps the down-state of every note, suppresses duplicate presses and
//! forwards state changes to the host's [`NoteHandler`].

use crate::registry::{ElementRef, NoteNumber};
use std::collections::{BTreeMap, HashMap};

/// Receives note events from a keyboard
///
/// Both methods are fire-and-forget and run synchronously inside the input
/// handler that caused them.
pub trait NoteHandler {
    /// A note started sounding
    fn note_on(&mut self, note: NoteNumber, channel: u8, velocity: u8, source: &ElementRef);

    /// A note stopped sounding
    ///
    /// `source` is the element last associated with the note, `None` if the
    /// note was never pressed on this keyboard.
    fn note_off(&mut self, note: NoteNumber, channel: u8, source: Option<&ElementRef>);
}

/// [`NoteHandler`] built from a pair of closures
pub struct NoteCallbacks<On, Off> {
    on: On,
    off: Off,
}

impl<On, Off> NoteCallbacks<On, Off>
where
    On: FnMut(NoteNumber, u8, u8, &ElementRef),
    Off: FnMut(NoteNumber, u8, Option<&ElementRef>),
{
    /// Wrap note-on and note-off closures
    pub fn new(on: On, off: Off) -> Self {
        Self { on, off }
    }
}

impl<On, Off> NoteHandler for NoteCallbacks<On, Off>
where
    On: FnMut(NoteNumber, u8, u8, &ElementRef),
    Off: FnMut(NoteNumber, u8, Option<&ElementRef>),
{
    fn note_on(&mut self, note: NoteNumber, channel: u8, velocity: u8, source: &ElementRef) {
        (self.on)(note, channel, velocity, source)
    }

    fn note_off(&mut self, note: NoteNumber, channel: u8, source: Option<&ElementRef>) {
        (self.off)(note, channel, source)
    }
}

/// Down-state of the notes of one keyboard
pub struct NoteTracker<H> {
    handler: H,
    channel: u8,
    velocity: u8,
    /// Notes currently sounding, with the element that started them
    down: BTreeMap<NoteNumber, ElementRef>,
    /// Last element seen for every note, kept after release
    last_source: HashMap<NoteNumber, ElementRef>,
    last_down: Option<NoteNumber>,
}

impl<H: NoteHandler> NoteTracker<H> {
    /// Create a tracker that reports to `handler`
    pub fn new(handler: H, channel: u8, velocity: u8) -> Self {
        Self {
            handler,
            channel,
            velocity,
            down: BTreeMap::new(),
            last_source: HashMap::new(),
            last_down: None,
        }
    }

    /// Press a note
    ///
    /// Does nothing if the note is already down, so overlapping input
    /// sources (pointer plus emulated mouse, enter while pressed) cannot
    /// trigger it twice.
    pub fn note_down(&mut self, note: NoteNumber, source: ElementRef) {
        if self.down.contains_key(&note) {
            log::trace!("note {} already down", note);
            return;
        }
        log::debug!("note on: note={} ch={} vel={}", note, self.channel, self.velocity);
        self.down.insert(note, source);
        self.last_source.insert(note, source);
        self.last_down = Some(note);
        self.handler.note_on(note, self.channel, self.velocity, &source);
    }

    /// Release a note
    ///
    /// Always reports the release, even for a note that is not down, so a
    /// speculative release can never leave a note stuck downstream.
    pub fn note_up(&mut self, note: NoteNumber) {
        log::debug!("note off: note={} ch={}", note, self.channel);
        self.down.remove(&note);
        let source = self.last_source.get(&note);
        self.handler.note_off(note, self.channel, source);
    }

    /// Release every note that is down
    pub fn all_notes_up(&mut self) {
        if self.down.is_empty() {
            return;
        }
        log::debug!("all notes off: {} sounding", self.down.len());
        for (note, source) in std::mem::take(&mut self.down) {
            self.handler.note_off(note, self.channel, Some(&source));
        }
    }

    /// Check if a note is currently down
    pub fn is_down(&self, note: NoteNumber) -> bool {
        self.down.contains_key(&note)
    }

    /// Notes currently down, ascending
    pub fn down_notes(&self) -> impl Iterator<Item = NoteNumber> + '_ {
        self.down.keys().copied()
    }

    /// Number of notes currently down
    pub fn down_count(&self) -> usize {
        self.down.len()
    }

    /// Element that started a note that is down
    pub fn source_of(&self, note: NoteNumber) -> Option<&ElementRef> {
        self.down.get(&note)
    }

    /// Most recently pressed note
    pub fn last_down(&self) -> Option<NoteNumber> {
        self.last_down
    }

    /// Channel passed to the handler
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Velocity passed to note-on
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// The host handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The host handler, mutably
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}
