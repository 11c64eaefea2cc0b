//! Input event normalization
//!
//! Turns raw mouse, pointer and touch events into press/release calls on a
//! [`NoteTracker`], including glide: dragging a held touch across keys
//! closes the previous note and opens the new one at every key boundary.
//!
//! Event dispatch is single-threaded and run-to-completion. Every call to
//! [`InputNormalizer::handle`] finishes its tracker updates before returning.

use crate::error::Result;
use crate::registry::{ElementRef, KeyRegistry, NoteNumber};
use crate::tracker::{NoteHandler, NoteTracker};
use std::collections::HashMap;

/// Identifier the host assigns to a touch point for its whole lifetime
pub type TouchId = u64;

/// Which kind of device raised a button event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSource {
    /// Classic mouse events
    Mouse,
    /// Unified pointer events (mouse, pen or touch)
    Pointer,
}

/// Bit set of physically held buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buttons(pub u16);

impl Buttons {
    /// No button held
    pub const NONE: Buttons = Buttons(0);
    /// Primary (usually left) button
    pub const PRIMARY: Buttons = Buttons(1);

    /// Check if the primary button is held
    pub fn primary(self) -> bool {
        self.0 & Self::PRIMARY.0 != 0
    }
}

/// One point of a touch list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    /// Stable id of this touch
    pub id: TouchId,
    /// Element the touch started on
    pub target: ElementRef,
    /// Current horizontal position in host coordinates
    pub x: f32,
    /// Current vertical position in host coordinates
    pub y: f32,
}

/// A raw input event as raised by the host
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Button or pointer pressed on `target`
    ButtonDown { source: PointerSource, target: ElementRef },
    /// Button or pointer released over `target`
    ButtonUp { source: PointerSource, target: ElementRef },
    /// Pointer moved onto `target`
    PointerEnter {
        source: PointerSource,
        target: ElementRef,
        buttons: Buttons,
    },
    /// Pointer moved off `target`
    PointerLeave { source: PointerSource, target: ElementRef },
    /// New touch points (changed touches)
    TouchStart { touches: Vec<TouchPoint> },
    /// All active touch points after a move
    TouchMove { touches: Vec<TouchPoint> },
    /// Lifted touch points (changed touches)
    TouchEnd { touches: Vec<TouchPoint> },
    /// Touch points the host aborted (changed touches)
    TouchCancel { touches: Vec<TouchPoint> },
    /// Context menu request on `target`
    ContextMenu { target: ElementRef },
}

/// Hit testing capability of the host
pub trait ElementResolver {
    /// Topmost element at the given position, if any
    fn resolve_element_at_point(&self, x: f32, y: f32) -> Option<ElementRef>;
}

impl<F> ElementResolver for F
where
    F: Fn(f32, f32) -> Option<ElementRef>,
{
    fn resolve_element_at_point(&self, x: f32, y: f32) -> Option<ElementRef> {
        self(x, y)
    }
}

/// Default-behavior control of the host event being handled
///
/// Hosts that cannot suppress an event return an error, which the
/// normalizer ignores.
pub trait EventControl {
    /// Suppress the host's default action (selection, scrolling, menus)
    fn prevent_default(&mut self) -> Result<()>;

    /// Keep the event from reaching parent handlers
    fn stop_propagation(&mut self) -> Result<()>;
}

/// [`EventControl`] for events that cannot be controlled
#[derive(Debug, Default, Clone, Copy)]
pub struct Uncontrolled;

impl EventControl for Uncontrolled {
    fn prevent_default(&mut self) -> Result<()> {
        Err(crate::error::Error::Unsupported("prevent_default"))
    }

    fn stop_propagation(&mut self) -> Result<()> {
        Err(crate::error::Error::Unsupported("stop_propagation"))
    }
}

/// What happened to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The event concerned this keyboard and was suppressed
    Handled,
    /// The event did not concern this keyboard and was left alone
    Ignored,
}

/// Per-keyboard input state
#[derive(Debug, Default)]
pub struct InputNormalizer {
    /// Current key of every active touch
    touches: HashMap<TouchId, NoteNumber>,
}

impl InputNormalizer {
    /// Create a normalizer with no active touches
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of touches currently holding a key
    pub fn active_touches(&self) -> usize {
        self.touches.len()
    }

    /// Key currently held by a touch
    pub fn touch_note(&self, id: TouchId) -> Option<NoteNumber> {
        self.touches.get(&id).copied()
    }

    /// Forget all touches (after the host released every note)
    pub fn reset(&mut self) {
        self.touches.clear();
    }

    /// Apply one raw event to the tracker
    pub fn handle<H: NoteHandler>(
        &mut self,
        event: &InputEvent,
        registry: &KeyRegistry,
        tracker: &mut NoteTracker<H>,
        resolver: &dyn ElementResolver,
        control: &mut dyn EventControl,
    ) -> Disposition {
        let disposition = match event {
            InputEvent::ButtonDown { target, .. } => match registry.note_of(target) {
                Some(note) => {
                    tracker.note_down(note, *target);
                    Disposition::Handled
                }
                None => Disposition::Ignored,
            },
            InputEvent::ButtonUp { target, .. } | InputEvent::PointerLeave { target, .. } => {
                if registry.is_my_key(Some(target), None) {
                    tracker.all_notes_up();
                    self.touches.clear();
                    Disposition::Handled
                } else {
                    Disposition::Ignored
                }
            }
            InputEvent::PointerEnter { target, buttons, .. } => match registry.note_of(target) {
                Some(note) => {
                    if buttons.primary() {
                        tracker.note_down(note, *target);
                    }
                    Disposition::Handled
                }
                None => Disposition::Ignored,
            },
            InputEvent::TouchStart { touches } => self.touch_start(touches, registry, tracker),
            InputEvent::TouchMove { touches } => self.touch_move(touches, registry, tracker, resolver),
            InputEvent::TouchEnd { touches } | InputEvent::TouchCancel { touches } => {
                self.touch_end(touches, registry, tracker)
            }
            InputEvent::ContextMenu { target } => {
                if registry.is_my_key(Some(target), None) {
                    Disposition::Handled
                } else {
                    Disposition::Ignored
                }
            }
        };

        if disposition == Disposition::Handled {
            suppress(control);
        }
        disposition
    }

    fn touch_start<H: NoteHandler>(
        &mut self,
        touches: &[TouchPoint],
        registry: &KeyRegistry,
        tracker: &mut NoteTracker<H>,
    ) -> Disposition {
        let mut disposition = Disposition::Ignored;
        for touch in touches {
            if let Some(note) = registry.note_of(&touch.target) {
                tracker.note_down(note, touch.target);
                self.touches.insert(touch.id, note);
                disposition = Disposition::Handled;
            }
        }
        disposition
    }

    fn touch_move<H: NoteHandler>(
        &mut self,
        touches: &[TouchPoint],
        registry: &KeyRegistry,
        tracker: &mut NoteTracker<H>,
        resolver: &dyn ElementResolver,
    ) -> Disposition {
        let mut disposition = Disposition::Ignored;
        for touch in touches {
            if !registry.is_my_key(Some(&touch.target), None) {
                continue;
            }
            disposition = Disposition::Handled;

            let Some(under) = resolver.resolve_element_at_point(touch.x, touch.y) else {
                continue;
            };
            let Some(note) = registry.note_of(&under) else {
                continue;
            };

            let previous = self.touches.get(&touch.id).copied().or(tracker.last_down());
            if previous == Some(note) {
                continue;
            }

            log::trace!("touch {} glides {:?} -> {}", touch.id, previous, note);
            match self.touches.get(&touch.id).copied() {
                Some(held) => {
                    self.touches.remove(&touch.id);
                    if !self.is_held(held) {
                        tracker.note_up(held);
                    }
                }
                // Touch we never saw start: fall back to closing everything
                None => {
                    tracker.all_notes_up();
                    self.touches.clear();
                }
            }
            tracker.note_down(note, under);
            self.touches.insert(touch.id, note);
        }
        disposition
    }

    fn touch_end<H: NoteHandler>(
        &mut self,
        touches: &[TouchPoint],
        registry: &KeyRegistry,
        tracker: &mut NoteTracker<H>,
    ) -> Disposition {
        let mut disposition = Disposition::Ignored;
        for touch in touches {
            if !registry.is_my_key(Some(&touch.target), None) {
                continue;
            }
            disposition = Disposition::Handled;

            if let Some(held) = self.touches.remove(&touch.id) {
                if !self.is_held(held) && tracker.is_down(held) {
                    tracker.note_up(held);
                }
            }
        }

        if disposition == Disposition::Handled && self.touches.is_empty() {
            tracker.all_notes_up();
        }
        disposition
    }

    /// Check if any active touch still holds `note`
    fn is_held(&self, note: NoteNumber) -> bool {
        self.touches.values().any(|&n| n == note)
    }
}

/// Best-effort suppression of the host's default handling
fn suppress(control: &mut dyn EventControl) {
    if let Err(e) = control.prevent_default() {
        log::trace!("prevent_default failed: {}", e);
    }
    if let Err(e) = control.stop_propagation() {
        log::trace!("stop_propagation failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ContainerId, ElementId};
    use crate::tracker::testing::{NoteEvent::*, Recorder};

    /// Keys 60..=64, each 10 units wide, laid out from x = 0
    struct Strip {
        root: ContainerId,
    }

    impl Strip {
        fn key(&self, note: NoteNumber) -> ElementRef {
            ElementRef::key(self.root, ElementId(note as u32), note)
        }

        fn x_of(&self, note: NoteNumber) -> f32 {
            (note - 60) as f32 * 10.0 + 5.0
        }
    }

    impl ElementResolver for Strip {
        fn resolve_element_at_point(&self, x: f32, _y: f32) -> Option<ElementRef> {
            if x < 0.0 {
                return None;
            }
            let note = 60 + (x / 10.0) as u32;
            if note <= 64 {
                Some(self.key(note as NoteNumber))
            } else {
                // Background of the page
                Some(ElementRef::plain(None, ElementId(1000)))
            }
        }
    }

    #[derive(Default)]
    struct CountingControl {
        prevented: usize,
        stopped: usize,
    }

    impl EventControl for CountingControl {
        fn prevent_default(&mut self) -> Result<()> {
            self.prevented += 1;
            Ok(())
        }

        fn stop_propagation(&mut self) -> Result<()> {
            self.stopped += 1;
            Ok(())
        }
    }

    struct Rig {
        strip: Strip,
        registry: KeyRegistry,
        tracker: NoteTracker<Recorder>,
        input: InputNormalizer,
        control: CountingControl,
    }

    impl Rig {
        fn new() -> Self {
            let root = ContainerId::next();
            Self {
                strip: Strip { root },
                registry: KeyRegistry::new(root),
                tracker: NoteTracker::new(Recorder::default(), 0, 100),
                input: InputNormalizer::new(),
                control: CountingControl::default(),
            }
        }

        fn send(&mut self, event: InputEvent) -> Disposition {
            self.input.handle(
                &event,
                &self.registry,
                &mut self.tracker,
                &self.strip,
                &mut self.control,
            )
        }

        fn touch(&self, id: TouchId, start: NoteNumber, at: NoteNumber) -> TouchPoint {
            TouchPoint {
                id,
                target: self.strip.key(start),
                x: self.strip.x_of(at),
                y: 0.0,
            }
        }

        fn events(&self) -> &[crate::tracker::testing::NoteEvent] {
            &self.tracker.handler().events
        }
    }

    #[test]
    fn test_button_down_up() {
        let mut rig = Rig::new();
        let key = rig.strip.key(60);

        rig.send(InputEvent::ButtonDown { source: PointerSource::Mouse, target: key });
        // Pointer event for the same press is a duplicate
        rig.send(InputEvent::ButtonDown { source: PointerSource::Pointer, target: key });
        rig.send(InputEvent::ButtonUp { source: PointerSource::Mouse, target: key });

        assert_eq!(rig.events(), &[On(60), Off(60)]);
        assert_eq!(rig.control.prevented, 3);
        assert_eq!(rig.control.stopped, 3);
    }

    #[test]
    fn test_enter_requires_primary_button() {
        let mut rig = Rig::new();
        let key = rig.strip.key(61);

        let d = rig.send(InputEvent::PointerEnter {
            source: PointerSource::Pointer,
            target: key,
            buttons: Buttons::NONE,
        });
        assert_eq!(d, Disposition::Handled);
        assert!(rig.events().is_empty());

        rig.send(InputEvent::PointerEnter {
            source: PointerSource::Pointer,
            target: key,
            buttons: Buttons(Buttons::PRIMARY.0 | 2),
        });
        assert_eq!(rig.events(), &[On(61)]);
    }

    #[test]
    fn test_mouse_drag_across_keys() {
        let mut rig = Rig::new();
        let (a, b) = (rig.strip.key(60), rig.strip.key(62));

        rig.send(InputEvent::ButtonDown { source: PointerSource::Mouse, target: a });
        rig.send(InputEvent::PointerLeave { source: PointerSource::Mouse, target: a });
        rig.send(InputEvent::PointerEnter {
            source: PointerSource::Mouse,
            target: b,
            buttons: Buttons::PRIMARY,
        });
        rig.send(InputEvent::ButtonUp { source: PointerSource::Mouse, target: b });

        assert_eq!(rig.events(), &[On(60), Off(60), On(62), Off(62)]);
    }

    #[test]
    fn test_foreign_targets_ignored() {
        let mut rig = Rig::new();
        let other = ElementRef::key(ContainerId::next(), ElementId(0), 60);
        let background = ElementRef::plain(Some(rig.registry.root()), ElementId(500));

        for target in [other, background] {
            assert_eq!(
                rig.send(InputEvent::ButtonDown { source: PointerSource::Mouse, target }),
                Disposition::Ignored
            );
            assert_eq!(rig.send(InputEvent::ContextMenu { target }), Disposition::Ignored);
        }
        assert!(rig.events().is_empty());
        assert_eq!(rig.control.prevented, 0);
    }

    #[test]
    fn test_context_menu_suppressed() {
        let mut rig = Rig::new();
        let key = rig.strip.key(63);
        assert_eq!(rig.send(InputEvent::ContextMenu { target: key }), Disposition::Handled);
        assert_eq!(rig.control.prevented, 1);
        assert!(rig.events().is_empty());
    }

    #[test]
    fn test_glide_round_trip() {
        let mut rig = Rig::new();

        let start = rig.touch(1, 60, 60);
        rig.send(InputEvent::TouchStart { touches: vec![start] });
        let to_b = rig.touch(1, 60, 62);
        rig.send(InputEvent::TouchMove { touches: vec![to_b] });
        let back = rig.touch(1, 60, 60);
        rig.send(InputEvent::TouchMove { touches: vec![back] });

        assert_eq!(rig.events(), &[On(60), Off(60), On(62), Off(62), On(60)]);

        rig.send(InputEvent::TouchEnd { touches: vec![back] });
        assert_eq!(rig.events().last(), Some(&Off(60)));
        assert_eq!(rig.tracker.down_count(), 0);
        assert_eq!(rig.input.active_touches(), 0);
    }

    #[test]
    fn test_stationary_touch_does_not_retrigger() {
        let mut rig = Rig::new();
        let touch = rig.touch(7, 61, 61);

        rig.send(InputEvent::TouchStart { touches: vec![touch] });
        for dy in 0..5 {
            let mut wiggle = touch;
            wiggle.y = dy as f32;
            wiggle.x += 0.5;
            rig.send(InputEvent::TouchMove { touches: vec![wiggle] });
        }
        assert_eq!(rig.events(), &[On(61)]);

        rig.send(InputEvent::TouchEnd { touches: vec![touch] });
        assert_eq!(rig.events(), &[On(61), Off(61)]);
    }

    #[test]
    fn test_glide_onto_non_key_keeps_note() {
        let mut rig = Rig::new();
        let touch = rig.touch(1, 64, 64);
        rig.send(InputEvent::TouchStart { touches: vec![touch] });

        // Off the right edge onto the page background, then off-screen
        let mut outside = touch;
        outside.x = 100.0;
        rig.send(InputEvent::TouchMove { touches: vec![outside] });
        outside.x = -5.0;
        rig.send(InputEvent::TouchMove { touches: vec![outside] });

        assert_eq!(rig.events(), &[On(64)]);
        rig.send(InputEvent::TouchEnd { touches: vec![outside] });
        assert_eq!(rig.events(), &[On(64), Off(64)]);
    }

    #[test]
    fn test_two_touches_independent() {
        let mut rig = Rig::new();
        let first = rig.touch(1, 61, 61);
        let second = rig.touch(2, 62, 62);

        rig.send(InputEvent::TouchStart { touches: vec![first] });
        rig.send(InputEvent::TouchStart { touches: vec![second] });
        assert_eq!(rig.events(), &[On(61), On(62)]);

        // Both listed in a move batch while stationary: nothing happens
        rig.send(InputEvent::TouchMove { touches: vec![first, second] });
        assert_eq!(rig.events(), &[On(61), On(62)]);

        // Second finger glides on, first stays down
        let moved = rig.touch(2, 62, 63);
        rig.send(InputEvent::TouchMove { touches: vec![first, moved] });
        assert_eq!(rig.events(), &[On(61), On(62), Off(62), On(63)]);
        assert!(rig.tracker.is_down(61));

        // Lifting the first finger releases only its note
        rig.send(InputEvent::TouchEnd { touches: vec![first] });
        assert_eq!(rig.events().last(), Some(&Off(61)));
        assert!(rig.tracker.is_down(63));

        rig.send(InputEvent::TouchEnd { touches: vec![moved] });
        assert_eq!(rig.tracker.down_count(), 0);
        assert_eq!(rig.tracker.handler().ons(), rig.tracker.handler().offs());
    }

    #[test]
    fn test_shared_key_not_released_early() {
        let mut rig = Rig::new();
        let a = rig.touch(1, 60, 60);
        let b = rig.touch(2, 62, 62);
        rig.send(InputEvent::TouchStart { touches: vec![a, b] });

        // Second finger glides onto the first finger's key
        let b_on_a = rig.touch(2, 62, 60);
        rig.send(InputEvent::TouchMove { touches: vec![a, b_on_a] });
        assert_eq!(rig.events(), &[On(60), On(62), Off(62)]);

        // First finger leaves it again; second still holds 60
        let a_moved = rig.touch(1, 60, 61);
        rig.send(InputEvent::TouchMove { touches: vec![a_moved, b_on_a] });
        assert_eq!(rig.events(), &[On(60), On(62), Off(62), On(61)]);
        assert!(rig.tracker.is_down(60));
    }

    #[test]
    fn test_lifting_shared_key_keeps_it_down() {
        let mut rig = Rig::new();
        let a = rig.touch(1, 60, 60);
        let b = rig.touch(2, 62, 62);
        rig.send(InputEvent::TouchStart { touches: vec![a, b] });
        let b_on_a = rig.touch(2, 62, 60);
        rig.send(InputEvent::TouchMove { touches: vec![a, b_on_a] });

        // First finger lifts while the second still rests on 60
        assert_eq!(rig.send(InputEvent::TouchEnd { touches: vec![a] }), Disposition::Handled);
        assert_eq!(rig.events(), &[On(60), On(62), Off(62)]);
        assert!(rig.tracker.is_down(60));
        assert_eq!(rig.input.active_touches(), 1);

        rig.send(InputEvent::TouchEnd { touches: vec![b_on_a] });
        assert_eq!(rig.events(), &[On(60), On(62), Off(62), Off(60)]);
        assert_eq!(rig.input.active_touches(), 0);
        assert_eq!(rig.tracker.handler().ons(), rig.tracker.handler().offs());
    }

    #[test]
    fn test_unknown_touch_uses_last_down() {
        let mut rig = Rig::new();
        let key = rig.strip.key(60);
        rig.send(InputEvent::ButtonDown { source: PointerSource::Pointer, target: key });

        // A move for a touch whose start we never received
        let stray = rig.touch(9, 60, 61);
        rig.send(InputEvent::TouchMove { touches: vec![stray] });
        assert_eq!(rig.events(), &[On(60), Off(60), On(61)]);
        assert_eq!(rig.input.touch_note(9), Some(61));
    }

    #[test]
    fn test_foreign_touches_ignored() {
        let mut rig = Rig::new();
        let foreign = TouchPoint {
            id: 3,
            target: ElementRef::key(ContainerId::next(), ElementId(0), 60),
            x: rig.strip.x_of(61),
            y: 0.0,
        };

        assert_eq!(rig.send(InputEvent::TouchStart { touches: vec![foreign] }), Disposition::Ignored);
        assert_eq!(rig.send(InputEvent::TouchMove { touches: vec![foreign] }), Disposition::Ignored);
        assert_eq!(rig.send(InputEvent::TouchEnd { touches: vec![foreign] }), Disposition::Ignored);
        assert!(rig.events().is_empty());
    }

    #[test]
    fn test_touch_cancel_releases() {
        let mut rig = Rig::new();
        let touch = rig.touch(4, 62, 62);
        rig.send(InputEvent::TouchStart { touches: vec![touch] });
        rig.send(InputEvent::TouchCancel { touches: vec![touch] });
        assert_eq!(rig.events(), &[On(62), Off(62)]);
    }

    #[test]
    fn test_release_when_nothing_down() {
        let mut rig = Rig::new();
        let key = rig.strip.key(60);
        rig.send(InputEvent::ButtonUp { source: PointerSource::Mouse, target: key });
        rig.send(InputEvent::PointerLeave { source: PointerSource::Mouse, target: key });
        assert!(rig.events().is_empty());
    }

    #[test]
    fn test_unsupported_control_is_swallowed() {
        let root = ContainerId::next();
        let strip = Strip { root };
        let registry = KeyRegistry::new(root);
        let mut tracker = NoteTracker::new(Recorder::default(), 0, 100);
        let mut input = InputNormalizer::new();

        let event = InputEvent::ButtonDown { source: PointerSource::Mouse, target: strip.key(60) };
        let d = input.handle(&event, &registry, &mut tracker, &strip, &mut Uncontrolled);
        assert_eq!(d, Disposition::Handled);
        assert!(tracker.is_down(60));
    }

    #[test]
    fn test_closure_resolver() {
        let root = ContainerId::next();
        let registry = KeyRegistry::new(root);
        let mut tracker = NoteTracker::new(Recorder::default(), 0, 100);
        let mut input = InputNormalizer::new();
        let resolver = move |x: f32, _y: f32| -> Option<ElementRef> {
            let note = if x < 10.0 { 40 } else { 41 };
            Some(ElementRef::key(root, ElementId(note as u32), note))
        };

        let touch = TouchPoint {
            id: 1,
            target: ElementRef::key(root, ElementId(40), 40),
            x: 15.0,
            y: 0.0,
        };
        input.handle(&InputEvent::TouchStart { touches: vec![touch] }, &registry, &mut tracker, &resolver, &mut Uncontrolled);
        input.handle(&InputEvent::TouchMove { touches: vec![touch] }, &registry, &mut tracker, &resolver, &mut Uncontrolled);
        assert_eq!(tracker.handler().events, vec![On(40), Off(40), On(41)]);
    }
}
