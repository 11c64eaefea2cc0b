//! Terminal mouse input
//!
//! Terminals only report button presses and positions. [`MouseAdapter`]
//! hit-tests every position against the [`KeyboardLayout`] and synthesizes
//! the enter/leave events a windowing system would raise when the pointer
//! crosses from one element to another.

use crate::input::{Buttons, InputEvent, PointerSource};
use crate::registry::ElementRef;
use crate::ui::KeyboardLayout;
use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

const SOURCE: PointerSource = PointerSource::Mouse;

/// Turns crossterm mouse events into keyboard input events
#[derive(Debug, Default)]
pub struct MouseAdapter {
    hovered: Option<ElementRef>,
    buttons: Buttons,
}

impl MouseAdapter {
    /// Create an adapter with nothing hovered and no button held
    pub fn new() -> Self {
        Self::default()
    }

    /// Element currently under the mouse
    pub fn hovered(&self) -> Option<ElementRef> {
        self.hovered
    }

    /// Translate one mouse event
    pub fn translate(&mut self, event: &MouseEvent, layout: &KeyboardLayout) -> Vec<InputEvent> {
        let under = layout.element_at(event.column, event.row);
        let mut events = Vec::new();

        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.hover(under, &mut events);
                self.buttons = Buttons::PRIMARY;
                if let Some(target) = under {
                    events.push(InputEvent::ButtonDown { source: SOURCE, target });
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.hover(under, &mut events);
                self.buttons = Buttons::NONE;
                if let Some(target) = under {
                    events.push(InputEvent::ButtonUp { source: SOURCE, target });
                }
            }
            MouseEventKind::Down(MouseButton::Right) => {
                if let Some(target) = under {
                    events.push(InputEvent::ContextMenu { target });
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                self.buttons = Buttons::PRIMARY;
                self.hover(under, &mut events);
            }
            // Crossterm reports moves without a button held as `Moved`
            MouseEventKind::Moved => {
                self.buttons = Buttons::NONE;
                self.hover(under, &mut events);
            }
            _ => {}
        }
        events
    }

    /// Forget the hovered element (pointer left the terminal)
    pub fn leave(&mut self) -> Vec<InputEvent> {
        self.buttons = Buttons::NONE;
        let mut events = Vec::new();
        self.hover(None, &mut events);
        events
    }

    fn hover(&mut self, under: Option<ElementRef>, events: &mut Vec<InputEvent>) {
        if under == self.hovered {
            return;
        }
        if let Some(target) = self.hovered.take() {
            events.push(InputEvent::PointerLeave { source: SOURCE, target });
        }
        if let Some(target) = under {
            events.push(InputEvent::PointerEnter {
                source: SOURCE,
                target,
                buttons: self.buttons,
            });
        }
        self.hovered = under;
    }
}
