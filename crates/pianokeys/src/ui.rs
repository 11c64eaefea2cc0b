//! TUI rendering for keyboards
//!
//! [`KeyboardLayout`] places the keys of a [`Keyboard`] in a terminal area
//! and doubles as the hit tester the input normalizer asks for touch glide.
//! [`KeyboardWidget`] draws the keyboard with ratatui.

use crate::config::Theme;
use crate::input::ElementResolver;
use crate::keyboard::{note_name, KeyKind, Keyboard};
use crate::registry::{ElementId, ElementRef, NoteNumber};
use crate::tracker::NoteHandler;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders};

/// Element id reported for the empty space between and below keys
pub const BACKGROUND_ID: ElementId = ElementId(u32::MAX);

const MIN_WHITE_WIDTH: u16 = 3;
const MAX_WHITE_WIDTH: u16 = 6;
const BLACK_WIDTH: u16 = 3;
const MIN_PAD_WIDTH: u16 = 4;
const MAX_PAD_WIDTH: u16 = 14;

/// Screen placement of one key
#[derive(Debug, Clone)]
struct PlacedKey {
    element: ElementRef,
    note: NoteNumber,
    rect: Rect,
    /// Drawn above the other keys
    on_top: bool,
}

/// Key rectangles of a keyboard inside a terminal area
#[derive(Debug, Clone)]
pub struct KeyboardLayout {
    area: Rect,
    keys_area: Rect,
    background: ElementRef,
    keys: Vec<PlacedKey>,
}

impl KeyboardLayout {
    /// Place the keys of `keyboard` in `area` (border included)
    pub fn compute<H: NoteHandler>(keyboard: &Keyboard<H>, area: Rect) -> Self {
        let inner = Block::default().borders(Borders::ALL).inner(area);
        // Last row is the status line
        let keys_area = Rect {
            height: inner.height.saturating_sub(1),
            ..inner
        };

        let keys = if keyboard.is_drum_pad() {
            place_pads(keyboard, keys_area)
        } else {
            place_piano(keyboard, keys_area)
        };

        Self {
            area,
            keys_area,
            background: ElementRef::plain(Some(keyboard.root()), BACKGROUND_ID),
            keys,
        }
    }

    /// Outer area including the border
    pub fn area(&self) -> Rect {
        self.area
    }

    /// Screen rectangle of the key playing `note`
    pub fn rect_of(&self, note: NoteNumber) -> Option<Rect> {
        self.keys.iter().find(|k| k.note == note).map(|k| k.rect)
    }

    /// Topmost element at a terminal cell
    pub fn element_at(&self, column: u16, row: u16) -> Option<ElementRef> {
        if !contains(self.keys_area, column, row) {
            return None;
        }
        self.keys
            .iter()
            .filter(|k| k.on_top)
            .chain(self.keys.iter().filter(|k| !k.on_top))
            .find(|k| contains(k.rect, column, row))
            .map(|k| k.element)
            .or(Some(self.background))
    }
}

impl ElementResolver for KeyboardLayout {
    fn resolve_element_at_point(&self, x: f32, y: f32) -> Option<ElementRef> {
        if x < 0.0 || y < 0.0 || x > u16::MAX as f32 || y > u16::MAX as f32 {
            return None;
        }
        self.element_at(x as u16, y as u16)
    }
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x && column < rect.right() && row >= rect.y && row < rect.bottom()
}

fn place_piano<H: NoteHandler>(keyboard: &Keyboard<H>, area: Rect) -> Vec<PlacedKey> {
    let whites = keyboard.white_key_count().max(1) as u16;
    let white_width = (area.width / whites).clamp(MIN_WHITE_WIDTH, MAX_WHITE_WIDTH);
    let mut placed = Vec::with_capacity(keyboard.keys().len());
    let mut next_white_x = area.x;

    for key in keyboard.keys() {
        let height = key.height.min(area.height);
        let rect = if key.kind.is_black() {
            // Straddle the boundary with the previous white key
            let x = next_white_x.saturating_sub(BLACK_WIDTH / 2).max(area.x);
            Rect::new(x, area.y, BLACK_WIDTH, height)
        } else {
            let rect = Rect::new(next_white_x, area.y, white_width, height);
            next_white_x += white_width;
            rect
        };
        placed.push(PlacedKey {
            element: key.element,
            note: key.note,
            rect: rect.intersection(area),
            on_top: key.kind.is_black(),
        });
    }
    placed
}

fn place_pads<H: NoteHandler>(keyboard: &Keyboard<H>, area: Rect) -> Vec<PlacedKey> {
    let count = keyboard.keys().len().max(1) as u16;
    let width = (area.width / count).clamp(MIN_PAD_WIDTH, MAX_PAD_WIDTH);

    keyboard
        .keys()
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let x = area.x.saturating_add(i as u16 * width);
            // One column gap between pads
            let rect = Rect::new(x, area.y, width.saturating_sub(1), key.height.min(area.height));
            PlacedKey {
                element: key.element,
                note: key.note,
                rect: rect.intersection(area),
                on_top: false,
            }
        })
        .collect()
}

/// Keyboard widget for rendering in ratatui
pub struct KeyboardWidget<'a, H: NoteHandler> {
    keyboard: &'a Keyboard<H>,
    layout: &'a KeyboardLayout,
    title: Option<String>,
    theme: Theme,
}

impl<'a, H: NoteHandler> KeyboardWidget<'a, H> {
    /// Create a new keyboard widget
    pub fn new(keyboard: &'a Keyboard<H>, layout: &'a KeyboardLayout) -> Self {
        Self {
            keyboard,
            layout,
            title: None,
            theme: Theme::default(),
        }
    }

    /// Set the block title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the theme
    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    fn key_style(&self, key: &crate::keyboard::KeyElement) -> Style {
        let pressed = self.keyboard.is_note_pressed(key.note);
        match (&key.kind, pressed) {
            (KeyKind::Black, true) => Style::default().fg(Color::White).bg(Color::Magenta).add_modifier(Modifier::BOLD),
            (KeyKind::Black, false) => Style::default().fg(Color::Gray).bg(self.theme.black_key()),
            (_, true) => Style::default().fg(Color::Black).bg(self.theme.pressed_key()),
            (KeyKind::White { .. }, false) => Style::default().fg(Color::Black).bg(self.theme.white_key()),
            (KeyKind::Drum { .. }, false) => Style::default().fg(Color::White).bg(self.theme.drum_pad()),
        }
    }

    fn key_label(&self, key: &crate::keyboard::KeyElement) -> Option<String> {
        match &key.kind {
            KeyKind::Drum { label } => Some(label.clone()),
            KeyKind::White { .. } if self.theme.show_note_names => Some(note_name(key.note)),
            _ => None,
        }
    }
}

impl<'a, H: NoteHandler> Widget for KeyboardWidget<'a, H> {
    fn render(self, _area: Rect, buf: &mut Buffer) {
        let area = self.layout.area.intersection(buf.area);
        if area.height < 4 || area.width < 8 {
            return;
        }

        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border()));
        if let Some(title) = &self.title {
            block = block.title(title.as_str());
        }
        let inner = block.inner(area);
        block.render(area, buf);

        // White keys and pads first, black keys over them
        for on_top in [false, true] {
            for placed in self.layout.keys.iter().filter(|k| k.on_top == on_top) {
                let rect = placed.rect.intersection(buf.area);
                let Some(key) = self.keyboard.key(placed.note) else {
                    continue;
                };
                if rect.is_empty() {
                    continue;
                }
                let style = self.key_style(key);
                buf.set_style(rect, style);
                if !on_top && !self.keyboard.is_drum_pad() && rect.width > 1 {
                    for row in rect.top()..rect.bottom() {
                        buf.set_string(rect.right() - 1, row, "│", style.fg(Color::DarkGray));
                    }
                }
                if let Some(label) = self.key_label(key) {
                    let row = if key.kind.is_black() { rect.top() } else { rect.bottom() - 1 };
                    let label: String = label.chars().take(rect.width as usize).collect();
                    buf.set_string(rect.x, row, label, style);
                }
            }
        }

        // Status line
        let playing = if self.keyboard.tracker().down_count() == 0 {
            "-".to_string()
        } else {
            self.keyboard
                .tracker()
                .down_notes()
                .map(note_name)
                .collect::<Vec<_>>()
                .join(" ")
        };
        if inner.height > 0 {
            let status = Line::from(vec![
                Span::styled("Playing: ", Style::default().fg(Color::DarkGray)),
                Span::styled(playing, Style::default().fg(self.theme.pressed_key()).add_modifier(Modifier::BOLD)),
            ]);
            buf.set_line(inner.x, inner.bottom() - 1, &status, inner.width);
        }
    }
}
