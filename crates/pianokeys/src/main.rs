//! piano-keys - On-screen piano keyboard in the terminal
//!
//! Click or drag across the keys with the mouse to play notes over JACK MIDI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event, KeyCode,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Clear};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::time::Duration;

use pianokeys::{
    config::{Config, KeyboardMode},
    input::Uncontrolled,
    keyboard::{note_name, Keyboard, KeyboardBuilder},
    midi::{is_jack_running, DummyMidiOutput, JackMidiOutput, MidiNoteHandler, MidiOutput},
    terminal::MouseAdapter,
    ui::{KeyboardLayout, KeyboardWidget},
};

#[derive(Parser)]
#[command(name = "piano-keys")]
#[command(author, version, about = "On-screen piano keyboard for the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path (default: ~/.config/piano-keys/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show drum pads instead of piano keys
    #[arg(long)]
    drums: bool,

    /// Lowest note (0-127)
    #[arg(long)]
    low: Option<u8>,

    /// Highest note (0-127)
    #[arg(long)]
    high: Option<u8>,

    /// MIDI channel (0-15)
    #[arg(long)]
    channel: Option<u8>,

    /// Velocity (1-127)
    #[arg(long)]
    velocity: Option<u8>,

    /// Keyboard height in rows
    #[arg(long)]
    height: Option<u16>,

    /// JACK client name
    #[arg(long)]
    client_name: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file
    Init,
    /// Show the configuration file path
    ConfigPath,
    /// List available JACK MIDI ports
    ListPorts,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init) => {
            let path = Config::create_default_config_file()?;
            println!("Created default config at: {}", path.display());
            return Ok(());
        }
        Some(Commands::ConfigPath) => {
            let path = Config::config_path()?;
            println!("{}", path.display());
            return Ok(());
        }
        Some(Commands::ListPorts) => {
            if !is_jack_running() {
                println!("JACK is not running");
                return Ok(());
            }
            let ports = pianokeys::midi::list_jack_midi_ports();
            if ports.is_empty() {
                println!("No JACK MIDI input ports found");
            } else {
                println!("Available JACK MIDI input ports:");
                for port in ports {
                    println!("  {}", port);
                }
            }
            return Ok(());
        }
        None => {}
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_or_default(),
    };

    // Apply CLI overrides
    if cli.drums {
        config.keyboard.mode = KeyboardMode::Drums;
    }
    if let Some(low) = cli.low {
        config.keyboard.note_low = low;
    }
    if let Some(high) = cli.high {
        config.keyboard.note_high = high;
    }
    if let Some(channel) = cli.channel {
        config.keyboard.channel = channel;
    }
    if let Some(velocity) = cli.velocity {
        config.keyboard.velocity = velocity;
    }
    if let Some(height) = cli.height {
        config.keyboard.height = height;
    }
    if let Some(name) = cli.client_name {
        config.midi.client_name = name;
    }

    let output: Box<dyn MidiOutput> = match JackMidiOutput::from_settings(&config.midi) {
        Ok(output) => {
            log::info!("JACK MIDI output created: {}", output.port_name());
            Box::new(output)
        }
        Err(e) => {
            log::warn!("MIDI output disabled: {}", e);
            Box::new(DummyMidiOutput)
        }
    };
    let handler = MidiNoteHandler::new(output);

    let keyboard_config = config.to_keyboard_config();
    let keyboard = match config.keyboard.mode {
        KeyboardMode::Piano => KeyboardBuilder::piano(keyboard_config).build(handler)?,
        KeyboardMode::Drums => {
            let labels = config.clone();
            KeyboardBuilder::drum_pad(keyboard_config, move |note| labels.drum_label(note)).build(handler)?
        }
    };

    run_tui(keyboard, &config)
}

fn run_tui(mut keyboard: Keyboard<MidiNoteHandler>, config: &Config) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut keyboard, config);

    // Nothing may keep sounding once the UI is gone
    keyboard.release_all();
    let channel = keyboard.config().channel;
    keyboard.handler().all_notes_off(channel);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableFocusChange,
        DisableMouseCapture
    )?;

    result
}

fn title(keyboard: &Keyboard<MidiNoteHandler>) -> String {
    let cfg = keyboard.config();
    let kind = if keyboard.is_drum_pad() { "Drums" } else { "Piano" };
    format!(
        " {} [{}..{}] ch {} -> {} ",
        kind,
        note_name(cfg.note_low),
        note_name(cfg.note_high),
        cfg.channel + 1,
        keyboard.handler().port_name()
    )
}

fn keyboard_area(frame_area: Rect, keyboard: &Keyboard<MidiNoteHandler>) -> Rect {
    // Border, keys, status line
    let height = keyboard.config().height.saturating_add(3).min(frame_area.height);
    Rect {
        y: frame_area.y + (frame_area.height - height) / 2,
        height,
        ..frame_area
    }
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    keyboard: &mut Keyboard<MidiNoteHandler>,
    config: &Config,
) -> Result<()> {
    let mut mouse = MouseAdapter::new();
    let mut control = Uncontrolled;
    let mut layout = KeyboardLayout::compute(keyboard, Rect::default());

    loop {
        terminal.draw(|frame| {
            let area = frame.area();
            frame.render_widget(Clear, area);
            let bg_block = Block::default().style(Style::default().bg(Color::Rgb(20, 20, 30)));
            frame.render_widget(bg_block, area);

            layout = KeyboardLayout::compute(keyboard, keyboard_area(area, keyboard));
            let widget = KeyboardWidget::new(keyboard, &layout)
                .title(title(keyboard))
                .theme(config.theme.clone());
            frame.render_widget(widget, area);
        })?;

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }

        match event::read()? {
            Event::Mouse(mouse_event) => {
                for input in mouse.translate(&mouse_event, &layout) {
                    keyboard.handle_event(&input, &layout, &mut control);
                }
            }
            Event::FocusLost => {
                for input in mouse.leave() {
                    keyboard.handle_event(&input, &layout, &mut control);
                }
                keyboard.release_all();
            }
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                _ => {}
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pianokeys::keyboard::{KeyboardConfig, MAX_HEIGHT};

    #[test]
    fn test_keyboard_area_fits_frame() {
        let config = KeyboardConfig {
            height: MAX_HEIGHT,
            ..KeyboardConfig::default()
        };
        let handler = MidiNoteHandler::new(Box::new(DummyMidiOutput));
        let keyboard = KeyboardBuilder::piano(config).build(handler).unwrap();

        let area = keyboard_area(Rect::new(0, 0, 80, 24), &keyboard);
        assert_eq!(area, Rect::new(0, 0, 80, 24));
    }
}
