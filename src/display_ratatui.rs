//! Ratatui canvas display for drawing programs
//!
//! Rendering happens on a dedicated thread fed through a channel. Shapes
//! accumulate between `clear` and `update`; `update` presents them. Key
//! presses are collected by the same thread and shared with the VM.

use crate::compiler::types::ElementType;
use crate::display_trait::{DisplayError, ObjectValue, RenderBackend};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    symbols::Marker,
    text::Line,
    widgets::{
        canvas::{Canvas, Circle, Rectangle},
        Block, Borders, Paragraph,
    },
    Terminal,
};
use std::collections::HashMap;
use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Terminals report presses, not releases; a key counts as held this long
const KEY_HOLD: Duration = Duration::from_millis(150);
const OUTPUT_LINES: u16 = 5;

/// Commands sent to the display thread
#[derive(Debug)]
enum DisplayCommand {
    Draw(ObjectValue),
    Clear,
    Update,
    Print(String),
    Quit,
}

type KeyTimes = Arc<Mutex<HashMap<String, Instant>>>;

pub struct RatatuiDisplay {
    tx: Sender<DisplayCommand>,
    display_thread: Option<thread::JoinHandle<()>>,
    keys: KeyTimes,
    closed: Arc<AtomicBool>,
}

/// Internal state owned by the display thread
struct CanvasState {
    title: String,
    width: f64,
    height: f64,
    pending: Vec<ObjectValue>,
    frame: Vec<ObjectValue>,
    output: Vec<String>,
}

impl RatatuiDisplay {
    pub fn new(title: &str, width: u16, height: u16) -> Result<Self, String> {
        let (tx, rx) = mpsc::channel();
        let keys: KeyTimes = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let state = CanvasState {
            title: title.to_string(),
            width: f64::from(width.max(1)),
            height: f64::from(height.max(1)),
            pending: Vec::new(),
            frame: Vec::new(),
            output: Vec::new(),
        };
        let thread_keys = Arc::clone(&keys);
        let thread_closed = Arc::clone(&closed);
        let display_thread = thread::Builder::new()
            .name("doodle-display".to_string())
            .spawn(move || {
                if let Err(e) = run_display_thread(rx, state, thread_keys, &thread_closed) {
                    eprintln!("Display thread error: {e}");
                }
                thread_closed.store(true, Ordering::SeqCst);
            })
            .map_err(|e| format!("Failed to spawn display thread: {e}"))?;

        Ok(RatatuiDisplay {
            tx,
            display_thread: Some(display_thread),
            keys,
            closed,
        })
    }

    fn send_command(&self, cmd: DisplayCommand) -> Result<(), DisplayError> {
        self.tx
            .send(cmd)
            .map_err(|e| DisplayError::new(format!("Failed to send display command: {e}")))
    }

    fn stop(&mut self) {
        let _ = self.tx.send(DisplayCommand::Quit);
        if let Some(thread) = self.display_thread.take() {
            let _ = thread.join();
        }
    }
}

impl RenderBackend for RatatuiDisplay {
    fn draw_square(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.send_command(DisplayCommand::Draw(object.clone()))
    }

    fn draw_circle(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.send_command(DisplayCommand::Draw(object.clone()))
    }

    fn draw_image(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.send_command(DisplayCommand::Draw(object.clone()))
    }

    fn draw_text(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.send_command(DisplayCommand::Draw(object.clone()))
    }

    fn key_pressed(&mut self, key: &str) -> Result<bool, DisplayError> {
        let keys = self
            .keys
            .lock()
            .map_err(|_| DisplayError::new("key state lock poisoned"))?;
        Ok(keys
            .get(key)
            .is_some_and(|pressed_at| pressed_at.elapsed() < KEY_HOLD))
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.send_command(DisplayCommand::Clear)
    }

    fn update(&mut self) -> Result<(), DisplayError> {
        self.send_command(DisplayCommand::Update)
    }

    fn print(&mut self, text: &str) -> Result<(), DisplayError> {
        self.send_command(DisplayCommand::Print(text.to_string()))
    }

    fn is_window_closed(&mut self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn shutdown(&mut self) -> Result<(), DisplayError> {
        debug!("Shutting down canvas display");
        self.stop();
        Ok(())
    }
}

impl Drop for RatatuiDisplay {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_display_thread(
    rx: Receiver<DisplayCommand>,
    mut state: CanvasState,
    keys: KeyTimes,
    closed: &AtomicBool,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, &rx, &mut state, &keys, closed);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Output printed while the canvas was up would otherwise be lost
    for line in &state.output {
        println!("{}", line);
    }
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    rx: &Receiver<DisplayCommand>,
    state: &mut CanvasState,
    keys: &KeyTimes,
    closed: &AtomicBool,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                let ctrl_c = key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                if key.code == KeyCode::Esc || ctrl_c {
                    debug!("Window closed by user");
                    closed.store(true, Ordering::SeqCst);
                    continue;
                }
                if let Some(name) = key_name(key.code) {
                    if let Ok(mut held) = keys.lock() {
                        held.insert(name, Instant::now());
                    }
                }
            }
        }

        match rx.recv_timeout(Duration::from_millis(10)) {
            Ok(DisplayCommand::Draw(object)) => state.pending.push(object),
            Ok(DisplayCommand::Clear) => state.pending.clear(),
            Ok(DisplayCommand::Update) => {
                state.frame = state.pending.clone();
                render(terminal, state)?;
            }
            Ok(DisplayCommand::Print(text)) => {
                state.output.push(text);
                render(terminal, state)?;
            }
            Ok(DisplayCommand::Quit) | Err(RecvTimeoutError::Disconnected) => return Ok(()),
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

/// Key names as the `keyPressed` builtin spells them
fn key_name(code: KeyCode) -> Option<String> {
    let name = match code {
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        _ => return None,
    };
    Some(name)
}

fn parse_color(name: &str) -> Color {
    name.parse::<Color>().unwrap_or(Color::White)
}

fn render(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state: &CanvasState,
) -> io::Result<()> {
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(OUTPUT_LINES + 2)])
            .split(f.size());

        let height = state.height;
        let canvas = Canvas::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(state.title.clone()),
            )
            .marker(Marker::Braille)
            .x_bounds([0.0, state.width])
            .y_bounds([0.0, height])
            .paint(|ctx| {
                for object in &state.frame {
                    // Program coordinates grow downwards
                    let top = height - object.y;
                    let color = parse_color(&object.color);
                    match object.kind {
                        ElementType::Square => ctx.draw(&Rectangle {
                            x: object.x,
                            y: top - object.height,
                            width: object.width,
                            height: object.height,
                            color,
                        }),
                        ElementType::Circle => ctx.draw(&Circle {
                            x: object.x + object.width / 2.0,
                            y: top - object.height / 2.0,
                            radius: object.width.min(object.height) / 2.0,
                            color,
                        }),
                        ElementType::Text => ctx.print(
                            object.x,
                            top,
                            Line::styled(object.message.clone(), Style::default().fg(color)),
                        ),
                        _ => {
                            ctx.draw(&Rectangle {
                                x: object.x,
                                y: top - object.height,
                                width: object.width,
                                height: object.height,
                                color: Color::DarkGray,
                            });
                            ctx.print(object.x, top, Line::from(object.image.clone()));
                        }
                    }
                }
            });
        f.render_widget(canvas, chunks[0]);

        let skip = state.output.len().saturating_sub(usize::from(OUTPUT_LINES));
        let lines: Vec<Line> = state.output[skip..]
            .iter()
            .map(|line| Line::from(line.clone()))
            .collect();
        let output = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("output"));
        f.render_widget(output, chunks[1]);
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_key_names() {
        assert_eq!(key_name(KeyCode::Up).as_deref(), Some("Up"));
        assert_eq!(key_name(KeyCode::Char(' ')).as_deref(), Some("Space"));
        assert_eq!(key_name(KeyCode::Char('w')).as_deref(), Some("w"));
        assert_eq!(key_name(KeyCode::F(1)), None);
    }

    #[test]
    fn test_color_names() {
        assert_eq!(parse_color("red"), Color::Red);
        assert_eq!(parse_color("#ff0000"), Color::Rgb(255, 0, 0));
        assert_eq!(parse_color("not a color"), Color::White);
    }
}
