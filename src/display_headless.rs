//! Headless display implementation for testing and CI environments
//!
//! Collects program output and draw calls without displaying anything.
//! Key state is scripted by the caller.

use crate::display_trait::{DisplayError, ObjectValue, RenderBackend};
use log::debug;
use std::collections::HashSet;

/// One recorded rendering operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Square(ObjectValue),
    Circle(ObjectValue),
    Image(ObjectValue),
    Text(ObjectValue),
    Clear,
    Update,
}

#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    lines: Vec<String>,
    draw_calls: Vec<DrawCall>,
    pressed: HashSet<String>,
    frames: usize,
    polls: usize,
    close_after: Option<usize>,
    echo: bool,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write every printed line to stdout
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Start with the given keys held down
    pub fn with_keys(keys: &[&str]) -> Self {
        let mut display = Self::new();
        for key in keys {
            display.press(key);
        }
        display
    }

    pub fn press(&mut self, key: &str) {
        self.pressed.insert(key.to_string());
    }

    pub fn release(&mut self, key: &str) {
        self.pressed.remove(key);
    }

    /// Report the window as closed once it has been polled `polls` times
    pub fn close_after(&mut self, polls: usize) {
        self.close_after = Some(polls);
    }

    /// Get all output as a single string
    pub fn get_output(&self) -> String {
        self.lines.join("\n")
    }

    pub fn get_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    /// Number of `update` calls so far
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl RenderBackend for HeadlessDisplay {
    fn draw_square(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.draw_calls.push(DrawCall::Square(object.clone()));
        Ok(())
    }

    fn draw_circle(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.draw_calls.push(DrawCall::Circle(object.clone()));
        Ok(())
    }

    fn draw_image(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.draw_calls.push(DrawCall::Image(object.clone()));
        Ok(())
    }

    fn draw_text(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.draw_calls.push(DrawCall::Text(object.clone()));
        Ok(())
    }

    fn key_pressed(&mut self, key: &str) -> Result<bool, DisplayError> {
        Ok(self.pressed.contains(key))
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.draw_calls.push(DrawCall::Clear);
        Ok(())
    }

    fn update(&mut self) -> Result<(), DisplayError> {
        self.frames += 1;
        debug!("Headless: frame {}", self.frames);
        self.draw_calls.push(DrawCall::Update);
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<(), DisplayError> {
        if self.echo {
            println!("{}", text);
        }
        self.lines.push(text.to_string());
        Ok(())
    }

    fn is_window_closed(&mut self) -> bool {
        self.polls += 1;
        self.close_after.is_some_and(|limit| self.polls >= limit)
    }
}
