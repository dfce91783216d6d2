//! Rendering and input capability consumed by the VM
//!
//! The VM knows nothing about how drawing happens. It hands fully read
//! object records to a `RenderBackend`, which may be a terminal canvas, a
//! headless recorder for tests, or a logging wrapper around either.

use crate::compiler::types::ElementType;
use std::fmt;

/// A drawable object as read out of its attribute block
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    pub kind: ElementType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub size: f64,
    pub color: String,
    pub message: String,
    pub image: String,
}

impl ObjectValue {
    pub fn new(kind: ElementType) -> Self {
        ObjectValue {
            kind,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            size: 0.0,
            color: String::new(),
            message: String::new(),
            image: String::new(),
        }
    }

    /// Axis-aligned overlap of the two objects' x/y/width/height boxes
    pub fn overlaps(&self, other: &ObjectValue) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

impl fmt::Display for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (x, y, w, h, size) = (self.x, self.y, self.width, self.height, self.size);
        match self.kind {
            ElementType::Square | ElementType::Circle => write!(
                f,
                "{} = x: {:.6}, y: {:.6}, width: {:.6}, height {:.6}, color {}",
                self.kind_name(),
                x,
                y,
                w,
                h,
                self.color
            ),
            ElementType::Text => write!(
                f,
                "Text = x: {:.6}, y: {:.6}, size: {:.6}, message: {}, color: {}",
                x, y, size, self.message, self.color
            ),
            _ => write!(
                f,
                "{} = x: {:.6}, y: {:.6}, width: {:.6}, height: {:.6}, image: {}",
                self.kind_name(),
                x,
                y,
                w,
                h,
                self.image
            ),
        }
    }
}

impl ObjectValue {
    fn kind_name(&self) -> &'static str {
        match self.kind {
            ElementType::Square => "Square",
            ElementType::Circle => "Circle",
            ElementType::Text => "Text",
            ElementType::Background => "Background",
            _ => "Image",
        }
    }
}

/// Core trait for rendering backends
pub trait RenderBackend {
    fn draw_square(&mut self, object: &ObjectValue) -> Result<(), DisplayError>;

    fn draw_circle(&mut self, object: &ObjectValue) -> Result<(), DisplayError>;

    /// Also used for backgrounds
    fn draw_image(&mut self, object: &ObjectValue) -> Result<(), DisplayError>;

    fn draw_text(&mut self, object: &ObjectValue) -> Result<(), DisplayError>;

    /// Whether the named key (e.g. "Up", "Space", "a") is currently down
    fn key_pressed(&mut self, key: &str) -> Result<bool, DisplayError>;

    fn intersects(&self, a: &ObjectValue, b: &ObjectValue) -> bool {
        a.overlaps(b)
    }

    /// Drop everything drawn since the last update
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Present the current frame
    fn update(&mut self) -> Result<(), DisplayError>;

    /// Program output from `write`
    fn print(&mut self, text: &str) -> Result<(), DisplayError>;

    /// Polled after every instruction
    fn is_window_closed(&mut self) -> bool;

    /// Release terminal or window resources
    fn shutdown(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Display error type
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayError {
    pub message: String,
}

impl DisplayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Display error: {}", self.message)
    }
}

impl std::error::Error for DisplayError {}

impl From<std::io::Error> for DisplayError {
    fn from(error: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> ObjectValue {
        ObjectValue {
            x,
            y,
            width: w,
            height: h,
            ..ObjectValue::new(ElementType::Square)
        }
    }

    #[test]
    fn test_overlap() {
        assert!(rect(0.0, 0.0, 10.0, 10.0).overlaps(&rect(5.0, 5.0, 10.0, 10.0)));
        assert!(!rect(0.0, 0.0, 10.0, 10.0).overlaps(&rect(10.0, 0.0, 5.0, 5.0)));
        assert!(!rect(0.0, 0.0, 10.0, 10.0).overlaps(&rect(0.0, 20.0, 5.0, 5.0)));
    }
}
