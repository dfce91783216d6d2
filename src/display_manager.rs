//! Display manager that creates appropriate render backends
//!
//! This module is responsible for:
//! - Picking the backend for the requested mode
//! - Falling back from the terminal canvas to headless output
//! - Wrapping the result with operation logging when asked

use crate::display_headless::HeadlessDisplay;
use crate::display_logging::LoggingDisplay;
use crate::display_ratatui::RatatuiDisplay;
use crate::display_trait::{DisplayError, RenderBackend};
use serde::Deserialize;

use log::debug;

/// Display mode selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Terminal canvas when interactive, headless otherwise
    #[default]
    Auto,
    /// Force the terminal canvas
    Terminal,
    /// No drawing; `write` output goes to stdout
    Headless,
}

/// Display environment capabilities
#[derive(Debug)]
pub struct DisplayCapabilities {
    pub has_terminal: bool,
    pub is_interactive: bool,
}

impl DisplayCapabilities {
    /// Detect current environment capabilities
    pub fn detect() -> Self {
        Self {
            has_terminal: atty::is(atty::Stream::Stdout),
            is_interactive: atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout),
        }
    }

    pub fn supports_canvas(&self) -> bool {
        self.has_terminal && self.is_interactive
    }
}

/// Settings the backends are built from
#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub mode: DisplayMode,
    pub title: String,
    pub width: u16,
    pub height: u16,
    pub log_ops: bool,
}

/// Create a render backend for the given settings
pub fn create_display(settings: &DisplaySettings) -> Result<Box<dyn RenderBackend>, DisplayError> {
    let caps = DisplayCapabilities::detect();
    debug!("Display capabilities: {:?}", caps);
    debug!("Creating display with mode {:?}", settings.mode);

    let mut display: Box<dyn RenderBackend> = match settings.mode {
        DisplayMode::Auto => {
            if caps.supports_canvas() {
                match create_canvas_display(settings) {
                    Ok(display) => display,
                    Err(e) => {
                        debug!("Canvas failed ({}), falling back to headless", e);
                        Box::new(HeadlessDisplay::echoing())
                    }
                }
            } else {
                debug!("No interactive terminal, using headless display");
                Box::new(HeadlessDisplay::echoing())
            }
        }

        DisplayMode::Terminal => create_canvas_display(settings)?,

        DisplayMode::Headless => {
            debug!("Using headless display");
            Box::new(HeadlessDisplay::echoing())
        }
    };

    if settings.log_ops || std::env::var("DISPLAY_LOG").is_ok() {
        debug!("Wrapping display with logging");
        display = Box::new(LoggingDisplay::new(display));
    }

    Ok(display)
}

fn create_canvas_display(settings: &DisplaySettings) -> Result<Box<dyn RenderBackend>, DisplayError> {
    debug!(
        "Creating RatatuiDisplay '{}' {}x{}",
        settings.title, settings.width, settings.height
    );
    let display = RatatuiDisplay::new(&settings.title, settings.width, settings.height)
        .map_err(|e| DisplayError::new(format!("Failed to create RatatuiDisplay: {}", e)))?;
    Ok(Box::new(display))
}
