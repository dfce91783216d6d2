#[macro_use]
extern crate lazy_static;

pub mod compiler;
pub mod config;

pub mod vm;
pub mod interpreter;
pub mod opcodes_display;
pub mod opcodes_math;
pub mod opcodes_memory;

pub mod display_headless;
pub mod display_logging;
pub mod display_manager;
pub mod display_ratatui;
pub mod display_trait;
