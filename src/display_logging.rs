//! Logging wrapper for render backends
//!
//! Logs every rendering operation, numbered, before forwarding it.

use crate::display_trait::{DisplayError, ObjectValue, RenderBackend};
use log::{debug, info};

pub struct LoggingDisplay {
    inner: Box<dyn RenderBackend>,
    op_count: usize,
}

impl LoggingDisplay {
    pub fn new(inner: Box<dyn RenderBackend>) -> Self {
        info!("=== DISPLAY LOGGING STARTED ===");
        Self { inner, op_count: 0 }
    }

    pub fn op_count(&self) -> usize {
        self.op_count
    }

    fn log_op(&mut self, op: &str) {
        self.op_count += 1;
        info!("[OP {:04}] {}", self.op_count, op);
    }

    fn log_draw(&mut self, name: &str, object: &ObjectValue) {
        self.log_op(&format!(
            "{}({:?} at {},{} size {}x{})",
            name, object.kind, object.x, object.y, object.width, object.height
        ));
    }
}

impl RenderBackend for LoggingDisplay {
    fn draw_square(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.log_draw("draw_square", object);
        self.inner.draw_square(object)
    }

    fn draw_circle(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.log_draw("draw_circle", object);
        self.inner.draw_circle(object)
    }

    fn draw_image(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.log_draw("draw_image", object);
        self.inner.draw_image(object)
    }

    fn draw_text(&mut self, object: &ObjectValue) -> Result<(), DisplayError> {
        self.log_op(&format!("draw_text('{}')", object.message));
        self.inner.draw_text(object)
    }

    fn key_pressed(&mut self, key: &str) -> Result<bool, DisplayError> {
        let result = self.inner.key_pressed(key);
        self.log_op(&format!("key_pressed('{}') -> {:?}", key, result));
        result
    }

    fn intersects(&self, a: &ObjectValue, b: &ObjectValue) -> bool {
        let hit = self.inner.intersects(a, b);
        debug!("intersects({:?}, {:?}) -> {}", a.kind, b.kind, hit);
        hit
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.log_op("clear()");
        self.inner.clear()
    }

    fn update(&mut self) -> Result<(), DisplayError> {
        self.log_op("update()");
        self.inner.update()
    }

    fn print(&mut self, text: &str) -> Result<(), DisplayError> {
        let preview = text
            .chars()
            .take(50)
            .collect::<String>()
            .replace('\n', "\\n")
            .replace('\r', "\\r");
        self.log_op(&format!("print('{}')", preview));
        self.inner.print(text)
    }

    fn is_window_closed(&mut self) -> bool {
        self.inner.is_window_closed()
    }

    fn shutdown(&mut self) -> Result<(), DisplayError> {
        self.log_op("shutdown()");
        info!("=== DISPLAY LOGGING ENDED ({} ops) ===", self.op_count);
        self.inner.shutdown()
    }
}
