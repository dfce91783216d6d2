//! Display and input operations
//!
//! `write`, the drawing builtins and the input queries all route through
//! the interpreter's render backend.

use crate::compiler::address_space::Address;
use crate::compiler::quad::{Operation, Quadruple};
use crate::compiler::types::{attributes_for, Attribute, ElementType};
use crate::display_trait::ObjectValue;
use crate::interpreter::{ExecutionResult, Interpreter, RuntimeError};
use crate::vm::Value;
use log::debug;

impl Interpreter<'_> {
    pub fn execute_display_op(&mut self, quad: &Quadruple) -> Result<ExecutionResult, RuntimeError> {
        match quad.op {
            Operation::Print => {
                let text = match self.vm.read(quad.result)? {
                    Value::Object(_) => self.read_object(quad.result)?.to_string(),
                    value => value.to_string(),
                };
                self.display.print(&text)?;
            }
            Operation::Render => {
                let object = self.read_object(quad.operand1)?;
                debug!("render {:?} at ({}, {})", object.kind, object.x, object.y);
                match object.kind {
                    ElementType::Square => self.display.draw_square(&object)?,
                    ElementType::Circle => self.display.draw_circle(&object)?,
                    ElementType::Text => self.display.draw_text(&object)?,
                    _ => self.display.draw_image(&object)?,
                }
            }
            Operation::Clear => self.display.clear()?,
            Operation::Update => self.display.update()?,
            Operation::KeyPressed => {
                let value = self.vm.read(quad.operand1)?;
                let key = value.as_str().ok_or(RuntimeError::TypeCoercion {
                    address: quad.operand1,
                    expected: ElementType::String,
                    found: value.kind(),
                })?;
                let pressed = self.display.key_pressed(key)?;
                self.vm.write(quad.result, Value::Bool(pressed))?;
            }
            Operation::CheckCollision => {
                let a = self.read_object(quad.operand1)?;
                let b = self.read_object(quad.operand2)?;
                let hit = self.display.intersects(&a, &b);
                self.vm.write(quad.result, Value::Bool(hit))?;
            }
            other => {
                return Err(RuntimeError::InvalidInstruction(format!(
                    "{} is not a display operation",
                    other
                )))
            }
        }
        Ok(ExecutionResult::Continue)
    }

    /// Read the attribute block at `address` into an `ObjectValue`
    pub(crate) fn read_object(&self, address: Address) -> Result<ObjectValue, RuntimeError> {
        let kind = match self.vm.read(address)? {
            Value::Object(kind) => kind,
            other => {
                return Err(RuntimeError::TypeCoercion {
                    address,
                    expected: ElementType::Square,
                    found: other.kind(),
                })
            }
        };

        let mut object = ObjectValue::new(kind);
        for attribute in attributes_for(kind) {
            let value = self.vm.read(address + attribute.offset())?;
            let number = value.as_number().unwrap_or(0.0);
            let text = value.as_str().unwrap_or_default().to_string();
            match attribute {
                Attribute::X => object.x = number,
                Attribute::Y => object.y = number,
                Attribute::Width => object.width = number,
                Attribute::Height => object.height = number,
                Attribute::Size => object.size = number,
                Attribute::Color => object.color = text,
                Attribute::Message => object.message = text,
                Attribute::Image => object.image = text,
            }
        }
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::quad::QuadrupleProgram;
    use crate::display_headless::{DrawCall, HeadlessDisplay};
    use crate::vm::VM;
    use test_log::test;

    #[test]
    fn test_render_reads_attribute_block() {
        let mut display = HeadlessDisplay::new();
        let mut interp = Interpreter::new(VM::new(QuadrupleProgram::default()).unwrap(), &mut display);
        // circle at 6000: x offset 3, width offset 2, color offset 6
        interp.vm.write(6003, Value::Float(10.0)).unwrap();
        interp.vm.write(6002, Value::Int(4)).unwrap();
        interp.vm.write(6006, Value::Str("red".to_string())).unwrap();
        interp
            .execute_display_op(&Quadruple::new(Operation::Render, 6000, -1, -1))
            .unwrap();
        drop(interp);

        match &display.draw_calls()[0] {
            DrawCall::Circle(object) => {
                assert_eq!(object.x, 10.0);
                assert_eq!(object.width, 4.0);
                assert_eq!(object.color, "red");
            }
            other => panic!("unexpected draw call {:?}", other),
        }
    }

    #[test]
    fn test_key_pressed_and_collision() {
        let mut display = HeadlessDisplay::with_keys(&["Up"]);
        let mut interp = Interpreter::new(VM::new(QuadrupleProgram::default()).unwrap(), &mut display);
        interp.vm.write(24000, Value::Str("Up".to_string())).unwrap();
        interp
            .execute_display_op(&Quadruple::new(Operation::KeyPressed, 24000, -1, 22000))
            .unwrap();
        assert_eq!(interp.vm.read(22000).unwrap(), Value::Bool(true));

        // Two 10x10 squares at 5000 and 5009, the second shifted by 5
        for base in [5000, 5009] {
            interp.vm.write(base + 1, Value::Float(10.0)).unwrap();
            interp.vm.write(base + 2, Value::Float(10.0)).unwrap();
        }
        interp.vm.write(5012, Value::Float(5.0)).unwrap();
        interp
            .execute_display_op(&Quadruple::new(Operation::CheckCollision, 5000, 5009, 22001))
            .unwrap();
        assert_eq!(interp.vm.read(22001).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_print_formats_values() {
        let mut display = HeadlessDisplay::new();
        let mut interp = Interpreter::new(VM::new(QuadrupleProgram::default()).unwrap(), &mut display);
        interp.vm.write(20000, Value::Float(2.5)).unwrap();
        interp
            .execute_display_op(&Quadruple::new(Operation::Print, -1, -1, 20000))
            .unwrap();
        interp
            .execute_display_op(&Quadruple::new(Operation::Print, -1, -1, 21000))
            .unwrap();
        drop(interp);
        assert_eq!(display.get_output(), "2.500000\na");
    }

    #[test]
    fn test_print_formats_objects() {
        let mut display = HeadlessDisplay::new();
        let mut interp = Interpreter::new(VM::new(QuadrupleProgram::default()).unwrap(), &mut display);
        // square at 5000, text at 8000
        interp.vm.write(5003, Value::Float(1.5)).unwrap();
        interp.vm.write(5006, Value::Str("red".to_string())).unwrap();
        interp.vm.write(8005, Value::Float(12.0)).unwrap();
        interp.vm.write(8007, Value::Str("hi".to_string())).unwrap();
        for address in [5000, 8000] {
            interp
                .execute_display_op(&Quadruple::new(Operation::Print, -1, -1, address))
                .unwrap();
        }
        drop(interp);
        assert_eq!(
            display.get_lines(),
            vec![
                "Square = x: 1.500000, y: 0.000000, width: 0.000000, height 0.000000, color red",
                "Text = x: 0.000000, y: 0.000000, size: 12.000000, message: hi, color: -",
            ]
        );
    }
}
