/// Arithmetic, comparison and logic operations
///
/// Int op Int stays Int; any Float operand makes the result Float.
/// Comparisons work on numbers of either kind and on chars. `&&` and `||`
/// evaluate both operands; the quads carry no short-circuit jumps.
use crate::compiler::address_space::Address;
use crate::compiler::quad::{Operation, Quadruple};
use crate::compiler::types::ElementType;
use crate::interpreter::{ExecutionResult, Interpreter, RuntimeError};
use crate::vm::Value;
use log::debug;

impl Interpreter<'_> {
    /// Handle math, comparison and logic opcodes
    pub fn execute_math_op(&mut self, quad: &Quadruple) -> Result<ExecutionResult, RuntimeError> {
        let left = self.vm.read(quad.operand1)?;
        let result = match quad.op {
            Operation::Not => {
                let value = self.expect_bool(quad.operand1, &left)?;
                Value::Bool(!value)
            }
            Operation::Sqrt => {
                let value = self.expect_number(quad.operand1, &left)?;
                Value::Float(value.sqrt())
            }
            op => {
                let right = self.vm.read(quad.operand2)?;
                self.binary(op, quad, left, right)?
            }
        };
        debug!("{} -> {} = {}", quad.op, quad.result, result);
        self.vm.write(quad.result, result)?;
        Ok(ExecutionResult::Continue)
    }

    fn binary(
        &self,
        op: Operation,
        quad: &Quadruple,
        left: Value,
        right: Value,
    ) -> Result<Value, RuntimeError> {
        match op {
            Operation::Add | Operation::Sub | Operation::Mult | Operation::Div => {
                self.arithmetic(op, quad, &left, &right)
            }
            Operation::Pow => {
                let base = self.expect_number(quad.operand1, &left)?;
                let exponent = self.expect_number(quad.operand2, &right)?;
                Ok(Value::Float(base.powf(exponent)))
            }
            Operation::Lt | Operation::Gt => {
                let ordering = match (&left, &right) {
                    (Value::Char(a), Value::Char(b)) => a.partial_cmp(b),
                    _ => {
                        let a = self.expect_number(quad.operand1, &left)?;
                        let b = self.expect_number(quad.operand2, &right)?;
                        a.partial_cmp(&b)
                    }
                };
                let wanted = if op == Operation::Lt {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Greater
                };
                Ok(Value::Bool(ordering == Some(wanted)))
            }
            Operation::Equal => Ok(Value::Bool(match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => a == b,
                (a, b) => match (a.as_number(), b.as_number()) {
                    (Some(x), Some(y)) => x == y,
                    _ => a == b,
                },
            })),
            Operation::And | Operation::Or => {
                let a = self.expect_bool(quad.operand1, &left)?;
                let b = self.expect_bool(quad.operand2, &right)?;
                Ok(Value::Bool(if op == Operation::And { a && b } else { a || b }))
            }
            other => Err(RuntimeError::InvalidInstruction(format!(
                "{} is not a math operation",
                other
            ))),
        }
    }

    fn arithmetic(
        &self,
        op: Operation,
        quad: &Quadruple,
        left: &Value,
        right: &Value,
    ) -> Result<Value, RuntimeError> {
        if let (Value::Int(a), Value::Int(b)) = (left, right) {
            let value = match op {
                Operation::Add => a.wrapping_add(*b),
                Operation::Sub => a.wrapping_sub(*b),
                Operation::Mult => a.wrapping_mul(*b),
                _ => {
                    if *b == 0 {
                        return Err(RuntimeError::DivisionByZero { ip: self.vm.ip });
                    }
                    a.wrapping_div(*b)
                }
            };
            return Ok(Value::Int(value));
        }

        let a = self.expect_number(quad.operand1, left)?;
        let b = self.expect_number(quad.operand2, right)?;
        let value = match op {
            Operation::Add => a + b,
            Operation::Sub => a - b,
            Operation::Mult => a * b,
            _ => {
                if b == 0.0 {
                    return Err(RuntimeError::DivisionByZero { ip: self.vm.ip });
                }
                a / b
            }
        };
        Ok(Value::Float(value))
    }

    fn expect_number(&self, address: Address, value: &Value) -> Result<f64, RuntimeError> {
        value.as_number().ok_or(RuntimeError::TypeCoercion {
            address,
            expected: ElementType::Float,
            found: value.kind(),
        })
    }

    fn expect_bool(&self, address: Address, value: &Value) -> Result<bool, RuntimeError> {
        value.as_bool().ok_or(RuntimeError::TypeCoercion {
            address,
            expected: ElementType::Bool,
            found: value.kind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::quad::QuadrupleProgram;
    use crate::display_headless::HeadlessDisplay;
    use crate::vm::VM;
    use test_log::test;

    fn eval(op: Operation, left: Value, right: Value) -> Result<Value, RuntimeError> {
        let mut display = HeadlessDisplay::new();
        let mut interp = Interpreter::new(VM::new(QuadrupleProgram::default())?, &mut display);
        // Temps: Float 20000, Char 21000, Bool 22000, Int 23000
        let slot = |v: &Value| match v {
            Value::Float(_) => 20000,
            Value::Char(_) => 21000,
            Value::Bool(_) => 22000,
            _ => 23000,
        };
        let (a, b) = (slot(&left), slot(&right) + 1);
        interp.vm.write(a, left)?;
        interp.vm.write(b, right)?;
        let result = match op {
            Operation::Lt | Operation::Gt | Operation::Equal | Operation::And | Operation::Or => 22500,
            _ => 20500,
        };
        interp.execute_math_op(&Quadruple::new(op, a, b, result))?;
        interp.vm.read(result)
    }

    #[test]
    fn test_int_and_float_arithmetic() {
        assert_eq!(eval(Operation::Add, Value::Int(2), Value::Float(0.5)).unwrap(), Value::Float(2.5));
        assert_eq!(eval(Operation::Div, Value::Float(7.0), Value::Int(2)).unwrap(), Value::Float(3.5));
        assert_eq!(eval(Operation::Mult, Value::Float(1.5), Value::Float(2.0)).unwrap(), Value::Float(3.0));
        assert_eq!(eval(Operation::Pow, Value::Int(2), Value::Int(10)).unwrap(), Value::Float(1024.0));
    }

    #[test]
    fn test_int_division_truncates() {
        let mut display = HeadlessDisplay::new();
        let mut interp = Interpreter::new(VM::new(QuadrupleProgram::default()).unwrap(), &mut display);
        interp.vm.write(23000, Value::Int(7)).unwrap();
        interp.vm.write(23001, Value::Int(2)).unwrap();
        interp
            .execute_math_op(&Quadruple::new(Operation::Div, 23000, 23001, 23002))
            .unwrap();
        assert_eq!(interp.vm.read(23002).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_division_by_zero_leaves_result_untouched() {
        let mut display = HeadlessDisplay::new();
        let mut interp = Interpreter::new(VM::new(QuadrupleProgram::default()).unwrap(), &mut display);
        interp.vm.write(23000, Value::Int(1)).unwrap();
        interp.vm.write(23002, Value::Int(5)).unwrap();
        let err = interp
            .execute_math_op(&Quadruple::new(Operation::Div, 23000, 23001, 23002))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::DivisionByZero { .. }));
        assert_eq!(interp.vm.read(23002).unwrap(), Value::Int(5));

        assert!(eval(Operation::Div, Value::Float(1.0), Value::Float(0.0)).is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval(Operation::Lt, Value::Int(1), Value::Float(1.5)).unwrap(), Value::Bool(true));
        assert_eq!(eval(Operation::Gt, Value::Char('b'), Value::Char('a')).unwrap(), Value::Bool(true));
        assert_eq!(eval(Operation::Equal, Value::Int(2), Value::Float(2.0)).unwrap(), Value::Bool(true));
        assert_eq!(eval(Operation::Equal, Value::Bool(true), Value::Bool(false)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_logic() {
        assert_eq!(eval(Operation::And, Value::Bool(true), Value::Bool(false)).unwrap(), Value::Bool(false));
        assert_eq!(eval(Operation::Or, Value::Bool(true), Value::Bool(false)).unwrap(), Value::Bool(true));
    }
}
