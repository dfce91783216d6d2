/// Memory operations: moves, indexed access and storage initialisation
///
/// `AddAddr` and `CheckBound` carry literal operands (a base address and a
/// list size); everything else names memory slots. Object values are copied
/// as whole attribute blocks.
use crate::compiler::address_space::Address;
use crate::compiler::quad::{Operation, Quadruple};
use crate::compiler::types::{ElementType, OBJECT_BLOCK_SIZE};
use crate::interpreter::{ExecutionResult, Interpreter, RuntimeError};
use crate::vm::{Memory, Value};
use log::debug;

impl Interpreter<'_> {
    pub fn execute_memory_op(&mut self, quad: &Quadruple) -> Result<ExecutionResult, RuntimeError> {
        match quad.op {
            Operation::Assign => {
                self.vm.memory.copy(quad.operand1, quad.result)?;
            }
            Operation::AssignIndex => {
                let target = self.vm.read_pointer(quad.result)?;
                debug!("assign_index: {} -> [{}]", quad.operand1, target);
                self.vm.memory.copy(quad.operand1, target)?;
            }
            Operation::AssignIndexInv => {
                let source = self.vm.read_pointer(quad.operand1)?;
                debug!("assign_index_inv: [{}] -> {}", source, quad.result);
                self.vm.memory.copy(source, quad.result)?;
            }
            Operation::AddAddr => {
                let index = self.read_index(quad.operand2)?;
                let location = Memory::locate(quad.operand1)?;
                let stride = if location.element.is_object() {
                    i64::from(OBJECT_BLOCK_SIZE)
                } else {
                    1
                };
                let pointer = i64::from(quad.operand1) + index * stride;
                self.vm.write(quad.result, Value::Int(pointer))?;
            }
            Operation::CheckBound => {
                let index = self.read_index(quad.result)?;
                let size = quad.operand1;
                // Both bounds: a negative index would land in whatever
                // variable precedes the list in its segment.
                if index < 0 || index >= i64::from(size) {
                    return Err(RuntimeError::IndexOutOfBounds { index, size });
                }
            }
            Operation::Init => {
                let element = ElementType::from_code_value(quad.result).ok_or_else(|| {
                    RuntimeError::InvalidInstruction(format!("unknown type code {}", quad.result))
                })?;
                let count = usize::try_from(quad.operand2).unwrap_or(1).max(1);
                debug!("init: {} x{} at {}", element, count, quad.operand1);
                self.vm
                    .memory
                    .reset(quad.operand1, count * element.slot_width())?;
            }
            other => {
                return Err(RuntimeError::InvalidInstruction(format!(
                    "{} is not a memory operation",
                    other
                )))
            }
        }
        Ok(ExecutionResult::Continue)
    }

    fn read_index(&self, address: Address) -> Result<i64, RuntimeError> {
        let value = self.vm.read(address)?;
        value.as_int().ok_or(RuntimeError::TypeCoercion {
            address,
            expected: ElementType::Int,
            found: value.kind(),
        })
    }
}
