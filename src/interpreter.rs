use crate::compiler::address_space::{Address, UNUSED_ADDRESS};
use crate::compiler::quad::{Operation, Quadruple, QuadrupleProgram};
use crate::compiler::types::ElementType;
use crate::display_trait::{DisplayError, RenderBackend};
use crate::vm::{is_block_base, slot_kind, ActivationRecord, Memory, VM};
use log::{debug, info};
use std::fmt;

/// Result of executing an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Fall through to the next quad
    Continue,
    /// Continue at the given quad
    Jump(usize),
    /// The entry function returned
    Halt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    DivisionByZero { ip: usize },
    IndexOutOfBounds { index: i64, size: i32 },
    InvalidAddress(Address),
    TypeCoercion {
        address: Address,
        expected: ElementType,
        found: ElementType,
    },
    InvalidInstruction(String),
    Display(DisplayError),
    StepLimitExceeded(u64),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuntimeError::DivisionByZero { ip } => write!(f, "Division by zero at quad {}", ip),
            RuntimeError::IndexOutOfBounds { index, size } => {
                write!(f, "Index {} out of bounds for list of size {}", index, size)
            }
            RuntimeError::InvalidAddress(address) => write!(f, "Invalid address {}", address),
            RuntimeError::TypeCoercion {
                address,
                expected,
                found,
            } => write!(
                f,
                "Cannot store {} at address {} (expected {})",
                found, address, expected
            ),
            RuntimeError::InvalidInstruction(msg) => write!(f, "Invalid instruction: {}", msg),
            RuntimeError::Display(e) => write!(f, "{}", e),
            RuntimeError::StepLimitExceeded(limit) => {
                write!(f, "Step limit of {} instructions exceeded", limit)
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<DisplayError> for RuntimeError {
    fn from(error: DisplayError) -> Self {
        RuntimeError::Display(error)
    }
}

/// Drives a `VM` through its quads against a render backend
pub struct Interpreter<'d> {
    pub vm: VM,
    pub(crate) display: &'d mut dyn RenderBackend,
    max_steps: Option<u64>,
    instruction_count: u64,
}

impl<'d> Interpreter<'d> {
    pub fn new(vm: VM, display: &'d mut dyn RenderBackend) -> Self {
        Interpreter {
            vm,
            display,
            max_steps: None,
            instruction_count: 0,
        }
    }

    /// Load a compiled program into a fresh VM
    pub fn load(program: QuadrupleProgram, display: &'d mut dyn RenderBackend) -> Result<Self, RuntimeError> {
        Ok(Self::new(VM::new(program)?, display))
    }

    /// Abort with `StepLimitExceeded` after this many instructions
    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    pub fn run(&mut self) -> Result<(), RuntimeError> {
        info!("Starting doodle VM: {} quads", self.vm.quads.len());

        while let Some(quad) = self.vm.quads.get(self.vm.ip).copied() {
            if let Some(limit) = self.max_steps {
                if self.instruction_count >= limit {
                    return Err(RuntimeError::StepLimitExceeded(limit));
                }
            }
            self.instruction_count += 1;

            debug!("[{:4}] {}", self.vm.ip, quad);
            match self.execute_instruction(&quad)? {
                ExecutionResult::Continue => self.vm.ip += 1,
                ExecutionResult::Jump(target) => self.vm.ip = target,
                ExecutionResult::Halt => {
                    self.vm.ip = self.vm.quads.len();
                    break;
                }
            }

            if self.display.is_window_closed() {
                info!("Window closed, stopping at quad {}", self.vm.ip);
                break;
            }
        }

        info!("VM finished after {} instructions", self.instruction_count);
        Ok(())
    }

    pub fn execute_instruction(&mut self, quad: &Quadruple) -> Result<ExecutionResult, RuntimeError> {
        match quad.op {
            Operation::Goto | Operation::GotoT | Operation::GotoF => self.execute_branch(quad),

            Operation::Add
            | Operation::Sub
            | Operation::Mult
            | Operation::Div
            | Operation::Lt
            | Operation::Gt
            | Operation::Equal
            | Operation::And
            | Operation::Or
            | Operation::Not
            | Operation::Pow
            | Operation::Sqrt => self.execute_math_op(quad),

            Operation::Assign
            | Operation::AssignIndex
            | Operation::AssignIndexInv
            | Operation::AddAddr
            | Operation::CheckBound
            | Operation::Init => self.execute_memory_op(quad),

            Operation::Era => {
                let footprint = usize::try_from(quad.operand1).unwrap_or(0);
                debug!("era: footprint {}", footprint);
                self.vm.pending.push(ActivationRecord::new(footprint));
                Ok(ExecutionResult::Continue)
            }
            Operation::Param => self.do_param(quad.operand1, quad.operand2),
            Operation::Call => self.do_call(quad.operand1),
            Operation::Ret => self.do_return(quad.result),

            Operation::Print
            | Operation::Render
            | Operation::Clear
            | Operation::Update
            | Operation::KeyPressed
            | Operation::CheckCollision => self.execute_display_op(quad),
        }
    }

    fn execute_branch(&mut self, quad: &Quadruple) -> Result<ExecutionResult, RuntimeError> {
        let target = jump_target(quad.result)?;
        let taken = match quad.op {
            Operation::Goto => true,
            Operation::GotoT => self.read_bool(quad.operand1)?,
            _ => !self.read_bool(quad.operand1)?,
        };
        Ok(if taken {
            ExecutionResult::Jump(target)
        } else {
            ExecutionResult::Continue
        })
    }

    /// Stage one argument on the innermost pending record
    pub(crate) fn do_param(&mut self, address: Address, size: Address) -> Result<ExecutionResult, RuntimeError> {
        let location = Memory::locate(address)?;
        let kind = slot_kind(&location);
        let width = if is_block_base(&location) {
            kind.slot_width()
        } else {
            1
        };
        let count = if size > 0 { size as usize } else { 1 };
        let values = self.vm.memory.read_block(address, width * count)?;

        let record = self.vm.pending.last_mut().ok_or_else(|| {
            RuntimeError::InvalidInstruction("Param without a pending Era".to_string())
        })?;
        debug!("param: {} x{} {} from {}", kind, count, width, address);
        record.stage_param(kind, values)?;
        Ok(ExecutionResult::Continue)
    }

    /// Suspend the caller's frame and enter the pending record
    pub(crate) fn do_call(&mut self, target: Address) -> Result<ExecutionResult, RuntimeError> {
        let target = jump_target(target)?;
        let mut callee = self.vm.pending.pop().ok_or_else(|| {
            RuntimeError::InvalidInstruction("Call without a pending Era".to_string())
        })?;

        let frame = self.vm.memory.snapshot_frame();
        let caller = self.vm.call_stack.last_mut().ok_or_else(|| {
            RuntimeError::InvalidInstruction("Call with an empty call stack".to_string())
        })?;
        caller.suspend(frame);

        for (address, values) in callee.take_params() {
            self.vm.memory.write_block(address, values)?;
        }
        callee.retip = self.vm.ip;
        debug!(
            "call: {} -> {} (depth {})",
            self.vm.ip,
            target,
            self.vm.call_stack.len() + 1
        );
        self.vm.call_stack.push(callee);
        Ok(ExecutionResult::Jump(target))
    }

    /// Leave the active record, handing `value` to the caller's `Call` result
    pub(crate) fn do_return(&mut self, value: Address) -> Result<ExecutionResult, RuntimeError> {
        let callee = self.vm.call_stack.pop().ok_or_else(|| {
            RuntimeError::InvalidInstruction("Ret with an empty call stack".to_string())
        })?;
        let Some(caller) = self.vm.call_stack.last_mut() else {
            debug!("ret: entry function finished");
            return Ok(ExecutionResult::Halt);
        };

        let values = if value == UNUSED_ADDRESS {
            None
        } else {
            let width = self.vm.memory.width_at(value)?;
            Some(self.vm.memory.read_block(value, width)?)
        };

        let frame = caller.resume().ok_or_else(|| {
            RuntimeError::InvalidInstruction("caller frame missing on return".to_string())
        })?;
        self.vm.memory.restore_frame(frame);

        let call_site = self
            .vm
            .quads
            .get(callee.retip)
            .copied()
            .ok_or(RuntimeError::InvalidAddress(callee.retip as Address))?;
        if let Some(values) = values {
            if call_site.result != UNUSED_ADDRESS {
                self.vm.memory.write_block(call_site.result, values)?;
            }
        }
        debug!("ret: back to {}", callee.retip + 1);
        Ok(ExecutionResult::Jump(callee.retip + 1))
    }

    pub(crate) fn read_bool(&self, address: Address) -> Result<bool, RuntimeError> {
        let value = self.vm.read(address)?;
        value.as_bool().ok_or(RuntimeError::TypeCoercion {
            address,
            expected: ElementType::Bool,
            found: value.kind(),
        })
    }
}

fn jump_target(address: Address) -> Result<usize, RuntimeError> {
    usize::try_from(address).map_err(|_| RuntimeError::InvalidAddress(address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::address_space::AddressSpace;
    use crate::compiler::types::Type;
    use crate::display_headless::HeadlessDisplay;
    use crate::vm::Value;
    use test_log::test;

    fn q(op: Operation, a: Address, b: Address, r: Address) -> Quadruple {
        Quadruple::new(op, a, b, r)
    }

    fn program(quads: Vec<Quadruple>, literals: &[(&str, Type)]) -> QuadrupleProgram {
        let mut space = AddressSpace::new();
        for (text, ty) in literals {
            space.add_constant(text, ty).unwrap();
        }
        QuadrupleProgram {
            quads,
            constants: space.constants(),
        }
    }

    #[test]
    fn test_straight_line_arithmetic() {
        // 33001 = 2, 33002 = 3
        let prog = program(
            vec![
                q(Operation::Goto, -1, -1, 1),
                q(Operation::Init, 13000, 1, 4),
                q(Operation::Add, 33001, 33002, 23000),
                q(Operation::Assign, 23000, -1, 13000),
                q(Operation::Print, -1, -1, 13000),
                q(Operation::Ret, -1, -1, -1),
            ],
            &[("2", Type::int()), ("3", Type::int())],
        );
        let mut display = HeadlessDisplay::new();
        let mut interp = Interpreter::load(prog, &mut display).unwrap();
        interp.run().unwrap();
        assert_eq!(interp.instruction_count(), 6);
        assert_eq!(display.get_output(), "5");
    }

    #[test]
    fn test_call_restores_caller_temps() {
        // main: t = 7; f(); print t      f: writes its own temp 23000
        let prog = program(
            vec![
                q(Operation::Goto, -1, -1, 1),
                q(Operation::Assign, 33001, -1, 23000),
                q(Operation::Era, 0, -1, -1),
                q(Operation::Call, 6, -1, -1),
                q(Operation::Print, -1, -1, 23000),
                q(Operation::Ret, -1, -1, -1),
                q(Operation::Assign, 33002, -1, 23000),
                q(Operation::Ret, -1, -1, -1),
            ],
            &[("7", Type::int()), ("9", Type::int())],
        );
        let mut display = HeadlessDisplay::new();
        Interpreter::load(prog, &mut display).unwrap().run().unwrap();
        assert_eq!(display.get_output(), "7");
    }

    #[test]
    fn test_return_value_lands_in_call_result() {
        // f(int p) returns p + p
        let prog = program(
            vec![
                q(Operation::Goto, -1, -1, 1),
                q(Operation::Era, 1, -1, -1),
                q(Operation::Param, 33001, -1, -1),
                q(Operation::Call, 6, -1, 23000),
                q(Operation::Print, -1, -1, 23000),
                q(Operation::Ret, -1, -1, -1),
                q(Operation::Add, 13000, 13000, 23000),
                q(Operation::Ret, -1, -1, 23000),
                q(Operation::Ret, -1, -1, 33000),
            ],
            &[("21", Type::int())],
        );
        let mut display = HeadlessDisplay::new();
        Interpreter::load(prog, &mut display).unwrap().run().unwrap();
        assert_eq!(display.get_output(), "42");
    }

    #[test]
    fn test_step_limit() {
        let prog = program(vec![q(Operation::Goto, -1, -1, 0)], &[]);
        let mut display = HeadlessDisplay::new();
        let err = Interpreter::load(prog, &mut display)
            .unwrap()
            .with_max_steps(Some(100))
            .run()
            .unwrap_err();
        assert_eq!(err, RuntimeError::StepLimitExceeded(100));
    }

    #[test]
    fn test_window_close_stops_loop() {
        let prog = program(vec![q(Operation::Goto, -1, -1, 0)], &[]);
        let mut display = HeadlessDisplay::new();
        display.close_after(5);
        let mut interp = Interpreter::load(prog, &mut display).unwrap();
        interp.run().unwrap();
        assert_eq!(interp.instruction_count(), 5);
    }

    #[test]
    fn test_param_without_era_is_rejected() {
        let prog = program(vec![q(Operation::Param, 33000, -1, -1)], &[]);
        let mut display = HeadlessDisplay::new();
        let err = Interpreter::load(prog, &mut display).unwrap().run().unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidInstruction(_)));
    }

    #[test]
    fn test_root_return_halts() {
        let prog = program(
            vec![
                q(Operation::Ret, -1, -1, -1),
                q(Operation::Print, -1, -1, 33000),
            ],
            &[],
        );
        let mut display = HeadlessDisplay::new();
        let mut interp = Interpreter::load(prog, &mut display).unwrap();
        interp.run().unwrap();
        assert_eq!(interp.vm.ip, 2);
        assert_eq!(interp.vm.read(33000).unwrap(), Value::Int(0));
        drop(interp);
        assert_eq!(display.get_output(), "");
    }
}
