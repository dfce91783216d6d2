// Quadruples
// The four-address instruction format shared by the code generator and the VM

use crate::compiler::address_space::{Address, ConstantEntry, UNUSED_ADDRESS};
use std::fmt;

macro_rules! operations {
    ($($name:ident),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Operation {
            $($name),*
        }

        impl Operation {
            pub fn name(self) -> &'static str {
                match self {
                    $(Operation::$name => stringify!($name)),*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($name) => Some(Operation::$name),)*
                    _ => None,
                }
            }
        }
    };
}

operations! {
    // Control transfer
    Goto,
    GotoT,
    GotoF,
    // Arithmetic, comparison, logic
    Add,
    Sub,
    Mult,
    Div,
    Lt,
    Gt,
    Equal,
    And,
    Or,
    Not,
    // Memory
    Assign,
    AssignIndex,
    AssignIndexInv,
    AddAddr,
    CheckBound,
    Init,
    // Call protocol
    Era,
    Param,
    Call,
    Ret,
    // I/O and builtins
    Print,
    Render,
    Clear,
    Update,
    KeyPressed,
    CheckCollision,
    Pow,
    Sqrt,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quadruple {
    pub op: Operation,
    pub operand1: Address,
    pub operand2: Address,
    pub result: Address,
}

impl Quadruple {
    pub fn new(op: Operation, operand1: Address, operand2: Address, result: Address) -> Self {
        Quadruple {
            op,
            operand1,
            operand2,
            result,
        }
    }

    /// A quad whose address fields are all unused
    pub fn bare(op: Operation) -> Self {
        Self::new(op, UNUSED_ADDRESS, UNUSED_ADDRESS, UNUSED_ADDRESS)
    }
}

impl fmt::Display for Quadruple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.op, self.operand1, self.operand2, self.result
        )
    }
}

/// The compiled artifact: the backpatched instruction list and the
/// constant pool it reads from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuadrupleProgram {
    pub quads: Vec<Quadruple>,
    pub constants: Vec<ConstantEntry>,
}

impl QuadrupleProgram {
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Human readable listing, one numbered quad per line
    pub fn listing(&self) -> String {
        self.quads
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{:4}: {}\n", i, q))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::AssignIndexInv.name(), "AssignIndexInv");
        assert_eq!(Operation::from_name("GotoF"), Some(Operation::GotoF));
        assert_eq!(Operation::from_name("goto"), None);
    }

    #[test]
    fn test_display() {
        let q = Quadruple::new(Operation::Add, 30000, 30001, 23000);
        assert_eq!(q.to_string(), "Add 30000 30001 23000");
        assert_eq!(Quadruple::bare(Operation::Goto).to_string(), "Goto -1 -1 -1");
    }
}
