// Semantic Cube
// (operator, left type, right type) -> result type, shared by the type
// checker and the code generator

use crate::compiler::ast::Operator;
use crate::compiler::error::CompilerError;
use crate::compiler::types::{ElementType, Type};
use std::collections::HashMap;

lazy_static! {
    static ref CUBE: SemanticCube = SemanticCube::new();
}

/// The process-wide immutable cube
pub fn cube() -> &'static SemanticCube {
    &CUBE
}

pub struct SemanticCube {
    table: HashMap<String, ElementType>,
}

impl Default for SemanticCube {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticCube {
    pub fn new() -> Self {
        use ElementType::*;

        let mut cube = SemanticCube {
            table: HashMap::new(),
        };

        for op in ["+", "-", "*", "/"] {
            cube.insert(op, Int, Int, Int);
            cube.insert(op, Float, Float, Float);
            cube.insert(op, Int, Float, Float);
            cube.insert(op, Float, Int, Float);
        }

        for op in ["<", ">"] {
            cube.insert(op, Int, Int, Bool);
            cube.insert(op, Float, Float, Bool);
            cube.insert(op, Int, Float, Bool);
            cube.insert(op, Float, Int, Bool);
            cube.insert(op, Char, Char, Bool);
        }

        for ty in [Int, Float, Char, Bool, String] {
            cube.insert("==", ty, ty, Bool);
        }
        cube.insert("==", Int, Float, Bool);
        cube.insert("==", Float, Int, Bool);

        cube.insert("&&", Bool, Bool, Bool);
        cube.insert("||", Bool, Bool, Bool);

        // Unary operators use Void as the absent right operand
        cube.insert("!", Bool, Void, Bool);

        cube
    }

    fn insert(&mut self, op: &str, left: ElementType, right: ElementType, result: ElementType) {
        let key = Self::key(op, &Type::basic(left), &Type::basic(right));
        self.table.insert(key, result);
    }

    fn key(op: &str, left: &Type, right: &Type) -> String {
        format!("{}{}{}", op, left.canonical(), right.canonical())
    }

    /// Result type of `left op right`, or `None` if the combination is invalid
    pub fn get(&self, op: &str, operands: [&Type; 2]) -> Option<Type> {
        self.table
            .get(&Self::key(op, operands[0], operands[1]))
            .map(|e| Type::basic(*e))
    }

    /// Like `get`, surfacing a miss as `InvalidOperation`
    pub fn check(&self, op: Operator, left: &Type, right: &Type) -> Result<Type, CompilerError> {
        self.get(op.symbol(), [left, right]).ok_or_else(|| {
            CompilerError::InvalidOperation(
                op.symbol().to_string(),
                left.to_string(),
                right.to_string(),
            )
        })
    }

    pub fn check_not(&self, operand: &Type) -> Result<Type, CompilerError> {
        self.get("!", [operand, &Type::void()]).ok_or_else(|| {
            CompilerError::InvalidOperation("!".to_string(), operand.to_string(), "none".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_arithmetic_results() {
        let c = cube();
        assert_eq!(c.get("+", [&Type::int(), &Type::int()]), Some(Type::int()));
        assert_eq!(c.get("/", [&Type::int(), &Type::float()]), Some(Type::float()));
        assert_eq!(c.get("*", [&Type::bool(), &Type::bool()]), None);
    }

    #[test]
    fn test_logical_requires_bools() {
        let c = cube();
        assert_eq!(c.get("&&", [&Type::int(), &Type::int()]), None);
        assert_eq!(c.get("||", [&Type::bool(), &Type::bool()]), Some(Type::bool()));
        assert!(matches!(
            c.check(Operator::And, &Type::int(), &Type::int()),
            Err(CompilerError::InvalidOperation(..))
        ));
    }

    #[test]
    fn test_equality() {
        let c = cube();
        assert_eq!(c.get("==", [&Type::bool(), &Type::bool()]), Some(Type::bool()));
        let s = Type::basic(ElementType::String);
        assert_eq!(c.get("==", [&s, &s]), Some(Type::bool()));
        assert_eq!(c.get("==", [&s, &Type::int()]), None);
    }

    #[test]
    fn test_lists_and_objects_never_match() {
        let c = cube();
        let list = Type::list(ElementType::Int, 3);
        assert_eq!(c.get("+", [&list, &Type::int()]), None);
        let sq = Type::basic(ElementType::Square);
        assert_eq!(c.get("==", [&sq, &sq]), None);
    }

    #[test]
    fn test_not() {
        assert_eq!(cube().check_not(&Type::bool()), Ok(Type::bool()));
        assert!(cube().check_not(&Type::int()).is_err());
    }
}
