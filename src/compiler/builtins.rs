// Builtin Function Registry
// Reserved names that lower directly to a single VM opcode

use crate::compiler::quad::Operation;
use crate::compiler::types::{ElementType, Type};
use indexmap::IndexMap;

/// What a builtin accepts in one argument position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Exact(ElementType),
    Numeric,
    AnyObject,
}

impl ParamKind {
    pub fn accepts(self, ty: &Type) -> bool {
        match self {
            ParamKind::Exact(element) => Type::basic(element).accepts(ty),
            ParamKind::Numeric => ty.is_numeric(),
            ParamKind::AnyObject => ty.is_object(),
        }
    }

    pub fn describe(self) -> String {
        match self {
            ParamKind::Exact(element) => element.to_string(),
            ParamKind::Numeric => "int or float".to_string(),
            ParamKind::AnyObject => "object".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub params: Vec<ParamKind>,
    pub return_type: ElementType,
    pub operation: Operation,
}

impl Builtin {
    pub fn return_type(&self) -> Type {
        Type::basic(self.return_type)
    }
}

lazy_static! {
    static ref BUILTINS: IndexMap<&'static str, Builtin> = {
        use ElementType::*;
        use ParamKind::*;

        let table = [
            ("keyPressed", vec![Exact(String)], Bool, Operation::KeyPressed),
            ("checkCollision", vec![AnyObject, AnyObject], Bool, Operation::CheckCollision),
            ("pow", vec![Numeric, Numeric], Float, Operation::Pow),
            ("sqrt", vec![Numeric], Float, Operation::Sqrt),
            ("render", vec![AnyObject], Void, Operation::Render),
            ("clear", vec![], Void, Operation::Clear),
            ("update", vec![], Void, Operation::Update),
        ];

        table
            .into_iter()
            .map(|(name, params, return_type, operation)| {
                (
                    name,
                    Builtin {
                        name,
                        params,
                        return_type,
                        operation,
                    },
                )
            })
            .collect()
    };
}

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.get(name)
}

pub fn is_reserved(name: &str) -> bool {
    BUILTINS.contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_registry_contents() {
        let pow = lookup("pow").unwrap();
        assert_eq!(pow.params.len(), 2);
        assert_eq!(pow.return_type(), Type::float());
        assert_eq!(lookup("render").map(|b| b.operation), Some(Operation::Render));
        assert!(is_reserved("keyPressed"));
        assert!(!is_reserved("main"));
    }

    #[test]
    fn test_param_kinds() {
        assert!(ParamKind::Numeric.accepts(&Type::int()));
        assert!(!ParamKind::Numeric.accepts(&Type::bool()));
        assert!(ParamKind::AnyObject.accepts(&Type::basic(ElementType::Text)));
        assert!(!ParamKind::AnyObject.accepts(&Type::list(ElementType::Text, 2)));
        assert!(ParamKind::Exact(ElementType::Float).accepts(&Type::int()));
    }
}
