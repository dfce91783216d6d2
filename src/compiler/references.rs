/// Pending-reference resolution for quadruple code generation
///
/// Function entry points are unknown while their call sites are emitted.
/// Each such site is recorded here as an `UnresolvedReference` and patched
/// in a single pass once the whole program has been generated:
///
/// 1. **Collection**: the generator records (quad index, field, target name)
/// 2. **Resolution**: every record is looked up in the function directory
///    and the named field of the quad is overwritten with the entry address
///
/// Jump targets inside a function are resolved through the generator's jump
/// stack instead, but go through the same single-write `patch_field` check.
use crate::compiler::address_space::{Address, UNUSED_ADDRESS};
use crate::compiler::directories::FunctionDirectory;
use crate::compiler::error::CompilerError;
use crate::compiler::quad::Quadruple;
use log::debug;

/// Which field of a quad receives the resolved address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchField {
    Operand1,
    Result,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedReference {
    pub quad_index: usize,
    pub field: PatchField,
    pub target: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceContext {
    pub unresolved_refs: Vec<UnresolvedReference>,
}

impl ReferenceContext {
    pub fn new() -> Self {
        Self {
            unresolved_refs: Vec::new(),
        }
    }

    pub fn add(&mut self, quad_index: usize, field: PatchField, target: impl Into<String>) {
        self.unresolved_refs.push(UnresolvedReference {
            quad_index,
            field,
            target: target.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.unresolved_refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unresolved_refs.is_empty()
    }

    /// Patch every recorded site with its function's entry address
    pub fn resolve(
        &mut self,
        quads: &mut [Quadruple],
        functions: &FunctionDirectory,
    ) -> Result<(), CompilerError> {
        debug!("resolving {} function references", self.unresolved_refs.len());

        for reference in self.unresolved_refs.drain(..) {
            let entry = functions
                .get(&reference.target)
                .map(|f| f.entry_address)
                .filter(|address| *address != UNUSED_ADDRESS)
                .ok_or_else(|| {
                    CompilerError::CodeGenError(format!(
                        "no entry address for function '{}'",
                        reference.target
                    ))
                })?;
            patch_field(quads, reference.quad_index, reference.field, entry)?;
            debug!(
                "patched quad {} {:?} -> {} ({})",
                reference.quad_index, reference.field, entry, reference.target
            );
        }
        Ok(())
    }
}

/// Overwrite one field of an emitted quad. A field may only be filled once.
pub fn patch_field(
    quads: &mut [Quadruple],
    index: usize,
    field: PatchField,
    value: Address,
) -> Result<(), CompilerError> {
    let quad = quads.get_mut(index).ok_or_else(|| {
        CompilerError::CodeGenError(format!("backpatch target {} out of range", index))
    })?;
    let slot = match field {
        PatchField::Operand1 => &mut quad.operand1,
        PatchField::Result => &mut quad.result,
    };
    if *slot != UNUSED_ADDRESS {
        return Err(CompilerError::CodeGenError(format!(
            "quad {} {:?} already patched",
            index, field
        )));
    }
    *slot = value;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::directories::FunctionEntry;
    use crate::compiler::quad::Operation;
    use crate::compiler::types::Type;
    use test_log::test;

    fn directory_with(name: &str, entry: Address) -> FunctionDirectory {
        let mut functions = FunctionDirectory::new();
        let mut f = FunctionEntry::new(name, Type::void(), 1);
        f.entry_address = entry;
        functions.add(f);
        functions
    }

    #[test]
    fn test_resolves_goto_result_and_call_operand() {
        let mut quads = vec![
            Quadruple::bare(Operation::Goto),
            Quadruple::new(Operation::Call, -1, -1, 23000),
        ];
        let mut refs = ReferenceContext::new();
        refs.add(0, PatchField::Result, "main");
        refs.add(1, PatchField::Operand1, "main");

        refs.resolve(&mut quads, &directory_with("main", 7)).unwrap();
        assert_eq!(quads[0].result, 7);
        assert_eq!(quads[1].operand1, 7);
        assert_eq!(quads[1].result, 23000);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_unknown_target_fails() {
        let mut quads = vec![Quadruple::bare(Operation::Goto)];
        let mut refs = ReferenceContext::new();
        refs.add(0, PatchField::Result, "nowhere");
        assert!(refs
            .resolve(&mut quads, &directory_with("main", 3))
            .is_err());
    }

    #[test]
    fn test_field_patched_once() {
        let mut quads = vec![Quadruple::bare(Operation::GotoF)];
        patch_field(&mut quads, 0, PatchField::Result, 4).unwrap();
        assert!(patch_field(&mut quads, 0, PatchField::Result, 5).is_err());
        assert!(patch_field(&mut quads, 3, PatchField::Result, 5).is_err());
    }
}
