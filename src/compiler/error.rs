// Compiler Error Handling

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CompilerError {
    // Front end errors
    ParseError(String, usize), // message, line

    // Semantic errors
    RedeclarationError(String, usize), // name, line
    UndeclaredIdentifier(String, usize),
    TypeMismatch(String, String, usize), // expected, found, line
    InvalidOperation(String, String, String), // operator, left type, right type
    ArityOrArgumentType(String, usize),  // message, line
    ReservedKeywordViolation(String, usize),
    InvalidAttribute(String, String, usize), // attribute, object type, line

    // Address space errors
    AllocationExceeded(String), // region/type bucket

    // Code generation errors
    CodeGenError(String),

    // Object file errors
    ObjectFormatError(String, usize), // message, line
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompilerError::ParseError(msg, line) => {
                write!(f, "Parse error at line {}: {}", line, msg)
            }
            CompilerError::RedeclarationError(name, line) => {
                write!(f, "Redeclaration of '{}' at line {}", name, line)
            }
            CompilerError::UndeclaredIdentifier(name, line) => {
                write!(f, "Undeclared identifier '{}' at line {}", name, line)
            }
            CompilerError::TypeMismatch(expected, found, line) => {
                write!(
                    f,
                    "Type mismatch at line {}: expected {}, found {}",
                    line, expected, found
                )
            }
            CompilerError::InvalidOperation(op, left, right) => {
                write!(
                    f,
                    "Invalid operation '{}' for operand types {} and {}",
                    op, left, right
                )
            }
            CompilerError::ArityOrArgumentType(msg, line) => {
                write!(f, "Invalid call at line {}: {}", line, msg)
            }
            CompilerError::ReservedKeywordViolation(name, line) => {
                write!(
                    f,
                    "'{}' at line {} is reserved for a builtin function",
                    name, line
                )
            }
            CompilerError::InvalidAttribute(attr, ty, line) => {
                write!(
                    f,
                    "Invalid attribute '{}' for type {} at line {}",
                    attr, ty, line
                )
            }
            CompilerError::AllocationExceeded(bucket) => {
                write!(f, "Address space exhausted for {}", bucket)
            }
            CompilerError::CodeGenError(msg) => {
                write!(f, "Code generation error: {}", msg)
            }
            CompilerError::ObjectFormatError(msg, line) => {
                write!(f, "Malformed object file at line {}: {}", line, msg)
            }
        }
    }
}

impl std::error::Error for CompilerError {}
