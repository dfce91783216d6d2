// Doodle Compiler Module
// Front end, semantic analysis and quadruple generation for Doodle programs

pub mod address_space;
pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod codegen_expressions;
pub mod codegen_statements;
pub mod directories;
pub mod error;
pub mod lexer;
pub mod object_file;
pub mod parser;
pub mod quad;
pub mod references;
pub mod semantic;
pub mod semantic_cube;
pub mod types;

#[cfg(test)]
mod address_space_tests;
#[cfg(test)]
mod parser_tests;

pub use error::CompilerError;
pub use quad::QuadrupleProgram;

use log::info;

/// Main compiler structure
pub struct DoodleCompiler {
    entry: String,
}

impl Default for DoodleCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl DoodleCompiler {
    /// Create a compiler whose programs start at `main`
    pub fn new() -> Self {
        Self::with_entry("main")
    }

    pub fn with_entry(entry: impl Into<String>) -> Self {
        DoodleCompiler {
            entry: entry.into(),
        }
    }

    /// Parse source text into an AST
    pub fn parse(&self, source: &str) -> Result<ast::Program, CompilerError> {
        let mut lexer = lexer::Lexer::new(source);
        let tokens = lexer.tokenize()?;

        let mut parser = parser::Parser::new(tokens);
        parser.parse()
    }

    /// Compile Doodle source code to a quadruple program
    pub fn compile(&self, source: &str) -> Result<QuadrupleProgram, CompilerError> {
        // Phase 1: Lexing and parsing
        let program = self.parse(source)?;
        info!("parsed program '{}'", program.id);

        self.compile_program(program)
    }

    /// Compile an already parsed program
    pub fn compile_program(&self, program: ast::Program) -> Result<QuadrupleProgram, CompilerError> {
        // Phase 2: Directories and semantic checks
        let analyzer = semantic::SemanticAnalyzer::with_entry(self.entry.clone());
        let analyzed = analyzer.analyze(program)?;

        // Phase 3: Addresses and quadruples
        let generator = codegen::CodeGenerator::new();
        generator.generate(analyzed)
    }
}
