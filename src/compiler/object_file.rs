// Object File Format
//
// Textual dump of a compiled program:
//
//   <quadruple count>
//   <op> <operand1> <operand2> <result>     (one line per quadruple)
//   <constant count>
//   <literal text> <address>                (one line per constant)
//
// Literal text may contain spaces (quoted strings), so the address is
// always the last whitespace-separated field of a constant line.

use crate::compiler::address_space::{locate, Address, ConstantEntry, Region};
use crate::compiler::error::CompilerError;
use crate::compiler::quad::{Operation, Quadruple, QuadrupleProgram};
use std::fmt::Write as _;

pub fn write(program: &QuadrupleProgram) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", program.quads.len());
    for quad in &program.quads {
        let _ = writeln!(out, "{}", quad);
    }
    let _ = writeln!(out, "{}", program.constants.len());
    for constant in &program.constants {
        let _ = writeln!(out, "{} {}", constant.text, constant.address);
    }
    out
}

pub fn parse(source: &str) -> Result<QuadrupleProgram, CompilerError> {
    let mut lines = source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end()))
        .filter(|(_, line)| !line.is_empty());

    let quad_count = read_count(&mut lines, "quadruple count")?;
    let mut quads = Vec::with_capacity(quad_count);
    for _ in 0..quad_count {
        let (line_no, line) = lines
            .next()
            .ok_or_else(|| CompilerError::ObjectFormatError("missing quadruple".to_string(), 0))?;
        quads.push(parse_quad(line, line_no)?);
    }

    let constant_count = read_count(&mut lines, "constant count")?;
    let mut constants = Vec::with_capacity(constant_count);
    for _ in 0..constant_count {
        let (line_no, line) = lines
            .next()
            .ok_or_else(|| CompilerError::ObjectFormatError("missing constant".to_string(), 0))?;
        constants.push(parse_constant(line, line_no)?);
    }

    if let Some((line_no, _)) = lines.next() {
        return Err(CompilerError::ObjectFormatError(
            "trailing content".to_string(),
            line_no,
        ));
    }

    Ok(QuadrupleProgram { quads, constants })
}

fn read_count<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    what: &str,
) -> Result<usize, CompilerError> {
    let (line_no, line) = lines
        .next()
        .ok_or_else(|| CompilerError::ObjectFormatError(format!("missing {}", what), 0))?;
    line.trim()
        .parse()
        .map_err(|_| CompilerError::ObjectFormatError(format!("invalid {}", what), line_no))
}

fn parse_address(field: &str, line_no: usize) -> Result<Address, CompilerError> {
    field.parse().map_err(|_| {
        CompilerError::ObjectFormatError(format!("invalid address '{}'", field), line_no)
    })
}

fn parse_quad(line: &str, line_no: usize) -> Result<Quadruple, CompilerError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [op, a1, a2, r] = fields.as_slice() else {
        return Err(CompilerError::ObjectFormatError(
            "expected 4 fields".to_string(),
            line_no,
        ));
    };
    let op = Operation::from_name(op).ok_or_else(|| {
        CompilerError::ObjectFormatError(format!("unknown operation '{}'", op), line_no)
    })?;
    Ok(Quadruple::new(
        op,
        parse_address(a1, line_no)?,
        parse_address(a2, line_no)?,
        parse_address(r, line_no)?,
    ))
}

fn parse_constant(line: &str, line_no: usize) -> Result<ConstantEntry, CompilerError> {
    let (text, address) = line
        .trim_start()
        .rsplit_once(char::is_whitespace)
        .ok_or_else(|| {
            CompilerError::ObjectFormatError("expected '<literal> <address>'".to_string(), line_no)
        })?;
    let address = parse_address(address, line_no)?;
    let location = locate(address)
        .filter(|l| l.region == Region::Constant)
        .ok_or_else(|| {
            CompilerError::ObjectFormatError(
                format!("{} is not a constant address", address),
                line_no,
            )
        })?;
    Ok(ConstantEntry {
        text: text.trim_end().to_string(),
        element: location.element,
        address,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::types::ElementType;
    use test_log::test;

    fn sample() -> QuadrupleProgram {
        QuadrupleProgram {
            quads: vec![
                Quadruple::new(Operation::Goto, -1, -1, 1),
                Quadruple::new(Operation::Print, -1, -1, 34005),
                Quadruple::new(Operation::Ret, -1, -1, -1),
            ],
            constants: vec![
                ConstantEntry {
                    text: "0".to_string(),
                    element: ElementType::Int,
                    address: 33000,
                },
                ConstantEntry {
                    text: "\"hello big world\"".to_string(),
                    element: ElementType::String,
                    address: 34005,
                },
            ],
        }
    }

    #[test]
    fn test_write_layout() {
        let text = write(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "3");
        assert_eq!(lines[1], "Goto -1 -1 1");
        assert_eq!(lines[4], "2");
        assert_eq!(lines[6], "\"hello big world\" 34005");
    }

    #[test]
    fn test_parse_recovers_program() {
        assert_eq!(parse(&write(&sample())).unwrap(), sample());
    }

    #[test]
    fn test_rejects_unknown_operation() {
        let err = parse("1\nJump -1 -1 0\n0\n").unwrap_err();
        assert!(matches!(err, CompilerError::ObjectFormatError(_, 2)));
    }

    #[test]
    fn test_rejects_non_constant_address() {
        let err = parse("0\n1\n5 3000\n").unwrap_err();
        assert!(matches!(err, CompilerError::ObjectFormatError(_, 3)));
    }

    #[test]
    fn test_rejects_truncated_file() {
        assert!(parse("2\nGoto -1 -1 1\n").is_err());
    }
}
