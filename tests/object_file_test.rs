/// Object file round trip: what doodlec writes, the runner can execute
use doodle::compiler::{object_file, DoodleCompiler};
use doodle::display_headless::HeadlessDisplay;
use doodle::interpreter::Interpreter;

const SOURCE: &str = r#"program p;
var string[2] names;
func int fib(int n) {
    if (n < 2) { return n; }
    return fib(n - 1) + fib(n - 2);
}
func void main() {
    names[0] = "say \"hi\"";
    names[1] = "a\\b";
    write fib(7);
    write names[0];
    write names[1];
    write 'q';
    write 1.25;
}
"#;

fn run(program: doodle::compiler::QuadrupleProgram) -> String {
    let mut display = HeadlessDisplay::new();
    Interpreter::load(program, &mut display).unwrap().run().unwrap();
    display.get_output()
}

#[test]
fn test_object_file_round_trip_runs_identically() {
    let program = DoodleCompiler::new().compile(SOURCE).unwrap();
    let dump = object_file::write(&program);
    let reloaded = object_file::parse(&dump).unwrap();

    assert_eq!(reloaded, program);
    assert_eq!(run(reloaded), run(program));
}

#[test]
fn test_program_output() {
    let program = DoodleCompiler::new().compile(SOURCE).unwrap();
    assert_eq!(run(program), "13\nsay \"hi\"\na\\b\nq\n1.250000");
}

#[test]
fn test_dump_layout() {
    let program = DoodleCompiler::new().compile(SOURCE).unwrap();
    let dump = object_file::write(&program);
    let mut lines = dump.lines();
    assert_eq!(lines.next(), Some(program.len().to_string().as_str()));
    let first = lines.next().unwrap();
    assert!(first.starts_with("Init"), "globals are initialised first: {}", first);
    assert!(dump.contains("Goto -1 -1"));
}
