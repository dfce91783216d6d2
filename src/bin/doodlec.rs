// doodlec - Doodle Compiler
// Compiles Doodle source files to textual quadruple object files

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use doodle::compiler::{object_file, DoodleCompiler};

fn main() {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let mut input_file = "";
    let mut output_file = String::new();
    let mut entry = "main".to_string();
    let mut listing = false;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: -o requires a filename");
                    process::exit(1);
                }
                output_file = args[i + 1].clone();
                i += 2;
            }
            "--entry" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --entry requires a function name");
                    process::exit(1);
                }
                entry = args[i + 1].clone();
                i += 2;
            }
            "--listing" => {
                listing = true;
                i += 1;
            }
            "-v" | "--verbose" => {
                verbose = true;
                i += 1;
            }
            "-h" | "--help" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option '{}'", arg);
                print_usage(&args[0]);
                process::exit(1);
            }
            _ => {
                if input_file.is_empty() {
                    input_file = &args[i];
                } else {
                    eprintln!("Error: Multiple input files specified");
                    process::exit(1);
                }
                i += 1;
            }
        }
    }

    if input_file.is_empty() {
        eprintln!("Error: No input file specified");
        print_usage(&args[0]);
        process::exit(1);
    }

    if output_file.is_empty() {
        output_file = Path::new(input_file)
            .with_extension("obj")
            .to_string_lossy()
            .into_owned();
    }

    if verbose {
        println!("Compiling {} -> {} (entry '{}')", input_file, output_file, entry);
    }

    let source = match fs::read_to_string(input_file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: Cannot read '{}': {}", input_file, e);
            process::exit(1);
        }
    };

    let program = match DoodleCompiler::with_entry(entry).compile(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if listing {
        print!("{}", program.listing());
    }

    if let Err(e) = fs::write(&output_file, object_file::write(&program)) {
        eprintln!("Error: Cannot write '{}': {}", output_file, e);
        process::exit(1);
    }

    if verbose {
        println!(
            "Wrote {} quadruples and {} constants",
            program.len(),
            program.constants.len()
        );
    }
}

fn print_usage(program_name: &str) {
    println!("doodlec - Doodle compiler");
    println!();
    println!("Usage: {} [options] <source.dl>", program_name);
    println!();
    println!("Options:");
    println!("  -o, --output <file>   Output object file (default: <source>.obj)");
    println!("  --entry <name>        Entry function (default: main)");
    println!("  --listing             Print the numbered quadruple listing");
    println!("  -v, --verbose         Verbose output");
    println!("  -h, --help            Show this help");
}
