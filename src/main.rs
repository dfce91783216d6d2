use doodle::compiler::{object_file, CompilerError, DoodleCompiler, QuadrupleProgram};
use doodle::config::DoodleConfig;
use doodle::display_manager::{create_display, DisplayMode};
use doodle::interpreter::Interpreter;
use log::{debug, info};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

const EXIT_COMPILE_ERROR: i32 = 1;
const EXIT_RUNTIME_ERROR: i32 = 2;

fn main() {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    // Display help information if no program file provided
    if args.len() < 2 {
        print_usage(&args[0]);
        return;
    }

    let mut config_path: Option<PathBuf> = None;
    let mut headless = false;
    let mut program_path: Option<&str> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --config requires a path");
                    process::exit(EXIT_COMPILE_ERROR);
                }
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--headless" => {
                headless = true;
                i += 1;
            }
            "-h" | "--help" => {
                print_usage(&args[0]);
                return;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option '{}'", arg);
                process::exit(EXIT_COMPILE_ERROR);
            }
            path => {
                program_path = Some(path);
                i += 1;
            }
        }
    }

    let Some(program_path) = program_path else {
        eprintln!("Error: No program file specified");
        print_usage(&args[0]);
        process::exit(EXIT_COMPILE_ERROR);
    };

    let mut config = match DoodleConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_COMPILE_ERROR);
        }
    };
    if headless {
        config.runtime.display = DisplayMode::Headless;
    }

    let program = match load_program(Path::new(program_path), &config.runtime.entry) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_COMPILE_ERROR);
        }
    };
    info!("Loaded {} quadruples from {}", program.len(), program_path);

    let mut display = match create_display(&config.display_settings()) {
        Ok(display) => display,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_RUNTIME_ERROR);
        }
    };

    let result = Interpreter::load(program, display.as_mut()).and_then(|interpreter| {
        interpreter
            .with_max_steps(config.runtime.max_steps)
            .run()
    });

    // Always restore the terminal before reporting
    if let Err(e) = display.shutdown() {
        debug!("Display shutdown failed: {}", e);
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(EXIT_RUNTIME_ERROR);
    }
}

/// Compile a source file, or read a `.obj` dump produced by `doodlec`
fn load_program(path: &Path, entry: &str) -> Result<QuadrupleProgram, CompilerError> {
    let text = fs::read_to_string(path).map_err(|e| {
        CompilerError::ParseError(format!("cannot read {}: {}", path.display(), e), 0)
    })?;

    if path.extension().is_some_and(|ext| ext == "obj") {
        debug!("Reading object file {}", path.display());
        object_file::parse(&text)
    } else {
        debug!("Compiling {} with entry '{}'", path.display(), entry);
        DoodleCompiler::with_entry(entry).compile(&text)
    }
}

fn print_usage(program_name: &str) {
    println!("doodle - compiler and virtual machine for the Doodle drawing language");
    println!();
    println!("Usage: {} [--config path] [--headless] <program.dl | program.obj>", program_name);
    println!();
    println!("Settings are read from doodle.toml in the working directory when present.");
}
