use std::io::Write;
use std::process::ExitCode;
use std::{env, fs, io};

use kestrel::error::{GenericResult, KestrelError};
use kestrel::Interpreter;

const EXIT_USAGE: u8 = 64;
const EXIT_STATIC_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;
const EXIT_IO_ERROR: u8 = 74;

fn main() -> ExitCode {
    init_tracing();

    let mut args = env::args().skip(1);
    let path = args.next();
    if args.next().is_some() {
        eprintln!("Usage: kestrel [SCRIPT_PATH]");
        return ExitCode::from(EXIT_USAGE);
    }

    let result = match path {
        Some(path) => run_file(&path),
        None => run_prompt().map(|_| ExitCode::SUCCESS),
    };

    result.unwrap_or_else(|error| {
        eprintln!("{error}");
        ExitCode::from(EXIT_IO_ERROR)
    })
}

// Logs go to stderr and only when RUST_LOG is set, so program output stays clean
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_file(path: &str) -> GenericResult<ExitCode> {
    tracing::info!(path, "running script");
    let contents = fs::read_to_string(path)?;

    let mut output_writer = io::stdout().lock();
    let mut interpreter = Interpreter::new(&mut output_writer);
    match kestrel::execute(&contents, &mut interpreter) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(error) => {
            display_error(&error);
            let code = if error.is_static() {
                EXIT_STATIC_ERROR
            } else {
                EXIT_RUNTIME_ERROR
            };
            Ok(ExitCode::from(code))
        }
    }
}

fn run_prompt() -> GenericResult<()> {
    println!("Welcome to the interactive prompt for the Kestrel interpreter.\n");

    let stdin = io::stdin();
    let mut output_writer = io::stdout();
    let mut interpreter = Interpreter::new(&mut output_writer);
    let mut buffer = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        if stdin.read_line(&mut buffer)? == 0 {
            // end of input
            return Ok(());
        }
        if let Err(error) = kestrel::execute(&buffer, &mut interpreter) {
            display_error(&error);
        }
        buffer.clear();
    }
}

fn display_error(error: &KestrelError) {
    eprintln!(" *** An error occurred while running the script ***");
    eprintln!("   {error}\n");
}
