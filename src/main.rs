use log::LevelFilter;
use shtoc::driver::{self, CompileOptions, DriverError, Mode};
use std::io::Write;
use std::path::PathBuf;
use std::process;

struct Config {
    filename: String,
    options: CompileOptions,
    verbose: bool,
}

struct CliError {
    code: i32,
    msg: String,
    show_usage: bool,
}

impl CliError {
    fn usage(msg: impl Into<String>) -> Self {
        Self { code: 1, msg: msg.into(), show_usage: true }
    }

    fn from_driver(err: DriverError) -> Self {
        Self { code: err.code, msg: err.msg, show_usage: false }
    }
}

fn usage_text() -> &'static str {
    "Usage: shtoc [flags] <script.sh>\n\
     Flags:\n\
     \x20 -o, --out <file>       Write the C program to <file> (default: output.c)\n\
     \x20 --check                Translate and report errors without writing output\n\
     \x20 --emit-statements      Print segmented statements and their kinds (debug)\n\
     \x20 --emit-c               Print the C program to stdout instead of writing it\n\
     \x20 -v, --verbose          Log translation decisions\n\
     \x20 -h, --help             Print help information\n\
     \x20 -V, --version          Print version information and exit"
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let config = match parse_args(args) {
        Ok(c) => c,
        Err(e) => fail(e),
    };
    init_logging(config.verbose);

    if let Err(e) = compile(config) {
        fail(e);
    }
}

fn fail(e: CliError) -> ! {
    eprintln!("{}", e.msg);
    if e.show_usage {
        eprintln!("{}", usage_text());
    }
    process::exit(e.code);
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(buf, "{}: {}", record.level().as_str().to_lowercase(), record.args())
        });
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn parse_args(args: Vec<String>) -> Result<Config, CliError> {
    if args.len() < 2 {
        return Err(CliError::usage("error: missing input file"));
    }

    let mut filename: Option<String> = None;
    let mut options = CompileOptions::default();
    let mut verbose = false;
    let mut out_given = false;
    let mut actions = Vec::new();

    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        if arg == "-h" || arg == "--help" {
            println!("{}", usage_text());
            process::exit(0);
        } else if arg == "-V" || arg == "--version" {
            println!("shtoc {}", env!("CARGO_PKG_VERSION"));
            process::exit(0);
        } else if arg == "-o" || arg == "--out" {
            let Some(value) = args.get(i + 1) else {
                return Err(CliError::usage(format!("error: {} requires an argument", arg)));
            };
            options.out_path = PathBuf::from(value);
            out_given = true;
            i += 2;
        } else if let Some(value) = arg.strip_prefix("--out=") {
            if value.is_empty() {
                return Err(CliError::usage("error: --out requires an argument"));
            }
            options.out_path = PathBuf::from(value);
            out_given = true;
            i += 1;
        } else if arg == "--check" {
            actions.push((arg.clone(), Mode::Check));
            i += 1;
        } else if arg == "--emit-statements" {
            actions.push((arg.clone(), Mode::EmitStatements));
            i += 1;
        } else if arg == "--emit-c" {
            actions.push((arg.clone(), Mode::EmitC));
            i += 1;
        } else if arg == "-v" || arg == "--verbose" {
            verbose = true;
            i += 1;
        } else if arg.starts_with('-') {
            return Err(CliError::usage(format!("error: unexpected argument: {}", arg)));
        } else {
            if filename.is_some() {
                return Err(CliError::usage(format!(
                    "error: unexpected argument: {} (script already specified)",
                    arg
                )));
            }
            filename = Some(arg.clone());
            i += 1;
        }
    }

    if actions.len() > 1 {
        return Err(CliError::usage(
            "error: multiple action flags specified (choose only one of: --check, --emit-statements, --emit-c)",
        ));
    }
    if let Some((flag, mode)) = actions.pop() {
        if out_given {
            return Err(CliError::usage(format!("error: {} cannot be used with --out", flag)));
        }
        options.mode = mode;
    }

    let Some(filename) = filename else {
        return Err(CliError::usage("error: missing input file"));
    };

    Ok(Config { filename, options, verbose })
}

fn compile(config: Config) -> Result<(), CliError> {
    let path = std::path::Path::new(&config.filename);
    let mode = config.options.mode;

    let compiled = driver::compile_file(path, &config.options).map_err(CliError::from_driver)?;

    match mode {
        Mode::EmitC | Mode::EmitStatements => print!("{}", compiled.text),
        Mode::Check if !compiled.text.is_empty() => println!("{}", compiled.text),
        Mode::Check | Mode::Default => {}
    }

    compiled.status().map_err(CliError::from_driver)
}
