use std::{env, fs, path::PathBuf, process::ExitCode, rc::Rc, time::Instant};

use emberc::{
    compiler::compiler::compile, display_error, errors::errors::Error, init_tracing, lexer::lexer::tokenize,
    options::CompileOptions, parser::parser::parse,
};
use tracing::info;

const USAGE: &str = "usage: emberc <file> [-o <output>] [--word-size <bytes>]";

struct Args {
    input: PathBuf,
    output: Option<PathBuf>,
    word_size: u64,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut input = None;
    let mut output = None;
    let mut word_size = CompileOptions::default().word_size;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                let path = args.next().ok_or("missing value for -o")?;
                output = Some(PathBuf::from(path));
            }
            "--word-size" => {
                let value = args.next().ok_or("missing value for --word-size")?;
                word_size = match value.parse::<u64>() {
                    Ok(size @ (4 | 8)) => size,
                    _ => return Err(format!("invalid word size `{}`, expected 4 or 8", value)),
                };
            }
            "-h" | "--help" => return Err(String::from(USAGE)),
            _ if input.is_none() && !arg.starts_with('-') => input = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument `{}`\n{}", arg, USAGE)),
        }
    }

    Ok(Args {
        input: input.ok_or(USAGE)?,
        output,
        word_size,
    })
}

fn report(errors: &[Error], source: &str) {
    for error in errors {
        eprintln!("{}\n", display_error(error, source));
    }
}

fn main() -> ExitCode {
    init_tracing();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let source = match fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(failure) => {
            eprintln!("could not read {}: {}", args.input.display(), failure);
            return ExitCode::FAILURE;
        }
    };

    let file_name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.input.to_string_lossy().into_owned());
    let options = CompileOptions::new(&file_name).with_word_size(args.word_size);

    let start = Instant::now();

    let tokens = match tokenize(&source, Some(file_name.clone())) {
        Ok(tokens) => tokens,
        Err(error) => {
            report(&[error], &source);
            return ExitCode::FAILURE;
        }
    };
    info!(elapsed = ?start.elapsed(), tokens = tokens.len(), "tokenized");

    let parse_start = Instant::now();
    let module = match parse(tokens, Rc::new(file_name)) {
        Ok(module) => module,
        Err(error) => {
            report(&[error], &source);
            return ExitCode::FAILURE;
        }
    };
    info!(elapsed = ?parse_start.elapsed(), items = module.len(), "parsed");

    let compile_start = Instant::now();
    let compiled = match compile(&module, &options) {
        Ok(compiled) => compiled,
        Err(errors) => {
            report(&errors, &source);
            return ExitCode::FAILURE;
        }
    };
    info!(elapsed = ?compile_start.elapsed(), functions = compiled.functions.len(), "lowered");
    info!(elapsed = ?start.elapsed(), "total");

    let dump = compiled.to_string();
    match args.output {
        Some(path) => {
            if let Err(failure) = fs::write(&path, dump) {
                eprintln!("could not write {}: {}", path.display(), failure);
                return ExitCode::FAILURE;
            }
        }
        None => print!("{}", dump),
    }

    ExitCode::SUCCESS
}
