use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt};

use compseudo::bytecode::Chunk;
use compseudo::bytecode::compile::compile_source;
use compseudo::bytecode::disasm::print_chunk;
use compseudo::bytecode::image::{load_image, write_image};
use compseudo::frontend::lexer::Lexer;
use compseudo::frontend::parser::parse;
use compseudo::frontend::token_dumper::TokenDumper;
use compseudo::runtime::Vm;

const EXIT_COMPILE: i32 = 65;
const EXIT_RUNTIME: i32 = 70;
const EXIT_IO: i32 = 74;

#[derive(Parser, Debug)]
#[command(name = "compseudo")]
#[command(about = "Compile and run pseudocode expressions on a bytecode VM")]
struct Args {
    /// Source file to run (starts the REPL when omitted)
    file: Option<PathBuf>,

    /// Print the token stream instead of running
    #[arg(long)]
    tokens: bool,

    /// Print the parsed expression tree instead of running
    #[arg(long)]
    ast: bool,

    /// Disassemble the chunk before running it
    #[arg(long)]
    bc: bool,

    /// Write the compiled bytecode image to this path
    #[arg(long, value_name = "PATH")]
    emit: Option<PathBuf>,

    /// Treat FILE as a bytecode image instead of source
    #[arg(long, requires = "file")]
    image: bool,

    /// Print token kind names in the token dump (implies --tokens)
    #[arg(long = "tokens-debug")]
    tokens_debug: bool,

    /// Disable ANSI colors in the token dump
    #[arg(long = "no-color")]
    no_color: bool,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,compseudo=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_logging();

    let args = Args::parse();

    match &args.file {
        Some(path) if args.image => run_image(path, &args),
        Some(path) => run_file(path, &args),
        None => repl(&args),
    }
}

fn token_dumper(args: &Args) -> TokenDumper {
    let mut dumper = TokenDumper::new();
    if args.no_color {
        dumper = dumper.no_color();
    }
    if args.tokens_debug {
        dumper = dumper.debug();
    }
    dumper
}

fn tokens_only(args: &Args) -> bool {
    args.tokens || args.tokens_debug
}

fn read_source(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", path.display(), e);
            process::exit(EXIT_IO);
        }
    }
}

fn run_file(path: &Path, args: &Args) {
    let source = read_source(path);
    debug!(path = %path.display(), bytes = source.len(), "read source");

    if tokens_only(args) {
        let tokens = Lexer::new(&source).tokenize();
        token_dumper(args).dump(&tokens);
        return;
    }

    let source: Rc<str> = Rc::from(source);

    if args.ast {
        match parse(&source) {
            Ok(ast) => println!("{}", ast),
            Err(e) => {
                eprintln!("Parse error: {}", e);
                process::exit(EXIT_COMPILE);
            }
        }
        return;
    }

    let mut vm = Vm::new();
    let chunk = match compile_source(&source, vm.heap_mut()) {
        Ok(chunk) => chunk,
        Err(e) => {
            eprintln!("Compile error: {}", e);
            process::exit(EXIT_COMPILE);
        }
    };

    if let Some(out) = &args.emit {
        if let Err(e) = write_image(out, &chunk, vm.heap()) {
            eprintln!("Failed to write '{}': {}", out.display(), e);
            process::exit(EXIT_IO);
        }
        info!(path = %out.display(), bytes = chunk.len(), "wrote bytecode image");
    }

    execute(&mut vm, &chunk, &path.display().to_string(), args.bc);
}

fn run_image(path: &Path, args: &Args) {
    let mut vm = Vm::new();
    let chunk = match load_image(path, vm.heap_mut()) {
        Ok(chunk) => chunk,
        Err(e) => {
            eprintln!("Failed to load '{}': {}", path.display(), e);
            process::exit(EXIT_IO);
        }
    };

    execute(&mut vm, &chunk, &path.display().to_string(), args.bc);
}

fn execute(vm: &mut Vm, chunk: &Chunk, name: &str, disassemble: bool) {
    if disassemble {
        print_chunk(chunk, vm.heap(), name);
    }

    match vm.run(chunk) {
        Ok(value) => println!("{}", value.display(vm.heap())),
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            process::exit(EXIT_RUNTIME);
        }
    }
}

fn repl(args: &Args) {
    let mut vm = Vm::new();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        // a failed flush only loses the prompt
        let _ = io::stdout().flush();

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                process::exit(EXIT_IO);
            }
        }

        if line.trim().is_empty() {
            continue;
        }

        if tokens_only(args) {
            let tokens = Lexer::new(&line).tokenize();
            token_dumper(args).dump(&tokens);
            continue;
        }

        match vm.interpret(&line) {
            Ok(value) => println!("{}", value.display(vm.heap())),
            Err(e) => eprintln!("{}", e),
        }
    }

    debug!(strings = vm.heap().len(), "repl finished");
}
