//! PL/0 CLI
//!
//! Compiles and runs PL/0 source files on the stack-machine VM, or prints
//! an intermediate representation (`--parse`, `--codegen`, `--transpile`)
//! instead of executing.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::Parser as ClapParser;
use tracing::info;

use pl0_compiler::{Generator, Parser, PythonTranspiler};
use pl0_runtime::{Vm, VmConfig};

#[derive(ClapParser)]
#[command(name = "pl0c")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "PL/0 compiler and virtual machine", long_about = None)]
struct Cli {
    /// PL/0 source file
    src: PathBuf,

    /// Print the parsed AST and exit
    #[arg(long)]
    parse: bool,

    /// Print the compiled instruction stream and exit
    #[arg(long)]
    codegen: bool,

    /// Transpile to the named target language and print the result
    #[arg(long, value_name = "TARGET")]
    transpile: Option<String>,

    /// Start the VM with the interactive debugger armed from instruction 0
    #[arg(long)]
    debug: bool,

    /// Data segment capacity
    #[arg(long, default_value_t = 500)]
    stack_size: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.src) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error reading {}: {e}", cli.src.display());
            process::exit(2);
        }
    };

    info!(path = %cli.src.display(), "parsing source");
    let program = match Parser::parse(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if cli.parse {
        print!("{program}");
        return;
    }

    if let Some(target) = cli.transpile.as_deref() {
        match target {
            "python" | "py" => match PythonTranspiler::generate(&program.blocks) {
                Ok(source) => print!("{source}"),
                Err(e) => {
                    eprintln!("{e}");
                    process::exit(2);
                }
            },
            other => {
                eprintln!("unsupported transpile target: {other}");
                process::exit(2);
            }
        }
        return;
    }

    info!("generating code");
    let code = match Generator::generate(&program.blocks) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    if cli.codegen {
        for instruction in &code {
            println!("{instruction}");
        }
        return;
    }

    let config = VmConfig::new()
        .with_stack_size(cli.stack_size)
        .with_debug(cli.debug);
    let code: Rc<[_]> = code.into();
    let stdout = std::io::stdout();
    let mut vm = Vm::new(code, config, stdout.lock());
    info!("running program");
    if let Err(e) = vm.run() {
        eprintln!("runtime error: {e}");
        process::exit(2);
    }
}
