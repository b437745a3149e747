use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{bail, miette, IntoDiagnostic, Result};

use stitch::output::{self, file_message, message, MsgColor};
use stitch::{term::TerminalConsole, Air, Features, RunState};

/// Stitch is an assembler and virtual machine for the LC3 assembly language.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` or `.obj` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Load `.obj` and `.asm` files into one machine and run it, starting at the first
    /// file's origin
    Run {
        /// Files to load, in order. Later files may overwrite earlier ones
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Comma-separated runtime features: `strict-traps`, `trace`
        #[arg(short, long)]
        features: Option<Features>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Assemble each `.asm` file into a `.obj` file beside it
    Asm {
        /// `.asm` files to assemble
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Destination for the object file, only with a single input
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Check a `.asm` file without running or outputting binary
    Check {
        /// File to check
        name: PathBuf,
    },
}

fn main() -> Result<()> {
    use MsgColor::*;
    let args = Args::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(stitch::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    match args.command {
        Some(Command::Run {
            files,
            features,
            minimal,
        }) => {
            output::set_minimal(minimal);
            run(&files, features.unwrap_or_default())
        }
        Some(Command::Asm {
            files,
            output: dest,
            minimal,
        }) => {
            output::set_minimal(minimal);
            if dest.is_some() && files.len() > 1 {
                bail!("Cannot use `--output` with more than one input file");
            }
            let mut failed = 0;
            for file in &files {
                let dest = dest.clone().unwrap_or_else(|| file.with_extension("obj"));
                if let Err(report) = assemble_file(file, &dest) {
                    file_message(Red, "Failed", file);
                    eprintln!("{report:?}");
                    failed += 1;
                }
            }
            if failed > 0 {
                bail!("{failed} of {} file(s) failed to assemble", files.len());
            }
            Ok(())
        }
        Some(Command::Check { name }) => {
            file_message(Green, "Checking", &name);
            let contents = fs::read_to_string(&name).into_diagnostic()?;
            assemble(&contents, &name)?;
            message(Green, "Success", "no errors found!");
            Ok(())
        }
        None => match args.path {
            Some(path) => run(&[path], Features::default()),
            None => {
                println!("\n~ stitch v{VERSION} ~");
                println!("{SHORT_INFO}");
                Ok(())
            }
        },
    }
}

fn assemble_file(name: &Path, dest: &Path) -> Result<()> {
    file_message(MsgColor::Green, "Assembling", name);
    let contents = fs::read_to_string(name).into_diagnostic()?;
    let air = assemble(&contents, name)?;
    let bytes = stitch::object::to_bytes(air.orig(), &air.words());
    fs::write(dest, bytes).into_diagnostic()?;
    file_message(MsgColor::Green, "Saved", dest);
    Ok(())
}

fn run(files: &[PathBuf], features: Features) -> Result<()> {
    let mut state = RunState::with_features(features);
    let mut entry = None;
    for file in files {
        file_message(MsgColor::Green, "Loading", file);
        match load(&mut state, file) {
            Ok(origin) => {
                entry.get_or_insert(origin);
            }
            Err(report) => {
                file_message(MsgColor::Red, "Failed", file);
                eprintln!("{report:?}");
            }
        }
    }
    let Some(entry) = entry else {
        bail!("No program could be loaded");
    };
    state.set_pc(entry);

    message(MsgColor::Green, "Running", format_args!("from x{entry:04X}"));
    let reason = {
        // Terminal is restored when the console drops
        let mut console = TerminalConsole::new().into_diagnostic()?;
        state.run(&mut console)
    };

    if reason.is_fault() {
        message(MsgColor::Red, "Halted", reason);
        bail!("Program stopped: {reason}");
    }
    message(MsgColor::Cyan, "Halted", reason);
    Ok(())
}

/// Load one file into the machine, assembling it first if it is source.
fn load(state: &mut RunState, name: &Path) -> Result<u16> {
    if name.extension().is_some_and(|ext| ext == "asm") {
        let contents = fs::read_to_string(name).into_diagnostic()?;
        let air = assemble(&contents, name)?;
        Ok(state.load_air(&air))
    } else {
        let bytes = fs::read(name).into_diagnostic()?;
        Ok(state.load_object(&bytes)?)
    }
}

/// Return assembly intermediate representation of source file, reporting every error found.
fn assemble(contents: &str, name: &Path) -> Result<Air> {
    stitch::assemble_air(contents).map_err(|errors| {
        let count = errors.len();
        for error in errors {
            eprintln!("{:?}", miette::Report::new(error));
        }
        miette!(
            "Could not assemble {} due to {count} previous error(s)",
            name.display()
        )
    })
}

const SHORT_INFO: &str = r"
Welcome to stitch, an assembler and virtual machine for LC3 assembly code.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
