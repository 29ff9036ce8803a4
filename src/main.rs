use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use miette::{MietteHandlerOpts, NamedSource, Report};

use regmach::classify::LabelRole;
use regmach::output::{self, message, MsgColor};
use regmach::symbol::Tag;
use regmach::{Error, Program, RunState};

/// Interpreter for tiny hex-coded register machine programs.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Program file to run
    path: Option<PathBuf>,

    /// Print every executed instruction to stderr
    #[arg(
        long,
        global = true,
        env = "REGMACH_TRACE",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    trace: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program and print its output to the terminal
    Run {
        /// Program file to run
        name: PathBuf,
        /// Only print program output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Build a program without running it
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Print the classified tokens and label table of a program
    Dump {
        /// File to dump
        name: PathBuf,
    },
}

/// An error together with the source text it points into, if any was read.
struct Failure {
    error: Error,
    source: Option<NamedSource<String>>,
}

impl Failure {
    fn in_source(error: Error, path: &Path, src: &str) -> Self {
        Failure {
            error,
            source: Some(NamedSource::new(path.display().to_string(), src.to_string())),
        }
    }

    /// Print the diagnostic and turn it into the process exit status.
    fn report(self) -> ExitCode {
        let status = self.error.status();
        let stage = if self.error.is_build_error() {
            "Build failed"
        } else {
            "Run failed"
        };
        let mut report = Report::new(self.error);
        if let Some(source) = self.source {
            message(MsgColor::Red, stage, format!("target {}", source.name()));
            report = report.with_source_code(source);
        }
        eprintln!("{report:?}");
        ExitCode::from(status)
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Failure {
            error,
            source: None,
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => return usage_exit(e),
    };

    if let Err(e) = miette::set_hook(Box::new(|_| {
        Box::new(
            MietteHandlerOpts::new() //
                .context_lines(regmach::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    })) {
        eprintln!("{e}");
    }

    let result = match args.command {
        Some(Command::Run { name, minimal }) => {
            output::set_minimal(minimal);
            run(&name, args.trace)
        }
        Some(Command::Check { name }) => check(&name),
        Some(Command::Dump { name }) => dump(&name),
        None => match args.path {
            Some(path) => run(&path, args.trace),
            None => {
                eprintln!("{SHORT_INFO}");
                Err(Error::MissingArgument.into())
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => failure.report(),
    }
}

/// Clap renders its own messages, the exit status follows [`Error::status`].
fn usage_exit(e: clap::Error) -> ExitCode {
    if let Err(io) = e.print() {
        eprintln!("{io}");
    }
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        ErrorKind::MissingRequiredArgument => ExitCode::from(Error::MissingArgument.status()),
        _ => ExitCode::from(Error::Usage.status()),
    }
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    message(color, left, format!("target {}", right.display()));
}

fn read_source(path: &Path) -> Result<String, Error> {
    let bytes = fs::read(path).map_err(|source| Error::OpenFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn build(path: &Path, src: &str) -> Result<Program, Failure> {
    Program::build(src).map_err(|e| Failure::in_source(e, path, src))
}

fn run(path: &Path, trace: bool) -> Result<(), Failure> {
    file_message(MsgColor::Green, "Assembling", path);
    let src = read_source(path)?;
    let program = build(path, &src)?;

    message(MsgColor::Green, "Running", format!("{} tokens", program.len()));
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let res = RunState::new(&program).with_trace(trace).run(&mut out);
    // Keep whatever was printed before a failure
    out.flush().map_err(Error::from)?;
    res.map_err(|e| Failure::in_source(e, path, &src))?;

    file_message(MsgColor::Green, "Completed", path);
    Ok(())
}

fn check(path: &Path) -> Result<(), Failure> {
    file_message(MsgColor::Green, "Checking", path);
    let src = read_source(path)?;
    build(path, &src)?;
    message(MsgColor::Green, "Success", "no errors found!");
    Ok(())
}

fn dump(path: &Path) -> Result<(), Failure> {
    let src = read_source(path)?;
    let program = build(path, &src)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut emit = || -> io::Result<()> {
        for (pos, token) in program.tokens().iter().enumerate() {
            let role = match (token.tag, token.role) {
                (Tag::Label, LabelRole::Definition) => "def",
                (Tag::Label, LabelRole::Reference) => "ref",
                _ => "",
            };
            writeln!(out, "{pos:>5}  {:<4} {:<3} {}", token.tag, role, token.text)?;
        }
        writeln!(out, "labels:")?;
        for (name, pos) in program.labels() {
            writeln!(out, "{pos:>5}  {name}")?;
        }
        out.flush()
    };
    emit().map_err(Error::from)?;
    Ok(())
}

const SHORT_INFO: &str = r"
regmach runs programs written as hex opcode words, for example:

    10 R0 C5
    16 R0

Please use `-h` or `--help` to access the usage instructions.
";
