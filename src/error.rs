use std::io;
use std::path::PathBuf;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::symbol::{Opcode, Tag};

/// Everything that can stop a build or a run. Each variant maps onto a distinct process exit
/// status through [`Error::status`].
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("No source file provided.")]
    #[diagnostic(code(cli::missing_argument), help("pass the path of a program to run"))]
    MissingArgument,

    #[error("Invalid command line arguments.")]
    #[diagnostic(code(cli::usage), help("use `--help` to see the accepted arguments"))]
    Usage,

    #[error("Failed to open file {}", path.display())]
    #[diagnostic(code(cli::open_file))]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    // Build errors
    #[error("Encountered an unknown opcode `{text}`")]
    #[diagnostic(
        code(build::unknown_opcode),
        help("opcodes are the hex numerals 10 (MOV) through 16 (OUT)")
    )]
    UnknownOpcode {
        text: String,
        #[label("unknown opcode")]
        span: SourceSpan,
    },

    #[error("Jump to undefined label `{label}`")]
    #[diagnostic(
        code(build::undefined_label),
        help("define the label somewhere that does not directly follow JEQ or JNE")
    )]
    UndefinedLabel {
        label: String,
        #[label("no such label")]
        span: SourceSpan,
    },

    // Runtime errors
    #[error("{op} expected {expected} operand, found {found}")]
    #[diagnostic(code(run::operand_shape), help("check the operands for this instruction"))]
    UnexpectedOperand {
        op: Opcode,
        expected: &'static str,
        found: &'static str,
        #[label("unexpected operand")]
        span: SourceSpan,
    },

    #[error("Register `{text}` does not exist")]
    #[diagnostic(code(run::register_range), help("registers range from R0 to R7"))]
    RegisterOutOfRange {
        text: String,
        #[label("register out of range")]
        span: SourceSpan,
    },

    #[error("Encountered a malformed operand `{text}`")]
    #[diagnostic(
        code(run::malformed_operand),
        help("operand values are hex numerals, immediates must fit in 32 bits")
    )]
    MalformedOperand {
        text: String,
        #[label("malformed operand")]
        span: SourceSpan,
    },

    #[error("Cannot execute unknown token `{text}`")]
    #[diagnostic(
        code(run::unresolved),
        help("tokens must be opcodes, labels, registers or immediates")
    )]
    UnresolvedToken {
        text: String,
        #[label("unknown token")]
        span: SourceSpan,
    },

    #[error("Failed to write program output")]
    #[diagnostic(code(run::output))]
    Output(#[from] io::Error),
}

impl Error {
    /// Process exit status reported for this error. Zero is reserved for success.
    pub fn status(&self) -> u8 {
        match self {
            Error::MissingArgument => 1,
            Error::OpenFile { .. } => 2,
            Error::UnknownOpcode { .. } => 3,
            Error::UnexpectedOperand { .. } => 4,
            Error::RegisterOutOfRange { .. } => 5,
            Error::UndefinedLabel { .. } => 6,
            Error::MalformedOperand { .. } => 7,
            Error::UnresolvedToken { .. } => 8,
            Error::Output(_) => 9,
            Error::Usage => 10,
        }
    }

    /// Errors raised while building, before any instruction runs.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownOpcode { .. } | Error::UndefinedLabel { .. }
        )
    }
}

/// Description of an operand slot for [`Error::UnexpectedOperand`].
pub(crate) fn describe_slot(tag: Option<Tag>) -> &'static str {
    match tag {
        Some(tag) => tag.describe(),
        None => "end of program",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_distinct() {
        let span = SourceSpan::from(0..1);
        let errors = [
            Error::MissingArgument,
            Error::OpenFile {
                path: PathBuf::from("x"),
                source: io::Error::new(io::ErrorKind::NotFound, "x"),
            },
            Error::UnknownOpcode { text: "1F".into(), span },
            Error::UnexpectedOperand {
                op: Opcode::Mov,
                expected: "register",
                found: "label",
                span,
            },
            Error::RegisterOutOfRange { text: "R8".into(), span },
            Error::UndefinedLabel { label: "Ax".into(), span },
            Error::MalformedOperand { text: "Rz".into(), span },
            Error::UnresolvedToken { text: "zz".into(), span },
            Error::Output(io::Error::new(io::ErrorKind::BrokenPipe, "x")),
            Error::Usage,
        ];
        let mut statuses: Vec<u8> = errors.iter().map(Error::status).collect();
        assert!(!statuses.contains(&0));
        statuses.sort_unstable();
        statuses.dedup();
        assert_eq!(statuses.len(), errors.len());
    }

    #[test]
    fn messages() {
        let err = Error::UnexpectedOperand {
            op: Opcode::Jeq,
            expected: "label",
            found: describe_slot(None),
            span: SourceSpan::from(0..2),
        };
        assert_eq!(err.to_string(), "JEQ expected label operand, found end of program");
        assert!(!err.is_build_error());
        let err = Error::UnknownOpcode {
            text: "1F".into(),
            span: SourceSpan::from(0..2),
        };
        assert_eq!(err.to_string(), "Encountered an unknown opcode `1F`");
        assert!(err.is_build_error());
    }
}
