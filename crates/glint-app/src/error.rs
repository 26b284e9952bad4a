use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::preprocess::Diagnostic;

/// What went wrong inside a `$name(min,max).initial` token.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TokenErrorKind {
    #[error("variable name is empty")]
    EmptyName,
    #[error("cannot parse number '{0}'")]
    InvalidNumber(String),
    #[error("expected ',' between bounds")]
    ExpectedComma,
    #[error("expected ')' to close bounds")]
    UnterminatedBounds,
    #[error("min {min} is greater than max {max}")]
    InvertedBounds { min: f32, max: f32 },
}

/// A malformed parameter token. Line and column are 1-based within the stage block.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("variable error at {line}:{column}: {kind}")]
pub struct TokenError {
    pub line: usize,
    pub column: usize,
    pub kind: TokenErrorKind,
}

/// Every way a reload can fail. None of these reach the render loop.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("cannot open shader file {}: {source}", path.display())]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("stage {stage}: {error}")]
    TokenSyntax { stage: usize, error: TokenError },
    #[error("stage {stage} failed to compile ({})", DiagnosticCount(diagnostics.len()))]
    StageCompile {
        stage: usize,
        diagnostics: Vec<Diagnostic>,
    },
}

struct DiagnosticCount(usize);

impl fmt::Display for DiagnosticCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => f.write_str("1 diagnostic"),
            n => write!(f, "{n} diagnostics"),
        }
    }
}
