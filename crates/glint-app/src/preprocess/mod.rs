pub mod split;
pub mod token;
pub mod unit;

pub use split::{split_stages, StageBlock, MAX_STAGES};
pub use token::{parse_tokens, ParsedStage};
pub use unit::{CompileUnit, CompilerMessage, Diagnostic};
