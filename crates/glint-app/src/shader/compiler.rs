use naga::front::glsl::{Frontend, Options, ParseErrors};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Module, ShaderStage, Span, WithSpan};

use crate::preprocess::CompilerMessage;

/// Parse and validate a fragment-stage GLSL compile unit.
///
/// wgpu would reject the same source at module creation, but only naga's own
/// errors carry spans that map back to a line in the shader file.
pub fn validate_fragment(source: &str) -> Result<Module, Vec<CompilerMessage>> {
    let mut frontend = Frontend::default();
    let options = Options::from(ShaderStage::Fragment);
    let module = frontend
        .parse(&options, source)
        .map_err(|errors| parse_messages(&errors, source))?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .map_err(|error| vec![validation_message(&error, source)])?;

    Ok(module)
}

fn line_of(span: Span, source: &str) -> Option<u32> {
    span.is_defined()
        .then(|| span.location(source).line_number)
}

fn parse_messages(errors: &ParseErrors, source: &str) -> Vec<CompilerMessage> {
    errors
        .errors
        .iter()
        .map(|e| CompilerMessage {
            line: line_of(e.meta, source),
            text: e.kind.to_string(),
        })
        .collect()
}

fn validation_message<E: std::error::Error>(error: &WithSpan<E>, source: &str) -> CompilerMessage {
    let line = error.spans().find_map(|(span, _)| line_of(*span, source));

    let mut text = error.as_inner().to_string();
    let mut cause = std::error::Error::source(error.as_inner());
    while let Some(inner) = cause {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        cause = inner.source();
    }

    CompilerMessage { line, text }
}
