//! Compile unit builder.
//!
//! Prepends the standard uniform preamble and one declaration per registered
//! parameter to a rewritten stage block, and maps compiler line numbers back
//! to the block.

use crate::params::types::uniform_name;
use crate::params::VariableRegistry;

use super::split::StageBlock;
use super::token::ParsedStage;

/// Everything up to the first parameter declaration.
///
/// The Globals block layout is mirrored by `gpu::uniforms::GlobalsStd140`.
const PREAMBLE_HEAD: &str = "#version 450
layout(location = 0) out vec4 fragColor;
layout(set = 0, binding = 1) uniform sampler glint_sampler;
layout(set = 0, binding = 2) uniform texture2D glint_channel0;
layout(set = 0, binding = 3) uniform texture2D glint_channel1;
layout(set = 0, binding = 4) uniform texture2D glint_channel2;
layout(set = 0, binding = 5) uniform texture2D glint_channel3;
#define iChannel0 sampler2D(glint_channel0, glint_sampler)
#define iChannel1 sampler2D(glint_channel1, glint_sampler)
#define iChannel2 sampler2D(glint_channel2, glint_sampler)
#define iChannel3 sampler2D(glint_channel3, glint_sampler)
layout(std140, set = 0, binding = 0) uniform Globals {
    vec3 iPos;
    mat3 iEye;
    float iTime;
    float iFrame;
    vec2 iResolution;
";

/// Closes the Globals block after the parameter lines.
const PREAMBLE_TAIL: &str = "};
";

/// Preamble lines that do not depend on the registry.
pub fn fixed_header_lines() -> usize {
    PREAMBLE_HEAD.lines().count() + PREAMBLE_TAIL.lines().count()
}

/// Build the compiled source for one rewritten stage block.
///
/// Returns the source and the number of preamble lines in front of the
/// user code (`original_line = reported_line - preamble_line_count`).
pub fn build(stage_source: &str, registry: &VariableRegistry) -> (String, usize) {
    let mut out = String::with_capacity(PREAMBLE_HEAD.len() + stage_source.len() + 32 * registry.len());
    out.push_str(PREAMBLE_HEAD);
    for p in registry.iter() {
        out.push_str("    float ");
        out.push_str(&uniform_name(&p.name));
        out.push_str(";\n");
    }
    out.push_str(PREAMBLE_TAIL);
    out.push_str(stage_source);
    (out, fixed_header_lines() + registry.len())
}

/// A message from the shader compiler, in compiled-source coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerMessage {
    pub line: Option<u32>,
    pub text: String,
}

/// A compiler message remapped to the stage block (1-based).
///
/// Messages without a line, or pointing into the preamble, get `line <= 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: i64,
    pub text: String,
}

/// One stage, ready for the compiler.
#[derive(Debug, Clone)]
pub struct CompileUnit {
    pub stage: usize,
    pub source: String,
    pub preamble_lines: usize,
    pub first_line: usize,
    /// Parameter names in Globals block order.
    pub parameters: Vec<String>,
    /// Parameter names the stage's own code refers to.
    pub referenced: Vec<String>,
}

impl CompileUnit {
    pub fn new(block: &StageBlock, parsed: &ParsedStage, registry: &VariableRegistry) -> Self {
        let (source, preamble_lines) = build(&parsed.source, registry);
        Self {
            stage: block.index,
            source,
            preamble_lines,
            first_line: block.first_line,
            parameters: registry.names(),
            referenced: parsed.referenced(),
        }
    }

    pub fn remap(&self, messages: &[CompilerMessage]) -> Vec<Diagnostic> {
        messages
            .iter()
            .map(|m| Diagnostic {
                line: m
                    .line
                    .map_or(0, |l| i64::from(l) - self.preamble_lines as i64),
                text: m.text.clone(),
            })
            .collect()
    }

    /// Whole-file line for a remapped diagnostic, if it points at user code.
    pub fn file_line(&self, diagnostic: &Diagnostic) -> Option<usize> {
        usize::try_from(diagnostic.line)
            .ok()
            .filter(|&l| l > 0)
            .map(|l| l + self.first_line - 1)
    }
}
