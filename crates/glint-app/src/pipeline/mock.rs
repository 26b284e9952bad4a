//! Recording backend for tests.
//!
//! Records every call and simulates target contents as a single float: a draw
//! writes `1 + previous value of its own channel`, a clear writes 0. Reading
//! a target back after some frames tells how many frames accumulated.

use std::collections::HashMap;

use crate::preprocess::{CompileUnit, CompilerMessage};

use super::backend::{RenderBackend, StageUniforms, CHANNEL_COUNT};

/// Source lines containing this fail to compile.
pub const FAIL_MARKER: &str = "#error";

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Compile(usize),
    CreateTarget {
        label: String,
        width: u32,
        height: u32,
    },
    Clear(usize),
    Draw {
        stage: usize,
        inputs: [usize; CHANNEL_COUNT],
        output: usize,
    },
    Composite {
        source: Option<usize>,
        downscale: u32,
    },
}

#[derive(Debug, PartialEq)]
pub struct MockProgram {
    pub stage: usize,
}

#[derive(Debug, PartialEq)]
pub struct MockTarget {
    pub id: usize,
}

#[derive(Debug, Default)]
pub struct MockBackend {
    pub calls: Vec<MockCall>,
    pub last_params: Vec<f32>,
    contents: HashMap<usize, f32>,
    next_id: usize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(&self, stage: usize) -> MockProgram {
        MockProgram { stage }
    }

    pub fn id(&self, target: &MockTarget) -> usize {
        target.id
    }

    pub fn contents(&self, target: &MockTarget) -> f32 {
        self.contents.get(&target.id).copied().unwrap_or(0.0)
    }

    pub fn compiled_stages(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                MockCall::Compile(stage) => Some(*stage),
                _ => None,
            })
            .collect()
    }
}

impl RenderBackend for MockBackend {
    type Program = MockProgram;
    type Target = MockTarget;

    fn compile(&mut self, unit: &CompileUnit) -> Result<MockProgram, Vec<CompilerMessage>> {
        self.calls.push(MockCall::Compile(unit.stage));
        let failing = unit
            .source
            .lines()
            .position(|l| l.contains(FAIL_MARKER));
        match failing {
            Some(i) => Err(vec![CompilerMessage {
                line: Some(i as u32 + 1),
                text: "error directive".into(),
            }]),
            None => Ok(MockProgram { stage: unit.stage }),
        }
    }

    fn create_target(&mut self, label: &str, width: u32, height: u32) -> MockTarget {
        self.calls.push(MockCall::CreateTarget {
            label: label.to_string(),
            width,
            height,
        });
        let id = self.next_id;
        self.next_id += 1;
        self.contents.insert(id, 0.0);
        MockTarget { id }
    }

    fn clear(&mut self, target: &MockTarget) {
        self.calls.push(MockCall::Clear(target.id));
        self.contents.insert(target.id, 0.0);
    }

    fn draw(
        &mut self,
        program: &MockProgram,
        uniforms: &StageUniforms<'_>,
        inputs: [&MockTarget; CHANNEL_COUNT],
        output: &MockTarget,
    ) {
        self.calls.push(MockCall::Draw {
            stage: program.stage,
            inputs: inputs.map(|t| t.id),
            output: output.id,
        });
        self.last_params = uniforms.params.to_vec();
        let previous = self.contents(inputs[program.stage]);
        self.contents.insert(output.id, previous + 1.0);
    }

    fn composite(&mut self, source: Option<&MockTarget>, downscale: u32) {
        self.calls.push(MockCall::Composite {
            source: source.map(|t| t.id),
            downscale,
        });
    }
}
