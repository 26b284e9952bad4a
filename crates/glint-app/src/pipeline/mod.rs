//! Multi-pass render pipeline.
//!
//! Holds 0-4 compiled stages and always-allocated feedback channels. Each
//! frame every active stage reads the previous frame of all four channels and
//! writes its own; the last stage's output is composited to the display.

pub mod backend;
pub mod channel;
#[cfg(test)]
pub mod mock;

use std::collections::HashSet;

use crate::params::VariableRegistry;

pub use backend::{FrameGlobals, RenderBackend, StageUniforms, CHANNEL_COUNT};
pub use channel::{channel_size, ChannelBuffer};

/// A compiled stage and the uniform layout it was built against.
pub struct Stage<P> {
    pub program: P,
    /// Parameter names in Globals block order.
    pub parameters: Vec<String>,
    /// Parameters the stage's source refers to.
    pub referenced: Vec<String>,
}

pub struct Pipeline<B: RenderBackend> {
    stages: Vec<Stage<B::Program>>,
    channels: [ChannelBuffer<B::Target>; CHANNEL_COUNT],
    width: u32,
    height: u32,
    downscale: u32,
    invalidated: bool,
}

impl<B: RenderBackend> Pipeline<B> {
    pub fn new(backend: &mut B, width: u32, height: u32, downscale: u32) -> Self {
        let downscale = downscale.max(1);
        let (w, h) = channel_size(width, height, downscale);
        let channels = std::array::from_fn(|i| ChannelBuffer::new(backend, i, w, h));
        Self {
            stages: Vec::new(),
            channels,
            width,
            height,
            downscale,
            invalidated: true,
        }
    }

    pub fn active_stage_count(&self) -> usize {
        self.stages.len()
    }

    #[cfg(test)]
    pub fn channel(&self, index: usize) -> &ChannelBuffer<B::Target> {
        &self.channels[index]
    }

    /// Swap in a freshly compiled stage sequence, dropping the old programs.
    /// Program behavior changed, so accumulated feedback is discarded.
    pub fn replace_stages(&mut self, stages: Vec<Stage<B::Program>>) {
        debug_assert!(stages.len() <= CHANNEL_COUNT);
        self.stages = stages;
        self.invalidated = true;
    }

    /// Clear all channels before the next frame's writes.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    #[cfg(test)]
    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn downscale(&self) -> u32 {
        self.downscale
    }

    /// Size the stages render at.
    pub fn channel_resolution(&self) -> (u32, u32) {
        channel_size(self.width, self.height, self.downscale)
    }

    pub fn resize(&mut self, backend: &mut B, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.reallocate(backend);
    }

    /// Returns true if the factor changed.
    pub fn set_downscale(&mut self, backend: &mut B, downscale: u32) -> bool {
        let downscale = downscale.max(1);
        if downscale == self.downscale {
            return false;
        }
        self.downscale = downscale;
        self.reallocate(backend);
        true
    }

    fn reallocate(&mut self, backend: &mut B) {
        let (w, h) = self.channel_resolution();
        self.channels = std::array::from_fn(|i| ChannelBuffer::new(backend, i, w, h));
        self.invalidated = true;
        log::debug!("Channel buffers reallocated at {w}x{h} (downscale {})", self.downscale);
    }

    /// Whether any active stage refers to `name`.
    pub fn uses_parameter(&self, name: &str) -> bool {
        self.stages
            .iter()
            .any(|s| s.referenced.iter().any(|r| r == name))
    }

    pub fn referenced_parameters(&self) -> HashSet<String> {
        self.stages
            .iter()
            .flat_map(|s| s.referenced.iter().cloned())
            .collect()
    }

    /// Render one frame.
    pub fn render(&mut self, backend: &mut B, globals: &FrameGlobals, registry: &VariableRegistry) {
        if self.stages.is_empty() {
            backend.composite(None, self.downscale);
            self.invalidated = false;
            return;
        }

        if self.invalidated {
            for channel in &self.channels {
                channel.clear(backend);
            }
        }

        for (index, stage) in self.stages.iter().enumerate() {
            let params = registry.pack_values(&stage.parameters);
            let uniforms = StageUniforms {
                globals,
                params: &params,
            };
            let inputs: [&B::Target; CHANNEL_COUNT] =
                std::array::from_fn(|i| self.channels[i].read_target());
            backend.draw(
                &stage.program,
                &uniforms,
                inputs,
                self.channels[index].write_target(),
            );
        }

        let last = self.stages.len() - 1;
        backend.composite(Some(self.channels[last].write_target()), self.downscale);

        for channel in self.channels.iter_mut().take(self.stages.len()) {
            channel.flip();
        }
        self.invalidated = false;
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockBackend, MockCall};
    use super::*;
    use crate::params::Declaration;

    fn stage(backend: &mut MockBackend, index: usize) -> Stage<<MockBackend as RenderBackend>::Program> {
        Stage {
            program: backend.program(index),
            parameters: Vec::new(),
            referenced: Vec::new(),
        }
    }

    fn pipeline_with(backend: &mut MockBackend, count: usize) -> Pipeline<MockBackend> {
        let mut p = Pipeline::new(backend, 64, 32, 1);
        let stages = (0..count).map(|i| stage(backend, i)).collect();
        p.replace_stages(stages);
        p
    }

    #[test]
    fn always_allocates_four_channels() {
        let mut b = MockBackend::new();
        let p = Pipeline::new(&mut b, 64, 32, 2);
        assert_eq!(p.active_stage_count(), 0);
        let created = b
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::CreateTarget { width: 32, height: 16, .. }))
            .count();
        assert_eq!(created, 2 * CHANNEL_COUNT);
    }

    #[test]
    fn zero_stages_presents_blank_frame() {
        let mut b = MockBackend::new();
        let mut p = Pipeline::new(&mut b, 64, 32, 1);
        b.calls.clear();
        p.render(&mut b, &FrameGlobals::default(), &VariableRegistry::new());
        assert_eq!(b.calls, vec![MockCall::Composite { source: None, downscale: 1 }]);
    }

    #[test]
    fn stages_draw_in_order_into_their_channel() {
        let mut b = MockBackend::new();
        let mut p = pipeline_with(&mut b, 3);
        b.calls.clear();
        p.render(&mut b, &FrameGlobals::default(), &VariableRegistry::new());
        let draws: Vec<(usize, usize)> = b
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::Draw { stage, output, .. } => Some((*stage, *output)),
                _ => None,
            })
            .collect();
        let outputs: Vec<usize> = (0..3).map(|i| b.id(p.channel(i).read_target())).collect();
        // After the flip, last frame's write target is this frame's read target.
        assert_eq!(draws, vec![(0, outputs[0]), (1, outputs[1]), (2, outputs[2])]);
    }

    #[test]
    fn every_stage_reads_previous_frame_of_all_channels() {
        let mut b = MockBackend::new();
        let mut p = pipeline_with(&mut b, 2);
        let reads: [usize; CHANNEL_COUNT] = std::array::from_fn(|i| b.id(p.channel(i).read_target()));
        let writes: Vec<usize> = (0..2).map(|i| b.id(p.channel(i).write_target())).collect();
        b.calls.clear();
        p.render(&mut b, &FrameGlobals::default(), &VariableRegistry::new());
        for call in &b.calls {
            if let MockCall::Draw { inputs, output, .. } = call {
                assert_eq!(*inputs, reads);
                assert!(!inputs.contains(output));
                assert!(writes.contains(output));
            }
        }
    }

    #[test]
    fn composites_last_stage_output() {
        let mut b = MockBackend::new();
        let mut p = pipeline_with(&mut b, 2);
        let last_write = b.id(p.channel(1).write_target());
        b.calls.clear();
        p.render(&mut b, &FrameGlobals::default(), &VariableRegistry::new());
        assert_eq!(
            b.calls.last(),
            Some(&MockCall::Composite {
                source: Some(last_write),
                downscale: 1
            })
        );
    }

    #[test]
    fn feedback_accumulates_until_invalidated() {
        let mut b = MockBackend::new();
        let mut p = pipeline_with(&mut b, 1);
        let g = FrameGlobals::default();
        let r = VariableRegistry::new();
        for _ in 0..3 {
            p.render(&mut b, &g, &r);
        }
        assert_eq!(b.contents(p.channel(0).read_target()), 3.0);

        // No-op frame keeps accumulating.
        p.render(&mut b, &g, &r);
        assert_eq!(b.contents(p.channel(0).read_target()), 4.0);

        // Camera move: cleared before the next write.
        p.invalidate();
        p.render(&mut b, &g, &r);
        assert_eq!(b.contents(p.channel(0).read_target()), 1.0);
        assert!(!p.is_invalidated());
    }

    #[test]
    fn invalidation_clears_before_any_draw() {
        let mut b = MockBackend::new();
        let mut p = pipeline_with(&mut b, 2);
        p.render(&mut b, &FrameGlobals::default(), &VariableRegistry::new());
        b.calls.clear();

        p.render(&mut b, &FrameGlobals::default(), &VariableRegistry::new());
        assert!(!b.calls.iter().any(|c| matches!(c, MockCall::Clear(_))));

        p.invalidate();
        b.calls.clear();
        p.render(&mut b, &FrameGlobals::default(), &VariableRegistry::new());
        let first_draw = b
            .calls
            .iter()
            .position(|c| matches!(c, MockCall::Draw { .. }))
            .unwrap();
        let clears = b.calls[..first_draw]
            .iter()
            .filter(|c| matches!(c, MockCall::Clear(_)))
            .count();
        assert_eq!(clears, 2 * CHANNEL_COUNT);
    }

    #[test]
    fn replacing_stages_invalidates() {
        let mut b = MockBackend::new();
        let mut p = pipeline_with(&mut b, 1);
        p.render(&mut b, &FrameGlobals::default(), &VariableRegistry::new());
        assert!(!p.is_invalidated());
        let s = stage(&mut b, 0);
        p.replace_stages(vec![s]);
        assert!(p.is_invalidated());
    }

    #[test]
    fn downscale_change_reallocates_and_invalidates() {
        let mut b = MockBackend::new();
        let mut p = pipeline_with(&mut b, 1);
        p.render(&mut b, &FrameGlobals::default(), &VariableRegistry::new());
        b.calls.clear();
        assert!(p.set_downscale(&mut b, 4));
        assert!(p.is_invalidated());
        assert_eq!(p.channel_resolution(), (16, 8));
        assert!(b
            .calls
            .iter()
            .all(|c| matches!(c, MockCall::CreateTarget { width: 16, height: 8, .. })));
        assert!(!p.set_downscale(&mut b, 4));
    }

    #[test]
    fn resize_to_same_size_is_a_noop() {
        let mut b = MockBackend::new();
        let mut p = pipeline_with(&mut b, 1);
        p.render(&mut b, &FrameGlobals::default(), &VariableRegistry::new());
        b.calls.clear();
        p.resize(&mut b, 64, 32);
        assert!(b.calls.is_empty());
        p.resize(&mut b, 128, 32);
        assert_eq!(b.calls.len(), 2 * CHANNEL_COUNT);
    }

    #[test]
    fn stage_uniforms_follow_block_order() {
        let mut b = MockBackend::new();
        let mut p = Pipeline::new(&mut b, 8, 8, 1);
        let mut r = VariableRegistry::new();
        r.merge(&[
            Declaration { name: "a".into(), bounds: None, initial: None },
            Declaration { name: "b".into(), bounds: None, initial: None },
        ]);
        r.set_value("b", 0.25);
        p.replace_stages(vec![Stage {
            program: b.program(0),
            parameters: vec!["b".into(), "a".into()],
            referenced: vec!["b".into()],
        }]);
        p.render(&mut b, &FrameGlobals::default(), &r);
        assert_eq!(b.last_params, vec![0.25, 0.5]);
        assert!(p.uses_parameter("b"));
        assert!(!p.uses_parameter("a"));
    }
}
