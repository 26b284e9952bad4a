use super::backend::RenderBackend;

/// Two targets for ping-pong feedback (previous frame access).
///
/// Stages read the previous frame from `read_target` while the stage owning
/// the channel writes `write_target`; `flip` swaps them after the frame.
pub struct ChannelBuffer<T> {
    pub targets: [T; 2],
    pub current: usize,
}

impl<T> ChannelBuffer<T> {
    pub fn new<B>(backend: &mut B, index: usize, width: u32, height: u32) -> Self
    where
        B: RenderBackend<Target = T>,
    {
        let a = backend.create_target(&format!("channel{index}-a"), width, height);
        let b = backend.create_target(&format!("channel{index}-b"), width, height);
        Self {
            targets: [a, b],
            current: 0,
        }
    }

    /// The target we render the current frame into.
    pub fn write_target(&self) -> &T {
        &self.targets[self.current]
    }

    /// The target containing the previous frame's output.
    pub fn read_target(&self) -> &T {
        &self.targets[1 - self.current]
    }

    pub fn flip(&mut self) {
        self.current = 1 - self.current;
    }

    /// Discard accumulated contents on both halves.
    pub fn clear<B>(&self, backend: &mut B)
    where
        B: RenderBackend<Target = T>,
    {
        backend.clear(&self.targets[0]);
        backend.clear(&self.targets[1]);
    }
}

/// Display size divided by the downscale factor, never below 1x1.
pub fn channel_size(width: u32, height: u32, downscale: u32) -> (u32, u32) {
    let d = downscale.max(1);
    ((width / d).max(1), (height / d).max(1))
}
