use bytemuck::{Pod, Zeroable};

use crate::pipeline::StageUniforms;

/// Fixed head of the `Globals` block, std140.
/// Must be kept in sync with the preamble in `preprocess::unit`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct GlobalsStd140 {
    pub position: [f32; 3],
    pub _pad0: f32,
    // mat3 columns are padded to vec4 in std140
    pub eye: [[f32; 4]; 3],
    pub time: f32,
    pub frame: f32,
    pub resolution: [f32; 2],
    // 80 bytes; parameter floats follow tightly packed
}

/// Byte size of a `Globals` block carrying `param_count` parameters.
pub fn block_size(param_count: usize) -> u64 {
    let raw = std::mem::size_of::<GlobalsStd140>() + 4 * param_count;
    raw.next_multiple_of(16) as u64
}

/// Pack the header and parameter values into a buffer of exactly
/// `block_size(params.len())` bytes.
pub fn pack(uniforms: &StageUniforms<'_>) -> Vec<u8> {
    let g = uniforms.globals;
    let column = |c: [f32; 3]| [c[0], c[1], c[2], 0.0];
    let head = GlobalsStd140 {
        position: g.position,
        _pad0: 0.0,
        eye: [column(g.eye[0]), column(g.eye[1]), column(g.eye[2])],
        time: g.time,
        frame: g.frame,
        resolution: g.resolution,
    };

    let size = block_size(uniforms.params.len()) as usize;
    let mut bytes = Vec::with_capacity(size);
    bytes.extend_from_slice(bytemuck::bytes_of(&head));
    bytes.extend_from_slice(bytemuck::cast_slice(uniforms.params));
    bytes.resize(size, 0);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FrameGlobals;

    #[test]
    fn globals_header_size_80() {
        assert_eq!(std::mem::size_of::<GlobalsStd140>(), 80);
    }

    #[test]
    fn block_size_rounds_to_16() {
        assert_eq!(block_size(0), 80);
        assert_eq!(block_size(1), 96);
        assert_eq!(block_size(4), 96);
        assert_eq!(block_size(5), 112);
    }

    #[test]
    fn pack_places_fields_at_std140_offsets() {
        let globals = FrameGlobals {
            position: [1.0, 2.0, 3.0],
            eye: [[4.0, 5.0, 6.0], [7.0, 8.0, 9.0], [10.0, 11.0, 12.0]],
            time: 13.0,
            frame: 14.0,
            resolution: [15.0, 16.0],
        };
        let params = [17.0, 18.0];
        let bytes = pack(&StageUniforms {
            globals: &globals,
            params: &params,
        });
        assert_eq!(bytes.len(), 96);
        let floats: &[f32] = bytemuck::cast_slice(&bytes);
        assert_eq!(&floats[0..3], &[1.0, 2.0, 3.0]);
        assert_eq!(&floats[4..7], &[4.0, 5.0, 6.0]);
        assert_eq!(&floats[8..11], &[7.0, 8.0, 9.0]);
        assert_eq!(&floats[12..15], &[10.0, 11.0, 12.0]);
        assert_eq!(floats[16], 13.0);
        assert_eq!(floats[17], 14.0);
        assert_eq!(&floats[18..20], &[15.0, 16.0]);
        assert_eq!(&floats[20..22], &[17.0, 18.0]);
        assert_eq!(&floats[22..24], &[0.0, 0.0]);
    }
}
