use wgpu::{BindGroup, CommandEncoder, RenderPipeline, TextureView};

/// Fullscreen triangle vertex shader (WGSL).
/// Uses the vertex_index trick: 3 vertices cover the entire target
/// without needing a vertex buffer. Fragment stages read `gl_FragCoord`
/// / `@builtin(position)` and need no varyings.
pub const FULLSCREEN_TRIANGLE_VS: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4f {
    let x = f32(i32(vi & 1u) * 4) - 1.0;
    let y = f32(i32(vi & 2u) * 2) - 1.0;
    return vec4f(x, y, 0.0, 1.0);
}
"#;

/// Clear `target` to all zeros and, if a pipeline is given, cover it
/// with one fullscreen triangle.
pub fn run_fullscreen_pass(
    encoder: &mut CommandEncoder,
    label: &str,
    draw: Option<(&RenderPipeline, &BindGroup)>,
    target: &TextureView,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    if let Some((pipeline, bind_group)) = draw {
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
