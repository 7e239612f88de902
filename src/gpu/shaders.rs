// ============================================================================
// GPU SHADERS — WGSL kept inline
// ============================================================================

// ============================================================================
// RASTER SHADER — one textured quad placed by the viewport projection
// ============================================================================
//
// The quad is generated from the vertex index and spans the image in model
// space, centred on the origin with +Y up: the image's top-left texel sits at
// (-w/2, +h/2). `view_proj` is the matrix ViewportState produces.
pub const RASTER_SHADER: &str = r#"
struct ViewUniforms {
    view_proj: mat4x4<f32>,
    image_size: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> view: ViewUniforms;
@group(1) @binding(0) var raster_texture: texture_2d<f32>;
@group(1) @binding(1) var raster_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
    );

    let uv = corners[vi];
    let model = vec2<f32>(
        (uv.x - 0.5) * view.image_size.x,
        (0.5 - uv.y) * view.image_size.y,
    );

    var out: VertexOutput;
    out.position = view.view_proj * vec4<f32>(model, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(raster_texture, raster_sampler, in.uv);
}
"#;
