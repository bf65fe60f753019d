use super::palette::{LUT_SIZE, PaletteSet};
use super::pattern::progress_table;
use super::{BackendError, FrameParams};
use metal::*;
use objc::rc::autoreleasepool;
use std::ffi::c_void;

// Argument slots shared by the pipeline setup and the per-frame encoder.
const QUAD_BUFFER_INDEX: u64 = 0;
const UNIFORMS_INDEX: u64 = 0;
const PROGRESS_BUFFER_INDEX: u64 = 1;
const PALETTE_TEXTURE_INDEX: u64 = 0;

const TARGET_FORMAT: MTLPixelFormat = MTLPixelFormat::RGBA8Unorm;

// Triangle strip covering clip space.
const QUAD: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

#[repr(C)]
#[derive(Clone, Copy)]
struct Uniforms {
    width: u32,
    frequency: f32,
    phase: f32,
}

struct RenderTarget {
    w: usize,
    h: usize,
    texture: Texture,
    progress: Buffer,
    readback: Buffer,
    readback_bpr: usize,
}

pub struct MetalBackend {
    device: Device,
    queue: CommandQueue,
    pipeline: RenderPipelineState,
    quad: Buffer,
    uniforms: Buffer,
    palettes: Vec<Texture>,
    target: Option<RenderTarget>,
    cpu_pixels: Vec<u8>,
}

impl MetalBackend {
    pub fn new() -> Result<Self, BackendError> {
        let device = Device::system_default().ok_or(BackendError::NoDevice)?;
        let queue = device.new_command_queue();

        let options = CompileOptions::new();
        // Fast math may reassociate the split fract() terms and break parity
        // with the CPU path.
        options.set_fast_math_enabled(false);
        let library = device
            .new_library_with_source(MOIRE_SRC, &options)
            .map_err(BackendError::ShaderCompile)?;

        let vertex = library
            .get_function("moire_vertex", None)
            .map_err(|e| BackendError::ShaderCompile(format!("moire_vertex: {e}")))?;
        let fragment = library
            .get_function("moire_fragment", None)
            .map_err(|e| BackendError::ShaderCompile(format!("moire_fragment: {e}")))?;

        let desc = RenderPipelineDescriptor::new();
        desc.set_vertex_function(Some(&vertex));
        desc.set_fragment_function(Some(&fragment));
        desc.color_attachments()
            .object_at(0)
            .ok_or_else(|| BackendError::PipelineLink("missing color attachment 0".to_string()))?
            .set_pixel_format(TARGET_FORMAT);
        let pipeline = device
            .new_render_pipeline_state(&desc)
            .map_err(BackendError::PipelineLink)?;

        let quad = device.new_buffer_with_data(
            QUAD.as_ptr().cast::<c_void>(),
            std::mem::size_of_val(&QUAD) as u64,
            MTLResourceOptions::StorageModeShared,
        );
        let uniforms = device.new_buffer(
            std::mem::size_of::<Uniforms>() as u64,
            MTLResourceOptions::StorageModeShared,
        );

        let palettes = PaletteSet::builtin()
            .iter()
            .map(|lut| upload_palette(&device, &lut.to_rgba()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            device,
            queue,
            pipeline,
            quad,
            uniforms,
            palettes,
            target: None,
            cpu_pixels: Vec::new(),
        })
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    fn ensure_target(&mut self, w: usize, h: usize) -> Result<(), BackendError> {
        if let Some(t) = &self.target {
            if t.w == w && t.h == h {
                return Ok(());
            }
        }
        self.target = Some(make_target(&self.device, w, h)?);
        self.cpu_pixels = vec![0u8; w * h * 4];
        Ok(())
    }

    pub fn render_frame(&mut self, params: &FrameParams) -> Option<&[u8]> {
        let (w, h) = (params.columns, params.rows);
        if w == 0 || h == 0 || self.palettes.is_empty() {
            return None;
        }
        if let Err(err) = self.ensure_target(w, h) {
            log::debug!("metal frame skipped: {err}");
            return None;
        }
        let target = self.target.as_ref()?;

        let u = Uniforms {
            width: w as u32,
            frequency: params.frequency_scalar,
            phase: params.phase,
        };
        unsafe {
            std::ptr::copy_nonoverlapping(
                (&u as *const Uniforms).cast::<u8>(),
                self.uniforms.contents().cast::<u8>(),
                std::mem::size_of::<Uniforms>(),
            );
        }

        let palette = self
            .palettes
            .get(params.palette)
            .unwrap_or(&self.palettes[0]);

        let cmd = autoreleasepool(|| {
            let cmd = self.queue.new_command_buffer();

            let pass = RenderPassDescriptor::new();
            let attachment = pass.color_attachments().object_at(0)?;
            attachment.set_texture(Some(&target.texture));
            attachment.set_load_action(MTLLoadAction::Clear);
            attachment.set_clear_color(MTLClearColor::new(0.0, 0.0, 0.0, 1.0));
            attachment.set_store_action(MTLStoreAction::Store);

            let encoder = cmd.new_render_command_encoder(pass);
            encoder.set_render_pipeline_state(&self.pipeline);
            encoder.set_viewport(MTLViewport {
                originX: 0.0,
                originY: 0.0,
                width: w as f64,
                height: h as f64,
                znear: 0.0,
                zfar: 1.0,
            });
            encoder.set_vertex_buffer(QUAD_BUFFER_INDEX, Some(&self.quad), 0);
            encoder.set_fragment_buffer(UNIFORMS_INDEX, Some(&self.uniforms), 0);
            encoder.set_fragment_buffer(PROGRESS_BUFFER_INDEX, Some(&target.progress), 0);
            encoder.set_fragment_texture(PALETTE_TEXTURE_INDEX, Some(palette));
            encoder.draw_primitives(MTLPrimitiveType::TriangleStrip, 0, QUAD.len() as u64);
            encoder.end_encoding();

            let blit = cmd.new_blit_command_encoder();
            blit.copy_from_texture_to_buffer(
                &target.texture,
                0,
                0,
                MTLOrigin { x: 0, y: 0, z: 0 },
                MTLSize::new(w as u64, h as u64, 1),
                &target.readback,
                0,
                target.readback_bpr as u64,
                target.readback_bpr.saturating_mul(h) as u64,
                MTLBlitOption::None,
            );
            blit.end_encoding();

            let owned = cmd.to_owned();
            owned.commit();
            Some(owned)
        })?;

        cmd.wait_until_completed();
        if matches!(cmd.status(), MTLCommandBufferStatus::Error) {
            log::debug!("metal command buffer failed; keeping previous frame");
            return None;
        }

        let row_bytes = w * 4;
        unsafe {
            let src = std::slice::from_raw_parts(
                target.readback.contents().cast::<u8>(),
                target.readback_bpr.saturating_mul(h),
            );
            for y in 0..h {
                let src_off = y * target.readback_bpr;
                let dst_off = y * row_bytes;
                self.cpu_pixels[dst_off..dst_off + row_bytes]
                    .copy_from_slice(&src[src_off..src_off + row_bytes]);
            }
        }

        Some(self.cpu_pixels.as_slice())
    }

    /// Drop every GPU-side object this backend created.
    pub fn teardown(&mut self) {
        self.palettes.clear();
        self.target = None;
        self.cpu_pixels = Vec::new();
    }
}

fn upload_palette(device: &Device, rgba: &[u8]) -> Result<Texture, BackendError> {
    if rgba.len() != LUT_SIZE * 4 {
        return Err(BackendError::Resource(format!(
            "palette table has {} bytes, expected {}",
            rgba.len(),
            LUT_SIZE * 4
        )));
    }
    let desc = TextureDescriptor::new();
    desc.set_texture_type(MTLTextureType::D2);
    desc.set_pixel_format(MTLPixelFormat::RGBA8Unorm);
    desc.set_width(LUT_SIZE as u64);
    desc.set_height(1);
    desc.set_usage(MTLTextureUsage::ShaderRead);

    let texture = device.new_texture(&desc);
    texture.replace_region(
        MTLRegion::new_2d(0, 0, LUT_SIZE as u64, 1),
        0,
        rgba.as_ptr().cast::<c_void>(),
        (LUT_SIZE * 4) as u64,
    );
    Ok(texture)
}

fn make_target(device: &Device, w: usize, h: usize) -> Result<RenderTarget, BackendError> {
    let w = w.max(1);
    let h = h.max(1);

    let desc = TextureDescriptor::new();
    desc.set_texture_type(MTLTextureType::D2);
    desc.set_pixel_format(TARGET_FORMAT);
    desc.set_width(w as u64);
    desc.set_height(h as u64);
    desc.set_storage_mode(MTLStorageMode::Private);
    desc.set_usage(MTLTextureUsage::RenderTarget | MTLTextureUsage::ShaderRead);
    let texture = device.new_texture(&desc);

    let table = progress_table(w, h);
    let progress = device.new_buffer_with_data(
        table.as_ptr().cast::<c_void>(),
        std::mem::size_of_val(table.as_slice()) as u64,
        MTLResourceOptions::StorageModeShared,
    );

    let align = (device.minimum_linear_texture_alignment_for_pixel_format(TARGET_FORMAT) as usize)
        .max(16);
    let row_bytes = w.saturating_mul(4);
    let readback_bpr = row_bytes.div_ceil(align) * align;
    let readback_len = readback_bpr.saturating_mul(h);
    if readback_len == 0 {
        return Err(BackendError::Resource(format!("empty readback for {w}x{h}")));
    }
    let readback = device.new_buffer(readback_len as u64, MTLResourceOptions::StorageModeShared);

    Ok(RenderTarget {
        w,
        h,
        texture,
        progress,
        readback,
        readback_bpr,
    })
}

// The fragment stage reads the same progress table the CPU path builds and
// then mirrors visual::pattern step for step. The palette texel is fetched
// with read(), so no filtering sits between the index and the colour.
const MOIRE_SRC: &str = r#"
#include <metal_stdlib>
using namespace metal;

constant float kLutSize = 1024.0;

struct Uniforms {
    uint width;
    float frequency;
    float phase;
};

struct VertexOut {
    float4 position [[position]];
};

vertex VertexOut moire_vertex(uint vid [[vertex_id]],
                              const device float2 *quad [[buffer(0)]]) {
    VertexOut out;
    out.position = float4(quad[vid], 0.0, 1.0);
    return out;
}

fragment float4 moire_fragment(VertexOut in [[stage_in]],
                               constant Uniforms &u [[buffer(0)]],
                               const device float *progress_table [[buffer(1)]],
                               texture2d<float, access::read> palette [[texture(0)]]) {
    uint2 pixel = uint2(in.position.xy);
    float progress = progress_table[pixel.y * u.width + pixel.x];

    float v1 = fract(progress * u.frequency);
    float v2 = fract(progress * u.phase);
    float raw = fract(v1 + v2);
    float t = raw <= 0.5 ? raw * 2.0 : (1.0 - raw) * 2.0;

    float index = min(floor(clamp(t, 0.0, 1.0) * (kLutSize - 1.0)), kLutSize - 1.0);
    float3 color = palette.read(uint2(uint(index), 0)).rgb;
    return float4(color, 1.0);
}
"#;
