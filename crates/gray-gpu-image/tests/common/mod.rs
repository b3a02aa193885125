#![allow(dead_code)]

use gray_gpu_image::{ComputeEncoder, Context, FilterKernel, FunctionDescriptor, Kernel, KernelModule};

/// Creates a context, or `None` when the machine has no usable adapter
pub fn context() -> Option<Context> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    match Context::new() {
        Ok(context) => Some(context),
        Err(e) => {
            tracing::warn!("Skipping GPU test: {e}");
            None
        }
    }
}

pub static SCALE: KernelModule = KernelModule::new(
    "test_scale",
    r#"
@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var destination: texture_storage_2d<r8unorm, write>;

@group(1) @binding(0) var<uniform> factor: f32;

@compute @workgroup_size(16, 16, 1)
fn scale(@builtin(global_invocation_id) id: vec3<u32>) {
    let size = textureDimensions(source);
    if (id.x >= size.x || id.y >= size.y) {
        return;
    }
    let value = textureLoad(source, vec2<i32>(id.xy), 0).r;
    textureStore(destination, vec2<i32>(id.xy), vec4<f32>(clamp(value * factor, 0.0, 1.0), 0.0, 0.0, 1.0));
}
"#,
);

/// Multiplies every pixel by a factor
#[derive(Debug)]
pub struct Scale {
    pub factor: f64,
}

impl Kernel for Scale {
    fn function_descriptors() -> Vec<FunctionDescriptor> {
        vec![SCALE.function("scale")]
    }

    fn name(&self) -> &'static str {
        "scale"
    }

    fn descriptor(&self) -> FunctionDescriptor {
        SCALE.function("scale")
    }

    fn bind_parameters(&self, encoder: &mut ComputeEncoder<'_>) {
        encoder.set_value(0, &self.factor);
    }
}

impl FilterKernel for Scale {}

pub static ADD: KernelModule = KernelModule::new(
    "test_add",
    r#"
@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var destination: texture_storage_2d<r8unorm, write>;
@group(0) @binding(2) var addend: texture_2d<f32>;

@compute @workgroup_size(16, 16, 1)
fn add(@builtin(global_invocation_id) id: vec3<u32>) {
    let size = textureDimensions(source);
    if (id.x >= size.x || id.y >= size.y) {
        return;
    }
    let coord = vec2<i32>(id.xy);
    let sum = textureLoad(source, coord, 0).r + textureLoad(addend, coord, 0).r;
    textureStore(destination, coord, vec4<f32>(min(sum, 1.0), 0.0, 0.0, 1.0));
}
"#,
);

/// Adds an auxiliary texture of the same size, saturating at white
#[derive(Debug)]
pub struct Add {
    pub addend: wgpu::Texture,
}

impl Kernel for Add {
    fn function_descriptors() -> Vec<FunctionDescriptor> {
        vec![ADD.function("add")]
    }

    fn name(&self) -> &'static str {
        "add"
    }

    fn descriptor(&self) -> FunctionDescriptor {
        ADD.function("add")
    }

    fn bind_parameters(&self, encoder: &mut ComputeEncoder<'_>) {
        encoder.set_auxiliary_texture(0, &self.addend);
    }
}

impl FilterKernel for Add {}
