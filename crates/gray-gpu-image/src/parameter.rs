//! GPU byte layouts of kernel parameters
//!
//! Each parameter type declares the `Pod` value it is uploaded as. WGSL has no
//! 64-bit floats, so `f64` and friends narrow to `f32`, and integers wider than
//! 32 bits narrow to 32 bits.

use std::ops::RangeInclusive;

/// A value that can be bound to a kernel parameter slot
pub trait KernelParameter {
    /// GPU-side representation
    type Gpu: bytemuck::Pod;

    /// Converts the value into its GPU-side representation
    fn to_gpu(&self) -> Self::Gpu;

    /// Size in bytes of the GPU-side representation
    fn gpu_size() -> usize
    where
        Self: Sized,
    {
        std::mem::size_of::<Self::Gpu>()
    }
}

impl KernelParameter for f64 {
    type Gpu = f32;
    fn to_gpu(&self) -> f32 {
        *self as f32
    }
}

impl KernelParameter for f32 {
    type Gpu = f32;
    fn to_gpu(&self) -> f32 {
        *self
    }
}

impl KernelParameter for i32 {
    type Gpu = i32;
    fn to_gpu(&self) -> i32 {
        *self
    }
}

impl KernelParameter for u32 {
    type Gpu = u32;
    fn to_gpu(&self) -> u32 {
        *self
    }
}

impl KernelParameter for i64 {
    type Gpu = i32;
    fn to_gpu(&self) -> i32 {
        (*self).clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }
}

impl KernelParameter for isize {
    type Gpu = i32;
    fn to_gpu(&self) -> i32 {
        (*self).clamp(i32::MIN as isize, i32::MAX as isize) as i32
    }
}

impl KernelParameter for usize {
    type Gpu = u32;
    fn to_gpu(&self) -> u32 {
        (*self).min(u32::MAX as usize) as u32
    }
}

impl KernelParameter for bool {
    type Gpu = u32;
    fn to_gpu(&self) -> u32 {
        *self as u32
    }
}

impl KernelParameter for (f64, f64) {
    type Gpu = [f32; 2];
    fn to_gpu(&self) -> [f32; 2] {
        [self.0 as f32, self.1 as f32]
    }
}

impl KernelParameter for [f64; 2] {
    type Gpu = [f32; 2];
    fn to_gpu(&self) -> [f32; 2] {
        [self[0] as f32, self[1] as f32]
    }
}

impl KernelParameter for [f32; 2] {
    type Gpu = [f32; 2];
    fn to_gpu(&self) -> [f32; 2] {
        *self
    }
}

impl KernelParameter for [f32; 4] {
    type Gpu = [f32; 4];
    fn to_gpu(&self) -> [f32; 4] {
        *self
    }
}

/// Uploaded as `vec2<f32>(start, end)`
impl KernelParameter for RangeInclusive<f64> {
    type Gpu = [f32; 2];
    fn to_gpu(&self) -> [f32; 2] {
        [*self.start() as f32, *self.end() as f32]
    }
}
