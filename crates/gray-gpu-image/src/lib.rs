//! GPU compute filter chains for grayscale images
//!
//! This crate runs chains of compute kernels over single-channel 8-bit images
//! held on a wgpu device. A [`Context`] owns the device, queue and a pipeline
//! cache; an [`Image`] owns its textures and dispatches either one
//! [`GeneratorKernel`], one resizing [`FilterKernel`], or an ordered chain of
//! filters that ping-pong between two textures inside a single command buffer.
//!
//! Builtin kernels live in [`builtin`]; custom kernels implement [`Kernel`]
//! over their own [`KernelModule`] and follow the same binding convention:
//! textures in bind group 0, parameters in bind group 1.

mod context;
mod dispatch;
mod encoder;
mod error;
mod function;
mod image;
mod parameter;

pub mod builtin;

/// Builtin WGSL kernel modules embedded at build time
pub mod kernels {
    include!(concat!(env!("OUT_DIR"), "/kernels.rs"));
}

pub use builtin::{BlurAxis, BuiltinFilter, BuiltinGenerator};
pub use context::{BACKEND_ENV, Context, ContextOptions, FALLBACK_ENV, POWER_ENV};
pub use dispatch::{DispatchGeometry, THREADGROUP_SIZE};
pub use encoder::{ComputeEncoder, PARAMETER_GROUP, TEXTURE_GROUP};
pub use error::{Error, Result};
pub use function::{FilterKernel, Function, FunctionDescriptor, GeneratorKernel, Kernel, KernelModule};
pub use image::{Image, Region, TEXTURE_FORMAT};
pub use parameter::KernelParameter;
