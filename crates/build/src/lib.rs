//! Gray GPU image build utilities
//!
//! This crate provides the build-time kernel registry for `gray-gpu-image`.
//! It reads a YAML manifest of WGSL compute kernels, checks every module
//! against the threadgroup and binding conventions the runtime dispatches
//! with, and emits Rust constants embedding the (optionally minified) source.

mod codegen;
mod minify;

pub mod kernels;

pub use codegen::dump_kernel_registry;
pub use kernels::{CompiledKernelModule, KernelKind, KernelManifest, KernelModuleSpec, KernelValidationError, compile_manifest};
pub use minify::{MinifyError, minify_kernel_module};
