//! Build script for gray-gpu-image
//!
//! Validates the builtin WGSL kernel modules listed in `kernels/manifest.yaml`
//! against the threadgroup and binding conventions, and embeds them as
//! `KernelModule` constants in `$OUT_DIR/kernels.rs`.

use gray_gpu_image_build::{compile_manifest, dump_kernel_registry};

fn main() {
    let kernels_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("kernels");
    println!("cargo::rerun-if-changed={}", kernels_dir.display());

    // Keep debug builds readable; release builds embed minified WGSL
    let minify = std::env::var("PROFILE").map(|profile| profile == "release").unwrap_or(false);

    let modules = compile_manifest(kernels_dir.join("manifest.yaml"), minify).expect("Failed to compile kernel manifest");
    for module in &modules {
        println!("Embedding {} kernel module: {}", module.spec.kind, module.spec.id);
    }

    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR not set");
    let output_path = std::path::PathBuf::from(out_dir).join("kernels.rs");
    std::fs::write(output_path, dump_kernel_registry(&modules)).expect("Failed to write kernels.rs");
}
