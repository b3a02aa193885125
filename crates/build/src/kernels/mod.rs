//! Kernel module registry compilation
//!
//! Turns the kernel manifest into validated, optionally minified WGSL modules
//! ready to be embedded as constants by the runtime crate's build script.

mod manifest;
mod validate;

pub use manifest::{KernelKind, KernelManifest, KernelModuleSpec};
pub use validate::{KernelValidationError, PARAMETER_GROUP, TEXTURE_GROUP, WORKGROUP_SIZE, validate_kernel_module};

/// A kernel module that passed validation
#[derive(Debug, Clone)]
pub struct CompiledKernelModule {
    /// The manifest entry this module was compiled from
    pub spec: KernelModuleSpec,
    /// WGSL source to embed
    pub source: String,
    /// Compute entry points in declaration order
    pub entry_points: Vec<String>,
}

impl CompiledKernelModule {
    /// Parses, validates and optionally minifies one manifest entry
    ///
    /// # Arguments
    /// * `spec` - The manifest entry
    /// * `source` - WGSL source of the entry's file
    /// * `minify` - Whether to minify the embedded WGSL
    pub fn compile(spec: KernelModuleSpec, source: &str, minify: bool) -> Result<Self, Box<dyn std::error::Error>> {
        if !spec.has_valid_id() {
            return Err(KernelValidationError::InvalidModuleId(spec.id.clone()).into());
        }

        let module = naga::front::wgsl::parse_str(source).map_err(|e| format!("Failed to parse '{}': {}", spec.file, e.emit_to_string(source)))?;
        let mut validator = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all());
        validator.validate(&module).map_err(|e| format!("Failed to validate '{}': {e}", spec.file))?;

        let entry_points = validate_kernel_module(&module, spec.kind).map_err(|e| format!("Kernel module '{}' is invalid: {e}", spec.id))?;

        let source = if minify { crate::minify_kernel_module(&module)? } else { source.to_string() };

        Ok(Self { spec, source, entry_points })
    }
}

/// Compiles every module listed in a manifest file
///
/// Module files are resolved relative to the manifest's directory.
pub fn compile_manifest<P: AsRef<std::path::Path>>(manifest_path: P, minify: bool) -> Result<Vec<CompiledKernelModule>, Box<dyn std::error::Error>> {
    let manifest_path = manifest_path.as_ref();
    let dir = manifest_path.parent().ok_or("Manifest path has no parent directory")?;
    let manifest = KernelManifest::from_file(manifest_path)?;

    manifest
        .modules
        .into_iter()
        .map(|spec| {
            let path = dir.join(&spec.file);
            let source = std::fs::read_to_string(&path).map_err(|e| format!("Error reading file {path:?}: {e}"))?;
            CompiledKernelModule::compile(spec, &source, minify)
        })
        .collect()
}
