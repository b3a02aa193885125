//! Compaction of validated kernel modules for embedding

use std::fmt;

/// Why a kernel module could not be written back out in compact form
#[derive(Debug)]
pub enum MinifyError {
    /// The renamed module no longer validates
    Validation(String),
    /// The WGSL backend rejected the module
    Write(String),
}

impl fmt::Display for MinifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(reason) => write!(f, "Minified module failed validation: {reason}"),
            Self::Write(reason) => write!(f, "Failed to write minified WGSL: {reason}"),
        }
    }
}

impl std::error::Error for MinifyError {}

/// Emits compact WGSL for an already parsed and validated kernel module
///
/// Local identifiers are shortened; entry point names and bindings survive,
/// so runtime lookups by function name keep working.
pub fn minify_kernel_module(module: &naga::Module) -> Result<String, MinifyError> {
    let mut compact = module.clone();
    wgsl_minifier::minify_module(&mut compact);

    let info = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all())
        .validate(&compact)
        .map_err(|e| MinifyError::Validation(e.to_string()))?;
    let written = naga::back::wgsl::write_string(&compact, &info, naga::back::wgsl::WriterFlags::empty()).map_err(|e| MinifyError::Write(e.to_string()))?;

    Ok(wgsl_minifier::minify_wgsl_source(&written))
}
