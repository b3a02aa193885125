//! Kernel manifest parser
//!
//! The manifest is a YAML file listing every WGSL module that should be embedded
//! into the runtime crate, together with the binding convention it follows.

use serde::Deserialize;
use std::fmt;

/// Binding convention a kernel module follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum KernelKind {
    /// Produces pixels without a source texture; destination at texture slot 0
    #[serde(rename = "generator")]
    Generator,
    /// Transforms a source (slot 0) into a destination (slot 1)
    #[serde(rename = "filter")]
    Filter,
}

impl KernelKind {
    /// First texture slot available for caller-bound auxiliary textures
    pub fn texture_start_index(&self) -> u32 {
        match self {
            KernelKind::Generator => 1,
            KernelKind::Filter => 2,
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelKind::Generator => write!(f, "generator"),
            KernelKind::Filter => write!(f, "filter"),
        }
    }
}

/// One WGSL module entry of the manifest
#[derive(Debug, Clone, Deserialize)]
pub struct KernelModuleSpec {
    /// Module identifier; becomes the upper-cased Rust constant name
    pub id: String,
    /// WGSL file path relative to the manifest
    pub file: String,
    /// Binding convention of every entry point in the module
    pub kind: KernelKind,
}

impl KernelModuleSpec {
    /// Name of the generated Rust constant for this module
    pub fn const_name(&self) -> String {
        self.id.to_uppercase()
    }

    /// Returns true if the id can be used as a Rust identifier
    pub fn has_valid_id(&self) -> bool {
        let mut chars = self.id.chars();
        match chars.next() {
            Some(first) if first.is_ascii_lowercase() => chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
            _ => false,
        }
    }
}

/// Raw kernel manifest as parsed from YAML
#[derive(Debug, Clone, Deserialize)]
pub struct KernelManifest {
    /// Modules in emission order
    pub modules: Vec<KernelModuleSpec>,
}

impl KernelManifest {
    /// Parses a kernel manifest from YAML content
    pub fn from_yaml(yaml_content: &str) -> Result<Self, serde_norway::Error> {
        serde_norway::from_str(yaml_content)
    }

    /// Parses a kernel manifest from a YAML file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }
}
