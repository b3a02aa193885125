//! Binding-convention and threadgroup validation for kernel modules
//!
//! Every compute entry point must run on a 16×16×1 threadgroup, textures live in
//! bind group 0 and parameters in bind group 1. Filters read a sampled source at
//! texture slot 0 and write an `r8unorm` storage destination at slot 1; generators
//! write their destination at slot 0.

use super::KernelKind;
use naga::{AddressSpace, ImageClass, ImageDimension, ShaderStage, StorageFormat, TypeInner};
use std::{collections::BTreeMap, fmt};

/// Threadgroup size every kernel entry point must declare
pub const WORKGROUP_SIZE: [u32; 3] = [16, 16, 1];
/// Bind group holding the source, destination and auxiliary textures
pub const TEXTURE_GROUP: u32 = 0;
/// Bind group holding scalar, vector and raw byte parameters
pub const PARAMETER_GROUP: u32 = 1;

/// Resource kinds the validator distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    SampledTexture,
    StorageTexture(StorageFormat),
    Buffer,
    Other,
}

/// Errors raised when a kernel module breaks the dispatch contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelValidationError {
    /// The module id is not usable as a Rust identifier
    InvalidModuleId(String),
    /// The module declares no compute entry point
    NoComputeEntryPoints,
    /// A compute entry point declares a threadgroup other than 16×16×1
    WorkgroupSize {
        /// Entry point name
        entry_point: String,
        /// Declared workgroup size
        size: [u32; 3],
    },
    /// A filter module lacks the sampled 2D source texture at slot 0
    MissingSource,
    /// The `r8unorm` storage destination is missing from its reserved slot
    MissingDestination(u32),
    /// A buffer was bound in the texture group (binding)
    BufferInTextureGroup(u32),
    /// A texture was bound in the parameter group (binding)
    TextureInParameterGroup(u32),
    /// A resource uses a bind group other than 0 or 1 (group, binding)
    UnexpectedGroup(u32, u32),
}

impl fmt::Display for KernelValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidModuleId(id) => write!(f, "Module id '{id}' must be a lowercase identifier"),
            Self::NoComputeEntryPoints => write!(f, "Module has no compute entry point"),
            Self::WorkgroupSize { entry_point, size } => {
                write!(f, "Entry point '{entry_point}' declares workgroup size {size:?}, expected {WORKGROUP_SIZE:?}")
            }
            Self::MissingSource => write!(f, "Filter module must declare a sampled texture_2d<f32> at @group(0) @binding(0)"),
            Self::MissingDestination(binding) => {
                write!(f, "Module must declare texture_storage_2d<r8unorm, write> at @group(0) @binding({binding})")
            }
            Self::BufferInTextureGroup(binding) => write!(f, "Buffer at @group(0) @binding({binding}); group 0 is reserved for textures"),
            Self::TextureInParameterGroup(binding) => write!(f, "Texture at @group(1) @binding({binding}); group 1 is reserved for parameters"),
            Self::UnexpectedGroup(group, binding) => write!(f, "Resource at @group({group}) @binding({binding}); only groups 0 and 1 are bound"),
        }
    }
}

impl std::error::Error for KernelValidationError {}

fn classify(module: &naga::Module, var: &naga::GlobalVariable) -> Resource {
    match var.space {
        AddressSpace::Uniform | AddressSpace::Storage { .. } => Resource::Buffer,
        AddressSpace::Handle => match &module.types[var.ty].inner {
            TypeInner::Image {
                dim: ImageDimension::D2,
                arrayed: false,
                class: ImageClass::Sampled { .. },
            } => Resource::SampledTexture,
            TypeInner::Image {
                dim: ImageDimension::D2,
                arrayed: false,
                class: ImageClass::Storage { format, .. },
            } => Resource::StorageTexture(*format),
            _ => Resource::Other,
        },
        _ => Resource::Other,
    }
}

/// Checks a parsed module against the dispatch contract of its kind
///
/// # Returns
/// The names of the module's compute entry points, in declaration order
pub fn validate_kernel_module(module: &naga::Module, kind: KernelKind) -> Result<Vec<String>, KernelValidationError> {
    let entry_points = module
        .entry_points
        .iter()
        .filter(|entry_point| entry_point.stage == ShaderStage::Compute)
        .map(|entry_point| {
            if entry_point.workgroup_size == WORKGROUP_SIZE {
                Ok(entry_point.name.clone())
            } else {
                Err(KernelValidationError::WorkgroupSize {
                    entry_point: entry_point.name.clone(),
                    size: entry_point.workgroup_size,
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    if entry_points.is_empty() {
        return Err(KernelValidationError::NoComputeEntryPoints);
    }

    let mut textures = BTreeMap::new();
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        let resource = classify(module, var);
        match (binding.group, resource) {
            (TEXTURE_GROUP, Resource::Buffer) => return Err(KernelValidationError::BufferInTextureGroup(binding.binding)),
            (TEXTURE_GROUP, _) => {
                textures.insert(binding.binding, resource);
            }
            (PARAMETER_GROUP, Resource::SampledTexture | Resource::StorageTexture(_)) => {
                return Err(KernelValidationError::TextureInParameterGroup(binding.binding));
            }
            (PARAMETER_GROUP, _) => {}
            (group, _) => return Err(KernelValidationError::UnexpectedGroup(group, binding.binding)),
        }
    }

    let destination = match kind {
        KernelKind::Generator => 0,
        KernelKind::Filter => {
            if textures.get(&0) != Some(&Resource::SampledTexture) {
                return Err(KernelValidationError::MissingSource);
            }
            1
        }
    };
    if textures.get(&destination) != Some(&Resource::StorageTexture(StorageFormat::R8Unorm)) {
        return Err(KernelValidationError::MissingDestination(destination));
    }

    Ok(entry_points)
}
