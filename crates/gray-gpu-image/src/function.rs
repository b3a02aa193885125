//! Kernel identities and the Generator/Filter capability split
//!
//! A [`KernelModule`] is a WGSL source that may hold several compute entry
//! points. A [`FunctionDescriptor`] names one entry point inside one module and
//! is the key of the pipeline cache. Kernel types implement [`Kernel`] plus one
//! of the [`GeneratorKernel`] / [`FilterKernel`] capabilities, and images
//! dispatch them through the closed [`Function`] sum type.

use crate::{ComputeEncoder, Context, Result};
use std::hash::{Hash, Hasher};

/// A WGSL module holding one or more compute kernels
#[derive(Debug)]
pub struct KernelModule {
    /// Stable identifier, unique per process
    pub id: &'static str,
    /// WGSL source code
    pub source: &'static str,
}

impl KernelModule {
    /// Creates a module from its id and WGSL source
    pub const fn new(id: &'static str, source: &'static str) -> Self {
        Self { id, source }
    }

    /// Returns a descriptor for one entry point of this module
    pub const fn function(&'static self, name: &'static str) -> FunctionDescriptor {
        FunctionDescriptor { module: self, name }
    }
}

/// Identity of a compiled kernel: (module id, entry point name)
#[derive(Debug, Clone, Copy)]
pub struct FunctionDescriptor {
    /// Module that defines the entry point
    pub module: &'static KernelModule,
    /// Entry point name
    pub name: &'static str,
}

impl FunctionDescriptor {
    /// Creates a descriptor for `name` inside `module`
    pub const fn new(module: &'static KernelModule, name: &'static str) -> Self {
        Self { module, name }
    }

    /// Id of the module that defines the entry point
    pub fn module_id(&self) -> &'static str {
        self.module.id
    }
}

impl PartialEq for FunctionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.module.id == other.module.id && self.name == other.name
    }
}

impl Eq for FunctionDescriptor {}

impl Hash for FunctionDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.module.id.hash(state);
        self.name.hash(state);
    }
}

impl std::fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.module.id, self.name)
    }
}

/// A kernel that can configure a compute dispatch
///
/// Implementors bind their own pipeline and parameters; the [`Image`](crate::Image)
/// binds the source and destination textures around them.
pub trait Kernel: std::fmt::Debug + Send + Sync {
    /// Every descriptor this kernel type may dispatch, in declaration order
    fn function_descriptors() -> Vec<FunctionDescriptor>
    where
        Self: Sized;

    /// Stable name of this case, used for labels and logs
    fn name(&self) -> &'static str;

    /// Descriptor of the entry point this case dispatches
    fn descriptor(&self) -> FunctionDescriptor;

    /// Binds this case's parameters, starting at parameter slot 0
    ///
    /// # Arguments
    /// * `encoder` - The encoder collecting bindings for the next dispatch
    fn bind_parameters(&self, encoder: &mut ComputeEncoder<'_>);

    /// Resolves and binds the pipeline, then binds the parameters
    ///
    /// # Arguments
    /// * `encoder` - The encoder collecting bindings for the next dispatch
    /// * `context` - The context owning the pipeline cache
    fn configure(&self, encoder: &mut ComputeEncoder<'_>, context: &Context) -> Result<()> {
        let pipeline = context.pipeline_for(&self.descriptor())?;
        encoder.set_pipeline(pipeline);
        self.bind_parameters(encoder);
        Ok(())
    }
}

/// A kernel producing pixels without a source texture
///
/// The destination is bound at texture slot 0; auxiliary textures start at slot 1.
pub trait GeneratorKernel: Kernel {}

/// A kernel transforming a source texture into a destination texture
///
/// The source is bound at texture slot 0 and the destination at slot 1;
/// auxiliary textures start at slot 2.
pub trait FilterKernel: Kernel {}

/// A kernel tagged with its capability
#[derive(Debug, Clone, Copy)]
pub enum Function<'a> {
    /// Writes the destination only
    Generator(&'a dyn GeneratorKernel),
    /// Reads the source and writes the destination
    Filter(&'a dyn FilterKernel),
}

impl Function<'_> {
    /// Texture slot of the first auxiliary texture
    pub fn texture_start_index(&self) -> u32 {
        match self {
            Function::Generator(_) => 1,
            Function::Filter(_) => 2,
        }
    }

    /// Texture slot of the destination texture
    pub fn destination_index(&self) -> u32 {
        match self {
            Function::Generator(_) => 0,
            Function::Filter(_) => 1,
        }
    }

    /// Name of the wrapped kernel case
    pub fn name(&self) -> &'static str {
        match self {
            Function::Generator(kernel) => kernel.name(),
            Function::Filter(kernel) => kernel.name(),
        }
    }

    /// Configures the encoder through the wrapped kernel
    pub fn configure(&self, encoder: &mut ComputeEncoder<'_>, context: &Context) -> Result<()> {
        match self {
            Function::Generator(kernel) => kernel.configure(encoder, context),
            Function::Filter(kernel) => kernel.configure(encoder, context),
        }
    }
}
