//! Error taxonomy for the filter-chain engine
//!
//! Every failure is surfaced synchronously to the caller of the operation that
//! triggered it. Nothing is retried internally.

/// Errors produced by [`Context`](crate::Context) and [`Image`](crate::Image) operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No usable adapter or device could be acquired
    #[error("GPU device unavailable: {0}")]
    DeviceUnavailable(String),
    /// The device refused to provide a command queue
    #[error("Command queue unavailable: {0}")]
    CommandQueueUnavailable(String),
    /// A kernel module could not be parsed, validated or created
    #[error("Failed to load kernel module '{module}': {reason}")]
    ModuleLoadFailed { module: &'static str, reason: String },
    /// The named entry point does not exist in its module
    #[error("No function '{name}' in kernel module '{module}'")]
    NoFunction { module: &'static str, name: &'static str },
    /// Creating the compute pipeline failed
    #[error("Failed to compile pipeline '{name}': {reason}")]
    PipelineCompileFailed { name: &'static str, reason: String },
    /// Encoding or finishing a command buffer failed
    #[error("Failed to create command buffer: {0}")]
    NoCommandBuffer(String),
    /// Encoding a compute pass failed, or a dispatch was attempted without a pipeline
    #[error("Failed to encode compute pass: {0}")]
    NoComputeEncoder(String),
    /// The device refused to allocate a texture
    #[error("Failed to allocate {width}x{height} texture: {reason}")]
    TextureAllocFailed { width: u32, height: u32, reason: String },
    /// Caller-supplied pixel buffer, stride or region is inconsistent with the image
    #[error("Invalid pixel layout: {0}")]
    InvalidLayout(String),
    /// Two images from different contexts were combined
    #[error("Images belong to different contexts")]
    ContextMismatch,
    /// Mapping the readback staging buffer failed
    #[error("Failed to read back texture: {0}")]
    Readback(String),
    /// Waiting for submitted work failed
    #[error("Failed to wait for GPU work: {0}")]
    Poll(#[from] wgpu::PollError),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
