//! Device context and pipeline cache
//!
//! A [`Context`] owns the wgpu device, its queue and the memoization table
//! mapping [`FunctionDescriptor`]s to compiled compute pipelines. It is shared
//! by reference between images and threads.

use crate::{ComputeEncoder, Error, FunctionDescriptor, KernelModule, Result, dispatch::THREADGROUP_SIZE, function::Kernel};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::{HashMap, hash_map::Entry};

/// Environment variable selecting the wgpu backends
pub const BACKEND_ENV: &str = "GRAY_GPU_IMAGE_BACKEND";
/// Environment variable selecting the adapter power preference
pub const POWER_ENV: &str = "GRAY_GPU_IMAGE_POWER";
/// Environment variable forcing the fallback (software) adapter
pub const FALLBACK_ENV: &str = "GRAY_GPU_IMAGE_FALLBACK";

/// Adapter and device selection options
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Backends the instance may use
    pub backends: wgpu::Backends,
    /// Preferred adapter class
    pub power_preference: wgpu::PowerPreference,
    /// Whether to request the fallback adapter
    pub force_fallback_adapter: bool,
    /// Device label
    pub label: Option<String>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            label: None,
        }
    }
}

impl ContextOptions {
    /// Defaults overridden by the `GRAY_GPU_IMAGE_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by the values `lookup` returns for the `GRAY_GPU_IMAGE_*` keys
    ///
    /// Values that cannot be parsed are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(value) = lookup(BACKEND_ENV) {
            match parse_backends(&value) {
                Some(backends) => options.backends = backends,
                None => tracing::warn!("Ignoring {BACKEND_ENV}={value:?}; expected primary, all or a list of wgpu backend names"),
            }
        }

        if let Some(value) = lookup(POWER_ENV) {
            match parse_power_preference(&value) {
                Some(power_preference) => options.power_preference = power_preference,
                None => tracing::warn!("Ignoring {POWER_ENV}={value:?}; expected low, high or none"),
            }
        }

        if let Some(value) = lookup(FALLBACK_ENV) {
            match parse_flag(&value) {
                Some(force_fallback_adapter) => options.force_fallback_adapter = force_fallback_adapter,
                None => tracing::warn!("Ignoring {FALLBACK_ENV}={value:?}; expected a boolean"),
            }
        }

        options
    }
}

/// Parses `primary`, `all`, or a comma separated list of wgpu backend names
fn parse_backends(value: &str) -> Option<wgpu::Backends> {
    let backends = match value.trim().to_ascii_lowercase().as_str() {
        "primary" => wgpu::Backends::PRIMARY,
        "all" => wgpu::Backends::all(),
        list => wgpu::Backends::from_comma_list(list),
    };
    (!backends.is_empty()).then_some(backends)
}

fn parse_power_preference(value: &str) -> Option<wgpu::PowerPreference> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" => Some(wgpu::PowerPreference::LowPower),
        "high" | "high-performance" => Some(wgpu::PowerPreference::HighPerformance),
        "none" => Some(wgpu::PowerPreference::None),
        _ => None,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// A kernel module created on the device, with its compute entry points
#[derive(Debug)]
struct LoadedModule {
    shader: wgpu::ShaderModule,
    entry_points: Vec<String>,
}

/// Lazily filled module and pipeline tables
#[derive(Debug, Default)]
struct PipelineCache {
    pipelines: HashMap<FunctionDescriptor, wgpu::ComputePipeline>,
    modules: HashMap<&'static str, LoadedModule>,
}

/// Owns the device, its queue and the compiled pipeline cache
#[derive(Debug)]
pub struct Context {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    cache: Mutex<PipelineCache>,
    /// Held from push to pop of every error scope; wgpu keeps one scope stack per device
    scope_lock: ReentrantMutex<()>,
}

impl Context {
    /// Creates a context configured from the environment
    ///
    /// See [`ContextOptions::from_env`].
    pub fn new() -> Result<Self> {
        Self::with_options(ContextOptions::from_env())
    }

    /// Creates a context, blocking until the adapter and device are acquired
    ///
    /// # Arguments
    /// * `options` - Adapter and device selection
    ///
    /// # Returns
    /// `DeviceUnavailable` when no adapter exists or it cannot write `r8unorm`
    /// storage textures, `CommandQueueUnavailable` when device creation fails
    pub fn with_options(options: ContextOptions) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: options.backends,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: options.power_preference,
            compatible_surface: None,
            force_fallback_adapter: options.force_fallback_adapter,
        }))
        .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        let info = adapter.get_info();
        tracing::debug!("Selected adapter {} ({:?})", info.name, info.backend);

        // r8unorm storage writes are an adapter-specific format capability
        let format_features = adapter.get_texture_format_features(wgpu::TextureFormat::R8Unorm);
        if !adapter.features().contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES)
            || !format_features.allowed_usages.contains(wgpu::TextureUsages::STORAGE_BINDING)
        {
            return Err(Error::DeviceUnavailable(format!("Adapter '{}' cannot write r8unorm storage textures", info.name)));
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: options.label.as_deref(),
            required_features: wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES,
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: Default::default(),
        }))
        .map_err(|e| Error::CommandQueueUnavailable(e.to_string()))?;

        Ok(Self::from_device(adapter, device, queue))
    }

    /// A context on wgpu's noop backend: validation runs, nothing executes
    #[cfg(test)]
    pub(crate) fn noop() -> Option<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::NOOP,
            backend_options: wgpu::BackendOptions {
                noop: wgpu::NoopBackendOptions { enable: true },
                ..Default::default()
            },
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())).ok()?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()?;
        Some(Self::from_device(adapter, device, queue))
    }

    fn from_device(adapter: wgpu::Adapter, device: wgpu::Device, queue: wgpu::Queue) -> Self {
        device.on_uncaptured_error(Box::new(|error| {
            tracing::error!("Uncaptured device error: {error}");
        }));

        Self {
            adapter,
            device,
            queue,
            cache: Mutex::new(PipelineCache::default()),
            scope_lock: ReentrantMutex::new(()),
        }
    }

    /// The wgpu device
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The serial submission queue
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Information about the selected adapter
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Returns the compiled pipeline for `descriptor`, compiling it on first use
    ///
    /// The module is loaded once per module id. Concurrent callers serialize on
    /// the cache lock, so each descriptor is compiled at most once.
    pub fn pipeline_for(&self, descriptor: &FunctionDescriptor) -> Result<wgpu::ComputePipeline> {
        // Scope lock before cache lock, the order every other scoped operation uses
        let _scope = self.scope_lock.lock();
        let mut guard = self.cache.lock();
        let cache = &mut *guard;

        if let Some(pipeline) = cache.pipelines.get(descriptor) {
            return Ok(pipeline.clone());
        }

        let module = match cache.modules.entry(descriptor.module.id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.load_module(descriptor.module)?),
        };

        if !module.entry_points.iter().any(|name| name == descriptor.name) {
            return Err(Error::NoFunction {
                module: descriptor.module.id,
                name: descriptor.name,
            });
        }

        tracing::debug!("Compiling pipeline {descriptor}");
        let pipeline = self
            .error_scope(|| {
                self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(descriptor.name),
                    layout: None,
                    module: &module.shader,
                    entry_point: Some(descriptor.name),
                    compilation_options: Default::default(),
                    cache: None,
                })
            })
            .map_err(|e| Error::PipelineCompileFailed {
                name: descriptor.name,
                reason: e.to_string(),
            })?;

        cache.pipelines.insert(*descriptor, pipeline.clone());
        Ok(pipeline)
    }

    /// Compiles every pipeline a kernel type declares
    pub fn prepare<K: Kernel>(&self) -> Result<()> {
        for descriptor in K::function_descriptors() {
            self.pipeline_for(&descriptor)?;
        }
        Ok(())
    }

    /// Number of compiled pipelines in the cache
    pub fn cached_pipeline_count(&self) -> usize {
        self.cache.lock().pipelines.len()
    }

    /// Number of loaded kernel modules in the cache
    pub fn cached_module_count(&self) -> usize {
        self.cache.lock().modules.len()
    }

    /// Parses, validates and creates a kernel module on the device
    fn load_module(&self, module: &'static KernelModule) -> Result<LoadedModule> {
        let load_failed = |reason: String| Error::ModuleLoadFailed { module: module.id, reason };

        let parsed = naga::front::wgsl::parse_str(module.source).map_err(|e| load_failed(e.emit_to_string(module.source)))?;
        let mut validator = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all());
        validator.validate(&parsed).map_err(|e| load_failed(e.to_string()))?;

        let entry_points = parsed
            .entry_points
            .iter()
            .filter(|entry_point| entry_point.stage == naga::ShaderStage::Compute)
            .map(|entry_point| {
                if entry_point.workgroup_size != THREADGROUP_SIZE {
                    tracing::warn!(
                        "Entry point '{}' in module '{}' declares workgroup size {:?}; dispatches assume {:?}",
                        entry_point.name,
                        module.id,
                        entry_point.workgroup_size,
                        THREADGROUP_SIZE
                    );
                }
                entry_point.name.clone()
            })
            .collect::<Vec<_>>();

        let shader = self
            .error_scope(|| {
                self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(module.id),
                    source: wgpu::ShaderSource::Wgsl(module.source.into()),
                })
            })
            .map_err(|e| load_failed(e.to_string()))?;

        tracing::debug!("Loaded kernel module '{}' with entry points {:?}", module.id, entry_points);
        Ok(LoadedModule { shader, entry_points })
    }

    /// Runs `operation` inside validation and out-of-memory error scopes
    ///
    /// Scoped operations from different threads are serialized, so each error
    /// reaches the thread whose operation raised it. Nested scopes on one
    /// thread are allowed.
    ///
    /// # Returns
    /// The operation's value, or the first device error it raised
    pub(crate) fn error_scope<T>(&self, operation: impl FnOnce() -> T) -> std::result::Result<T, wgpu::Error> {
        let _scope = self.scope_lock.lock();
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = operation();
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        match validation.or(out_of_memory) {
            Some(error) => Err(error),
            None => Ok(value),
        }
    }

    /// Records commands into one command buffer, submits it and blocks until it completes
    ///
    /// Device errors raised while recording become `NoCommandBuffer` (out of
    /// memory) or `NoComputeEncoder` (validation).
    pub(crate) fn submit_and_wait(&self, label: &str, record: impl FnOnce(&mut wgpu::CommandEncoder) -> Result<()>) -> Result<()> {
        let index = self
            .error_scope(|| -> Result<wgpu::SubmissionIndex> {
                let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
                record(&mut encoder)?;
                Ok(self.queue.submit(std::iter::once(encoder.finish())))
            })
            .map_err(|e| match e {
                wgpu::Error::OutOfMemory { .. } => Error::NoCommandBuffer(e.to_string()),
                _ => Error::NoComputeEncoder(e.to_string()),
            })??;

        self.device.poll(wgpu::PollType::WaitForSubmissionIndex(index))?;
        Ok(())
    }

    /// Encodes one compute pass through a [`ComputeEncoder`], submits it and blocks until it completes
    pub(crate) fn compute_and_wait(&self, label: &str, encode: impl FnOnce(&mut ComputeEncoder<'_>) -> Result<()>) -> Result<()> {
        self.submit_and_wait(label, |command_encoder| {
            let mut encoder = ComputeEncoder::new(self, command_encoder, label);
            encode(&mut encoder)
        })
    }
}
