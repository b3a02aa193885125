//! Compute encoding session
//!
//! [`ComputeEncoder`] wraps one `wgpu::ComputePass` and collects texture and
//! parameter bindings slot by slot. Bind groups are materialised from the
//! pipeline's layout when [`ComputeEncoder::dispatch`] is called:
//!
//! - group 0 holds textures, keyed by texture slot
//! - group 1 holds parameters, keyed by parameter slot
//!
//! Bindings are cleared after each dispatch, so every kernel in a chain binds
//! its own pipeline, parameters and textures.

use crate::{Context, DispatchGeometry, Error, Function, KernelParameter, Result};
use std::collections::BTreeMap;
use wgpu::util::DeviceExt;

/// Bind group index of textures
pub const TEXTURE_GROUP: u32 = 0;
/// Bind group index of parameters
pub const PARAMETER_GROUP: u32 = 1;

/// Parameter buffers are padded to this many bytes
const PARAMETER_ALIGNMENT: usize = 16;

/// Collects bindings for the dispatches of one compute pass
#[derive(Debug)]
pub struct ComputeEncoder<'a> {
    context: &'a Context,
    pass: wgpu::ComputePass<'a>,
    label: String,
    pipeline: Option<wgpu::ComputePipeline>,
    textures: BTreeMap<u32, wgpu::TextureView>,
    parameters: BTreeMap<u32, wgpu::Buffer>,
    texture_start_index: u32,
    dispatch_count: usize,
}

impl<'a> ComputeEncoder<'a> {
    /// Begins a compute pass on `command_encoder`
    pub(crate) fn new(context: &'a Context, command_encoder: &'a mut wgpu::CommandEncoder, label: &str) -> Self {
        let pass = command_encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });

        Self {
            context,
            pass,
            label: label.to_string(),
            pipeline: None,
            textures: BTreeMap::new(),
            parameters: BTreeMap::new(),
            texture_start_index: 0,
            dispatch_count: 0,
        }
    }

    /// Prepares the encoder for the next dispatch of `function`
    pub(crate) fn begin_function(&mut self, function: &Function<'_>) {
        self.texture_start_index = function.texture_start_index();
        self.label = function.name().to_string();
    }

    /// Binds the compute pipeline of the next dispatch
    pub fn set_pipeline(&mut self, pipeline: wgpu::ComputePipeline) {
        self.pipeline = Some(pipeline);
    }

    /// Binds a texture at an absolute texture slot
    ///
    /// Slots below the function's start index are reserved for the image's
    /// source and destination; kernels bind their own textures through
    /// [`set_auxiliary_texture`](Self::set_auxiliary_texture).
    pub fn set_texture(&mut self, index: u32, texture: &wgpu::Texture) {
        self.textures.insert(index, texture.create_view(&wgpu::TextureViewDescriptor::default()));
    }

    /// Binds the `n`th auxiliary texture, after the reserved source/destination slots
    pub fn set_auxiliary_texture(&mut self, n: u32, texture: &wgpu::Texture) {
        self.set_texture(self.texture_start_index + n, texture);
    }

    /// First texture slot available to auxiliary textures
    pub fn texture_start_index(&self) -> u32 {
        self.texture_start_index
    }

    /// Binds one scalar or vector parameter
    pub fn set_value<P: KernelParameter>(&mut self, slot: u32, value: &P) {
        self.set_bytes(slot, bytemuck::bytes_of(&value.to_gpu()));
    }

    /// Binds an array of parameters, laid out as a storage-buffer array
    pub fn set_values<P: KernelParameter>(&mut self, slot: u32, values: &[P]) {
        let values = values.iter().map(<P as KernelParameter>::to_gpu).collect::<Vec<_>>();
        self.set_bytes(slot, bytemuck::cast_slice(&values));
    }

    /// Binds raw bytes as a parameter buffer
    pub fn set_bytes(&mut self, slot: u32, bytes: &[u8]) {
        let padded_len = bytes.len().max(1).next_multiple_of(PARAMETER_ALIGNMENT);
        let mut contents = Vec::with_capacity(padded_len);
        contents.extend_from_slice(bytes);
        contents.resize(padded_len, 0);

        let buffer = self.context.device().create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} parameter {slot}", self.label)),
            contents: &contents,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::STORAGE,
        });
        self.parameters.insert(slot, buffer);
    }

    /// Number of dispatches recorded so far
    pub fn dispatch_count(&self) -> usize {
        self.dispatch_count
    }

    /// Records one dispatch with the current bindings, then clears them
    ///
    /// # Returns
    /// `NoComputeEncoder` if no pipeline was bound
    pub fn dispatch(&mut self, geometry: DispatchGeometry) -> Result<()> {
        let pipeline = self
            .pipeline
            .take()
            .ok_or_else(|| Error::NoComputeEncoder(format!("No pipeline bound for '{}'", self.label)))?;
        let textures = std::mem::take(&mut self.textures);
        let parameters = std::mem::take(&mut self.parameters);
        let device = self.context.device();

        let texture_entries = textures
            .iter()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect::<Vec<_>>();
        let texture_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} textures", self.label)),
            layout: &pipeline.get_bind_group_layout(TEXTURE_GROUP),
            entries: &texture_entries,
        });

        self.pass.set_pipeline(&pipeline);
        self.pass.set_bind_group(TEXTURE_GROUP, &texture_group, &[]);

        if !parameters.is_empty() {
            let parameter_entries = parameters
                .iter()
                .map(|(binding, buffer)| wgpu::BindGroupEntry {
                    binding: *binding,
                    resource: buffer.as_entire_binding(),
                })
                .collect::<Vec<_>>();
            let parameter_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} parameters", self.label)),
                layout: &pipeline.get_bind_group_layout(PARAMETER_GROUP),
                entries: &parameter_entries,
            });
            self.pass.set_bind_group(PARAMETER_GROUP, &parameter_group, &[]);
        }

        let [x, y, z] = geometry.grid;
        tracing::debug!("Dispatching '{}' on a {x}x{y}x{z} grid", self.label);
        self.pass.dispatch_workgroups(x, y, z);
        self.dispatch_count += 1;
        Ok(())
    }
}
