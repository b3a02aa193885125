//! GPU-resident grayscale image
//!
//! An [`Image`] owns its current texture and, once a filter chain has run, a
//! same-sized scratch texture. Chains ping-pong between the two so no texture
//! is read and written by the same dispatch. Every operation that submits GPU
//! work blocks until that work has completed.

use crate::{Context, DispatchGeometry, Error, FilterKernel, Function, GeneratorKernel, Result};

/// Pixel format of every image texture
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// A rectangle of pixels inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Left edge in pixels
    pub x: u32,
    /// Top edge in pixels
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Region {
    /// The whole of a `(width, height)` image
    pub fn full((width, height): (u32, u32)) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Whether the region lies inside a `(width, height)` image
    pub fn fits_within(&self, (width, height): (u32, u32)) -> bool {
        self.x.checked_add(self.width).is_some_and(|right| right <= width) && self.y.checked_add(self.height).is_some_and(|bottom| bottom <= height)
    }
}

/// Checks a host pixel layout of `rows` rows of `width` pixels
///
/// # Arguments
/// * `len` - Length of the host buffer
/// * `width` - Pixels per row
/// * `rows` - Number of rows
/// * `bytes_per_row` - Row stride of the host buffer
/// * `exact` - Whether the buffer must be exactly `rows * bytes_per_row` long
fn check_layout(len: usize, width: u32, rows: u32, bytes_per_row: usize, exact: bool) -> Result<()> {
    if bytes_per_row < width as usize {
        return Err(Error::InvalidLayout(format!("Row stride {bytes_per_row} is smaller than the width {width}")));
    }
    let required = if exact {
        rows as usize * bytes_per_row
    } else {
        (rows as usize).saturating_sub(1) * bytes_per_row + width as usize
    };
    if (exact && len != required) || len < required {
        return Err(Error::InvalidLayout(format!(
            "{rows} rows with stride {bytes_per_row} need {required} bytes, got {len}"
        )));
    }
    Ok(())
}

fn extent((width, height): (u32, u32)) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// Allocates an `r8unorm` texture readable and writable by kernels
fn allocate_texture(context: &Context, size: (u32, u32)) -> Result<wgpu::Texture> {
    tracing::debug!("Allocating {}x{} texture", size.0, size.1);
    context
        .error_scope(|| {
            context.device().create_texture(&wgpu::TextureDescriptor {
                label: Some("Gray Image Texture"),
                size: extent(size),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TEXTURE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        })
        .map_err(|e| Error::TextureAllocFailed {
            width: size.0,
            height: size.1,
            reason: e.to_string(),
        })
}

/// A single-channel 8-bit image living on the GPU of its [`Context`]
#[derive(Debug)]
pub struct Image<'ctx> {
    context: &'ctx Context,
    /// Current pixels; defines the image size
    texture_a: wgpu::Texture,
    /// Scratch target of filter chains, same size as `texture_a` when present
    texture_b: Option<wgpu::Texture>,
}

impl<'ctx> Image<'ctx> {
    /// Allocates an image of `(width, height)` pixels
    ///
    /// Pixel contents are zero until replaced or generated.
    pub fn new(context: &'ctx Context, size: (u32, u32)) -> Result<Self> {
        Ok(Self {
            context,
            texture_a: allocate_texture(context, size)?,
            texture_b: None,
        })
    }

    /// The context this image lives on
    pub fn context(&self) -> &'ctx Context {
        self.context
    }

    pub fn width(&self) -> u32 {
        self.texture_a.width()
    }

    pub fn height(&self) -> u32 {
        self.texture_a.height()
    }

    /// `(width, height)` in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// The texture holding the current pixels
    ///
    /// Can be bound as an auxiliary texture of another image's kernels.
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture_a
    }

    /// Whether a scratch texture is currently allocated
    pub fn has_scratch(&self) -> bool {
        self.texture_b.is_some()
    }

    /// Replaces the pixels from host memory, optionally resizing the image
    ///
    /// # Arguments
    /// * `bytes` - Exactly `height * bytes_per_row` bytes, row-major
    /// * `size` - New `(width, height)`, or `None` to keep the current size
    /// * `bytes_per_row` - Row stride of `bytes`, at least the width
    pub fn replace_with_pixels(&mut self, bytes: &[u8], size: Option<(u32, u32)>, bytes_per_row: usize) -> Result<()> {
        let size = size.unwrap_or(self.size());
        check_layout(bytes.len(), size.0, size.1, bytes_per_row, true)?;
        let stride = u32::try_from(bytes_per_row).map_err(|_| Error::InvalidLayout(format!("Row stride {bytes_per_row} does not fit in 32 bits")))?;

        if size != self.size() {
            self.texture_a = allocate_texture(self.context, size)?;
            self.texture_b = None;
        }

        let texture = &self.texture_a;
        let queue = self.context.queue();
        self.context
            .error_scope(|| {
                queue.write_texture(
                    texture.as_image_copy(),
                    bytes,
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(stride),
                        rows_per_image: Some(size.1),
                    },
                    extent(size),
                )
            })
            .map_err(|e| Error::InvalidLayout(e.to_string()))
    }

    /// Replaces the pixels with a GPU-side copy of `other`, resizing to match
    ///
    /// Blocks until the copy has completed.
    pub fn replace_from_image(&mut self, other: &Image<'_>) -> Result<()> {
        if !std::ptr::eq(self.context, other.context) {
            return Err(Error::ContextMismatch);
        }

        if other.size() != self.size() {
            self.texture_a = allocate_texture(self.context, other.size())?;
            self.texture_b = None;
        }

        let source = &other.texture_a;
        let destination = &self.texture_a;
        self.context.submit_and_wait("Replace From Image", |encoder| {
            encoder.copy_texture_to_texture(source.as_image_copy(), destination.as_image_copy(), extent(other.size()));
            Ok(())
        })
    }

    /// Creates a new image on the same context holding a copy of these pixels
    pub fn try_clone(&self) -> Result<Image<'ctx>> {
        let mut image = Image::new(self.context, self.size())?;
        image.replace_from_image(self)?;
        Ok(image)
    }

    /// Reads pixels back into host memory
    ///
    /// # Arguments
    /// * `bytes` - Destination; rows are written `bytes_per_row` apart
    /// * `bytes_per_row` - Row stride of `bytes`, at least the region width
    /// * `region` - Rectangle to read, or `None` for the whole image
    pub fn get_bytes(&self, bytes: &mut [u8], bytes_per_row: usize, region: Option<Region>) -> Result<()> {
        let region = region.unwrap_or(Region::full(self.size()));
        if !region.fits_within(self.size()) {
            return Err(Error::InvalidLayout(format!("{region:?} lies outside the {}x{} image", self.width(), self.height())));
        }
        check_layout(bytes.len(), region.width, region.height, bytes_per_row, false)?;
        if region.width == 0 || region.height == 0 {
            return Ok(());
        }

        let padded_row = region.width.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let staging = self
            .context
            .error_scope(|| {
                self.context.device().create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Readback Buffer"),
                    size: padded_row as u64 * region.height as u64,
                    usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                    mapped_at_creation: false,
                })
            })
            .map_err(|e| Error::Readback(e.to_string()))?;

        let texture = &self.texture_a;
        self.context.submit_and_wait("Readback", |encoder| {
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x: region.x, y: region.y, z: 0 },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &staging,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_row),
                        rows_per_image: Some(region.height),
                    },
                },
                extent((region.width, region.height)),
            );
            Ok(())
        })?;

        let slice = staging.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.context.device().poll(wgpu::PollType::Wait)?;
        pollster::block_on(receiver.receive())
            .ok_or_else(|| Error::Readback("Map callback was dropped".to_string()))?
            .map_err(|e| Error::Readback(e.to_string()))?;

        {
            let data = slice.get_mapped_range();
            let width = region.width as usize;
            for (row, padded) in data.chunks(padded_row as usize).take(region.height as usize).enumerate() {
                let start = row * bytes_per_row;
                bytes[start..start + width].copy_from_slice(&padded[..width]);
            }
        }
        staging.unmap();
        Ok(())
    }

    /// Reads the whole image back as tightly packed rows
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = vec![0; self.width() as usize * self.height() as usize];
        self.get_bytes(&mut bytes, self.width() as usize, None)?;
        Ok(bytes)
    }

    /// Runs a generator over the whole image
    ///
    /// The generator writes the current texture in place; no source is bound.
    pub fn apply(&mut self, generator: &dyn GeneratorKernel) -> Result<()> {
        let function = Function::Generator(generator);
        let geometry = DispatchGeometry::for_size(self.size());
        let context = self.context;
        let destination = &self.texture_a;

        context.compute_and_wait(function.name(), |encoder| {
            encoder.begin_function(&function);
            function.configure(encoder, context)?;
            encoder.set_texture(function.destination_index(), destination);
            encoder.dispatch(geometry)
        })
    }

    /// Runs one filter into a new texture of `size`
    ///
    /// The dispatch covers the source dimensions. When `size` equals the
    /// current size this is a one-element [`apply_filters`](Self::apply_filters).
    pub fn apply_resized(&mut self, filter: &dyn FilterKernel, size: (u32, u32)) -> Result<()> {
        if size == self.size() {
            return self.apply_filters(&[filter]);
        }

        self.texture_b = None;
        let output = allocate_texture(self.context, size)?;
        let function = Function::Filter(filter);
        let geometry = DispatchGeometry::for_size(self.size());
        let context = self.context;
        let source = &self.texture_a;

        context.compute_and_wait(function.name(), |encoder| {
            encoder.begin_function(&function);
            function.configure(encoder, context)?;
            encoder.set_texture(0, source);
            encoder.set_texture(function.destination_index(), &output);
            encoder.dispatch(geometry)
        })?;

        self.texture_a = output;
        Ok(())
    }

    /// Runs an ordered chain of filters in one command buffer
    ///
    /// Filters alternate between the current and scratch textures. Every
    /// filter must preserve the image size; use
    /// [`apply_resized`](Self::apply_resized) for the ones that do not.
    /// An empty chain does nothing.
    pub fn apply_filters(&mut self, filters: &[&dyn FilterKernel]) -> Result<()> {
        if filters.is_empty() {
            return Ok(());
        }

        let scratch = match &self.texture_b {
            Some(texture) => texture.clone(),
            None => {
                let texture = allocate_texture(self.context, self.size())?;
                self.texture_b = Some(texture.clone());
                texture
            }
        };

        let geometry = DispatchGeometry::for_size(self.size());
        let context = self.context;
        let mut pair = (self.texture_a.clone(), scratch);
        let label = filters.iter().map(|filter| filter.name()).collect::<Vec<_>>().join(" > ");

        context.compute_and_wait(&label, |encoder| {
            for filter in filters {
                let function = Function::Filter(*filter);
                encoder.begin_function(&function);
                function.configure(encoder, context)?;
                encoder.set_texture(0, &pair.0);
                encoder.set_texture(function.destination_index(), &pair.1);
                encoder.dispatch(geometry)?;
                std::mem::swap(&mut pair.0, &mut pair.1);
            }
            Ok(())
        })?;

        self.texture_a = pair.0;
        self.texture_b = Some(pair.1);
        Ok(())
    }
}
