//! Builtin kernel catalog
//!
//! Each case dispatches one entry point of the embedded [`kernels`](crate::kernels)
//! modules and binds its parameters in declaration order, starting at slot 0.

use crate::{ComputeEncoder, FilterKernel, FunctionDescriptor, GeneratorKernel, Kernel, KernelParameter, kernels};

/// Number of entries in a [`BuiltinFilter::Lookup`] table
pub const LOOKUP_TABLE_LEN: usize = 256;

/// Axis of a one-dimensional blur pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlurAxis {
    /// Horizontal pass
    X,
    /// Vertical pass
    Y,
}

impl KernelParameter for BlurAxis {
    type Gpu = u32;
    fn to_gpu(&self) -> u32 {
        match self {
            BlurAxis::X => 0,
            BlurAxis::Y => 1,
        }
    }
}

/// Builtin source-to-destination kernels
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinFilter {
    /// Linear remap of `[black_level, white_level]` onto `[0, 1]`, clamped
    Level { black_level: f64, white_level: f64 },
    /// Power-law remap `v^(1 / gamma)`
    Gamma { gamma: f64 },
    /// One-dimensional gaussian blur with sigma `radius / 2`
    GaussianBlur { axis: BlurAxis, radius: f64 },
    /// White where `v >= color`, black elsewhere
    Threshold { color: f64 },
    /// Clockwise rotation by `turn_count` quarter turns
    ///
    /// Odd turn counts swap width and height, so the filter must be applied
    /// with [`Image::apply_resized`](crate::Image::apply_resized) and
    /// [`BuiltinFilter::output_size`].
    Rotate90 { turn_count: i32 },
    /// Tone curve `table[round(v * 255)] / 255` over a 256-byte table
    Lookup { table: bytes::Bytes },
}

impl BuiltinFilter {
    /// Size of the image this filter produces from an input of `size`
    pub fn output_size(&self, (width, height): (u32, u32)) -> (u32, u32) {
        match self {
            BuiltinFilter::Rotate90 { turn_count } if turn_count.rem_euclid(2) == 1 => (height, width),
            _ => (width, height),
        }
    }

    /// Whether the filter can run inside a chain without resizing
    pub fn preserves_size(&self, size: (u32, u32)) -> bool {
        self.output_size(size) == size
    }

    /// A lookup filter built from a mapping function
    pub fn lookup_from_fn(mapping: impl Fn(u8) -> u8) -> Self {
        let table = (0..=u8::MAX).map(mapping).collect::<Vec<_>>();
        BuiltinFilter::Lookup { table: table.into() }
    }
}

impl Kernel for BuiltinFilter {
    fn function_descriptors() -> Vec<FunctionDescriptor> {
        vec![
            kernels::LEVEL.function("level"),
            kernels::GAMMA.function("gamma_correct"),
            kernels::GAUSSIAN_BLUR.function("gaussian_blur"),
            kernels::THRESHOLD.function("threshold"),
            kernels::ROTATE90.function("rotate90"),
            kernels::LOOKUP.function("lookup"),
        ]
    }

    fn name(&self) -> &'static str {
        match self {
            BuiltinFilter::Level { .. } => "level",
            BuiltinFilter::Gamma { .. } => "gamma",
            BuiltinFilter::GaussianBlur { .. } => "gaussianBlur",
            BuiltinFilter::Threshold { .. } => "threshold",
            BuiltinFilter::Rotate90 { .. } => "rotate90",
            BuiltinFilter::Lookup { .. } => "lookup",
        }
    }

    fn descriptor(&self) -> FunctionDescriptor {
        match self {
            BuiltinFilter::Level { .. } => kernels::LEVEL.function("level"),
            BuiltinFilter::Gamma { .. } => kernels::GAMMA.function("gamma_correct"),
            BuiltinFilter::GaussianBlur { .. } => kernels::GAUSSIAN_BLUR.function("gaussian_blur"),
            BuiltinFilter::Threshold { .. } => kernels::THRESHOLD.function("threshold"),
            BuiltinFilter::Rotate90 { .. } => kernels::ROTATE90.function("rotate90"),
            BuiltinFilter::Lookup { .. } => kernels::LOOKUP.function("lookup"),
        }
    }

    fn bind_parameters(&self, encoder: &mut ComputeEncoder<'_>) {
        match self {
            BuiltinFilter::Level { black_level, white_level } => {
                encoder.set_value(0, black_level);
                encoder.set_value(1, white_level);
            }
            BuiltinFilter::Gamma { gamma } => encoder.set_value(0, gamma),
            BuiltinFilter::GaussianBlur { axis, radius } => {
                encoder.set_value(0, axis);
                encoder.set_value(1, radius);
            }
            BuiltinFilter::Threshold { color } => encoder.set_value(0, color),
            BuiltinFilter::Rotate90 { turn_count } => encoder.set_value(0, turn_count),
            BuiltinFilter::Lookup { table } => {
                let mut padded = [0u8; LOOKUP_TABLE_LEN];
                let len = table.len().min(LOOKUP_TABLE_LEN);
                padded[..len].copy_from_slice(&table[..len]);
                encoder.set_bytes(0, &padded);
            }
        }
    }
}

impl FilterKernel for BuiltinFilter {}

/// Builtin kernels that produce pixels without a source
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinGenerator {
    /// Uniform field of one gray level in `[0, 1]`
    SolidColor { color: f64 },
}

impl Kernel for BuiltinGenerator {
    fn function_descriptors() -> Vec<FunctionDescriptor> {
        vec![kernels::SOLID_COLOR.function("solid_color")]
    }

    fn name(&self) -> &'static str {
        match self {
            BuiltinGenerator::SolidColor { .. } => "solidColor",
        }
    }

    fn descriptor(&self) -> FunctionDescriptor {
        match self {
            BuiltinGenerator::SolidColor { .. } => kernels::SOLID_COLOR.function("solid_color"),
        }
    }

    fn bind_parameters(&self, encoder: &mut ComputeEncoder<'_>) {
        match self {
            BuiltinGenerator::SolidColor { color } => encoder.set_value(0, color),
        }
    }
}

impl GeneratorKernel for BuiltinGenerator {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_output_size() {
        let size = (640, 480);
        assert_eq!(BuiltinFilter::Rotate90 { turn_count: 1 }.output_size(size), (480, 640));
        assert_eq!(BuiltinFilter::Rotate90 { turn_count: 2 }.output_size(size), (640, 480));
        assert_eq!(BuiltinFilter::Rotate90 { turn_count: 3 }.output_size(size), (480, 640));
        assert_eq!(BuiltinFilter::Rotate90 { turn_count: -1 }.output_size(size), (480, 640));
        assert_eq!(BuiltinFilter::Rotate90 { turn_count: 4 }.output_size(size), (640, 480));
        assert!(BuiltinFilter::Gamma { gamma: 2.2 }.preserves_size(size));
        assert!(!BuiltinFilter::Rotate90 { turn_count: 1 }.preserves_size(size));
    }

    #[test]
    fn test_descriptors_cover_every_case() {
        let filters = [
            BuiltinFilter::Level { black_level: 0.0, white_level: 1.0 },
            BuiltinFilter::Gamma { gamma: 1.0 },
            BuiltinFilter::GaussianBlur { axis: BlurAxis::X, radius: 1.0 },
            BuiltinFilter::Threshold { color: 0.5 },
            BuiltinFilter::Rotate90 { turn_count: 1 },
            BuiltinFilter::lookup_from_fn(|v| v),
        ];

        let descriptors = BuiltinFilter::function_descriptors();
        assert_eq!(descriptors.len(), filters.len());
        for filter in &filters {
            assert!(descriptors.contains(&filter.descriptor()), "{} has no declared descriptor", filter.name());
        }

        assert_eq!(BuiltinGenerator::function_descriptors(), vec![BuiltinGenerator::SolidColor { color: 0.5 }.descriptor()]);
    }

    #[test]
    fn test_descriptors_name_embedded_entry_points() {
        for descriptor in BuiltinFilter::function_descriptors().into_iter().chain(BuiltinGenerator::function_descriptors()) {
            let source = descriptor.module.source;
            assert!(source.contains(descriptor.name), "{descriptor} is missing from its module source");
        }
    }

    #[test]
    fn test_lookup_from_fn() {
        let BuiltinFilter::Lookup { table } = BuiltinFilter::lookup_from_fn(|v| 255 - v) else {
            panic!("expected a lookup filter");
        };
        assert_eq!(table.len(), LOOKUP_TABLE_LEN);
        assert_eq!(table[0], 255);
        assert_eq!(table[255], 0);
    }

    #[test]
    fn test_blur_axis_layout() {
        assert_eq!(BlurAxis::X.to_gpu(), 0);
        assert_eq!(BlurAxis::Y.to_gpu(), 1);
    }
}
