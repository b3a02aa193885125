//! Threadgroup and grid arithmetic

/// Threadgroup size every kernel entry point declares
pub const THREADGROUP_SIZE: [u32; 3] = [16, 16, 1];

/// Workgroup counts covering an image of a given size
///
/// Edges are rounded up; kernels bound-check against their texture dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGeometry {
    /// Threads per workgroup
    pub threadgroup: [u32; 3],
    /// Workgroups per dispatch
    pub grid: [u32; 3],
}

impl DispatchGeometry {
    /// Computes the geometry for a `width`×`height` image
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            threadgroup: THREADGROUP_SIZE,
            grid: [width.div_ceil(THREADGROUP_SIZE[0]), height.div_ceil(THREADGROUP_SIZE[1]), 1],
        }
    }

    /// Computes the geometry for a `(width, height)` pair
    pub fn for_size((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}
