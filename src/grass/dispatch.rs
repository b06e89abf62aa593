//! Workgroup grid sizing for the placement kernel.
//!
//! The instance count is rounded up to a whole number of workgroups. If that
//! group count fits in one grid dimension the dispatch is 1D; otherwise it is
//! folded into X/Y to stay under the per-dimension cap. The shader rebuilds
//! the linear index from `global_invocation_id` and `num_workgroups` and
//! skips indices `>= grass_count`.

/// Threads per workgroup. Must match `@workgroup_size` in `grass_placement.wgsl`.
pub const WORKGROUP_SIZE: u32 = 64;

/// Portable per-dimension workgroup cap (wgpu default limit).
pub const MAX_GROUPS_PER_DIMENSION: u32 = 65_535;

/// A thread-group grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchSize {
    /// Total invocations covered by this grid.
    pub fn invocations(&self, group_size: u32) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64 * group_size as u64
    }

    /// True if every index below `instance_count` gets an invocation.
    pub fn covers(&self, instance_count: u32, group_size: u32) -> bool {
        self.invocations(group_size) >= instance_count as u64
    }
}

/// Size the grid for `instance_count` with the default group size and cap.
///
/// Returns `None` for zero instances: the dispatch is skipped rather than
/// issued with an empty grid.
pub fn dispatch_for(instance_count: u32) -> Option<DispatchSize> {
    dispatch_with(instance_count, WORKGROUP_SIZE, MAX_GROUPS_PER_DIMENSION)
}

/// Size the grid for an explicit group size and per-dimension cap.
pub fn dispatch_with(instance_count: u32, group_size: u32, max_per_dim: u32) -> Option<DispatchSize> {
    if instance_count == 0 || group_size == 0 || max_per_dim == 0 {
        return None;
    }

    let groups = (instance_count as u64).div_ceil(group_size as u64);
    let total = groups * group_size as u64;

    if groups <= max_per_dim as u64 {
        return Some(DispatchSize { x: groups as u32, y: 1, z: 1 });
    }

    let groups_x = total
        .min(max_per_dim as u64)
        .div_ceil(group_size as u64)
        .min(max_per_dim as u64);
    let groups_y = total
        .div_ceil(groups_x * group_size as u64)
        .min(max_per_dim as u64);

    Some(DispatchSize {
        x: groups_x as u32,
        y: groups_y as u32,
        z: 1,
    })
}
