//! Engine ↔ disk coordinate convention
//!
//! The engine is Z-up and measures in engine units; files on disk are Y-up and
//! measured in 1/64 of that. Both scale factors are powers of two, so a value
//! survives the round trip bit-exactly (barring subnormals).
//!
//! Normals go through the same transform as positions.

use glam::Vec3;

/// Disk units per engine unit.
pub const DISK_SCALE: f32 = 1.0 / 64.0;
/// Engine units per disk unit.
pub const ENGINE_SCALE: f32 = 64.0;

/// Swap Y/Z and scale by 1/64.
#[inline]
pub fn engine_to_disk(v: [f32; 3]) -> [f32; 3] {
    let v = Vec3::from_array(v);
    (Vec3::new(v.x, v.z, v.y) * DISK_SCALE).to_array()
}

/// Exact inverse of [`engine_to_disk`]: scale by 64 and swap Y/Z back.
#[inline]
pub fn disk_to_engine(v: [f32; 3]) -> [f32; 3] {
    let v = Vec3::from_array(v) * ENGINE_SCALE;
    [v.x, v.z, v.y]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_and_scale() {
        assert_eq!(engine_to_disk([64.0, 128.0, 192.0]), [1.0, 3.0, 2.0]);
        assert_eq!(disk_to_engine([1.0, 3.0, 2.0]), [64.0, 128.0, 192.0]);
    }

    #[test]
    fn test_roundtrip_is_exact() {
        let samples = [
            [0.1, -7.25, 1234.5678],
            [-0.0, 0.0, 1.0e-3],
            [3.0e6, -2.5e-2, 0.333_333_34],
        ];
        for v in samples {
            let back = disk_to_engine(engine_to_disk(v));
            for (a, b) in v.iter().zip(back.iter()) {
                assert_eq!(a.to_bits(), b.to_bits(), "{v:?} -> {back:?}");
            }
        }
    }
}
