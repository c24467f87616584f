//! Octahedron-encoded normals (§3, §9): a deliberate file-format choice
//! packing a unit normal into two floats. Encode/decode must be mutual
//! inverses; §8 scenario S7 (chunk file round trip) pins this.

use glam::Vec3;

fn sign_not_zero(v: f32) -> f32 {
    if v >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Maps a unit normal to two floats in `[-1, 1]`.
pub fn encode(n: Vec3) -> [f32; 2] {
    let l1 = n.x.abs() + n.y.abs() + n.z.abs();
    let p = [n.x / l1, n.y / l1];
    if n.z >= 0.0 {
        p
    } else {
        [
            (1.0 - p[1].abs()) * sign_not_zero(p[0]),
            (1.0 - p[0].abs()) * sign_not_zero(p[1]),
        ]
    }
}

/// Inverse of `encode`. Not guaranteed unit-length for arbitrary inputs;
/// callers that need a strict unit normal should `normalize()` the
/// result, matching the reference decoder's behaviour of trusting its
/// own encoder's output.
pub fn decode(encoded: [f32; 2]) -> Vec3 {
    let mut n = Vec3::new(encoded[0], encoded[1], 1.0 - encoded[0].abs() - encoded[1].abs());
    if n.z < 0.0 {
        let x = (1.0 - n.y.abs()) * sign_not_zero(n.x);
        let y = (1.0 - n.x.abs()) * sign_not_zero(n.y);
        n.x = x;
        n.y = y;
    }
    n.normalize()
}
