//! Interpolation helpers:
//! - lerp_f32 / lerp_into (component-wise)
//! - hermite_into (cubic Hermite with per-second tangents)

/// Linear interpolation of scalars. Exact at `t == 0` and `t == 1`.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Component-wise lerp of `a` towards `b`, written into `out`.
#[inline]
pub fn lerp_into(out: &mut [f32], a: &[f32], b: &[f32], t: f32) {
    for ((o, va), vb) in out.iter_mut().zip(a).zip(b) {
        *o = lerp_f32(*va, *vb, t);
    }
}

/// Cubic Hermite basis weights `(h00, h10, h01, h11)` at `t`.
#[inline]
pub fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    (
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    )
}

/// Cubic Hermite between `v0` and `v1`. Tangents are per second, so they are
/// scaled by the bracket length `span`.
#[inline]
pub fn hermite_into(
    out: &mut [f32],
    v0: &[f32],
    out_tangent0: &[f32],
    v1: &[f32],
    in_tangent1: &[f32],
    span: f32,
    t: f32,
) {
    let (h00, h10, h01, h11) = hermite_basis(t);
    for (i, o) in out.iter_mut().enumerate() {
        *o = h00 * v0[i] + h10 * span * out_tangent0[i] + h01 * v1[i] + h11 * span * in_tangent1[i];
    }
}
