use fixed::types::I32F32;

/// Q32.32 fixed-point: the numeric scalar carried by items. Exact equality
/// and bit-identical arithmetic on every platform, which the engine's
/// determinism guarantee depends on.
pub type Num = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to [`Num`]. Use for initialization and display glue only,
/// never inside machine behaviors.
#[inline]
pub fn num(v: f64) -> Num {
    Num::from_num(v)
}

/// Convert a [`Num`] back to f64 for display.
#[inline]
pub fn to_f64(v: Num) -> f64 {
    v.to_num::<f64>()
}
