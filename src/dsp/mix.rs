//! Signal summing and wet/dry helpers.

/*
Summing Buses
=============

A bus is just a buffer that several sources ADD into. Every render block the
graph clears each bus, sums every upstream signal into it, and hands it to
the next stage.

  Signal A:  [ 1.0,  0.5, -0.5, -1.0]
  Signal B:  [ 1.0,  0.8,  0.2, -0.5]
  Sum:       [ 2.0,  1.3, -0.3, -1.5]  ← can exceed ±1.0!

Summing is unweighted; level management is the job of gains further
downstream (mixer units, the master gain, and the master soft clip).

Wet/Dry
-------

Effects split their input into an untouched (dry) path and a processed (wet)
path and add them back together:

    output = dry × dry_gain + wet × wet_gain

With `dry_gain = 1 − mix` and `wet_gain = mix` the two weights sum to one,
so turning the mix knob crossfades without a level jump.
*/

/// Add signal B into signal A in-place (summing).
#[inline]
pub fn sum_in_place(a: &mut [f32], b: &[f32]) {
    debug_assert_eq!(a.len(), b.len());

    for (sa, &sb) in a.iter_mut().zip(b.iter()) {
        *sa += sb;
    }
}

/// Multiply a buffer by a constant gain in-place.
#[inline]
pub fn scale_in_place(buffer: &mut [f32], gain: f32) {
    for sample in buffer.iter_mut() {
        *sample *= gain;
    }
}

/// Blend dry and wet samples using linear crossfade (single sample version).
///
/// output = (dry × (1-mix)) + (wet × mix)
#[inline]
pub fn blend_dry_wet(dry: f32, wet: f32, mix: f32) -> f32 {
    dry * (1.0 - mix) + wet * mix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_in_place() {
        let mut a = [1.0, 0.5, -0.5, -1.0];
        let b = [1.0, 0.8, 0.2, -0.5];
        sum_in_place(&mut a, &b);
        assert_eq!(a, [2.0, 1.3, -0.3, -1.5]);
    }

    #[test]
    fn test_scale_in_place() {
        let mut a = [1.0, -2.0, 0.5];
        scale_in_place(&mut a, 0.5);
        assert_eq!(a, [0.5, -1.0, 0.25]);
    }

    #[test]
    fn test_blend_dry_wet_endpoints() {
        assert_eq!(blend_dry_wet(1.0, 0.0, 0.0), 1.0);
        assert_eq!(blend_dry_wet(1.0, 0.0, 1.0), 0.0);
        assert_eq!(blend_dry_wet(1.0, 0.0, 0.25), 0.75);
    }
}
