//! ULP (unit in the last place) comparison of single precision floats.
//!
//! Two floats of the same sign are equal when their bit patterns, read as
//! integers, are at most `max_ulp` apart. Opposite signs only compare equal
//! when they are exactly equal (±0).

pub const DEFAULT_MAX_ULP: u16 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FloatEq {
    max_ulp: u16,
}

impl FloatEq {
    pub const fn new(max_ulp: u16) -> Self {
        Self { max_ulp }
    }

    /// 1 or 2 is enough for values produced by the same arithmetic; 100 to
    /// 1000 when only 4 or 5 significant digits matter.
    pub fn set_tolerance(&mut self, max_ulp: u16) {
        self.max_ulp = max_ulp;
    }

    pub fn tolerance(&self) -> u16 {
        self.max_ulp
    }

    pub fn equal(&self, a: f32, b: f32) -> bool {
        let a_bits = a.to_bits() as i32;
        let b_bits = b.to_bits() as i32;

        if (a_bits < 0) != (b_bits < 0) {
            return a == b;
        }
        a_bits.abs_diff(b_bits) <= u32::from(self.max_ulp)
    }
}

impl Default for FloatEq {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ULP)
    }
}
