//! Newtype wrappers for the physical quantities that flow through the pipeline, so that
//! kilowatts, meters, kilograms-per-second and currency amounts cannot be silently mixed
//! in arithmetic. All are backed by `f64`; unlike the teacher's integral `unit!` macro
//! (built for byte/bit counts), this domain's quantities are continuous.

macro_rules! unit {
    ($name: ident) => {
        #[derive(Debug, Default, Copy, Clone, PartialEq, derive_more::Add, derive_more::Sub, derive_more::Sum)]
        pub struct $name(f64);

        impl $name {
            pub const ZERO: $name = Self::new(0.0);

            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            pub const fn into_f64(self) -> f64 {
                self.0
            }

            pub fn scale_by(self, val: f64) -> Self {
                Self(self.0 * val)
            }
        }

        impl From<$name> for f64 {
            fn from(val: $name) -> Self {
                val.into_f64()
            }
        }

        impl From<f64> for $name {
            fn from(val: f64) -> Self {
                Self::new(val)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

unit!(Meters);
unit!(KiloWatts);
unit!(KiloWattHours);
unit!(KgPerSec);
unit!(Currency);

impl std::ops::Mul<f64> for Meters {
    type Output = Meters;
    fn mul(self, rhs: f64) -> Meters {
        Meters::new(self.0 * rhs)
    }
}

impl std::ops::Div<KiloWatts> for Currency {
    type Output = f64;
    fn div(self, rhs: KiloWatts) -> f64 {
        self.0 / rhs.0
    }
}

impl std::ops::Mul<Meters> for Currency {
    type Output = Currency;
    fn mul(self, rhs: Meters) -> Currency {
        Currency::new(self.0 * rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_round_trips() {
        let a = KiloWatts::new(10.0);
        let b = KiloWatts::new(5.0);
        assert_eq!((a + b).into_f64(), 15.0);
        assert_eq!((a - b).into_f64(), 5.0);
    }
}
