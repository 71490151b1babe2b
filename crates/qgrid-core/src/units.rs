//! Power and energy newtypes.
//!
//! Dispatch works in average power per snapshot (MW) while results are
//! reported in energy (MWh). Keeping the two as distinct types makes the
//! step-duration conversion explicit at every boundary.
//!
//! ```
//! use qgrid_core::units::{Hours, MegawattHours, Megawatts};
//!
//! let p = Megawatts(250.0);
//! let e: MegawattHours = p * Hours(24.0);
//! assert_eq!(e, MegawattHours(6000.0));
//! assert_eq!(e / Hours(24.0), p);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Sub};

macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $type {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl Div<$type> for $type {
            type Output = f64;
            fn div(self, rhs: $type) -> Self::Output {
                self.0 / rhs.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.2} {}", self.0, $unit_name)
            }
        }

        impl $type {
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            #[inline]
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Average active power over a snapshot, in megawatts (MW)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl_unit_ops!(Megawatts, "MW");

/// Energy in megawatt-hours (MWh)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MegawattHours(pub f64);

impl_unit_ops!(MegawattHours, "MWh");

/// Duration in hours
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Hours(pub f64);

impl_unit_ops!(Hours, "h");

impl Mul<Hours> for Megawatts {
    type Output = MegawattHours;
    fn mul(self, rhs: Hours) -> Self::Output {
        MegawattHours(self.0 * rhs.0)
    }
}

impl Div<Hours> for MegawattHours {
    type Output = Megawatts;
    fn div(self, rhs: Hours) -> Self::Output {
        Megawatts(self.0 / rhs.0)
    }
}

impl MegawattHours {
    /// Convert to terawatt-hours.
    pub fn to_twh(self) -> f64 {
        self.0 / 1.0e6
    }
}
