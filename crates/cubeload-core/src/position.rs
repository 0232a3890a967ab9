//! Packed 3D grid positions.
//!
//! A [`Position`] identifies one section of the sparse grid. The three
//! signed coordinates are packed into a single `u64`:
//!
//! ```text
//! bit 63            42 41            20 19             0
//!     [ x : 22 bits  ][ z : 22 bits  ][ y : 20 bits   ]
//! ```
//!
//! Each field is stored in two's complement, so decoding is a pair of
//! shifts on the signed representation.

use std::fmt;

use crate::error::PositionError;

const X_BITS: u32 = 22;
const Z_BITS: u32 = 22;
const Y_BITS: u32 = 20;

const X_MASK: u64 = (1 << X_BITS) - 1;
const Z_MASK: u64 = (1 << Z_BITS) - 1;
const Y_MASK: u64 = (1 << Y_BITS) - 1;

const Y_OFFSET: u32 = 0;
const Z_OFFSET: u32 = Y_BITS;
const X_OFFSET: u32 = Y_BITS + Z_BITS;

/// One cell of the sparse grid, packed into a 64-bit key.
///
/// Ordering and hashing operate on the packed value, so positions are
/// cheap map keys and have a total order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position(u64);

impl Position {
    /// Smallest representable x (and z) coordinate.
    pub const MIN_XZ: i32 = -(1 << (X_BITS - 1));
    /// Largest representable x (and z) coordinate.
    pub const MAX_XZ: i32 = (1 << (X_BITS - 1)) - 1;
    /// Smallest representable y coordinate.
    pub const MIN_Y: i32 = -(1 << (Y_BITS - 1));
    /// Largest representable y coordinate.
    pub const MAX_Y: i32 = (1 << (Y_BITS - 1)) - 1;

    /// Pack a coordinate triple.
    ///
    /// Coordinates outside the packed range wrap around, exactly like
    /// integer overflow on each bit field. Use [`try_new`](Self::try_new)
    /// to reject them instead.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(
            ((x as u64 & X_MASK) << X_OFFSET)
                | ((z as u64 & Z_MASK) << Z_OFFSET)
                | ((y as u64 & Y_MASK) << Y_OFFSET),
        )
    }

    /// Pack a coordinate triple, rejecting coordinates that would wrap.
    pub fn try_new(x: i32, y: i32, z: i32) -> Result<Self, PositionError> {
        check_axis("x", x, Self::MIN_XZ, Self::MAX_XZ)?;
        check_axis("y", y, Self::MIN_Y, Self::MAX_Y)?;
        check_axis("z", z, Self::MIN_XZ, Self::MAX_XZ)?;
        Ok(Self::new(x, y, z))
    }

    /// Reinterpret a packed key produced by [`packed`](Self::packed).
    pub const fn from_packed(packed: u64) -> Self {
        Self(packed)
    }

    /// The packed 64-bit key.
    pub const fn packed(self) -> u64 {
        self.0
    }

    /// X coordinate.
    pub const fn x(self) -> i32 {
        ((self.0 as i64) >> X_OFFSET) as i32
    }

    /// Y coordinate.
    pub const fn y(self) -> i32 {
        (((self.0 as i64) << (64 - Y_BITS)) >> (64 - Y_BITS)) as i32
    }

    /// Z coordinate.
    pub const fn z(self) -> i32 {
        (((self.0 as i64) << (64 - Z_OFFSET - Z_BITS)) >> (64 - Z_BITS)) as i32
    }

    /// The position displaced by `(dx, dy, dz)`, wrapping at the packed range.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(
            self.x().wrapping_add(dx),
            self.y().wrapping_add(dy),
            self.z().wrapping_add(dz),
        )
    }

    /// The coarse column key containing this position: `(x, 0, z)`.
    pub const fn column(self) -> Self {
        Self::new(self.x(), 0, self.z())
    }

    /// Chebyshev (L∞) distance to `other`.
    pub fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x().abs_diff(other.x());
        let dy = self.y().abs_diff(other.y());
        let dz = self.z().abs_diff(other.z());
        dx.max(dy).max(dz)
    }
}

fn check_axis(axis: &'static str, value: i32, min: i32, max: i32) -> Result<(), PositionError> {
    if value < min || value > max {
        return Err(PositionError::OutOfRange {
            axis,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({}, {}, {})", self.x(), self.y(), self.z())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x(), self.y(), self.z())
    }
}

impl From<(i32, i32, i32)> for Position {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}
