use num_traits::{One, PrimInt};

/// Trait implemented by flag enums that map onto a single bit.
///
/// You choose the backing integer type via the associated `Storage`.
pub trait FlagBitmask {
    type Storage: PrimInt;

    fn bit_index(&self) -> u8;

    fn mask(&self) -> Self::Storage {
        // NOTE: `bit_index()` must be < number of bits in `Storage`.
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// A small bitmask container over any primitive integer.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitmaskFlags<T: PrimInt> {
    pub bits: T,
}

impl<T: PrimInt> BitmaskFlags<T> {
    pub fn new(bits: T) -> Self {
        Self { bits }
    }

    pub fn from_flags<U: FlagBitmask<Storage = T> + Copy>(flags: &[U]) -> Self {
        let mut out = Self::new(T::zero());
        for &flag in flags {
            out.add(flag);
        }
        out
    }

    pub fn add<U: FlagBitmask<Storage = T>>(&mut self, flag: U) {
        self.bits = self.bits | flag.mask();
    }

    pub fn remove<U: FlagBitmask<Storage = T>>(&mut self, flag: U) {
        self.bits = self.bits & !flag.mask();
    }

    pub fn has<U: FlagBitmask<Storage = T>>(&self, flag: U) -> bool {
        (self.bits & flag.mask()) != T::zero()
    }
}

/// Soft-body collision modes.
///
/// Bit positions follow the conventional soft-body layout, so
/// `SoftRigid | SoftSoft` serializes to `0x11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionFlag {
    /// Soft nodes against rigid colliders.
    SoftRigid,
    /// Soft nodes against the nodes of other soft bodies.
    SoftSoft,
}

impl FlagBitmask for CollisionFlag {
    type Storage = u32;

    fn bit_index(&self) -> u8 {
        match self {
            CollisionFlag::SoftRigid => 0,
            CollisionFlag::SoftSoft => 4,
        }
    }
}

pub type CollisionFlags = BitmaskFlags<u32>;
