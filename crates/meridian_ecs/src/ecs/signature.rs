//! # Signatures
//!
//! A signature is a 64-bit set of component type ids. Entities carry one
//! describing what they hold; systems carry one describing what they require.
//!
//! The 64-type ceiling is the width of the backing word, not a domain limit.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Small integer identifying a registered component type (0-63).
///
/// Assigned in registration order by the entity manager.
pub type ComponentTypeId = u8;

/// Maximum number of component types a world can register.
pub const MAX_COMPONENTS: usize = u64::BITS as usize;

/// Fixed-width bitset of component type ids.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Signature(u64);

impl Signature {
    /// The signature with no bits set.
    pub const EMPTY: Self = Self(0);

    /// Creates an empty signature.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Creates a signature from its raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns a copy with `id` set. Ids of 64 and above leave it unchanged.
    #[inline]
    #[must_use]
    pub const fn with(self, id: ComponentTypeId) -> Self {
        Self(self.0 | bit(id))
    }

    /// Sets the bit for `id`. No-op for ids of 64 and above.
    #[inline]
    pub fn set(&mut self, id: ComponentTypeId) {
        self.0 |= bit(id);
    }

    /// Clears the bit for `id`. No-op for ids of 64 and above.
    #[inline]
    pub fn reset(&mut self, id: ComponentTypeId) {
        self.0 &= !bit(id);
    }

    /// Checks the bit for `id`. Ids of 64 and above are never set.
    #[inline]
    #[must_use]
    pub const fn test(self, id: ComponentTypeId) -> bool {
        self.0 & bit(id) != 0
    }

    /// Clears every bit.
    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// True when every bit of `required` is also set here.
    ///
    /// This is the system matching rule: `(self & required) == required`.
    #[inline]
    #[must_use]
    pub const fn contains(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// True when no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterates over the set component ids in ascending order.
    pub fn iter(self) -> impl Iterator<Item = ComponentTypeId> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            // trailing_zeros of a non-zero u64 is at most 63
            let id = bits.trailing_zeros() as ComponentTypeId;
            bits &= bits - 1;
            Some(id)
        })
    }
}

/// Mask for `id`, or 0 when it does not fit in the word.
#[inline]
const fn bit(id: ComponentTypeId) -> u64 {
    match 1u64.checked_shl(id as u32) {
        Some(mask) => mask,
        None => 0,
    }
}

impl BitOr for Signature {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Signature {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Signature {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl FromIterator<ComponentTypeId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentTypeId>>(iter: I) -> Self {
        let mut signature = Self::EMPTY;
        for id in iter {
            signature.set(id);
        }
        signature
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Binary for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reset_test() {
        let mut sig = Signature::new();
        assert!(sig.is_empty());

        sig.set(5);
        sig.set(63);
        assert!(sig.test(5));
        assert!(sig.test(63));
        assert!(!sig.test(4));
        assert_eq!(sig.count(), 2);

        sig.reset(5);
        assert!(!sig.test(5));
        assert_eq!(sig.count(), 1);
    }

    #[test]
    fn test_ids_past_the_word_are_ignored() {
        let mut sig = Signature::EMPTY.with(3);
        for id in [64, 65, 127, 200, ComponentTypeId::MAX] {
            assert!(!sig.test(id), "id {id} reads as set");
            assert_eq!(sig.with(id), sig);
            sig.set(id);
            sig.reset(id);
        }
        assert_eq!(sig.bits(), 0b1000);

        // 64 + 3 must not alias bit 3.
        sig.reset(67);
        assert!(sig.test(3));
        assert!(!Signature::EMPTY.with(3).test(67));
    }

    #[test]
    fn test_contains_is_subset_match() {
        let required = Signature::EMPTY.with(0).with(2);
        let entity = Signature::EMPTY.with(0).with(1).with(2);

        assert!(entity.contains(required));
        assert!(!required.contains(entity));
        assert!(entity.contains(Signature::EMPTY));

        let missing_one = Signature::EMPTY.with(0).with(1);
        assert!(!missing_one.contains(required));
    }

    #[test]
    fn test_iter_ascending() {
        let sig: Signature = [9, 1, 40].into_iter().collect();
        assert_eq!(sig.iter().collect::<Vec<_>>(), vec![1, 9, 40]);
        assert_eq!(format!("{sig:?}"), "{1, 9, 40}");
    }

    #[test]
    fn test_operators() {
        let a = Signature::EMPTY.with(1);
        let b = Signature::EMPTY.with(2);
        let mut c = a | b;
        assert_eq!(c.bits(), 0b110);
        assert_eq!((c & a).bits(), 0b10);

        c |= Signature::from_bits(1);
        assert_eq!(c.bits(), 0b111);
        c.clear();
        assert!(c.is_empty());
    }
}
