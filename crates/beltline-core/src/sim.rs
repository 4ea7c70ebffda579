//! Deterministic state hashing for desync detection.

use crate::item::Item;
use crate::num::Num;

/// A simple deterministic hash of simulation state.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic. Two
/// worlds that hash equal after the same tick sequence are, for desync
/// purposes, the same world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_num(&mut self, v: Num) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Feed an item structurally: a shape tag byte, then the payload, with
    /// children in order. Structurally equal items always hash equal.
    pub fn write_item(&mut self, item: &Item) {
        match item {
            Item::Void => self.write(&[0]),
            Item::Number(v) => {
                self.write(&[1]);
                self.write_num(*v);
            }
            Item::Text(s) => {
                self.write(&[2]);
                self.write_u64(s.len() as u64);
                self.write(s.as_bytes());
            }
            Item::Product(fst, snd) => {
                self.write(&[3]);
                self.write_item(fst);
                self.write_item(snd);
            }
            Item::Sum { tag, inner } => {
                self.write(&[4, *tag as u8]);
                self.write_item(inner);
            }
        }
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::num;

    #[test]
    fn hash_deterministic() {
        let mut h1 = StateHash::new();
        h1.write_u64(42);
        h1.write_i32(-7);

        let mut h2 = StateHash::new();
        h2.write_u64(42);
        h2.write_i32(-7);

        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn hash_order_matters() {
        let mut h1 = StateHash::new();
        h1.write_i32(1);
        h1.write_i32(2);

        let mut h2 = StateHash::new();
        h2.write_i32(2);
        h2.write_i32(1);

        assert_ne!(h1.finish(), h2.finish());
    }

    #[test]
    fn equal_items_hash_equal() {
        let a = Item::pair(Item::number(num(2.0)), Item::right(Item::text("x")));
        let b = Item::pair(Item::number(num(2.0)), Item::right(Item::text("x")));

        let mut ha = StateHash::new();
        ha.write_item(&a);
        let mut hb = StateHash::new();
        hb.write_item(&b);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn different_shapes_hash_differently() {
        let mut void = StateHash::new();
        void.write_item(&Item::Void);

        let mut zero = StateHash::new();
        zero.write_item(&Item::number(num(0.0)));

        assert_ne!(void.finish(), zero.finish());
    }

    #[test]
    fn sum_tag_changes_hash() {
        let mut left = StateHash::new();
        left.write_item(&Item::left(Item::Void));

        let mut right = StateHash::new();
        right.write_item(&Item::right(Item::Void));

        assert_ne!(left.finish(), right.finish());
    }
}
