//! The item algebra: the closed set of value shapes that flow on belts.
//!
//! An [`Item`] is an immutable, structurally-recursive value with exactly
//! five shapes. Equality is structural, there is no identity and no mutation
//! API. Products and sums own their children exclusively, so plain value
//! semantics (clone on move between cells) is all the engine needs.

use crate::num::Num;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// Discriminant for the five item shapes. Used in wrong-shape diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Void,
    Number,
    Text,
    Product,
    Sum,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Void => "void",
            Shape::Number => "number",
            Shape::Text => "text",
            Shape::Product => "product",
            Shape::Sum => "sum",
        };
        f.write_str(name)
    }
}

/// A behavior inspected an item expecting one shape and found another.
///
/// This is always a logic error in a specific machine's behavior, never an
/// engine failure; the engine isolates it to that machine for that tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected a {expected} item, found a {found} item")]
pub struct ShapeError {
    pub expected: Shape,
    pub found: Shape,
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A piece of data carried on conveyor belts.
///
/// `Void` is a real value (the absence-of-meaning marker), distinct from "no
/// item present at this cell", which the engine models as `Option::None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    /// Absence-of-meaningful-value marker.
    Void,
    /// A fixed-point number.
    Number(Num),
    /// A text value.
    Text(String),
    /// An ordered pair of two items.
    Product(Box<Item>, Box<Item>),
    /// A tagged union: one concrete item plus which of two branches it is.
    Sum { tag: bool, inner: Box<Item> },
}

impl Item {
    pub fn number(v: Num) -> Self {
        Item::Number(v)
    }

    pub fn text(s: impl Into<String>) -> Self {
        Item::Text(s.into())
    }

    /// An ordered pair.
    pub fn pair(fst: Item, snd: Item) -> Self {
        Item::Product(Box::new(fst), Box::new(snd))
    }

    /// The `false`-tagged branch of a sum.
    pub fn left(inner: Item) -> Self {
        Item::Sum {
            tag: false,
            inner: Box::new(inner),
        }
    }

    /// The `true`-tagged branch of a sum.
    pub fn right(inner: Item) -> Self {
        Item::Sum {
            tag: true,
            inner: Box::new(inner),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Item::Void => Shape::Void,
            Item::Number(_) => Shape::Number,
            Item::Text(_) => Shape::Text,
            Item::Product(_, _) => Shape::Product,
            Item::Sum { .. } => Shape::Sum,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Item::Void)
    }

    // -- Checked accessors --
    //
    // These define the behavior for accessing a payload of the wrong shape:
    // a ShapeError the owning behavior can propagate or recover from.

    pub fn as_number(&self) -> Result<Num, ShapeError> {
        match self {
            Item::Number(v) => Ok(*v),
            other => Err(ShapeError {
                expected: Shape::Number,
                found: other.shape(),
            }),
        }
    }

    pub fn as_text(&self) -> Result<&str, ShapeError> {
        match self {
            Item::Text(s) => Ok(s),
            other => Err(ShapeError {
                expected: Shape::Text,
                found: other.shape(),
            }),
        }
    }

    pub fn as_pair(&self) -> Result<(&Item, &Item), ShapeError> {
        match self {
            Item::Product(fst, snd) => Ok((fst, snd)),
            other => Err(ShapeError {
                expected: Shape::Product,
                found: other.shape(),
            }),
        }
    }

    pub fn as_sum(&self) -> Result<(bool, &Item), ShapeError> {
        match self {
            Item::Sum { tag, inner } => Ok((*tag, inner)),
            other => Err(ShapeError {
                expected: Shape::Sum,
                found: other.shape(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::num;

    #[test]
    fn structural_equality_scalars() {
        assert_eq!(Item::number(num(5.0)), Item::number(num(5.0)));
        assert_ne!(Item::number(num(5.0)), Item::number(num(6.0)));
        assert_eq!(Item::text("belt"), Item::text("belt"));
        assert_ne!(Item::text("belt"), Item::text("line"));
        assert_eq!(Item::Void, Item::Void);
        assert_ne!(Item::Void, Item::number(num(0.0)));
    }

    #[test]
    fn structural_equality_nested() {
        let a = Item::pair(
            Item::number(num(1.0)),
            Item::left(Item::pair(Item::text("x"), Item::Void)),
        );
        let b = Item::pair(
            Item::number(num(1.0)),
            Item::left(Item::pair(Item::text("x"), Item::Void)),
        );
        assert_eq!(a, b);

        // Flip the sum tag: no longer equal.
        let c = Item::pair(
            Item::number(num(1.0)),
            Item::right(Item::pair(Item::text("x"), Item::Void)),
        );
        assert_ne!(a, c);
    }

    #[test]
    fn pair_order_matters() {
        let ab = Item::pair(Item::text("a"), Item::text("b"));
        let ba = Item::pair(Item::text("b"), Item::text("a"));
        assert_ne!(ab, ba);
    }

    #[test]
    fn shape_discriminants() {
        assert_eq!(Item::Void.shape(), Shape::Void);
        assert_eq!(Item::number(num(1.0)).shape(), Shape::Number);
        assert_eq!(Item::text("t").shape(), Shape::Text);
        assert_eq!(Item::pair(Item::Void, Item::Void).shape(), Shape::Product);
        assert_eq!(Item::left(Item::Void).shape(), Shape::Sum);
    }

    #[test]
    fn checked_accessors_happy_path() {
        assert_eq!(Item::number(num(4.0)).as_number(), Ok(num(4.0)));
        assert_eq!(Item::text("hi").as_text(), Ok("hi"));

        let p = Item::pair(Item::number(num(1.0)), Item::text("two"));
        let (fst, snd) = p.as_pair().unwrap();
        assert_eq!(fst, &Item::number(num(1.0)));
        assert_eq!(snd, &Item::text("two"));

        let s = Item::right(Item::Void);
        assert_eq!(s.as_sum(), Ok((true, &Item::Void)));
    }

    #[test]
    fn wrong_shape_access_is_an_error() {
        let err = Item::text("five").as_number().unwrap_err();
        assert_eq!(err.expected, Shape::Number);
        assert_eq!(err.found, Shape::Text);

        assert!(Item::Void.as_pair().is_err());
        assert!(Item::number(num(1.0)).as_sum().is_err());
    }

    #[test]
    fn shape_error_display() {
        let err = Item::Void.as_number().unwrap_err();
        assert_eq!(err.to_string(), "expected a number item, found a void item");
    }

    #[test]
    fn deep_nesting_clone_and_compare() {
        let mut item = Item::Void;
        for i in 0..64 {
            item = Item::pair(Item::number(num(i as f64)), item);
        }
        let copy = item.clone();
        assert_eq!(item, copy);
    }
}
