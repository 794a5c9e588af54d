//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity and are compared by their values. In the
/// pantry model:
///
/// - `Quantity(3)` is a value object (any two threes are interchangeable)
/// - `Category::Dairy` is a value object
/// - `InventoryItem { id, .. }` is an entity (two items with equal fields but
///   different ids are different items)
///
/// Value objects validate on construction and are immutable afterwards; to
/// "change" one, build a new one.
///
/// ```ignore
/// let q = Quantity::new(2)?;
/// assert_eq!(q.saturating_add(Quantity::new(3)?), Quantity::new(5)?);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
