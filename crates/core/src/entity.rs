//! Entity trait: identity + continuity across state changes.

/// Tenant-owned document with a stable identifier.
///
/// Stores key documents by `(tenant, id())`, so two values with the same id are
/// the same record at different points in time.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
