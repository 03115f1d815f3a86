//! # IDs
//! Every cross-reference in a document is made through an ID. This is implemented in this module via the `Id<T>` type,
//! which wraps a random 128-bit value namespaced by the type T. IDs are never reused, even after the thing they name is deleted.
//!
//! To get a fresh ID, simply use `Id<YourNamespaceTy>`'s `Default` impl. To eagerly acquire many ids,
//! use `Id::many`.

/// ID that is globally unique.
/// IDs with different types may share a value but should not be considered equal.
pub struct Id<T: std::any::Any> {
    id: uuid::Uuid,
    // Namespace marker. `fn() -> T` so that T's auto traits aren't inherited.
    _phantom: std::marker::PhantomData<fn() -> T>,
}
impl<T: std::any::Any> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for Id<T> {}
impl<T: std::any::Any> std::cmp::PartialEq<Id<T>> for Id<T> {
    fn eq(&self, other: &Id<T>) -> bool {
        // Namespace already checked at compile time - Self::T == Other::T of course!
        self.id == other.id
    }
}
impl<T: std::any::Any> std::cmp::Eq for Id<T> {}
impl<T: std::any::Any> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl<T: std::any::Any> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: std::any::Any> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T: std::any::Any> Id<T> {
    /// Allocate a fresh, random ID.
    #[must_use]
    pub fn new() -> Self {
        Self::from_uuid(uuid::Uuid::new_v4())
    }
    /// Wrap an existing value, e.g. one read back from a script.
    #[must_use]
    pub const fn from_uuid(id: uuid::Uuid) -> Self {
        Self {
            id,
            _phantom: std::marker::PhantomData,
        }
    }
    /// Get the raw value of this ID.
    /// IDs from differing namespaces may share the same value!
    #[must_use]
    pub fn uuid(&self) -> uuid::Uuid {
        self.id
    }
    /// Allocate many IDs at once.
    ///
    /// *The order of IDs is undefined.* All that's guaranteed is that they're unique.
    pub fn many(count: usize) -> impl ExactSizeIterator<Item = Self> {
        (0..count).map(|_| Self::new())
    }
}
impl<T: std::any::Any> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: std::any::Any> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // rsplit always yields at least one element, even for empty strings.
        let name = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or_default();
        write!(f, "{name}#{}", self.id.as_hyphenated())
    }
}
impl<T: std::any::Any> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Id<T> as std::fmt::Display>::fmt(self, f)
    }
}
// Serialized as a bare uuid, the namespace is implied by context.
impl<T: std::any::Any> serde::Serialize for Id<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.id.serialize(serializer)
    }
}
impl<'de, T: std::any::Any> serde::Deserialize<'de> for Id<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        uuid::Uuid::deserialize(deserializer).map(Self::from_uuid)
    }
}
