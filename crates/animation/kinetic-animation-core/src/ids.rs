//! Identifiers and a simple allocator for instances.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of an animation instance (leaf or timeline).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic allocator for InstanceId.
/// Timeline children draw from the same allocator as top-level instances.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_instance: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_instance(&mut self) -> InstanceId {
        let id = InstanceId(self.next_instance);
        self.next_instance = self.next_instance.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_instance(), InstanceId(0));
        assert_eq!(alloc.alloc_instance(), InstanceId(1));
        alloc.reset();
        assert_eq!(alloc.alloc_instance(), InstanceId(0));
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(InstanceId(7).to_string(), "#7");
    }
}
