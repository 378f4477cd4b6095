use core::fmt;
use core::num::NonZeroU32;

/// Handle into one of the kernel's arenas (nodes of a system, children of a
/// system). Stored as `position + 1` so an unbound `Option<Id>` is free.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id(NonZeroU32);

impl Id {
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// # Panics
    /// If `position` does not fit a `u32`; arenas never grow that large.
    pub fn from_usize(position: usize) -> Self {
        match u32::try_from(position) {
            Ok(index) => Self::from_index(index),
            Err(_) => panic!("arena position {position} exceeds the id range"),
        }
    }

    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// Position in the owning arena.
    pub fn slot(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Node in a system's node arena.
pub type NodeId = Id;
/// Child component slot in a system.
pub type CompId = Id;
