//! Key registry
//!
//! Decides whether an arbitrary host element is one of the keys of a given
//! keyboard, and which note it plays. Targets that cannot be identified are
//! never an error, they are simply "not mine".

use std::sync::atomic::{AtomicU32, Ordering};

/// MIDI-style note number (0-127)
pub type NoteNumber = u8;

static NEXT_CONTAINER: AtomicU32 = AtomicU32::new(1);

/// Identifies the root container a keyboard's keys are placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u32);

impl ContainerId {
    /// Allocate a container id that no other keyboard in this process uses
    pub fn next() -> Self {
        Self(NEXT_CONTAINER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Identifies an element within its container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

/// A reference to an element of the host's element tree
///
/// This is what input events point at. Key elements carry their container
/// and a note marker; anything else the host reports (backgrounds, other
/// widgets, other keyboards' keys) is described the same way and filtered
/// by [`KeyRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef {
    /// Element id, unique within its parent
    pub id: ElementId,
    /// Immediate container of the element, if any
    pub parent: Option<ContainerId>,
    /// Note number attached to key elements
    pub note_marker: Option<NoteNumber>,
}

impl ElementRef {
    /// Reference to a key element
    pub fn key(parent: ContainerId, id: ElementId, note: NoteNumber) -> Self {
        Self {
            id,
            parent: Some(parent),
            note_marker: Some(note),
        }
    }

    /// Reference to an element that is not a key (no note marker)
    pub fn plain(parent: Option<ContainerId>, id: ElementId) -> Self {
        Self {
            id,
            parent,
            note_marker: None,
        }
    }
}

/// Recognizes the keys of one keyboard instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRegistry {
    root: ContainerId,
}

impl KeyRegistry {
    /// Create a registry for keys placed directly in `root`
    pub fn new(root: ContainerId) -> Self {
        Self { root }
    }

    /// The container this registry's keys live in
    pub fn root(&self) -> ContainerId {
        self.root
    }

    /// Check whether `elem` is one of our keys
    ///
    /// With `note` set, the key must also play exactly that note.
    pub fn is_my_key(&self, elem: Option<&ElementRef>, note: Option<NoteNumber>) -> bool {
        match (elem.and_then(|e| self.note_of(e)), note) {
            (Some(_), None) => true,
            (Some(marker), Some(wanted)) => marker == wanted,
            (None, _) => false,
        }
    }

    /// Note played by `elem` if it is one of our keys
    pub fn note_of(&self, elem: &ElementRef) -> Option<NoteNumber> {
        if elem.parent == Some(self.root) {
            elem.note_marker
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_ids_are_unique() {
        let a = ContainerId::next();
        let b = ContainerId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_own_key() {
        let root = ContainerId::next();
        let registry = KeyRegistry::new(root);
        let key = ElementRef::key(root, ElementId(0), 60);

        assert!(registry.is_my_key(Some(&key), None));
        assert!(registry.is_my_key(Some(&key), Some(60)));
        assert_eq!(registry.note_of(&key), Some(60));
    }

    #[test]
    fn test_wrong_note() {
        let root = ContainerId::next();
        let registry = KeyRegistry::new(root);
        let key = ElementRef::key(root, ElementId(1), 61);

        assert!(!registry.is_my_key(Some(&key), Some(60)));
    }

    #[test]
    fn test_foreign_elements() {
        let root = ContainerId::next();
        let other = ContainerId::next();
        let registry = KeyRegistry::new(root);

        // Key of another keyboard
        let foreign_key = ElementRef::key(other, ElementId(0), 60);
        assert!(!registry.is_my_key(Some(&foreign_key), None));
        assert!(!registry.is_my_key(Some(&foreign_key), Some(60)));
        assert_eq!(registry.note_of(&foreign_key), None);

        // Sibling without a note marker
        let label = ElementRef::plain(Some(root), ElementId(99));
        assert!(!registry.is_my_key(Some(&label), None));

        // Detached element and nothing at all
        let detached = ElementRef::plain(None, ElementId(0));
        assert!(!registry.is_my_key(Some(&detached), None));
        assert!(!registry.is_my_key(None, None));
        assert!(!registry.is_my_key(None, Some(60)));
    }
}
