//! Identity for structures and codelets.
//!
//! Structure ids are namespaced by kind and monotonically assigned within
//! each namespace. They exist for addressing, provenance and logging —
//! never for ordering semantics (the `Ord` impl only makes id sets
//! deterministic to iterate, which seeded runs depend on).

use std::fmt;

use crate::structures::StructureKind;

/// Arena address of a structure: kind namespace plus a monotonic serial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructureId {
    pub kind: StructureKind,
    pub serial: u32,
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.name(), self.serial)
    }
}

/// Monotonic codelet id, shared across all roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CodeletId(pub u64);

impl fmt::Display for CodeletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "codelet{}", self.0)
    }
}

/// Per-run id allocator. One per chamber; reset by building a new chamber.
#[derive(Debug, Default)]
pub struct IdSource {
    structure_serials: [u32; StructureKind::COUNT],
    codelet_serial: u64,
}

impl IdSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_structure(&mut self, kind: StructureKind) -> StructureId {
        let slot = &mut self.structure_serials[kind.index()];
        *slot += 1;
        StructureId { kind, serial: *slot }
    }

    pub fn next_codelet(&mut self) -> CodeletId {
        self.codelet_serial += 1;
        CodeletId(self.codelet_serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serials_are_monotonic_per_kind() {
        let mut ids = IdSource::new();
        let a = ids.next_structure(StructureKind::Chunk);
        let b = ids.next_structure(StructureKind::Chunk);
        let c = ids.next_structure(StructureKind::Label);
        assert_eq!(a.serial, 1);
        assert_eq!(b.serial, 2);
        assert_eq!(c.serial, 1);
        assert_ne!(a, c);
    }

    #[test]
    fn display_is_kind_prefixed() {
        let mut ids = IdSource::new();
        let id = ids.next_structure(StructureKind::Relation);
        assert_eq!(id.to_string(), "Relation1");
        assert_eq!(ids.next_codelet().to_string(), "codelet1");
    }
}
