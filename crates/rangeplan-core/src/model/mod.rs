//! Runtime-only descriptors for tables, columns, and indexes.
//!
//! Models are plain data consumed by the builder and the plan selector;
//! they carry no planning semantics and are cheap to declare as consts in
//! tests.

use crate::value::coerce::ColumnType;
use std::fmt::{self, Display};

///
/// ColumnModel
/// One table column: native domain plus nullability.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ColumnModel {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl ColumnModel {
    #[must_use]
    pub const fn new(name: &'static str, ty: ColumnType, nullable: bool) -> Self {
        Self { name, ty, nullable }
    }
}

///
/// KeypartModel
/// One ordered component of an index key. A partial keypart indexes a
/// truncated prefix of the column and never supports exact containment.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeypartModel {
    pub column: &'static str,
    pub partial: bool,
}

impl KeypartModel {
    #[must_use]
    pub const fn new(column: &'static str) -> Self {
        Self {
            column,
            partial: false,
        }
    }

    #[must_use]
    pub const fn partial(column: &'static str) -> Self {
        Self {
            column,
            partial: true,
        }
    }
}

///
/// IndexModel
/// Runtime descriptor for one index over a table.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexModel {
    pub name: &'static str,
    pub keyparts: &'static [KeypartModel],
    pub unique: bool,
    /// Scans of this index emit row identifiers in a stable, comparable
    /// order, enabling merge-based intersection/union.
    pub ror_capable: bool,
    /// Clustering primary key: rows live in the index, so it covers every
    /// column.
    pub clustered: bool,
}

impl IndexModel {
    #[must_use]
    pub const fn new(name: &'static str, keyparts: &'static [KeypartModel], unique: bool) -> Self {
        Self {
            name,
            keyparts,
            unique,
            ror_capable: false,
            clustered: false,
        }
    }

    #[must_use]
    pub const fn ror(name: &'static str, keyparts: &'static [KeypartModel], unique: bool) -> Self {
        Self {
            name,
            keyparts,
            unique,
            ror_capable: true,
            clustered: false,
        }
    }

    #[must_use]
    pub const fn clustered_pk(name: &'static str, keyparts: &'static [KeypartModel]) -> Self {
        Self {
            name,
            keyparts,
            unique: true,
            ror_capable: true,
            clustered: true,
        }
    }

    /// Keypart position of `column`, if this index contains it.
    #[must_use]
    pub fn keypart_of(&self, column: &str) -> Option<usize> {
        self.keyparts.iter().position(|kp| kp.column == column)
    }

    /// True when every needed column is available from this index alone.
    #[must_use]
    pub fn covers(&self, needed: &[&str]) -> bool {
        self.clustered
            || needed
                .iter()
                .all(|column| self.keyparts.iter().any(|kp| kp.column == *column && !kp.partial))
    }
}

impl Display for IndexModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .keyparts
            .iter()
            .map(|kp| kp.column)
            .collect::<Vec<_>>()
            .join(", ");

        if self.unique {
            write!(f, "UNIQUE {}({})", self.name, fields)
        } else {
            write!(f, "{}({})", self.name, fields)
        }
    }
}

///
/// TableModel
/// Table descriptor: columns plus the index catalog in declaration order.
/// Catalog order is part of the planner determinism contract.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TableModel {
    pub name: &'static str,
    pub columns: &'static [ColumnModel],
    pub indexes: &'static [IndexModel],
}

impl TableModel {
    #[must_use]
    pub const fn new(
        name: &'static str,
        columns: &'static [ColumnModel],
        indexes: &'static [IndexModel],
    ) -> Self {
        Self {
            name,
            columns,
            indexes,
        }
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnModel> {
        self.columns.iter().find(|column| column.name == name)
    }
}

///
/// IndexMask
/// Usable-index bitmap over `TableModel::indexes` positions.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexMask(u64);

impl IndexMask {
    /// Every index usable.
    #[must_use]
    pub const fn all() -> Self {
        Self(u64::MAX)
    }

    #[must_use]
    pub const fn only(positions: &[usize]) -> Self {
        let mut mask = 0u64;
        let mut i = 0;
        while i < positions.len() {
            mask |= 1 << positions[i];
            i += 1;
        }
        Self(mask)
    }

    #[must_use]
    pub const fn contains(self, position: usize) -> bool {
        position < 64 && (self.0 >> position) & 1 == 1
    }
}

impl Default for IndexMask {
    fn default() -> Self {
        Self::all()
    }
}
