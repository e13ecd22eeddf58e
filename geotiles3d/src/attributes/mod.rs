//! Per-instance attribute tables.
//!
//! Attribute tables are columnar: one identifier column plus any number of
//! named integer, double and string columns, all sharing the same instance
//! index order. Columns are kept in `BTreeMap`s so that every encoder sees
//! attributes in ascending name order, which fixes the byte layout of the
//! packed batch table.
//!
//! # Example
//!
//! ```
//! use geotiles3d::attributes::{BatchTable, InstanceAttributes};
//!
//! let table = InstanceAttributes::new(vec!["tree".into(), "lamp".into()])
//!     .with_integer("FSC", vec![1, 2])
//!     .with_double("HGT", vec![4.5, 3.0]);
//!
//! let batch = BatchTable::pack(&table, &[1, 0]);
//! assert_eq!(batch.binary().len(), 8 + 16);
//! ```

mod batch_table;

pub use batch_table::{BatchTable, ComponentType, IDENTIFIER_KEY};

use std::collections::BTreeMap;

use crate::geodesy::{BoundingRegion, Cartographic};
use crate::tile::TileNode;

/// Columnar per-instance attributes for one batch of features.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstanceAttributes {
    identifiers: Vec<String>,
    integers: BTreeMap<String, Vec<i32>>,
    doubles: BTreeMap<String, Vec<f64>>,
    strings: BTreeMap<String, Vec<String>>,
}

impl InstanceAttributes {
    /// Create a table from its identifier column; the identifier count is
    /// the instance count.
    pub fn new(identifiers: Vec<String>) -> Self {
        Self {
            identifiers,
            ..Self::default()
        }
    }

    /// Add an integer column.
    ///
    /// # Panics
    ///
    /// Panics if the column length differs from the instance count or the
    /// name is already used.
    pub fn with_integer(mut self, name: impl Into<String>, values: Vec<i32>) -> Self {
        let name = name.into();
        self.check_column(&name, values.len());
        self.integers.insert(name, values);
        self
    }

    /// Add a double column.
    ///
    /// # Panics
    ///
    /// Panics if the column length differs from the instance count or the
    /// name is already used.
    pub fn with_double(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        let name = name.into();
        self.check_column(&name, values.len());
        self.doubles.insert(name, values);
        self
    }

    /// Add a string column.
    ///
    /// # Panics
    ///
    /// Panics if the column length differs from the instance count or the
    /// name is already used.
    pub fn with_string(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        let name = name.into();
        self.check_column(&name, values.len());
        self.strings.insert(name, values);
        self
    }

    fn check_column(&self, name: &str, len: usize) {
        assert_eq!(
            len,
            self.instance_count(),
            "attribute column '{}' has {} values for {} instances",
            name,
            len,
            self.instance_count()
        );
        assert!(
            name != IDENTIFIER_KEY
                && !self.integers.contains_key(name)
                && !self.doubles.contains_key(name)
                && !self.strings.contains_key(name),
            "attribute column '{}' is declared twice",
            name
        );
    }

    pub fn instance_count(&self) -> usize {
        self.identifiers.len()
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn integers(&self) -> &BTreeMap<String, Vec<i32>> {
        &self.integers
    }

    pub fn doubles(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.doubles
    }

    pub fn strings(&self) -> &BTreeMap<String, Vec<String>> {
        &self.strings
    }
}

/// Instance attributes plus the placement of every instance, for
/// instanced-model tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAttributes {
    tile_region: BoundingRegion,
    instances: InstanceAttributes,
    positions: Vec<Cartographic>,
    scales: Vec<[f32; 3]>,
    orientations: Vec<f64>,
}

impl ModelAttributes {
    /// Create model attributes owned by `tile`.
    ///
    /// `orientations` are headings in degrees, clockwise from north.
    ///
    /// # Panics
    ///
    /// Panics if any placement column length differs from the instance
    /// count.
    pub fn new(
        tile: &TileNode,
        instances: InstanceAttributes,
        positions: Vec<Cartographic>,
        scales: Vec<[f32; 3]>,
        orientations: Vec<f64>,
    ) -> Self {
        let count = instances.instance_count();
        assert_eq!(positions.len(), count, "position column length mismatch");
        assert_eq!(scales.len(), count, "scale column length mismatch");
        assert_eq!(orientations.len(), count, "orientation column length mismatch");
        Self {
            tile_region: *tile.region(),
            instances,
            positions,
            scales,
            orientations,
        }
    }

    /// Bounding region of the owning tile.
    pub fn tile_region(&self) -> &BoundingRegion {
        &self.tile_region
    }

    pub fn instances(&self) -> &InstanceAttributes {
        &self.instances
    }

    pub fn positions(&self) -> &[Cartographic] {
        &self.positions
    }

    pub fn scales(&self) -> &[[f32; 3]] {
        &self.scales
    }

    pub fn orientations(&self) -> &[f64] {
        &self.orientations
    }

    pub fn instance_count(&self) -> usize {
        self.instances.instance_count()
    }
}
