//! Batch table packing.
//!
//! A batch table has a JSON half and a binary half. Identifier and string
//! columns are stored inline in the JSON as arrays. Numeric columns are
//! stored in the binary half and referenced from the JSON by byte offset:
//!
//! ```text
//! ┌────────────────────────────┬─────┬──────────────────────────────┐
//! │ INT columns (4 B / value)  │ pad │ DOUBLE columns (8 B / value) │
//! └────────────────────────────┴─────┴──────────────────────────────┘
//!   ^ byteOffset 0                    ^ multiple of 8
//! ```

use bytes::{BufMut, BytesMut};
use serde_json::{json, Map, Value};

use super::InstanceAttributes;
use crate::error::TileResult;
use crate::layout::{pad_text, round_up, SECTION_ALIGNMENT};

/// JSON key holding the identifier column.
pub const IDENTIFIER_KEY: &str = "CNAM";

/// Component type of a packed numeric attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    /// 32-bit signed integer.
    Int,
    /// 64-bit IEEE float.
    Double,
}

impl ComponentType {
    /// Tag written to the `componentType` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Int => "INT",
            ComponentType::Double => "DOUBLE",
        }
    }

    /// Size of one value in bytes.
    pub fn size(&self) -> usize {
        match self {
            ComponentType::Int => 4,
            ComponentType::Double => 8,
        }
    }
}

/// A packed batch table: JSON descriptor plus binary body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchTable {
    json: Map<String, Value>,
    binary: Vec<u8>,
}

impl BatchTable {
    /// The "no metadata" batch table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pack every instance of `attributes` in index order, or produce an
    /// empty table when there are no attributes.
    pub fn pack_all(attributes: Option<&InstanceAttributes>) -> Self {
        match attributes {
            Some(attributes) => {
                let selection: Vec<usize> = (0..attributes.instance_count()).collect();
                Self::pack(attributes, &selection)
            }
            None => Self::empty(),
        }
    }

    /// Pack the selected instances of `attributes`, in selection order.
    ///
    /// # Panics
    ///
    /// Panics if any selection index is out of range.
    pub fn pack(attributes: &InstanceAttributes, selection: &[usize]) -> Self {
        let count = attributes.instance_count();
        if let Some(bad) = selection.iter().find(|&&idx| idx >= count) {
            panic!(
                "selection index {} out of range for {} instances",
                bad, count
            );
        }

        let mut json = Map::new();
        json.insert(
            IDENTIFIER_KEY.to_string(),
            select_strings(attributes.identifiers(), selection),
        );
        for (name, column) in attributes.strings() {
            json.insert(name.clone(), select_strings(column, selection));
        }

        let int_len = round_up(
            attributes.integers().len() * selection.len() * ComponentType::Int.size(),
            SECTION_ALIGNMENT,
        );
        let double_len = attributes.doubles().len() * selection.len() * ComponentType::Double.size();
        let mut binary = BytesMut::with_capacity(int_len + double_len);

        for (name, column) in attributes.integers() {
            json.insert(name.clone(), descriptor(binary.len(), ComponentType::Int));
            for &idx in selection {
                binary.put_i32_le(column[idx]);
            }
        }

        binary.resize(int_len, 0);

        for (name, column) in attributes.doubles() {
            json.insert(name.clone(), descriptor(binary.len(), ComponentType::Double));
            for &idx in selection {
                binary.put_f64_le(column[idx]);
            }
        }

        Self {
            json,
            binary: binary.to_vec(),
        }
    }

    /// True for the "no metadata" table.
    pub fn is_empty(&self) -> bool {
        self.json.is_empty() && self.binary.is_empty()
    }

    pub fn json(&self) -> &Map<String, Value> {
        &self.json
    }

    pub fn binary(&self) -> &[u8] {
        &self.binary
    }

    /// Serialized JSON padded with spaces to an aligned length. The empty
    /// table serializes to no bytes at all.
    pub fn json_section(&self) -> TileResult<Vec<u8>> {
        if self.json.is_empty() {
            return Ok(Vec::new());
        }
        Ok(pad_text(serde_json::to_vec(&self.json)?, 0))
    }

    /// Binary body, already aligned.
    pub fn binary_section(&self) -> &[u8] {
        &self.binary
    }
}

fn descriptor(byte_offset: usize, component_type: ComponentType) -> Value {
    json!({
        "byteOffset": byte_offset,
        "type": "SCALAR",
        "componentType": component_type.as_str(),
    })
}

fn select_strings(column: &[String], selection: &[usize]) -> Value {
    Value::Array(
        selection
            .iter()
            .map(|&idx| Value::String(column[idx].clone()))
            .collect(),
    )
}
