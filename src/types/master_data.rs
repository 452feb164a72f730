//! Master data tables: shipping lines, charterers and sea transports
//!
//! Every table is described by a constant [`TableSpec`]. The import pipeline and
//! the storage backends only ever see the [`TableSpec`] and untyped [`EntityRow`]s;
//! the typed structs below exist for the wire format.

use serde::{Deserialize, Serialize};

/// One column of a master data table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// CSV header name, matched exactly
    pub header: &'static str,
    /// Database column name
    pub column: &'static str,
    /// Human readable name used in messages
    pub label: &'static str,
    pub max_length: usize,
    pub required: bool,
}

/// Vessel master columns that softly reference a master data table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VesselReference {
    ShippingLine,
    Charterer,
    CallSign,
}

impl VesselReference {
    pub fn column(&self) -> &'static str {
        match self {
            VesselReference::ShippingLine => "shipping_line_code",
            VesselReference::Charterer => "charterer",
            VesselReference::CallSign => "call_sign",
        }
    }
}

/// Static description of a master data table
#[derive(Debug, PartialEq, Eq)]
pub struct TableSpec {
    pub entity: &'static str,
    pub entity_plural: &'static str,
    pub table: &'static str,
    /// Columns in storage order. The first one is the primary key.
    pub columns: &'static [ColumnSpec],
    /// Index of the required descriptive column checked by the validator
    pub description_column: Option<usize>,
    pub referenced_by: Option<VesselReference>,
    /// Index of the column used to order listings
    pub order_by: usize,
}

impl TableSpec {
    pub fn key(&self) -> &ColumnSpec {
        &self.columns[0]
    }

    pub fn required_headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.header).collect()
    }

    pub fn column_list(&self) -> String {
        self.columns.iter().map(|c| c.column).collect::<Vec<_>>().join(", ")
    }
}

/// A normalized row, values in [`TableSpec::columns`] order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRow {
    pub values: Vec<Option<String>>,
}

impl EntityRow {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    /// Primary key; empty when the key value is missing
    pub fn key(&self) -> &str {
        self.value(0).unwrap_or("")
    }

    pub fn value(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }
}

/// Typed view of a master data table
pub trait MasterEntity: Serialize + Send + Sync + 'static {
    const TABLE: &'static TableSpec;

    fn from_row(row: &EntityRow) -> Self;
}

pub const SHIPPING_LINES: TableSpec = TableSpec {
    entity: "shipping line",
    entity_plural: "shipping lines",
    table: "shipping_lines",
    columns: &[
        ColumnSpec { header: "Code", column: "code", label: "code", max_length: 6, required: true },
        ColumnSpec { header: "Description", column: "name", label: "name", max_length: 100, required: true },
    ],
    description_column: Some(1),
    referenced_by: Some(VesselReference::ShippingLine),
    order_by: 1,
};

pub const CHARTERERS: TableSpec = TableSpec {
    entity: "charterer",
    entity_plural: "charterers",
    table: "charterers",
    columns: &[
        ColumnSpec { header: "Key Code", column: "key_code", label: "key code", max_length: 6, required: true },
        ColumnSpec { header: "Description", column: "description", label: "description", max_length: 50, required: true },
        ColumnSpec { header: "Long Description", column: "long_description", label: "long description", max_length: 100, required: false },
    ],
    description_column: Some(1),
    referenced_by: Some(VesselReference::Charterer),
    order_by: 1,
};

pub const TRANSPORT_SEAS: TableSpec = TableSpec {
    entity: "call sign",
    entity_plural: "call signs",
    table: "transport_seas",
    columns: &[
        ColumnSpec { header: "TransportID", column: "transport_id", label: "Transport ID", max_length: 10, required: true },
        ColumnSpec { header: "Name", column: "name", label: "name", max_length: 100, required: false },
        ColumnSpec { header: "CarrierCode", column: "carrier_code", label: "carrier code", max_length: 10, required: false },
        ColumnSpec { header: "CarrierName", column: "carrier_name", label: "carrier name", max_length: 100, required: false },
    ],
    description_column: None,
    referenced_by: Some(VesselReference::CallSign),
    order_by: 0,
};

/// Shipping line (carrier company)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingLine {
    pub code: String,
    pub name: String,
}

impl MasterEntity for ShippingLine {
    const TABLE: &'static TableSpec = &SHIPPING_LINES;

    fn from_row(row: &EntityRow) -> Self {
        Self {
            code: row.key().to_string(),
            name: row.value(1).unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charterer {
    pub key_code: String,
    pub description: String,
    pub long_description: Option<String>,
}

impl MasterEntity for Charterer {
    const TABLE: &'static TableSpec = &CHARTERERS;

    fn from_row(row: &EntityRow) -> Self {
        Self {
            key_code: row.key().to_string(),
            description: row.value(1).unwrap_or_default().to_string(),
            long_description: row.value(2).map(str::to_string),
        }
    }
}

/// Sea transport registry entry; the transport ID is the vessel call sign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportSea {
    pub transport_id: String,
    pub name: Option<String>,
    pub carrier_code: Option<String>,
    pub carrier_name: Option<String>,
}

impl MasterEntity for TransportSea {
    const TABLE: &'static TableSpec = &TRANSPORT_SEAS;

    fn from_row(row: &EntityRow) -> Self {
        Self {
            transport_id: row.key().to_string(),
            name: row.value(1).map(str::to_string),
            carrier_code: row.value(2).map(str::to_string),
            carrier_name: row.value(3).map(str::to_string),
        }
    }
}

/// Response for listing a master data table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterDataListResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
}
