//! Row types: the ordered `(name, type, nullable)` field lists every operator produces.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int64,
    Float64,
    Utf8,
    /// Days since 1970-01-01.
    Date,
    /// Result of a COLLECT: a nested bag of rows.
    Multiset,
    /// Type of an untyped NULL literal.
    Null,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Int64 => "BIGINT",
            DataType::Float64 => "DOUBLE",
            DataType::Utf8 => "VARCHAR",
            DataType::Date => "DATE",
            DataType::Multiset => "MULTISET",
            DataType::Null => "NULL",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Ordered list of fields produced by an operator.
///
/// Two row types are interchangeable inside an equivalence set when they have
/// the same number of fields with the same data types; names and nullability
/// may differ between alternatives (see [`RowType::equivalent_to`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowType {
    pub fields: Vec<Field>,
}

impl RowType {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Index of the first field with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn concat(&self, other: &RowType) -> RowType {
        let mut fields = self.fields.clone();
        fields.extend(other.fields.iter().cloned());
        RowType { fields }
    }

    /// Copy of this row type with every field forced nullable (the side of an
    /// outer join that can generate nulls).
    pub fn with_nullability(&self, nullable: bool) -> RowType {
        RowType {
            fields: self
                .fields
                .iter()
                .map(|f| Field {
                    nullable: nullable || f.nullable,
                    ..f.clone()
                })
                .collect(),
        }
    }

    pub fn equivalent_to(&self, other: &RowType) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.data_type == b.data_type)
    }
}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordType(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", field.data_type, field.name)?;
            if !field.nullable {
                write!(f, " NOT NULL")?;
            }
        }
        write!(f, ")")
    }
}
