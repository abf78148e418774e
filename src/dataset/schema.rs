//! Dataset schema types
//!
//! Each dataset belongs to one of two closed kinds. A kind fixes the set of
//! numeric fields and string fields a query may reference:
//!
//! - `Kind::Sections`: academic course sections
//! - `Kind::Rooms`: campus rooms
//!
//! Field names are parsed once into the closed `Field` enum; everything
//! downstream matches on variants instead of comparing strings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Separator between a dataset id and a field name (`sections_avg`)
pub const SEPARATOR: char = '_';

/// The two dataset kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Course sections (averages, pass/fail counts, instructors)
    Sections,
    /// Campus rooms (buildings, seats, coordinates)
    Rooms,
}

impl Kind {
    /// Resolve a bare field name for this kind
    pub fn field(&self, name: &str) -> Option<Field> {
        match self {
            Self::Sections => SectionField::from_name(name).map(Field::Section),
            Self::Rooms => RoomField::from_name(name).map(Field::Room),
        }
    }

    /// Declared numeric fields
    pub fn numeric_fields(&self) -> Vec<Field> {
        self.fields()
            .into_iter()
            .filter(|f| f.field_type() == FieldType::Numeric)
            .collect()
    }

    /// Declared string fields
    pub fn text_fields(&self) -> Vec<Field> {
        self.fields()
            .into_iter()
            .filter(|f| f.field_type() == FieldType::Text)
            .collect()
    }

    /// Every declared field, numeric first
    pub fn fields(&self) -> Vec<Field> {
        match self {
            Self::Sections => SectionField::ALL.iter().copied().map(Field::Section).collect(),
            Self::Rooms => RoomField::ALL.iter().copied().map(Field::Room).collect(),
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sections" => Some(Self::Sections),
            "rooms" => Some(Self::Rooms),
            _ => None,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sections => write!(f, "sections"),
            Self::Rooms => write!(f, "rooms"),
        }
    }
}

/// Value type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Always a number (mfield)
    Numeric,
    /// Always a string (sfield)
    Text,
}

/// Fields of a course section record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionField {
    Avg,
    Pass,
    Fail,
    Audit,
    Year,
    Dept,
    Id,
    Instructor,
    Title,
    Uuid,
}

impl SectionField {
    pub const ALL: [SectionField; 10] = [
        Self::Avg,
        Self::Pass,
        Self::Fail,
        Self::Audit,
        Self::Year,
        Self::Dept,
        Self::Id,
        Self::Instructor,
        Self::Title,
        Self::Uuid,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Audit => "audit",
            Self::Year => "year",
            Self::Dept => "dept",
            Self::Id => "id",
            Self::Instructor => "instructor",
            Self::Title => "title",
            Self::Uuid => "uuid",
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Avg | Self::Pass | Self::Fail | Self::Audit | Self::Year => FieldType::Numeric,
            Self::Dept | Self::Id | Self::Instructor | Self::Title | Self::Uuid => FieldType::Text,
        }
    }
}

/// Fields of a room record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomField {
    Lat,
    Lon,
    Seats,
    Fullname,
    Shortname,
    Number,
    Name,
    Address,
    Type,
    Furniture,
    Href,
}

impl RoomField {
    pub const ALL: [RoomField; 11] = [
        Self::Lat,
        Self::Lon,
        Self::Seats,
        Self::Fullname,
        Self::Shortname,
        Self::Number,
        Self::Name,
        Self::Address,
        Self::Type,
        Self::Furniture,
        Self::Href,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lat => "lat",
            Self::Lon => "lon",
            Self::Seats => "seats",
            Self::Fullname => "fullname",
            Self::Shortname => "shortname",
            Self::Number => "number",
            Self::Name => "name",
            Self::Address => "address",
            Self::Type => "type",
            Self::Furniture => "furniture",
            Self::Href => "href",
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Lat | Self::Lon | Self::Seats => FieldType::Numeric,
            Self::Fullname
            | Self::Shortname
            | Self::Number
            | Self::Name
            | Self::Address
            | Self::Type
            | Self::Furniture
            | Self::Href => FieldType::Text,
        }
    }
}

/// A field of either kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Section(SectionField),
    Room(RoomField),
}

impl Field {
    /// Bare field name, without the dataset qualifier
    pub fn name(&self) -> &'static str {
        match self {
            Self::Section(f) => f.name(),
            Self::Room(f) => f.name(),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Section(f) => f.field_type(),
            Self::Room(f) => f.field_type(),
        }
    }

    /// Kind this field belongs to
    pub fn kind(&self) -> Kind {
        match self {
            Self::Section(_) => Kind::Sections,
            Self::Room(_) => Kind::Rooms,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.field_type() == FieldType::Numeric
    }

    /// Qualified name for a dataset id (`sections_avg`)
    pub fn qualified(&self, dataset_id: &str) -> String {
        format!("{}{}{}", dataset_id, SEPARATOR, self.name())
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A `datasetId_field` reference split into its two halves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifiedField<'a> {
    pub dataset_id: &'a str,
    pub field: &'a str,
}

impl<'a> QualifiedField<'a> {
    /// Split on the first separator. Both halves must be non-empty.
    pub fn parse(key: &'a str) -> Option<Self> {
        let (dataset_id, field) = key.split_once(SEPARATOR)?;
        if dataset_id.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self { dataset_id, field })
    }
}

/// Lookup of a dataset id to its kind
pub trait SchemaRegistry {
    fn kind_of(&self, dataset_id: &str) -> Option<Kind>;
}

impl SchemaRegistry for HashMap<String, Kind> {
    fn kind_of(&self, dataset_id: &str) -> Option<Kind> {
        self.get(dataset_id).copied()
    }
}
