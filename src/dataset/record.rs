//! Fixed-schema records
//!
//! A record is one normalized row of a dataset. The field set is fixed by
//! the dataset kind, so field existence and value types are settled when the
//! record is deserialized rather than when it is queried.

use crate::dataset::schema::{Field, Kind, RoomField, SectionField};
use serde::{Deserialize, Serialize};

/// One course section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub uuid: String,
    pub id: String,
    pub title: String,
    pub instructor: String,
    pub dept: String,
    pub year: f64,
    pub avg: f64,
    pub pass: f64,
    pub fail: f64,
    pub audit: f64,
}

impl Section {
    pub fn get(&self, field: SectionField) -> FieldValue<'_> {
        match field {
            SectionField::Avg => FieldValue::Number(self.avg),
            SectionField::Pass => FieldValue::Number(self.pass),
            SectionField::Fail => FieldValue::Number(self.fail),
            SectionField::Audit => FieldValue::Number(self.audit),
            SectionField::Year => FieldValue::Number(self.year),
            SectionField::Dept => FieldValue::Text(&self.dept),
            SectionField::Id => FieldValue::Text(&self.id),
            SectionField::Instructor => FieldValue::Text(&self.instructor),
            SectionField::Title => FieldValue::Text(&self.title),
            SectionField::Uuid => FieldValue::Text(&self.uuid),
        }
    }
}

/// One campus room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub fullname: String,
    pub shortname: String,
    pub number: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    pub seats: f64,
    #[serde(rename = "type")]
    pub room_type: String,
    pub furniture: String,
    pub href: String,
}

impl Room {
    pub fn get(&self, field: RoomField) -> FieldValue<'_> {
        match field {
            RoomField::Lat => FieldValue::Number(self.lat),
            RoomField::Lon => FieldValue::Number(self.lon),
            RoomField::Seats => FieldValue::Number(self.seats),
            RoomField::Fullname => FieldValue::Text(&self.fullname),
            RoomField::Shortname => FieldValue::Text(&self.shortname),
            RoomField::Number => FieldValue::Text(&self.number),
            RoomField::Name => FieldValue::Text(&self.name),
            RoomField::Address => FieldValue::Text(&self.address),
            RoomField::Type => FieldValue::Text(&self.room_type),
            RoomField::Furniture => FieldValue::Text(&self.furniture),
            RoomField::Href => FieldValue::Text(&self.href),
        }
    }
}

/// A record of either kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Section(Section),
    Room(Room),
}

impl Record {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Section(_) => Kind::Sections,
            Self::Room(_) => Kind::Rooms,
        }
    }

    /// Read a field. `None` when the field belongs to the other kind.
    pub fn get(&self, field: Field) -> Option<FieldValue<'_>> {
        match (self, field) {
            (Self::Section(s), Field::Section(f)) => Some(s.get(f)),
            (Self::Room(r), Field::Room(f)) => Some(r.get(f)),
            _ => None,
        }
    }

    /// Numeric values that are NaN or infinite cannot be ordered or aggregated
    pub(crate) fn has_finite_numbers(&self) -> bool {
        let kind = self.kind();
        kind.numeric_fields().into_iter().all(|field| {
            matches!(self.get(field), Some(FieldValue::Number(n)) if n.is_finite())
        })
    }
}

impl From<Section> for Record {
    fn from(section: Section) -> Self {
        Self::Section(section)
    }
}

impl From<Room> for Record {
    fn from(room: Room) -> Self {
        Self::Room(room)
    }
}

/// A borrowed field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
}

impl<'a> FieldValue<'a> {
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}
