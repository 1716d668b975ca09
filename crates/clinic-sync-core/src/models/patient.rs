//! Typed view over a patient record in client shape.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId};

/// A patient as rendered by list, form and report views.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Server id - absent until created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Full name
    #[serde(default)]
    pub nama_lengkap: String,
    /// Sex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jenis_kelamin: Option<String>,
    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_hp: Option<String>,
    /// Date of birth (YYYY-MM-DD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tanggal_lahir: Option<String>,
    /// Presenting complaint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keluhan: Option<String>,
    /// Registration date (YYYY-MM-DD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tanggal_mendaftar: Option<String>,
    /// Address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alamat: Option<String>,
}

impl Patient {
    /// Create a patient form with the required name.
    pub fn new(nama_lengkap: impl Into<String>) -> Self {
        Self {
            nama_lengkap: nama_lengkap.into(),
            ..Self::default()
        }
    }

    /// Read a client-shape entity. Unknown attributes are ignored.
    pub fn from_entity(entity: &Entity) -> Result<Self, serde_json::Error> {
        serde_json::from_value(entity.clone().into_value())
    }

    /// Client-shape entity, ready for `EntityStore::create`/`update`.
    pub fn to_entity(&self) -> Result<Entity, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        Ok(Entity::from_value(value).unwrap_or_default())
    }

    pub fn birth_date(&self) -> Option<NaiveDate> {
        self.tanggal_lahir.as_deref().and_then(parse_date)
    }

    pub fn registration_date(&self) -> Option<NaiveDate> {
        self.tanggal_mendaftar.as_deref().and_then(parse_date)
    }

    /// Age in whole years on the given date.
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        let born = self.birth_date()?;
        if born > date {
            return None;
        }
        let mut years = date.year() - born.year();
        if (date.month(), date.day()) < (born.month(), born.day()) {
            years -= 1;
        }
        u32::try_from(years).ok()
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
