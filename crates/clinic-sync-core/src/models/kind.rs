//! Entity kinds and the field mapping between wire and client shapes.
//!
//! The server names some attributes differently from the client. Each
//! [`FieldAlias`] pairs a wire key with its client key, and the same
//! mapping is applied in both directions for every operation:
//!
//! ```text
//! wire → client:  client = client ?? wire ?? ""   (wire key dropped)
//! client → wire:  wire   = client ?? wire         (client key dropped)
//! ```

use serde_json::Value;

use super::{Entity, EntityId};

/// A renamed attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAlias {
    /// Key used by the server.
    pub wire: &'static str,
    /// Key exposed to views.
    pub client: &'static str,
}

/// Full-name alias shared by every built-in kind.
pub const NAME_ALIAS: FieldAlias = FieldAlias {
    wire: "nama",
    client: "namaLengkap",
};

const NAME_ALIASES: &[FieldAlias] = &[NAME_ALIAS];

/// Description of one REST resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityKind {
    /// Collection path, e.g. `/patients`.
    pub collection_path: &'static str,
    /// Singular label used in default failure messages.
    pub singular: &'static str,
    /// Plural label used in default failure messages.
    pub plural: &'static str,
    /// Renamed attributes.
    pub aliases: &'static [FieldAlias],
}

impl EntityKind {
    pub const PATIENT: EntityKind = EntityKind {
        collection_path: "/patients",
        singular: "patient",
        plural: "patients",
        aliases: NAME_ALIASES,
    };

    pub const DOCTOR: EntityKind = EntityKind {
        collection_path: "/doctors",
        singular: "doctor",
        plural: "doctors",
        aliases: NAME_ALIASES,
    };

    pub const APPOINTMENT: EntityKind = EntityKind {
        collection_path: "/appointments",
        singular: "appointment",
        plural: "appointments",
        aliases: NAME_ALIASES,
    };

    pub const MEDICAL_RECORD: EntityKind = EntityKind {
        collection_path: "/medical-records",
        singular: "medical record",
        plural: "medical records",
        aliases: NAME_ALIASES,
    };

    /// All built-in kinds.
    pub const ALL: [EntityKind; 4] = [
        Self::PATIENT,
        Self::DOCTOR,
        Self::APPOINTMENT,
        Self::MEDICAL_RECORD,
    ];

    /// Path of a single item, e.g. `/patients/7`.
    pub fn item_path(&self, id: &EntityId) -> String {
        format!("{}/{}", self.collection_path, id)
    }

    /// Map a server record to the client shape.
    pub fn to_client(&self, mut entity: Entity) -> Entity {
        for alias in self.aliases {
            let wire = entity.remove(alias.wire).filter(|v| !v.is_null());
            let client = entity.remove(alias.client).filter(|v| !v.is_null());
            let value = client
                .or(wire)
                .unwrap_or_else(|| Value::String(String::new()));
            entity.insert(alias.client, value);
        }
        entity
    }

    /// Map a client record to the server shape.
    pub fn to_wire(&self, mut entity: Entity) -> Entity {
        for alias in self.aliases {
            let client = entity.remove(alias.client).filter(|v| !v.is_null());
            let wire = entity.remove(alias.wire).filter(|v| !v.is_null());
            if let Some(value) = client.or(wire) {
                entity.insert(alias.wire, value);
            }
        }
        entity
    }

    /// Human-readable name of a client-shape record (first alias).
    pub fn display_name<'a>(&self, entity: &'a Entity) -> &'a str {
        self.aliases
            .first()
            .and_then(|alias| entity.get_str(alias.client))
            .unwrap_or("")
    }

    pub fn fetch_all_failed(&self) -> String {
        format!("Failed to fetch {}", self.plural)
    }

    pub fn fetch_one_failed(&self) -> String {
        format!("Failed to fetch {}", self.singular)
    }

    pub fn create_failed(&self) -> String {
        format!("Failed to create {}", self.singular)
    }

    pub fn update_failed(&self) -> String {
        format!("Failed to update {}", self.singular)
    }

    pub fn delete_failed(&self) -> String {
        format!("Failed to delete {}", self.singular)
    }
}
