//! Things - the single record type held by the hosted table.
//!
//! A `Thing` is owned by the user who created it and is only ever changed by
//! the store. Clients build a `NewThing` and let the store assign the id.
//!
//! ## Example
//!
//! ```
//! use things_sync::{NewThing, Thing};
//!
//! let draft = NewThing::new("Small Steel Chair", 42, "user-1");
//! let stored = draft.into_thing(7);
//! assert_eq!(stored.id, 7);
//! assert_eq!(stored.owner, "user-1");
//! ```

mod factory;

use serde::{Deserialize, Serialize};

pub use factory::{RandomThingFactory, ThingFactory};

/// Store-assigned identifier of a thing.
pub type ThingId = i64;

/// A stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thing {
    pub id: ThingId,
    pub name: String,
    pub weight: u32,
    pub owner: String,
}

impl Thing {
    pub fn new(
        id: ThingId,
        name: impl Into<String>,
        weight: u32,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            weight,
            owner: owner.into(),
        }
    }

    /// Read a column by name, formatted the way equality filters compare it.
    pub fn column(&self, column: &str) -> Option<String> {
        match column {
            "id" => Some(self.id.to_string()),
            "name" => Some(self.name.clone()),
            "weight" => Some(self.weight.to_string()),
            "owner" => Some(self.owner.clone()),
            _ => None,
        }
    }
}

/// Insert payload: a thing without an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewThing {
    pub name: String,
    pub weight: u32,
    pub owner: String,
}

impl NewThing {
    pub fn new(name: impl Into<String>, weight: u32, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight,
            owner: owner.into(),
        }
    }

    /// Attach a store-assigned id.
    pub fn into_thing(self, id: ThingId) -> Thing {
        Thing {
            id,
            name: self.name,
            weight: self.weight,
            owner: self.owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lookup() {
        let thing = Thing::new(3, "Lamp", 12, "user-9");
        assert_eq!(thing.column("id").as_deref(), Some("3"));
        assert_eq!(thing.column("owner").as_deref(), Some("user-9"));
        assert_eq!(thing.column("weight").as_deref(), Some("12"));
        assert_eq!(thing.column("colour"), None);
    }

    #[test]
    fn decodes_store_rows_with_extra_columns() {
        let json = r#"{"id":5,"name":"Desk","weight":80,"owner":"u1","created_at":"2024-01-01"}"#;
        let thing: Thing = serde_json::from_str(json).unwrap();
        assert_eq!(thing, Thing::new(5, "Desk", 80, "u1"));
    }

    #[test]
    fn new_thing_serializes_without_id() {
        let value = serde_json::to_value(NewThing::new("Desk", 80, "u1")).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["owner"], "u1");
    }
}
