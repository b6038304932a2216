//! Stock entry: the `stocks` table entity and its JSON wire shape.
//!
//! The wire shape is deliberately lenient: any field missing from a payload
//! decodes to its zero value (`0`, `""`, `0.0`, Unix epoch). Only malformed
//! JSON or a field of the wrong type is a decode error.

use chrono::{DateTime, SubsecRound, Utc};
use sea_orm::{entity::prelude::*, ActiveValue::NotSet, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// DDL for the `stocks` table. The service never runs it; operators and
/// tests do.
pub const SCHEMA_SQL: &str = include_str!("../sql/stocks.sql");

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "stocks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub company: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StockEntry {
    #[serde(rename = "stockId")]
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub company: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Current time at the precision a `TIMESTAMPTZ` column keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

impl StockEntry {
    /// Decode a request body. Missing fields become zero values.
    pub fn decode(body: &[u8]) -> Result<Self, ModelError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Decode an update body. It must be a JSON object; its shape is checked
    /// later by `apply_patch`.
    pub fn decode_patch(body: &[u8]) -> Result<serde_json::Value, ModelError> {
        let patch: serde_json::Value = serde_json::from_slice(body)?;
        if !patch.is_object() {
            return Err(ModelError::Decode("expected a JSON object".into()));
        }
        Ok(patch)
    }

    /// Set both timestamps for a fresh entry.
    pub fn stamp_created(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
        self.updated_at = at;
    }

    /// Merge `patch` onto this stored entry. `id` and `createdAt` always keep
    /// their stored values; `updatedAt` moves to `at` (never before `createdAt`).
    pub fn apply_patch(&self, patch: &serde_json::Value, at: DateTime<Utc>) -> Result<Self, ModelError> {
        let mut next = self.merge_json(patch)?;
        next.id = self.id;
        next.created_at = self.created_at;
        next.updated_at = at.max(self.created_at);
        Ok(next)
    }

    /// Apply a JSON object onto this entry and return the result.
    /// Keys absent from `patch` (or set to `null`) keep their current value;
    /// unknown keys are ignored.
    pub fn merge_json(&self, patch: &serde_json::Value) -> Result<Self, ModelError> {
        let serde_json::Value::Object(fields) = patch else {
            return Err(ModelError::Decode("expected a JSON object".into()));
        };
        let mut current = serde_json::to_value(self)?;
        if let Some(obj) = current.as_object_mut() {
            for (key, value) in fields.iter().filter(|(_, v)| !v.is_null()) {
                obj.insert(key.clone(), value.clone());
            }
        }
        Ok(serde_json::from_value(current)?)
    }

    /// Row for an INSERT: the id is left to the `BIGSERIAL` default.
    pub fn to_insert_model(&self) -> ActiveModel {
        ActiveModel {
            id: NotSet,
            name: Set(self.name.clone()),
            price: Set(self.price),
            company: Set(self.company.clone()),
            created_at: Set(self.created_at.into()),
            updated_at: Set(self.updated_at.into()),
        }
    }

    /// Row for an UPDATE keyed by `id`, every business column written.
    pub fn to_update_model(&self) -> ActiveModel {
        ActiveModel {
            id: Set(self.id),
            name: Set(self.name.clone()),
            price: Set(self.price),
            company: Set(self.company.clone()),
            created_at: Set(self.created_at.into()),
            updated_at: Set(self.updated_at.into()),
        }
    }
}

impl From<Model> for StockEntry {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            price: m.price,
            company: m.company,
            created_at: m.created_at.with_timezone(&Utc),
            updated_at: m.updated_at.with_timezone(&Utc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn acme() -> StockEntry {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        StockEntry {
            id: 7,
            name: "A".into(),
            price: 1.0,
            company: "C".into(),
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn decode_uses_wire_names() {
        let e = StockEntry::decode(br#"{"stockId":3,"name":"ACME","price":10.5,"company":"Acme Inc"}"#).unwrap();
        assert_eq!(e.id, 3);
        assert_eq!(e.name, "ACME");
        assert_eq!(e.price, 10.5);
        assert_eq!(e.company, "Acme Inc");
    }

    #[test]
    fn decode_missing_fields_yields_zero_values() {
        let e = StockEntry::decode(b"{}").unwrap();
        assert_eq!(e, StockEntry::default());
        assert_eq!(e.created_at.timestamp(), 0);
    }

    #[test]
    fn decode_rejects_malformed_and_mistyped() {
        assert!(StockEntry::decode(b"{not json").is_err());
        assert!(StockEntry::decode(b"").is_err());
        assert!(StockEntry::decode(br#"{"price":"ten"}"#).is_err());
    }

    #[test]
    fn encode_emits_every_field() {
        let v = serde_json::to_value(acme()).unwrap();
        let obj = v.as_object().unwrap();
        for key in ["stockId", "name", "price", "company", "createdAt", "updatedAt"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert!(v["price"].is_number());
        assert_eq!(v["createdAt"], "2024-03-01T12:00:00Z");
    }

    #[test]
    fn merge_keeps_unspecified_fields() {
        let merged = acme().merge_json(&json!({"price": 2})).unwrap();
        assert_eq!(merged.name, "A");
        assert_eq!(merged.company, "C");
        assert_eq!(merged.price, 2.0);
        assert_eq!(merged.id, 7);
    }

    #[test]
    fn merge_ignores_nulls_and_unknown_keys() {
        let merged = acme().merge_json(&json!({"name": null, "ticker": "ACM"})).unwrap();
        assert_eq!(merged, acme());
    }

    #[test]
    fn merge_rejects_non_objects_and_bad_types() {
        assert!(acme().merge_json(&json!([1, 2])).is_err());
        assert!(acme().merge_json(&json!({"price": "two"})).is_err());
    }

    #[test]
    fn apply_patch_preserves_identity_and_advances_updated_at() {
        let stored = acme();
        let later = stored.created_at + chrono::Duration::minutes(5);
        let next = stored
            .apply_patch(&json!({"price": 2, "stockId": 99, "createdAt": "2030-01-01T00:00:00Z"}), later)
            .unwrap();
        assert_eq!(next.id, 7);
        assert_eq!(next.created_at, stored.created_at);
        assert_eq!(next.updated_at, later);
        assert_eq!(next.price, 2.0);
        assert_eq!(next.name, "A");
    }

    #[test]
    fn apply_patch_never_moves_updated_at_before_created_at() {
        let stored = acme();
        let earlier = stored.created_at - chrono::Duration::days(1);
        let next = stored.apply_patch(&json!({}), earlier).unwrap();
        assert!(next.created_at <= next.updated_at);
    }

    #[test]
    fn decode_patch_requires_object() {
        assert!(StockEntry::decode_patch(br#"{"price":2}"#).is_ok());
        assert!(StockEntry::decode_patch(b"[1]").is_err());
        assert!(StockEntry::decode_patch(b"").is_err());
    }

    #[test]
    fn stamp_created_sets_both_timestamps() {
        let mut e = StockEntry::default();
        let t = now();
        e.stamp_created(t);
        assert_eq!(e.created_at, t);
        assert_eq!(e.updated_at, t);
        assert_eq!(t.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn model_round_trips_through_entry() {
        let e = acme();
        let m = Model {
            id: e.id,
            name: e.name.clone(),
            price: e.price,
            company: e.company.clone(),
            created_at: e.created_at.into(),
            updated_at: e.updated_at.into(),
        };
        assert_eq!(StockEntry::from(m), e);
    }

    #[test]
    fn insert_model_leaves_id_to_storage() {
        let am = acme().to_insert_model();
        assert!(matches!(am.id, NotSet));
        assert_eq!(am.name, Set("A".to_string()));
        let am = acme().to_update_model();
        assert_eq!(am.id, Set(7));
    }

    #[test]
    fn schema_targets_stocks_table() {
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS stocks"));
        assert!(SCHEMA_SQL.contains("updated_at"));
    }
}
