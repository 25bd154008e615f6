//! The ER-engine surface the core consumes (spec.md §6): an opaque service
//! exposing `getEntity(id) -> resolvedEntity | NOT_FOUND`. This module owns
//! the wire shape and its translation into [`mart_types::ResolvedEntity`];
//! [`HttpErEngineClient`] is the production implementation, grounded on the
//! `reqwest::Client` the teacher already uses for its own healthcheck call.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use error_stack::{Report, ResultExt as _};
use mart_types::{EntityCore, MatchType, Record, RecordKey, RelatedEntity, ResolvedEntity};
use serde::Deserialize;

use crate::error::MartError;

/// Fetches the authoritative resolved state of an entity. A caller holding
/// a [`tokio::sync::Mutex`] per entity (`mart-engine::scheduler`) is solely
/// responsible for serializing calls against the same id — this trait makes
/// no such guarantee itself.
pub trait ErEngineClient: Send + Sync {
    fn get_entity(
        &self,
        entity_id: i64,
    ) -> impl Future<Output = Result<Option<ResolvedEntity>, Report<MartError>>> + Send;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct GetEntityResponse {
    resolved_entity: RawResolvedEntity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawResolvedEntity {
    entity_id: i64,
    #[serde(default)]
    entity_name: Option<String>,
    #[serde(default)]
    records: Vec<RawRecord>,
    #[serde(default)]
    related_entities: Vec<RawRelatedEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawRecord {
    data_source: String,
    record_id: String,
    #[serde(default)]
    match_key: Option<String>,
    #[serde(default)]
    errule_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawRelatedEntity {
    entity_id: i64,
    match_level: i32,
    #[serde(default)]
    match_key: Option<String>,
    #[serde(default)]
    errule_code: Option<String>,
    #[serde(default)]
    is_ambiguous: bool,
    #[serde(default)]
    is_disclosed: bool,
    #[serde(default)]
    record_summary: Vec<RawRecordSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawRecordSummary {
    data_source: String,
    record_count: i64,
}

/// `RELATED_ENTITIES` carries only a per-source record *count*, not the
/// individual records a full `GetEntity` on that id would return. To reuse
/// one `EntityCore` type for both the resolved entity and its related
/// entities (spec.md §9's "single record type" design note), a related
/// entity's `EntityCore.records` is filled with `record_count` synthetic,
/// unpersisted placeholders per source — `source_summary()` then recomputes
/// the exact counts the wire payload reported. Only the resolved entity's
/// own `records` ever reach the `record` table (see `diff::apply_mutations`).
fn synthetic_records(summary: &[RawRecordSummary]) -> Vec<Record> {
    let mut records = Vec::new();
    for entry in summary {
        for index in 0..entry.record_count.max(0) {
            records.push(Record::new(
                RecordKey::new(entry.data_source.clone(), format!("~{index}")),
                None,
                None,
            ));
        }
    }
    records
}

fn convert(raw: RawResolvedEntity) -> Result<ResolvedEntity, Report<MartError>> {
    let records = raw
        .records
        .into_iter()
        .map(|r| Record::new(RecordKey::new(r.data_source, r.record_id), r.match_key.as_deref(), r.errule_code.as_deref()))
        .collect();
    let entity = EntityCore::new(raw.entity_id, raw.entity_name, records);

    let related_entities = raw
        .related_entities
        .into_iter()
        .map(|r| {
            let match_type = MatchType::detect(r.is_ambiguous, r.is_disclosed, r.match_level);
            RelatedEntity {
                entity: EntityCore::new(r.entity_id, None, synthetic_records(&r.record_summary)),
                match_type,
                match_key: r.match_key.unwrap_or_default(),
                principle: r.errule_code.unwrap_or_default(),
            }
        })
        .collect();

    ResolvedEntity::new(entity, related_entities)
        .change_context(MartError::Logic("related entity lists itself".to_owned()))
}

/// Production client: `GET {base_url}/entities/{id}`, 404 mapped to `None`.
#[derive(Debug, Clone)]
pub struct HttpErEngineClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpErEngineClient {
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

impl ErEngineClient for HttpErEngineClient {
    async fn get_entity(
        &self,
        entity_id: i64,
    ) -> Result<Option<ResolvedEntity>, Report<MartError>> {
        let url = format!("{}/entities/{entity_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .change_context(MartError::TransportTransient(format!(
                "GET {url} failed"
            )))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().change_context(
            MartError::TransportTransient(format!("GET {url} returned an error status")),
        )?;

        let body: GetEntityResponse = response
            .json()
            .await
            .change_context(MartError::TransportTransient(format!(
                "GET {url} returned an undecodable body"
            )))?;

        convert(body.resolved_entity).map(Some)
    }
}

/// In-memory test double: a fixed map from entity id to resolved state,
/// used by `mart-engine`'s own tests and available to callers assembling
/// their own.
#[derive(Debug, Default)]
pub struct StaticErEngineClient {
    entities: Mutex<HashMap<i64, ResolvedEntity>>,
}

impl StaticErEngineClient {
    #[must_use]
    pub fn new(entities: BTreeMap<i64, ResolvedEntity>) -> Self {
        Self {
            entities: Mutex::new(entities.into_iter().collect()),
        }
    }

    pub fn set(&self, entity: ResolvedEntity) {
        self.entities.lock().unwrap().insert(entity.entity.id, entity);
    }

    pub fn remove(&self, entity_id: i64) {
        self.entities.lock().unwrap().remove(&entity_id);
    }
}

impl ErEngineClient for StaticErEngineClient {
    async fn get_entity(
        &self,
        entity_id: i64,
    ) -> Result<Option<ResolvedEntity>, Report<MartError>> {
        Ok(self.entities.lock().unwrap().get(&entity_id).cloned())
    }
}
