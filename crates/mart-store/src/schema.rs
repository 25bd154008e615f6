//! The persisted-schema table list from spec §6, as bootstrap DDL.
//!
//! Spec §1 marks DDL as external for the networked (postgres) backend — an
//! operator applies it out of band. The embedded (sqlite) backend has no
//! separate operator, so it self-creates this same schema on open,
//! following the pack's sqlite-recorder precedent of
//! `CREATE TABLE IF NOT EXISTS` at startup (see `DESIGN.md`).

pub const BOOTSTRAP_SQL: &str = r"
CREATE TABLE IF NOT EXISTS pending_event (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    lease_id        TEXT,
    lease_expires_at TEXT,
    payload         TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    modified_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pending_event_lease
    ON pending_event(lease_expires_at);

CREATE TABLE IF NOT EXISTS dead_letter (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    payload          TEXT NOT NULL,
    first_failed_at  TEXT NOT NULL,
    attempt_count    INTEGER NOT NULL,
    last_error_chain TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entity (
    entity_id    INTEGER PRIMARY KEY,
    name         TEXT,
    hash         TEXT,
    record_count INTEGER NOT NULL DEFAULT 0,
    relation_count INTEGER NOT NULL DEFAULT 0,
    modified_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS record (
    data_source TEXT NOT NULL,
    record_id   TEXT NOT NULL,
    entity_id   INTEGER NOT NULL,
    match_key   TEXT,
    principle   TEXT,
    PRIMARY KEY (data_source, record_id)
);

CREATE INDEX IF NOT EXISTS idx_record_entity ON record(entity_id);

CREATE TABLE IF NOT EXISTS relationship (
    lo_entity_id INTEGER NOT NULL,
    hi_entity_id INTEGER NOT NULL,
    match_level  INTEGER NOT NULL,
    match_type   TEXT NOT NULL,
    match_key    TEXT NOT NULL,
    principle    TEXT NOT NULL,
    hash         TEXT,
    PRIMARY KEY (lo_entity_id, hi_entity_id)
);

CREATE TABLE IF NOT EXISTS report_counter (
    report_key    TEXT PRIMARY KEY,
    entity_count  INTEGER NOT NULL DEFAULT 0,
    record_count  INTEGER NOT NULL DEFAULT 0,
    relation_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS report_detail (
    report_key TEXT NOT NULL,
    entity_id  INTEGER NOT NULL,
    related_id INTEGER,
    PRIMARY KEY (report_key, entity_id, related_id)
);

CREATE INDEX IF NOT EXISTS idx_report_detail_entity
    ON report_detail(report_key, entity_id);

CREATE TABLE IF NOT EXISTS report_update (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    report_key     TEXT NOT NULL,
    entity_id      INTEGER NOT NULL,
    related_id     INTEGER,
    entity_delta   INTEGER NOT NULL,
    record_delta   INTEGER NOT NULL,
    relation_delta INTEGER NOT NULL
);
";
