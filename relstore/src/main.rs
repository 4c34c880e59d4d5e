//! Relstore - Demo Loader
//!
//! Loads a JSON document into a small team/member/item schema and prints a
//! summary of the resulting object graph.

use anyhow::{Context, Result};
use dotenv::dotenv;
use relstore::schema::{FieldDef, KeyFieldRef, TypeRegistry};
use relstore::{memory, RelationKind, Store, StoreConfig};
use serde::Serialize;
use serde_json::{json, Value};
use std::env;
use std::fs;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable naming the input document.
const INPUT_ENV: &str = "RELSTORE_INPUT";

/// Environment variable selecting the log format ("pretty" or "json").
const LOG_FORMAT_ENV: &str = "RELSTORE_LOG_FORMAT";

/// Initialize tracing/logging.
fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relstore=info"));

    let json = env::var(LOG_FORMAT_ENV)
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .init();
    }

    info!(
        service_name = "relstore",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );
    json
}

/// Schema of the demo document
fn demo_registry() -> Result<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    let team = registry.declare("Team")?;
    let member = registry.declare("Member")?;
    let item = registry.declare("Item")?;

    registry.define(
        team,
        vec![
            FieldDef::key("id"),
            FieldDef::plain("name"),
            FieldDef::relationship("members", member, RelationKind::Child).many(),
        ],
    )?;
    registry.define(
        member,
        vec![
            FieldDef::key("id"),
            FieldDef::plain("name"),
            FieldDef::plain("role").with_default("member"),
            FieldDef::key_nested("team", KeyFieldRef::new(team, "id"), "team_id")
                .back_relation(RelationKind::Child),
        ],
    )?;
    registry.define(
        item,
        vec![
            FieldDef::key("id"),
            FieldDef::plain("title"),
            FieldDef::nested("items", item)
                .many()
                .back_relation(RelationKind::Child),
            FieldDef::relationship("parent", item, RelationKind::Child),
        ],
    )?;

    Ok(registry)
}

/// Built-in document, used when no input is given
fn sample_document() -> Value {
    json!({
        "Member": [
            {"id": 10, "name": "Ada", "team_id": 1, "role": "lead"},
            {"id": 11, "name": "Grace", "team_id": 1},
            {"id": 12, "name": "Linus", "team_id": 2}
        ],
        "Team": [
            {"id": 1, "name": "Storage"},
            {"id": 2, "name": "Networking"}
        ],
        "Item": [
            {"id": 100, "title": "Roadmap", "items": [
                {"id": 101, "title": "Index"},
                {"id": 102, "title": "Graph", "items": [{"id": 103, "title": "Buckets"}]}
            ]}
        ]
    })
}

fn read_document() -> Result<(String, Value)> {
    let path = env::args().nth(1).or_else(|| env::var(INPUT_ENV).ok());

    match path {
        Some(path) => {
            let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            let document =
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;
            Ok((path, document))
        }
        None => Ok(("<built-in sample>".to_string(), sample_document())),
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    input: String,
    records: usize,
    records_by_type: Vec<(String, usize)>,
    edges: usize,
    unresolved_keys: usize,
    memory: memory::StoreMemory,
    bytes_per_record: f64,
}

impl Summary {
    fn collect(input: String, store: &Store) -> Self {
        let records_by_type = store
            .schema()
            .types()
            .map(|def| {
                let count = store
                    .records()
                    .filter(|(_, record)| record.type_tag() == def.tag())
                    .count();
                (def.name().to_string(), count)
            })
            .collect();

        Self {
            input,
            records: store.len(),
            records_by_type,
            edges: store.edge_count(),
            unresolved_keys: store.unresolved_count(),
            memory: memory::store_size(store),
            bytes_per_record: memory::bytes_per_record(store),
        }
    }

    fn print(&self) {
        println!();
        println!(
            "┌──────────────────────────────────────────────────────────────────────────────┐"
        );
        println!(
            "│ Summary                                                                      │"
        );
        println!(
            "├──────────────────────────────────────────────────────────────────────────────┤"
        );
        println!("│ Input:               {:<56}│", truncate(&self.input, 56));
        println!("│ Total records:       {:>6}{:<50}│", self.records, "");
        for (name, count) in &self.records_by_type {
            println!("│   {:<18}{:>6}{:<50}│", truncate(name, 18), count, "");
        }
        println!("│ Relation edges:      {:>6}{:<50}│", self.edges, "");
        println!("│ Unresolved keys:     {:>6}{:<50}│", self.unresolved_keys, "");
        println!(
            "│ Memory:              {:<56}│",
            format!(
                "{} ({:.1} B/record)",
                memory::format_bytes(self.memory.total_bytes),
                self.bytes_per_record
            )
        );
        println!(
            "└──────────────────────────────────────────────────────────────────────────────┘"
        );
    }
}

fn truncate(value: &str, width: usize) -> String {
    value.chars().take(width).collect()
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let json_output = init_tracing();
    let config = StoreConfig::from_env();
    info!(key_registration = ?config.key_registration, "Store configured");

    let schema = Arc::new(demo_registry()?.build().context("building demo schema")?);
    let mut store = Store::with_config(schema, config);

    let (input, document) = read_document()?;
    let loaded = store
        .load_document(document)
        .with_context(|| format!("loading {}", input))?;
    info!(records = loaded.len(), input = %input, "Document loaded");

    let summary = Summary::collect(input, &store);
    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print();
    }

    Ok(())
}
