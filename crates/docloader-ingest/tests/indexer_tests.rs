//! Full runs from configuration to output file

mod common;

use common::MockSink;
use docloader_common::DocloaderError;
use docloader_ingest::computed::ComputedFieldRegistry;
use docloader_ingest::config::IndexerConfig;
use docloader_ingest::field::FieldValue;
use docloader_ingest::indexer::Indexer;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn read_documents(path: &Path) -> Vec<serde_json::Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn csv_config(dir: &TempDir, data: &str) -> IndexerConfig {
    let data_file = dir.path().join("sites.csv");
    fs::write(&data_file, data).unwrap();

    let toml = format!(
        r#"
data_type = "csv"
path_to_data_file = '{}'
first_row_is_header = true
fields = "id:int;name;opened:datetime:yyyy-MM-dd;tags:multivalued"
literals = "type:string:site"
unique_key_field_value = "type;id"
unique_key_field_value_delimiter = "-"
multivalue_field_delimiter = "|"
batch_size = 2
thread_count = 2
sleep_millis_between_retries = 0

[sink]
type = "jsonl"
path = '{}'
"#,
        data_file.display(),
        dir.path().join("out/sites.jsonl").display()
    );

    IndexerConfig::from_toml_str(&toml).unwrap()
}

#[tokio::test]
async fn test_csv_to_jsonl() {
    let dir = TempDir::new().unwrap();
    let config = csv_config(
        &dir,
        "id,name,opened,tags\n\
         42,Acme,2020-03-01,north|depot\n\
         43,\"Bolt, Inc\",,\n\
         ,Orphan,2021-01-01,\n",
    );

    let totals = Indexer::new(config).run().await.unwrap();
    assert_eq!(totals.rows_read, 3);
    assert_eq!(totals.rows_skipped, 1);
    assert_eq!(totals.documents_indexed, 2);

    let mut documents = read_documents(&dir.path().join("out/sites.jsonl"));
    documents.sort_by_key(|d| d["id"].as_str().unwrap_or_default().to_string());

    assert_eq!(
        documents[0],
        serde_json::json!({
            "id": "site-42",
            "name": {"set": "Acme"},
            "opened": {"set": "2020-03-01T00:00:00Z"},
            "tags": {"set": ["north", "depot"]},
            "type": {"set": "site"}
        })
    );
    assert_eq!(
        documents[1],
        serde_json::json!({
            "id": "site-43",
            "name": {"set": "Bolt, Inc"},
            "type": {"set": "site"}
        })
    );
}

#[tokio::test]
async fn test_json_lines_input_with_computed_field() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("people.jsonl");
    fs::write(
        &data_file,
        "{\"person_id\": \"p1\", \"first\": \"Ada\", \"last\": \"Lovelace\"}\n\
         \n\
         {\"person_id\": \"p2\", \"first\": \"Alan\", \"last\": null}\n",
    )
    .unwrap();

    let config = IndexerConfig {
        data_type: Some("json".parse().unwrap()),
        path_to_data_file: Some(data_file),
        fields: "id;first;last".to_string(),
        fields_to_json: "id:person_id".to_string(),
        dynamic_fields: "full_name=concat(first,last)".to_string(),
        first_row_is_header: true,
        ..IndexerConfig::default()
    };

    let sink = Arc::new(MockSink::default());
    let totals = Indexer::new(config).run_with_sink(sink.clone()).await.unwrap();

    assert_eq!(totals.documents_indexed, 2);
    assert_eq!(MockSink::count(&sink.commits), 1);
    assert_eq!(MockSink::count(&sink.optimizes), 0);
    assert_eq!(MockSink::count(&sink.closes), 1);
}

#[tokio::test]
async fn test_custom_computed_plugin() {
    let dir = TempDir::new().unwrap();
    let mut config = csv_config(&dir, "id,name,opened,tags\n7,Acme,,\n");
    config.dynamic_fields = "slug=slugify(name)".to_string();
    config.optimize_index = true;

    let mut registry = ComputedFieldRegistry::with_builtins();
    registry.register_fn("slugify", |_target: &str, sources: &[String]| {
        sources
            .first()
            .map(|s| FieldValue::String(s.to_lowercase().replace(' ', "-")))
    });

    Indexer::new(config).with_registry(registry).run().await.unwrap();

    let documents = read_documents(&dir.path().join("out/sites.jsonl"));
    assert_eq!(documents[0]["slug"], serde_json::json!({"set": "acme"}));
}

#[tokio::test]
async fn test_unknown_plugin_fails_before_loading() {
    let dir = TempDir::new().unwrap();
    let mut config = csv_config(&dir, "id,name,opened,tags\n7,Acme,,\n");
    config.dynamic_fields = "slug=slugify(name)".to_string();

    let sink = Arc::new(MockSink::default());
    let err = Indexer::new(config).run_with_sink(sink.clone()).await.unwrap_err();

    assert!(err.is_configuration(), "{err}");
    assert_eq!(MockSink::count(&sink.writes), 0);
    assert_eq!(MockSink::count(&sink.closes), 1);
}

#[tokio::test]
async fn test_missing_data_file() {
    let dir = TempDir::new().unwrap();
    let mut config = csv_config(&dir, "");
    config.path_to_data_file = Some(dir.path().join("absent.csv"));

    let sink = Arc::new(MockSink::default());
    let err = Indexer::new(config).run_with_sink(sink.clone()).await.unwrap_err();

    assert!(matches!(err, DocloaderError::DataFile { .. }), "{err}");
    assert_eq!(MockSink::count(&sink.commits), 0);
}

#[tokio::test]
async fn test_failed_load_is_not_committed() {
    let dir = TempDir::new().unwrap();
    let mut config = csv_config(&dir, "id,name,opened,tags\n1,a,,\n2,b,,\n3,c,,\n");
    config.retry_count = 1;

    let sink = Arc::new(MockSink::failing_after(0));
    let err = Indexer::new(config).run_with_sink(sink.clone()).await.unwrap_err();

    assert_eq!(err.partial_totals(), Some((0, 0)));
    assert_eq!(MockSink::count(&sink.commits), 0);
    assert_eq!(MockSink::count(&sink.closes), 1);
}
