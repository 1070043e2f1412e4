//! End-to-end pipeline tests against the in-memory store
//!
//! Each test builds its own catalog and source so the expected survivors of
//! masking and deduplication are visible in the test itself.

use care_import::database::{DocumentStore, MemoryStore};
use care_import::import::read_csv;
use care_import::transform::CoercionSettings;
use care_import::{
    Engine, EngineError, FieldCatalog, FieldValue, ImporterConfig, LoadError, Stage, TableSource,
};
use serde_json::json;
use tokio::runtime::Runtime;

const CATALOG: &str = r#"
_id:
  doc: care
Name:
  doc: patient
  parent: care
  primary: care
  index: true
Age:
  doc: patient
  parent: care
  type: int
  error_mask:
    function: is_inrange
    param: [0, 130]
Gender:
  doc: patient
  parent: care
  primary: care
  error_mask:
    function: is_in
    param: [Male, Female]
Date of Admission:
  doc: admission
  parent: care
  type: date
  primary: care
Hospital:
  doc: admission
  parent: care
  primary: care
"#;

const HEADER: &str = "Name,Age,Gender,Date of Admission,Hospital\n";

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn catalog(content: &str) -> FieldCatalog {
    FieldCatalog::parse(content, &CoercionSettings::default()).unwrap()
}

fn source(rows: &str) -> TableSource {
    read_csv(format!("{}{}", HEADER, rows).as_bytes())
        .unwrap()
        .into()
}

fn names(engine: &Engine) -> Vec<String> {
    engine
        .table()
        .column_values("Name")
        .iter()
        .map(|v| v.to_string())
        .collect()
}

#[test]
fn test_out_of_range_age_drops_row() {
    let mut engine = Engine::new(ImporterConfig::new(), catalog(CATALOG));
    engine
        .load(source(
            "Bob,-5,Male,2023-01-01,General\nAlice,30,Female,2023-01-02,General\n",
        ))
        .unwrap();
    engine.clean().unwrap();
    assert_eq!(names(&engine), vec!["Alice"]);
    assert_eq!(engine.report().rows_dropped, 1);
}

#[test]
fn test_gender_outside_set_dropped_or_replaced() {
    let rows = "Eve,40,Unknown,2023-01-01,General\n";

    let mut engine = Engine::new(ImporterConfig::new(), catalog(CATALOG));
    engine.load(source(rows)).unwrap();
    engine.clean().unwrap();
    assert!(engine.table().is_empty());

    let replacing = CATALOG.replace(
        "    param: [Male, Female]",
        "    param: [Male, Female]\n  replace: Other",
    );
    let mut engine = Engine::new(ImporterConfig::new(), catalog(&replacing));
    engine.load(source(rows)).unwrap();
    engine.clean().unwrap();
    assert_eq!(engine.table().len(), 1);
    assert_eq!(
        engine.table().records()[0].get("Gender"),
        &FieldValue::text("Other")
    );
    assert_eq!(engine.report().cells_replaced, 1);
}

#[test]
fn test_duplicates_keep_last_row() {
    let mut engine = Engine::new(ImporterConfig::new(), catalog(CATALOG));
    engine
        .load(source(
            "Bob,40,Male,2023-01-01,General\n\
             Ann,50,Female,2023-01-01,General\n\
             Bob,41,Male,2023-01-01,General\n",
        ))
        .unwrap();
    engine.clean().unwrap();
    engine.deduplicate().unwrap();

    assert_eq!(names(&engine), vec!["Ann", "Bob"]);
    let bob = &engine.table().records()[1];
    assert_eq!(bob.index(), 2);
    assert_eq!(bob.get("Age"), &FieldValue::Integer(41));
    assert_eq!(engine.report().duplicates_removed, 1);
}

#[test]
fn test_missing_column_aborts_before_cleaning() {
    let mut engine = Engine::new(ImporterConfig::new(), catalog(CATALOG));
    let table = read_csv("Name,Age,Gender,Hospital\nBob,40,Male,General\n".as_bytes()).unwrap();
    let err = engine.load(table.into()).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Load(LoadError::MissingColumns(ref cols))
            if cols == &vec!["Date of Admission".to_string()]
    ));
    assert_eq!(engine.stage(), Stage::Idle);
    assert!(engine.clean().is_err());
}

#[test]
fn test_second_run_only_updates() {
    let rt = runtime();
    rt.block_on(async {
        let store = MemoryStore::new();
        let rows = "Bob,40,Male,2023-01-01,General\nAnn,50,Female,2023-01-02,General\n";

        let mut first = Engine::new(ImporterConfig::new(), catalog(CATALOG));
        let report = first.run(source(rows), &store, &[]).await.unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.updated, 0);
        let ids = store.document_ids("care");

        let mut second = Engine::new(ImporterConfig::new(), catalog(CATALOG));
        let report = second.run(source(rows), &store, &[]).await.unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.updated, 2);
        assert_eq!(report.collections_created, 0);
        assert_eq!(store.document_ids("care"), ids);
    });
}

#[test]
fn test_assembled_document_shape() {
    let rt = runtime();
    rt.block_on(async {
        let store = MemoryStore::new();
        let mut engine = Engine::new(ImporterConfig::new(), catalog(CATALOG));
        engine
            .run(source("Bob,40,Male,2023-01-01,General\n"), &store, &[])
            .await
            .unwrap();

        let id = care_import::assembly::document_id("Bob_Male_2023-01-01_General");
        let stored = store.document("care", &id).unwrap();
        assert_eq!(
            stored.to_json(),
            json!({
                "_id": id,
                "patient": {"name": "Bob", "age": 40, "gender": "Male"},
                "admission": {"dateOfAdmission": "2023-01-01", "hospital": "General"}
            })
        );
        assert_eq!(store.indexes("care"), vec!["patient.name"]);
    });
}

#[test]
fn test_trace_only_sends_nothing() {
    let rt = runtime();
    rt.block_on(async {
        let store = MemoryStore::new();
        let mut config = ImporterConfig::new();
        config.run.trace_only = true;
        config.run.clean_db = true;
        let mut engine = Engine::new(config, catalog(CATALOG));
        let report = engine
            .run(source("Bob,40,Male,2023-01-01,General\n"), &store, &[])
            .await
            .unwrap();

        assert_eq!(report.documents_assembled, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.total_written(), 0);
        assert!(store.list_collection_names().await.unwrap().is_empty());
    });
}

#[test]
fn test_rejected_rows_do_not_stop_the_batch() {
    let rt = runtime();
    rt.block_on(async {
        let store = MemoryStore::new();
        // pre-existing collection whose validator forbids null ages
        store
            .create_collection(
                "care",
                &json!({"$jsonSchema": {
                    "bsonType": "object",
                    "properties": {"patient": {
                        "bsonType": "object",
                        "properties": {"age": {"bsonType": "int"}}
                    }}
                }}),
            )
            .await
            .unwrap();

        let nullable_age = CATALOG.replace(
            "    param: [0, 130]",
            "    param: [0, 130]\n  replace: null",
        );
        let mut engine = Engine::new(ImporterConfig::new(), catalog(&nullable_age));
        let report = engine
            .run(
                source(
                    "Bob,-5,Male,2023-01-01,General\n\
                     Ann,50,Female,2023-01-02,General\n",
                ),
                &store,
                &[],
            )
            .await
            .unwrap();

        assert_eq!(engine.stage(), Stage::Persisted);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.is_success());
        assert_eq!(store.count("care"), 1);
    });
}

#[test]
fn test_clean_db_recreates_collections_and_roles() {
    let rt = runtime();
    rt.block_on(async {
        let store = MemoryStore::new();
        let roles = care_import::database::parse_roles(
            r#"roles:
  - createRole: reader
    privileges:
      - resource: {db: "${dbname}", collection: care}
        actions: [find]
"#,
            "testhealthcare",
        )
        .unwrap();
        let rows = "Bob,40,Male,2023-01-01,General\n";

        let mut engine = Engine::new(ImporterConfig::new(), catalog(CATALOG));
        engine.run(source(rows), &store, &roles).await.unwrap();
        assert_eq!(store.role_names(), vec!["reader"]);

        // without a reset the role already exists and creating it again fails
        let mut engine = Engine::new(ImporterConfig::new(), catalog(CATALOG));
        let report = engine.run(source(rows), &store, &roles).await.unwrap();
        assert_eq!(report.roles_created, 0);

        let mut config = ImporterConfig::new();
        config.run.clean_db = true;
        let mut engine = Engine::new(config, catalog(CATALOG));
        let report = engine.run(source(rows), &store, &roles).await.unwrap();
        assert_eq!(report.collections_created, 1);
        assert_eq!(report.roles_created, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(store.count("care"), 1);
    });
}
