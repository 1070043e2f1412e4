//! Tests over the bundled catalog, roles document and sample dataset

use care_import::config::ImporterConfig;
use care_import::database::{MemoryStore, load_roles};
use care_import::export::StorageSchema;
use care_import::{Engine, FieldCatalog, FieldValue, TableSource, ValueType};
use std::path::PathBuf;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join(name)
}

fn config() -> ImporterConfig {
    let mut config = ImporterConfig::new();
    config.paths.catalog = data_path("fields_settings.yml");
    config.paths.roles = data_path("roles.yml");
    config.paths.source = data_path("healthcare_dataset.csv");
    config
}

#[test]
fn test_bundled_catalog() {
    let config = config();
    let catalog = FieldCatalog::load(&config.paths.catalog, &config.coercion).unwrap();

    assert_eq!(catalog.top_level_containers(), vec!["care"]);
    assert_eq!(
        catalog.primary_key_field_names(Some("care")),
        vec![
            "Name",
            "Gender",
            "Medical Condition",
            "Date of Admission",
            "Doctor",
            "Hospital"
        ]
    );
    let dates: Vec<&str> = catalog
        .fields_requiring_type(ValueType::Date)
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(dates, vec!["Date of Admission", "Discharge Date"]);

    let schema = StorageSchema::derive(&catalog);
    let paths: Vec<String> = schema.indexes.iter().map(|i| i.dotted_path()).collect();
    assert_eq!(
        paths,
        vec![
            "care.patient.name",
            "care.treatment.medicalCondition",
            "care.admission.dateOfAdmission",
            "care.admission.hospital"
        ]
    );

    let care = &schema.validators["care"]["$jsonSchema"];
    assert_eq!(
        care["properties"]["patient"]["properties"]["bloodType"]["bsonType"],
        serde_json::json!(["string", "null"])
    );
    assert_eq!(
        care["properties"]["billing"]["properties"]["billingAmount"]["bsonType"],
        "double"
    );
}

#[test]
fn test_bundled_roles() {
    let roles = load_roles(&data_path("roles.yml"), "testhealthcare").unwrap();
    let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["care_reader", "care_writer", "care_admin"]);
    assert!(
        roles
            .iter()
            .flat_map(|r| &r.privileges)
            .all(|p| p.resource.db == "testhealthcare")
    );
}

#[test]
fn test_check_sample_dataset() {
    let config = config();
    let source = TableSource::Path(config.paths.source.clone());
    let mut engine = Engine::from_config(config).unwrap();
    let report = engine.check(source).unwrap();

    // Bob (age -5) and Emily (gender Unknown) are dropped, the first Danny
    // Smith row is superseded by the last one
    assert_eq!(report.rows_loaded, 9);
    assert_eq!(report.rows_dropped, 2);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(report.documents_assembled, 6);
    // Christopher Berg: blood type Z+ and an empty test result
    assert_eq!(report.cells_replaced, 2);

    let christopher = engine
        .table()
        .records()
        .iter()
        .find(|r| r.get("Name") == &FieldValue::text("ChRISTopher BerG"))
        .unwrap();
    assert!(christopher.get("Blood Type").is_missing());
    assert_eq!(
        christopher.get("Billing Amount"),
        &FieldValue::Float(19784.63)
    );
}

#[test]
fn test_import_sample_dataset() {
    let rt = runtime();
    rt.block_on(async {
        let config = config();
        let source = TableSource::Path(config.paths.source.clone());
        let store = MemoryStore::new();
        let mut engine = Engine::from_config(config).unwrap();
        let roles = engine.load_roles().unwrap();

        let report = engine.run(source, &store, &roles).await.unwrap();
        assert!(report.is_success(), "{:?}", report.errors);
        assert_eq!(report.inserted, 6);
        assert_eq!(report.indexes_created, 4);
        assert_eq!(report.roles_created, 3);
        assert_eq!(store.count("care"), 6);
    });
}

#[test]
fn test_row_window() {
    let mut config = config();
    config.run.start = 5;
    config.run.limit = 2;
    let source = TableSource::Path(config.paths.source.clone());
    let mut engine = Engine::from_config(config).unwrap();
    let report = engine.check(source).unwrap();

    // rows 5 and 6 are Bob and Emily, both dropped
    assert_eq!(report.rows_loaded, 2);
    assert_eq!(report.documents_assembled, 0);
}
