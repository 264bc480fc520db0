#![allow(dead_code)]

use catalogdb::{Action, Catalog, Config, RecordKind, SchemaKind};
use serde_json::{json, Value};

pub const ENG_IDS: [&str; 6] = [
    "11325_158_19640418141800",
    "39727_22_19750113062500",
    "40510_145_19930221211500",
    "42292_5p_19900609195600",
    "42292_9s_19900610041000",
    "CTDF02",
];

pub const FRA_ID: &str = "mdweb_2_catalog_CSW Data Catalog_profile_inspire_core_service_4";

pub const DC_IDS: [&str; 2] = [
    "urn:uuid:19887a8a-f6b0-4a63-ae56-7fba0e17801f",
    "urn:uuid:a06af396-3105-442d-8b40-22b57a90d2f2",
];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// ISO document with one identification block.
pub fn iso_document(identifier: &str, language: &str, title: &str, keywords: &[&[&str]], bbox: [f64; 4]) -> Value {
    let groups: Vec<Value> = keywords.iter().map(|group| json!({"keyword": group})).collect();
    json!({
        "fileIdentifier": identifier,
        "language": language,
        "hierarchyLevel": "dataset",
        "dateStamp": "2009-01-01T00:00:00",
        "contact": [{"organisationName": "IFREMER / IDM/SISMER", "role": "publisher"}],
        "identificationInfo": [{
            "citation": {"title": title, "date": [{"date": "1990-06-09", "dateType": "creation"}]},
            "abstract": format!("Measurements of {}", title),
            "descriptiveKeywords": groups,
            "extent": [{
                "geographicElement": [{
                    "westBoundLongitude": bbox[0],
                    "southBoundLatitude": bbox[1],
                    "eastBoundLongitude": bbox[2],
                    "northBoundLatitude": bbox[3]
                }],
                "temporalElement": [{
                    "beginPosition": "1990-06-05T00:00:00",
                    "endPosition": "1990-07-02T00:00:00"
                }]
            }]
        }]
    })
}

pub fn iso(identifier: &str, language: &str, title: &str, keywords: &[&[&str]], bbox: [f64; 4]) -> RecordKind {
    RecordKind::from_json(SchemaKind::Iso, &iso_document(identifier, language, title, keywords, bbox)).unwrap()
}

pub fn dc(identifier: &str, title: &str, subjects: &[&str], bbox: [f64; 4]) -> RecordKind {
    RecordKind::from_json(
        SchemaKind::Dc,
        &json!({
            "identifier": identifier,
            "title": title,
            "type": "http://purl.org/dc/dcmitype/Image",
            "subject": subjects,
            "language": "en",
            "modified": "2004-03-15",
            "BoundingBox": [{"crs": "EPSG:4326", "minx": bbox[0], "miny": bbox[1], "maxx": bbox[2], "maxy": bbox[3]}]
        }),
    )
    .unwrap()
}

/// The records every integration test starts from.
pub fn fixture_records() -> Vec<RecordKind> {
    vec![
        iso(ENG_IDS[0], "eng", "64061411.bot", &[&["Oceans"]], [1.0, 36.0, 3.0, 38.0]),
        iso(ENG_IDS[1], "eng", "75000111.ctd", &[&["Oceans"], &["Temperature"]], [-4.0, 45.0, -3.0, 46.0]),
        iso(ENG_IDS[2], "eng", "93028011.ctd", &[&["Salinity"]], [-10.0, 40.0, -9.0, 41.0]),
        iso(
            ENG_IDS[3],
            "eng",
            "90008411.ctd",
            &[&["Salinity"], &["Temperature"], &["Oceans"]],
            [1.1, 36.5, 1.2, 36.6],
        ),
        iso(ENG_IDS[4], "eng", "90008411-2.ctd", &[&["Temperature"]], [1.1, 36.5, 1.2, 36.6]),
        iso(ENG_IDS[5], "eng", "CTD profile", &[&["Sea water"]], [20.0, -10.0, 25.0, -5.0]),
        iso(FRA_ID, "fra", "Catalogue service", &[&["Services"]], [-5.0, 41.0, 10.0, 51.0]),
        dc(DC_IDS[0], "Mona Lisa", &["Oceans", "Painting"], [13.754, 60.042, 17.92, 68.41]),
        dc(DC_IDS[1], "Lorem ipsum", &["Tourism--Greece"], [-4.0, 45.0, -3.0, 46.0]),
    ]
}

pub fn seeded_catalog() -> Catalog {
    seeded_catalog_with(Config::default())
}

pub fn seeded_catalog_with(config: Config) -> Catalog {
    init_tracing();
    let catalog = Catalog::new(config).unwrap();
    let actions = fixture_records().into_iter().map(Action::insert).collect();
    let summary = catalog.transaction(actions).unwrap();
    assert_eq!(summary.total_inserted, 9);
    catalog
}
