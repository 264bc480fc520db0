mod common;

use catalogdb::search::ProjectedRecord;
use catalogdb::tree::RecordTree;
use catalogdb::{
    Action, Catalog, Config, Constraint, ErrorKind, FilterExpr, Node, Projection, PropertyUpdate, QueryRequest,
    ResultMode, SchemaKind,
};
use common::*;

fn ids(catalog: &Catalog, request: QueryRequest) -> Vec<String> {
    catalog.query(&request).unwrap().records.into_iter().map(|r| r.identifier).collect()
}

fn cql(catalog: &Catalog, text: &str) -> Vec<String> {
    ids(catalog, QueryRequest::cql(text).page(1, 100))
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn equality_and_negation() {
    let catalog = seeded_catalog();
    let mut eng = owned(&ENG_IDS);
    eng.sort();
    assert_eq!(cql(&catalog, "Language = 'eng'"), eng);

    let others = owned(&[FRA_ID, DC_IDS[0], DC_IDS[1]]);
    assert_eq!(cql(&catalog, "Language <> 'eng'"), others);
    assert_eq!(cql(&catalog, "NOT Language = 'eng'"), others);
    assert_eq!(cql(&catalog, "language != 'eng'"), others);
}

#[test]
fn comparisons_are_existential_over_repeated_values() {
    let catalog = seeded_catalog();
    assert_eq!(
        cql(&catalog, "Subject = 'Temperature' AND Subject = 'Salinity'"),
        owned(&[ENG_IDS[3]])
    );
    assert_eq!(
        cql(&catalog, "Language = 'fra' OR Subject = 'Painting'"),
        owned(&[FRA_ID, DC_IDS[0]])
    );
    // a record lacking the property never satisfies <>
    assert_eq!(cql(&catalog, "Format <> 'NetCDF'"), Vec::<String>::new());
}

#[test]
fn text_ordering_and_like() {
    let catalog = seeded_catalog();
    assert_eq!(cql(&catalog, "identifier < '2'"), owned(&[ENG_IDS[0]]));
    assert_eq!(cql(&catalog, "identifier >= 'urn'"), owned(&DC_IDS));

    assert_eq!(
        cql(&catalog, "Title LIKE '%.ctd'"),
        owned(&[ENG_IDS[1], ENG_IDS[2], ENG_IDS[3], ENG_IDS[4]])
    );
    assert_eq!(cql(&catalog, "Title LIKE '%CTD%'"), owned(&[ENG_IDS[5]]));
    assert_eq!(cql(&catalog, "Title ILIKE '%CTD%'").len(), 5);
    assert_eq!(cql(&catalog, "Title LIKE '9_028011.ctd'"), owned(&[ENG_IDS[2]]));
    assert_eq!(cql(&catalog, "AnyText LIKE 'IFREMER%'").len(), 7);
}

#[test]
fn temporal_bounds_are_inclusive() {
    let catalog = seeded_catalog();
    assert_eq!(cql(&catalog, "Modified AFTER 2009-01-01T00:00:00Z").len(), 7);
    assert_eq!(cql(&catalog, "Modified BEFORE 2005-01-01T00:00:00Z"), owned(&DC_IDS));
    assert_eq!(
        cql(&catalog, "Modified DURING 2004-03-15T00:00:00Z/2004-03-15T00:00:00Z"),
        owned(&DC_IDS)
    );
    assert_eq!(
        cql(&catalog, "TempExtent_begin BETWEEN 1990-06-01T00:00:00Z AND 1990-06-05T00:00:00Z").len(),
        7
    );
    assert!(cql(&catalog, "TempExtent_end BEFORE 1990-07-01T00:00:00Z").is_empty());
}

#[test]
fn bounding_box_intersection() {
    let catalog = seeded_catalog();
    assert_eq!(
        cql(&catalog, "BBOX(BoundingBox, 1, 36, 2, 37)"),
        owned(&[ENG_IDS[0], ENG_IDS[3], ENG_IDS[4]])
    );
    assert_eq!(
        cql(&catalog, "BBOX(BoundingBox, -4.5, 44.5, -3.5, 45.5, 'EPSG:4326')"),
        owned(&[ENG_IDS[1], FRA_ID, DC_IDS[1]])
    );
    // touching edges count
    assert_eq!(cql(&catalog, "BBOX(BoundingBox, 25, -5, 30, 0)"), owned(&[ENG_IDS[5]]));

    let filter = FilterExpr::bbox("BoundingBox", 13.0, 60.0, 14.0, 61.0).and(FilterExpr::equals("Subject", "Oceans"));
    assert_eq!(
        ids(&catalog, QueryRequest::new().with_constraint(Constraint::Filter(filter))),
        owned(&[DC_IDS[0]])
    );
}

#[test]
fn missing_property_is_null() {
    let catalog = seeded_catalog();
    assert_eq!(cql(&catalog, "Format IS NULL").len(), 9);
    assert_eq!(cql(&catalog, "Title IS NOT NULL").len(), 9);
    assert_eq!(cql(&catalog, "Abstract IS NULL"), owned(&DC_IDS));
}

#[test]
fn type_names_restrict_the_schemas() {
    let catalog = seeded_catalog();
    let dc = QueryRequest::new().with_type_names(&[SchemaKind::Dc]).page(1, 100);
    assert_eq!(ids(&catalog, dc), owned(&DC_IDS));

    let kinds = QueryRequest::parse_type_names(&["gmd:MD_Metadata"]).unwrap();
    let iso = QueryRequest::cql("Subject = 'Oceans'").with_type_names(&kinds);
    assert_eq!(ids(&catalog, iso), owned(&[ENG_IDS[0], ENG_IDS[1], ENG_IDS[3]]));

    let ebrim = QueryRequest::new().with_type_names(&[SchemaKind::Ebrim]);
    assert_eq!(catalog.query(&ebrim).unwrap().matched, 0);
}

#[test]
fn paging_walks_the_whole_result() {
    let catalog = seeded_catalog();
    let mut seen = Vec::new();
    let mut start = 1;
    let mut pages = 0;
    loop {
        let result = catalog.query(&QueryRequest::new().page(start, 4)).unwrap();
        assert_eq!(result.matched, 9);
        seen.extend(result.records.iter().map(|r| r.identifier.clone()));
        pages += 1;
        if result.next_record == 0 {
            break;
        }
        assert_eq!(result.next_record, start + result.returned);
        start = result.next_record;
    }
    assert_eq!(pages, 3);
    let mut all: Vec<String> = fixture_records().iter().filter_map(|r| r.tree().identifier()).collect();
    all.sort();
    assert_eq!(seen, all);

    let past_end = catalog.query(&QueryRequest::new().page(10, 4)).unwrap();
    assert_eq!((past_end.matched, past_end.returned, past_end.next_record), (9, 0, 0));

    let default_page = catalog.query(&QueryRequest::new()).unwrap();
    assert_eq!((default_page.returned, default_page.next_record), (9, 0));
}

#[test]
fn max_records_is_clamped() {
    let catalog = seeded_catalog_with(Config {
        default_max_records: 2,
        max_records_limit: 3,
        ..Config::default()
    });
    let clamped = catalog.query(&QueryRequest::new().page(1, 100)).unwrap();
    assert_eq!((clamped.returned, clamped.next_record), (3, 4));

    let default_page = catalog.query(&QueryRequest::new()).unwrap();
    assert_eq!((default_page.returned, default_page.next_record), (2, 3));
}

#[test]
fn start_position_below_one_is_rejected() {
    let catalog = seeded_catalog();
    let err = catalog.query(&QueryRequest::new().page(0, 10)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidPagingParameter);
}

#[test]
fn sorting_by_title_both_ways() {
    let catalog = seeded_catalog();
    let expected = owned(&[ENG_IDS[0], ENG_IDS[1], ENG_IDS[4], ENG_IDS[3], ENG_IDS[2], ENG_IDS[5]]);

    let ascending = QueryRequest::cql("Language = 'eng'").sort("Title", false);
    assert_eq!(ids(&catalog, ascending), expected);

    let descending = QueryRequest::cql("Language = 'eng'").sort("Title", true);
    let mut reversed = expected.clone();
    reversed.reverse();
    assert_eq!(ids(&catalog, descending), reversed);

    // no values anywhere: identifier order
    let by_format = QueryRequest::cql("Language = 'eng'").sort("Format", true);
    let mut eng = owned(&ENG_IDS);
    eng.sort();
    assert_eq!(ids(&catalog, by_format), eng);

    let err = catalog
        .query(&QueryRequest::new().sort("colour", false))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownProperty);
}

#[test]
fn hits_and_validate_return_counts_only() {
    let catalog = seeded_catalog();
    for mode in [ResultMode::Hits, ResultMode::Validate] {
        let result = catalog
            .query(&QueryRequest::cql("Language = 'eng'").mode(mode))
            .unwrap();
        assert_eq!(result.mode, mode);
        assert_eq!((result.matched, result.returned, result.next_record), (6, 0, 0));
        assert!(result.records.is_empty());
    }

    let err = catalog
        .query(&QueryRequest::cql("Language = ").mode(ResultMode::Validate))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConstraintSyntax);
}

#[test]
fn invalid_constraints_are_reported() {
    let catalog = seeded_catalog();
    let cases = [
        ("colour = 'red'", ErrorKind::UnknownProperty),
        ("IDENTIFIER = 'x'", ErrorKind::UnknownProperty),
        ("Language = 'eng", ErrorKind::ConstraintSyntax),
        ("(Language = 'eng'", ErrorKind::ConstraintSyntax),
        ("Modified AFTER yesterday", ErrorKind::ConstraintSyntax),
        ("Title BETWEEN a AND b", ErrorKind::ConstraintSyntax),
        ("Title AFTER 2009-01-01T00:00:00Z", ErrorKind::ConstraintSyntax),
        ("BBOX(Title, 0, 0, 1, 1)", ErrorKind::ConstraintSyntax),
        ("BBOX(BoundingBox, 0, 0, 1, 1, 'EPSG:3857')", ErrorKind::ConstraintSyntax),
        ("BBOX(BoundingBox, 5, 0, 1, 1)", ErrorKind::ConstraintSyntax),
        ("BoundingBox = 'x'", ErrorKind::ConstraintSyntax),
    ];
    for (text, expected) in cases {
        let err = catalog.query(&QueryRequest::cql(text)).unwrap_err();
        assert_eq!(err.kind, expected, "constraint {}", text);
    }

    let err = catalog.query(&QueryRequest::cql("colour = 'red'")).unwrap_err();
    assert!(err.context.contains("colour"), "{}", err.context);

    let deep = format!("{}Language = 'eng'{}", "(".repeat(20_000), ")".repeat(20_000));
    let err = catalog.query(&QueryRequest::cql(deep)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConstraintSyntax);
}

#[test]
fn element_sets_shape_the_content() {
    let catalog = seeded_catalog();
    let fetch = |projection: Projection| -> ProjectedRecord {
        let request = QueryRequest::cql(format!("identifier = '{}'", ENG_IDS[0])).with_projection(projection);
        catalog.query(&request).unwrap().records.remove(0)
    };

    let brief = fetch(Projection::Brief);
    assert!(brief.content.resolve("fileIdentifier").is_some());
    assert!(brief.content.resolve("language").is_none());

    let summary = fetch(Projection::Summary);
    assert!(summary.content.resolve("language").is_some());
    assert!(summary.content.resolve("contact").is_none());

    let full = fetch(Projection::Full);
    assert!(full.content.resolve("contact").is_some());
    assert_eq!(&full.content, catalog.record(ENG_IDS[0]).unwrap().content.root());

    let titles = fetch(Projection::elements(&["identificationInfo/citation/title"]).unwrap());
    assert_eq!(
        titles.to_json(),
        serde_json::json!({"identificationInfo": [{"citation": {"title": "64061411.bot"}}]})
    );

    assert_eq!(Projection::from_element_set("FULL").unwrap(), Projection::Full);
    assert_eq!(
        Projection::from_element_set("everything").unwrap_err().kind,
        ErrorKind::InvalidArgument
    );
}

#[test]
fn get_by_id_keeps_request_order_and_converts_to_dublin_core() {
    let catalog = seeded_catalog();
    let records = catalog
        .get_by_id(&[DC_IDS[1], ENG_IDS[0]], &Projection::Full, None)
        .unwrap();
    assert_eq!(
        records.iter().map(|r| (r.identifier.as_str(), r.kind)).collect::<Vec<_>>(),
        vec![(DC_IDS[1], SchemaKind::Dc), (ENG_IDS[0], SchemaKind::Iso)]
    );

    let as_dc = catalog
        .get_by_id(&[ENG_IDS[0]], &Projection::Full, Some(SchemaKind::Dc))
        .unwrap()
        .remove(0);
    assert_eq!(as_dc.kind, SchemaKind::Dc);
    assert_eq!(as_dc.content.children_of("title"), vec![&Node::text("64061411.bot")]);
    assert_eq!(as_dc.content.children_of("language"), vec![&Node::text("eng")]);
    assert_eq!(as_dc.content.children_of("BoundingBox").len(), 1);

    let err = catalog
        .get_by_id(&[ENG_IDS[0]], &Projection::Full, Some(SchemaKind::Ebrim))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);

    let err = catalog
        .get_by_id(&[ENG_IDS[0], "missing"], &Projection::Brief, None)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RecordNotFound);
    assert!(err.context.contains("missing"));
}

#[test]
fn cached_results_follow_updates() {
    let catalog = seeded_catalog();
    assert_eq!(cql(&catalog, "Language = 'fra'"), owned(&[FRA_ID]));
    assert_eq!(cql(&catalog, "Language = 'fra'"), owned(&[FRA_ID]));
    assert!(catalog.stats().cache_stats.hit_count >= 1);

    catalog
        .transaction(vec![Action::update_properties(
            Constraint::cql(format!("identifier = '{}'", ENG_IDS[0])),
            vec![PropertyUpdate::set("language", Node::text("fra"))],
        )])
        .unwrap();
    assert_eq!(cql(&catalog, "Language = 'fra'"), owned(&[ENG_IDS[0], FRA_ID]));
}
