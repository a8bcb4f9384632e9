use strata_lib::meta::catalog::{CatalogEvent, CatalogRole, RoleValue, VersionAttr};
use strata_lib::parse_catalog;

const FIRST_SNAPSHOT: &str = r#"{
    "formatVersion": 1,
    "uid": "net.minecraft",
    "name": "Minecraft",
    "versions": [
        { "version": "1.11", "type": "release", "releaseTime": "2016-11-14T12:00:00Z" },
        { "version": "17w50a", "type": "snapshot", "releaseTime": "2017-12-11T12:00:00Z" }
    ]
}"#;

const SECOND_SNAPSHOT: &str = r#"{
    "formatVersion": 1,
    "uid": "net.minecraft",
    "name": "Minecraft",
    "versions": [
        { "version": "1.11", "type": "release", "releaseTime": "2016-11-14T12:00:00Z" },
        { "version": "17w50a", "type": "snapshot", "releaseTime": "2017-12-11T12:00:00Z" },
        { "version": "1.12.2", "type": "release", "releaseTime": "2017-09-18T08:39:46Z" }
    ]
}"#;

#[test]
fn incremental_fetches_merge_into_a_long_lived_catalog() {
    let mut catalog = parse_catalog(FIRST_SNAPSHOT, "net.minecraft/index.json").unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.recommended().unwrap().version(), "1.11");

    let rx = catalog.subscribe();
    let fresh = parse_catalog(SECOND_SNAPSHOT, "net.minecraft/index.json").unwrap();
    catalog.merge(&fresh);

    // Exactly one appended row plus the recommended takeover.
    let events: Vec<CatalogEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            CatalogEvent::RowsInserted { first: 2, last: 2 },
            CatalogEvent::DataChanged {
                first: 0,
                last: 2,
                attrs: vec![VersionAttr::Recommended],
            },
        ]
    );
    assert_eq!(catalog.recommended().unwrap().version(), "1.12.2");

    // Merging the same snapshot again changes nothing.
    catalog.merge(&fresh);
    assert!(rx.try_iter().next().is_none());
    assert_eq!(catalog.len(), 3);

    // The appended row answers role queries like any other.
    assert_eq!(
        catalog.data(2, CatalogRole::Version),
        Some(RoleValue::Text("1.12.2".to_string()))
    );
    assert_eq!(
        catalog.data(2, CatalogRole::Recommended),
        Some(RoleValue::Bool(true))
    );

    // Explicit re-sort puts the newest release back on top.
    catalog.sort_versions();
    assert_eq!(catalog.at(0).unwrap().version(), "17w50a");
    assert_eq!(catalog.at(1).unwrap().version(), "1.12.2");
    assert_eq!(catalog.at(2).unwrap().version(), "1.11");
}
