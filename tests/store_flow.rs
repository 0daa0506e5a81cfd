use merdit::state::{
    AddressBar, BootstrapSource, DEFAULT_DIAGRAM_CODE, DiagramDocument, DiagramStore, FileStorage,
    LINK_DEBOUNCE_MS, Location, MemoryStorage, STORAGE_KEY, Storage, StoreDefaults, Theme,
    encode, share_url,
};

#[test]
fn test_session_is_restored_from_file_storage() {
    let dir = tempfile::tempdir().unwrap();

    let mut first = DiagramStore::new(
        FileStorage::new(dir.path()),
        AddressBar::default(),
        StoreDefaults::default(),
    );
    assert_eq!(first.bootstrap(), BootstrapSource::Defaults);
    assert_eq!(first.source_text(), DEFAULT_DIAGRAM_CODE);
    first.set_source_text("graph LR\n  A-->B", 0);
    first.set_theme(Theme::Neutral, 10);
    drop(first);

    let mut second = DiagramStore::new(
        FileStorage::new(dir.path()),
        AddressBar::default(),
        StoreDefaults::default(),
    );
    assert_eq!(second.bootstrap(), BootstrapSource::Storage);
    assert_eq!(second.source_text(), "graph LR\n  A-->B");
    assert_eq!(second.theme(), Theme::Neutral);
}

#[test]
fn test_link_wins_over_saved_session() {
    let saved = DiagramDocument::new("graph TD\n  saved", Theme::Dark);
    let storage = MemoryStorage::with_item(STORAGE_KEY, &saved.to_json().unwrap());

    let linked = DiagramDocument::new("graph TD\n  linked", Theme::Forest);
    let url = share_url("https://diagrams.example", "/edit", &encode(&linked).unwrap());

    let mut store = DiagramStore::new(
        storage,
        AddressBar::parse(&url).unwrap(),
        StoreDefaults::default(),
    );
    assert_eq!(store.bootstrap(), BootstrapSource::Link);
    assert_eq!(store.source_text(), "graph TD\n  linked");
    assert_eq!(store.theme(), Theme::Forest);
}

#[test]
fn test_share_link_reopens_same_diagram() {
    let mut store = DiagramStore::new(
        MemoryStorage::new(),
        AddressBar::parse("https://diagrams.example/edit").unwrap(),
        StoreDefaults::default(),
    );
    store.bootstrap();
    store.set_source_text("stateDiagram-v2\n  [*] --> Still", 0);
    store.set_theme(Theme::Dark, 0);

    let link = store.generate_share_link().unwrap();
    assert!(link.starts_with("https://diagrams.example/edit?data="));

    let mut reopened = DiagramStore::new(
        MemoryStorage::new(),
        AddressBar::parse(&link).unwrap(),
        StoreDefaults::default(),
    );
    reopened.bootstrap();
    assert_eq!(reopened.state().document(), store.state().document());
}

#[test]
fn test_address_bar_follows_edits_after_quiet_period() {
    let mut store = DiagramStore::new(
        MemoryStorage::new(),
        AddressBar::default(),
        StoreDefaults::default(),
    );
    store.bootstrap();

    store.set_source_text("graph TD\n  A", 0);
    store.set_source_text("graph TD\n  A-->B", 400);
    assert!(!store.poll(400 + LINK_DEBOUNCE_MS - 1));
    assert!(store.poll(400 + LINK_DEBOUNCE_MS));

    let payload = store.location().data_param().unwrap();
    let expected = encode(&DiagramDocument::new("graph TD\n  A-->B", Theme::Default)).unwrap();
    assert_eq!(payload, expected);
    assert_eq!(store.location().replacements(), 1);
    assert!(!store.sync_location());

    let saved = store.storage().get_item(STORAGE_KEY).unwrap().unwrap();
    assert!(saved.contains("A-->B"));
}
