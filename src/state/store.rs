//! The diagram state store.
//!
//! Owns `{source_text, theme}` for one editing session and keeps three
//! places consistent with it:
//!
//! 1. at startup, state is bootstrapped from the inbound link, else the
//!    saved session, else defaults;
//! 2. every later change is written to storage immediately;
//! 3. the address bar is rewritten after [`LINK_DEBOUNCE_MS`] of quiet.

use crate::debounce::Debouncer;

use super::codec;
use super::{DEFAULT_DIAGRAM_CODE, DiagramDocument, Location, STORAGE_KEY, Storage, Theme};

/// Quiet period before the address bar is rewritten.
pub const LINK_DEBOUNCE_MS: u64 = 1_000;

/// Fallback values when neither a link nor storage yields a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDefaults {
    pub source_text: String,
    pub theme: Theme,
}

impl Default for StoreDefaults {
    fn default() -> Self {
        Self {
            source_text: DEFAULT_DIAGRAM_CODE.to_string(),
            theme: Theme::Default,
        }
    }
}

/// Plain state. Transitions are pure; the store applies side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramState {
    pub source_text: String,
    pub theme: Theme,
    pub initialized: bool,
}

impl DiagramState {
    #[must_use]
    pub fn with_source_text(self, source_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_theme(self, theme: Theme) -> Self {
        Self { theme, ..self }
    }

    #[must_use]
    pub fn with_document(self, doc: DiagramDocument) -> Self {
        Self {
            source_text: doc.source_text,
            theme: doc.theme,
            ..self
        }
    }

    #[must_use]
    pub fn initialized(self) -> Self {
        Self {
            initialized: true,
            ..self
        }
    }

    pub fn document(&self) -> DiagramDocument {
        DiagramDocument::new(self.source_text.clone(), self.theme)
    }
}

/// Where the bootstrapped state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapSource {
    Link,
    Storage,
    Defaults,
}

pub struct DiagramStore<S, L> {
    state: DiagramState,
    storage: S,
    location: L,
    link_debounce: Debouncer<()>,
    bootstrap_source: Option<BootstrapSource>,
}

impl<S, L> std::fmt::Debug for DiagramStore<S, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramStore")
            .field("theme", &self.state.theme)
            .field("initialized", &self.state.initialized)
            .field("link_pending", &self.link_debounce.is_pending())
            .finish_non_exhaustive()
    }
}

impl<S: Storage, L: Location> DiagramStore<S, L> {
    /// Create an uninitialized store seeded with `defaults`.
    pub fn new(storage: S, location: L, defaults: StoreDefaults) -> Self {
        Self {
            state: DiagramState {
                source_text: defaults.source_text,
                theme: defaults.theme,
                initialized: false,
            },
            storage,
            location,
            link_debounce: Debouncer::new(LINK_DEBOUNCE_MS),
            bootstrap_source: None,
        }
    }

    /// Adopt state from the inbound link, else storage, else defaults.
    ///
    /// Runs at most once; later calls return the first result.
    pub fn bootstrap(&mut self) -> BootstrapSource {
        if let Some(source) = self.bootstrap_source {
            return source;
        }
        let _scope = crate::perf::scope("store.bootstrap");
        let fallback_theme = self.state.theme;

        let source = if let Some(doc) = self.document_from_link(fallback_theme) {
            self.adopt(doc);
            BootstrapSource::Link
        } else if let Some(doc) = self.document_from_storage(fallback_theme) {
            self.adopt(doc);
            BootstrapSource::Storage
        } else {
            BootstrapSource::Defaults
        };

        self.state = self.state.clone().initialized();
        self.bootstrap_source = Some(source);
        tracing::debug!(?source, theme = %self.state.theme, "store initialized");
        crate::perf::log_event(
            "store.bootstrap",
            format!("source={source:?} theme={}", self.state.theme),
        );
        source
    }

    fn document_from_link(&self, fallback_theme: Theme) -> Option<DiagramDocument> {
        let payload = self.location.data_param()?;
        codec::decode(&payload, fallback_theme)
            .inspect_err(|err| tracing::warn!(%err, "failed to parse diagram data from link"))
            .ok()
    }

    fn document_from_storage(&self, fallback_theme: Theme) -> Option<DiagramDocument> {
        let saved = match self.storage.get_item(STORAGE_KEY) {
            Ok(saved) => saved?,
            Err(err) => {
                tracing::warn!(%err, "failed to read saved diagram");
                return None;
            }
        };
        DiagramDocument::from_json(&saved, fallback_theme)
            .inspect_err(|err| tracing::warn!(%err, "failed to parse saved diagram"))
            .ok()
    }

    fn adopt(&mut self, doc: DiagramDocument) {
        self.state = self.state.clone().with_document(doc);
    }

    pub const fn state(&self) -> &DiagramState {
        &self.state
    }

    pub fn source_text(&self) -> &str {
        &self.state.source_text
    }

    pub const fn theme(&self) -> Theme {
        self.state.theme
    }

    pub const fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    pub const fn bootstrap_source(&self) -> Option<BootstrapSource> {
        self.bootstrap_source
    }

    pub const fn location(&self) -> &L {
        &self.location
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub const fn is_link_update_pending(&self) -> bool {
        self.link_debounce.is_pending()
    }

    /// Replace the source text. Returns whether anything changed.
    pub fn set_source_text(&mut self, source_text: impl Into<String>, now_ms: u64) -> bool {
        let source_text = source_text.into();
        if source_text == self.state.source_text {
            return false;
        }
        self.state = self.state.clone().with_source_text(source_text);
        self.persist(now_ms);
        true
    }

    /// Replace the theme. Returns whether anything changed.
    pub fn set_theme(&mut self, theme: Theme, now_ms: u64) -> bool {
        if theme == self.state.theme {
            return false;
        }
        self.state = self.state.clone().with_theme(theme);
        self.persist(now_ms);
        true
    }

    fn persist(&mut self, now_ms: u64) {
        if !self.state.initialized {
            return;
        }
        let doc = self.state.document();
        match doc.to_json() {
            Ok(json) => {
                if let Err(err) = self.storage.set_item(STORAGE_KEY, &json) {
                    tracing::warn!(%err, "failed to save diagram");
                }
            }
            Err(err) => tracing::warn!(%err, "failed to serialize diagram"),
        }
        self.link_debounce.queue((), now_ms);
    }

    /// Fire the debounced address-bar update once its window has elapsed.
    ///
    /// Returns whether the address bar was written.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if self.link_debounce.take_ready(now_ms).is_some() {
            self.sync_location()
        } else {
            false
        }
    }

    /// Write the current document into the address bar unless it is
    /// already there. Returns whether a write happened.
    pub fn sync_location(&mut self) -> bool {
        let encoded = match codec::encode(&self.state.document()) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(%err, "failed to encode diagram for link");
                return false;
            }
        };
        if self.location.data_param().as_deref() == Some(encoded.as_str()) {
            return false;
        }
        self.location.replace_data(&encoded);
        tracing::debug!(len = encoded.len(), "address bar updated");
        crate::perf::log_event("store.link.replace", format!("len={}", encoded.len()));
        true
    }

    /// Absolute link reconstructing the current state. Does not touch the
    /// address bar.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be serialized.
    pub fn generate_share_link(&self) -> Result<String, serde_json::Error> {
        let encoded = codec::encode(&self.state.document())?;
        Ok(codec::share_url(
            self.location.origin(),
            self.location.path(),
            &encoded,
        ))
    }

    /// Milliseconds until the pending link update fires.
    pub fn link_update_due_in(&self, now_ms: u64) -> Option<u64> {
        self.link_debounce.remaining_ms(now_ms)
    }

    /// Drop any pending address-bar update.
    pub fn cancel_pending(&mut self) {
        self.link_debounce.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AddressBar, MemoryStorage};

    type TestStore = DiagramStore<MemoryStorage, AddressBar>;

    fn store_with(storage: MemoryStorage, location: AddressBar) -> TestStore {
        DiagramStore::new(storage, location, StoreDefaults::default())
    }

    fn link_for(doc: &DiagramDocument) -> AddressBar {
        let encoded = codec::encode(doc).unwrap();
        AddressBar::parse(&format!("http://localhost:3000/?data={encoded}")).unwrap()
    }

    fn saved(doc: &DiagramDocument) -> MemoryStorage {
        MemoryStorage::with_item(STORAGE_KEY, &doc.to_json().unwrap())
    }

    fn stored_code(store: &TestStore) -> String {
        let json = store.storage().get_item(STORAGE_KEY).unwrap().unwrap();
        DiagramDocument::from_json(&json, Theme::Default)
            .unwrap()
            .source_text
    }

    #[test]
    fn test_state_transitions_keep_other_fields() {
        let state = DiagramState {
            source_text: "graph TD".to_string(),
            theme: Theme::Forest,
            initialized: false,
        };
        let next = state.initialized().with_theme(Theme::Dark);
        assert!(next.initialized);
        assert_eq!(next.source_text, "graph TD");
        assert_eq!(next.theme, Theme::Dark);
    }

    #[test]
    fn test_defaults_when_nothing_to_restore() {
        let mut store = store_with(MemoryStorage::new(), AddressBar::default());
        assert!(!store.is_initialized());

        assert_eq!(store.bootstrap(), BootstrapSource::Defaults);
        assert_eq!(store.source_text(), DEFAULT_DIAGRAM_CODE);
        assert_eq!(store.theme(), Theme::Default);
        assert!(store.is_initialized());
    }

    #[test]
    fn test_custom_defaults_are_used() {
        let defaults = StoreDefaults {
            source_text: "graph TD;".to_string(),
            theme: Theme::Dark,
        };
        let mut store = DiagramStore::new(MemoryStorage::new(), AddressBar::default(), defaults);
        store.bootstrap();
        assert_eq!(store.source_text(), "graph TD;");
        assert_eq!(store.theme(), Theme::Dark);
    }

    #[test]
    fn test_link_wins_over_storage() {
        let from_link = DiagramDocument::new("graph LR\n  link", Theme::Forest);
        let from_storage = DiagramDocument::new("graph LR\n  storage", Theme::Dark);
        let mut store = store_with(saved(&from_storage), link_for(&from_link));

        assert_eq!(store.bootstrap(), BootstrapSource::Link);
        assert_eq!(store.source_text(), "graph LR\n  link");
        assert_eq!(store.theme(), Theme::Forest);
    }

    #[test]
    fn test_corrupt_link_falls_back_to_storage() {
        let from_storage = DiagramDocument::new("graph LR\n  storage", Theme::Dark);
        let location = AddressBar::parse("http://localhost:3000/?data=%%%garbage").unwrap();
        let mut store = store_with(saved(&from_storage), location);

        assert_eq!(store.bootstrap(), BootstrapSource::Storage);
        assert_eq!(store.source_text(), "graph LR\n  storage");
        assert_eq!(store.theme(), Theme::Dark);
    }

    #[test]
    fn test_corrupt_storage_falls_back_to_defaults() {
        let storage = MemoryStorage::with_item(STORAGE_KEY, "{oops");
        let mut store = store_with(storage, AddressBar::default());
        assert_eq!(store.bootstrap(), BootstrapSource::Defaults);
        assert_eq!(store.source_text(), DEFAULT_DIAGRAM_CODE);
        assert!(store.is_initialized());
    }

    #[test]
    fn test_unknown_theme_in_link_keeps_default_theme_and_code() {
        let payload = lz_str::compress_to_encoded_uri_component(
            r#"{"mermaidCode":"graph TD; A-->B","settings":{"theme":"purple"},"appVersion":1}"#,
        );
        let location =
            AddressBar::parse(&format!("http://localhost:3000/?data={payload}")).unwrap();
        let mut store = store_with(MemoryStorage::new(), location);

        assert_eq!(store.bootstrap(), BootstrapSource::Link);
        assert_eq!(store.source_text(), "graph TD; A-->B");
        assert_eq!(store.theme(), Theme::Default);
    }

    #[test]
    fn test_bootstrap_runs_once() {
        let mut store = store_with(MemoryStorage::new(), AddressBar::default());
        store.bootstrap();
        store.set_source_text("graph TD;", 0);

        assert_eq!(store.bootstrap(), BootstrapSource::Defaults);
        assert_eq!(store.source_text(), "graph TD;", "second bootstrap is a no-op");
    }

    #[test]
    fn test_bootstrap_does_not_write_back() {
        let doc = DiagramDocument::new("graph LR", Theme::Dark);
        let mut store = store_with(saved(&doc), link_for(&doc));
        store.bootstrap();
        assert_eq!(store.storage().writes(), 0);
        assert!(!store.is_link_update_pending());
        assert_eq!(store.location().replacements(), 0);
    }

    #[test]
    fn test_changes_before_bootstrap_have_no_side_effects() {
        let mut store = store_with(MemoryStorage::new(), AddressBar::default());
        assert!(store.set_source_text("graph TD;", 0));
        assert_eq!(store.storage().writes(), 0);
        assert!(!store.is_link_update_pending());
    }

    #[test]
    fn test_set_source_text_persists_immediately() {
        let mut store = store_with(MemoryStorage::new(), AddressBar::default());
        store.bootstrap();

        store.set_source_text("graph TD;", 10);
        assert_eq!(store.storage().writes(), 1);
        assert_eq!(stored_code(&store), "graph TD;");
        assert_eq!(store.location().replacements(), 0, "link waits for the debounce");
        assert!(!store.poll(10 + LINK_DEBOUNCE_MS - 1));
    }

    #[test]
    fn test_unchanged_value_is_not_a_change() {
        let mut store = store_with(MemoryStorage::new(), AddressBar::default());
        store.bootstrap();
        assert!(!store.set_source_text(DEFAULT_DIAGRAM_CODE, 0));
        assert!(!store.set_theme(Theme::Default, 0));
        assert_eq!(store.storage().writes(), 0);
    }

    #[test]
    fn test_rapid_changes_coalesce_into_one_link_update() {
        let mut store = store_with(MemoryStorage::new(), AddressBar::default());
        store.bootstrap();

        store.set_source_text("a", 0);
        store.set_source_text("ab", 400);
        store.set_theme(Theme::Dark, 800);
        assert_eq!(store.storage().writes(), 3);

        assert!(!store.poll(1_000), "window restarted at 800");
        assert!(store.poll(1_800));
        assert_eq!(store.location().replacements(), 1);

        let data = store.location().data_param().unwrap();
        let doc = codec::decode(&data, Theme::Default).unwrap();
        assert_eq!(doc, DiagramDocument::new("ab", Theme::Dark));
    }

    #[test]
    fn test_sync_location_is_idempotent() {
        let mut store = store_with(MemoryStorage::new(), AddressBar::default());
        store.bootstrap();
        store.set_source_text("graph TD;", 0);

        assert!(store.sync_location());
        assert!(!store.sync_location());
        assert_eq!(store.location().replacements(), 1);
    }

    #[test]
    fn test_link_already_matching_is_not_rewritten() {
        let doc = DiagramDocument::new("graph LR", Theme::Dark);
        let mut store = store_with(MemoryStorage::new(), link_for(&doc));
        store.bootstrap();
        assert!(!store.sync_location());
        assert_eq!(store.location().replacements(), 0);
    }

    #[test]
    fn test_cancel_pending_drops_link_update() {
        let mut store = store_with(MemoryStorage::new(), AddressBar::default());
        store.bootstrap();
        store.set_source_text("graph TD;", 0);
        store.cancel_pending();
        assert!(!store.poll(10_000));
        assert_eq!(store.location().replacements(), 0);
    }

    #[test]
    fn test_share_link_round_trips_without_touching_address_bar() {
        let mut store = store_with(MemoryStorage::new(), AddressBar::default());
        store.bootstrap();

        let link = store.generate_share_link().unwrap();
        assert!(link.starts_with("http://localhost:3000/?data="));
        assert_eq!(store.location().replacements(), 0);

        let opened = AddressBar::parse(&link).unwrap();
        let doc = codec::decode(&opened.data_param().unwrap(), Theme::Null).unwrap();
        assert_eq!(doc.source_text, DEFAULT_DIAGRAM_CODE);
        assert_eq!(doc.theme, Theme::Default);
    }
}
