use std::cell::Cell;
use std::rc::Rc;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::editor::Direction;
use crate::format::pretty_format;
use crate::render::{
    Artifact, Display, EngineConfig, RENDER_DEBOUNCE_MS, RenderEngine, RenderError,
    RenderPipeline,
};
use crate::state::{
    AddressBar, DiagramDocument, DiagramStore, LINK_DEBOUNCE_MS, Location, MemoryStorage,
    STORAGE_KEY, Storage, StoreDefaults, Theme, encode, share_url,
};
use crate::templates::TemplateLibrary;

use super::{App, Message, Model, Overlay, SessionPipeline, SessionStore, ToastLevel, update};

#[derive(Debug, Default, Clone)]
struct Counters {
    inits: Rc<Cell<usize>>,
    draws: Rc<Cell<usize>>,
}

/// Draws `<svg>` around the source; sources containing "error" fail to parse.
struct FakeEngine {
    counters: Counters,
}

impl RenderEngine for FakeEngine {
    fn initialize(&mut self, _config: &EngineConfig) {
        self.counters.inits.set(self.counters.inits.get() + 1);
    }

    fn validate(&mut self, source: &str) -> Result<(), RenderError> {
        if source.contains("error") {
            Err(RenderError::Syntax("Parse error on line 1".into()))
        } else {
            Ok(())
        }
    }

    fn draw(&mut self, target_id: &str, source: &str) -> Result<Artifact, RenderError> {
        self.counters.draws.set(self.counters.draws.get() + 1);
        Ok(Artifact::new(target_id, format!("<svg>{source}</svg>")))
    }
}

fn create_test_model_at(location: AddressBar, defaults: StoreDefaults) -> (Model, Counters) {
    let counters = Counters::default();
    let store: SessionStore = DiagramStore::new(
        Box::new(MemoryStorage::new()) as Box<dyn Storage>,
        location,
        defaults.clone(),
    );
    let engine: Box<dyn RenderEngine> = Box::new(FakeEngine {
        counters: counters.clone(),
    });
    let pipeline: SessionPipeline = RenderPipeline::new(engine, defaults.theme);
    let model = Model::new(store, pipeline, TemplateLibrary::builtin(), (80, 24));
    (model, counters)
}

fn create_test_model() -> (Model, Counters) {
    let (mut model, counters) =
        create_test_model_at(AddressBar::default(), StoreDefaults::default());
    model.bootstrap();
    (model, counters)
}

fn send(model: Model, msg: Message, now_ms: u64) -> Model {
    let mut model = model;
    model.now_ms = now_ms;
    update(model, msg)
}

fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent::new(code, modifiers)
}

#[test]
fn test_bootstrap_renders_defaults_immediately() {
    let (model, counters) = create_test_model();
    assert_eq!(counters.draws.get(), 1);
    assert!(matches!(model.pipeline.display(), Display::Diagram(_)));
    assert_eq!(model.editor.text(), model.store.source_text());
    assert!(model.store.is_initialized());
}

#[test]
fn test_bootstrap_from_link_loads_code_and_theme() {
    let doc = DiagramDocument::new("graph TD\n  A-->B", Theme::Forest);
    let url = share_url("https://merdit.dev", "/", &encode(&doc).unwrap());
    let (mut model, _) =
        create_test_model_at(AddressBar::parse(&url).unwrap(), StoreDefaults::default());
    model.bootstrap();

    assert_eq!(model.editor.text(), "graph TD\n  A-->B");
    assert_eq!(model.theme(), Theme::Forest);
    assert_eq!(model.pipeline.theme(), Theme::Forest);
    let (text, level) = model.active_toast().unwrap();
    assert_eq!(level, ToastLevel::Info);
    assert_eq!(text, "Loaded diagram from link");
}

#[test]
fn test_typing_burst_renders_once_with_latest_text() {
    let (mut model, counters) = create_test_model();
    model = send(model, Message::EditorMoveToEnd, 0);
    model = send(model, Message::EditorInsertChar('x'), 0);
    model = send(model, Message::EditorInsertChar('y'), 100);
    model = send(model, Message::EditorInsertChar('z'), 200);

    assert!(!model.tick(200 + RENDER_DEBOUNCE_MS - 1));
    assert_eq!(counters.draws.get(), 1);

    assert!(model.tick(200 + RENDER_DEBOUNCE_MS));
    assert_eq!(counters.draws.get(), 2);
    let svg = model.pipeline.last_good().map(Artifact::svg).unwrap();
    assert!(svg.ends_with("xyz</svg>"));
}

#[test]
fn test_edit_is_persisted_before_link_updates() {
    let (mut model, _) = create_test_model();
    let before = model.store.location().replacements();
    model = send(model, Message::EditorInsertStr("%% note\n".into()), 0);

    let stored = model.store.storage().get_item(STORAGE_KEY).unwrap().unwrap();
    assert!(stored.contains("%% note"));
    assert_eq!(model.store.location().replacements(), before);

    model.tick(LINK_DEBOUNCE_MS - 1);
    assert_eq!(model.store.location().replacements(), before);
    model.tick(LINK_DEBOUNCE_MS);
    assert_eq!(model.store.location().replacements(), before + 1);
    assert!(model.store.location().data_param().is_some());
}

#[test]
fn test_cursor_moves_do_not_schedule_renders() {
    let (mut model, _) = create_test_model();
    model = send(model, Message::EditorMoveCursor(Direction::Down), 0);
    model = send(model, Message::EditorMoveEnd, 0);
    assert!(!model.has_pending_work());
}

#[test]
fn test_cycle_theme_reinitializes_and_rerenders() {
    let (mut model, counters) = create_test_model();
    let inits = counters.inits.get();
    model = send(model, Message::CycleTheme, 0);

    assert_eq!(model.theme(), Theme::Dark);
    assert_eq!(model.pipeline.theme(), Theme::Dark);
    assert_eq!(counters.inits.get(), inits + 1);
    assert!(model.pipeline.is_pending());

    model.tick(RENDER_DEBOUNCE_MS);
    assert_eq!(counters.draws.get(), 2);
}

#[test]
fn test_render_error_keeps_previous_diagram() {
    let (mut model, _) = create_test_model();
    let good = model.pipeline.last_good().cloned().unwrap();

    model = send(model, Message::EditorInsertStr("error ".into()), 0);
    model.tick(RENDER_DEBOUNCE_MS);

    assert_eq!(model.pipeline.error(), Some("Parse error on line 1"));
    assert_eq!(model.pipeline.display(), Display::Diagram(&good));
}

#[test]
fn test_empty_source_shows_placeholder() {
    let defaults = StoreDefaults {
        source_text: String::new(),
        theme: Theme::Default,
    };
    let (mut model, counters) = create_test_model_at(AddressBar::default(), defaults);
    model.bootstrap();
    assert_eq!(model.pipeline.display(), Display::Placeholder);
    assert_eq!(model.pipeline.error(), None);
    assert_eq!(counters.draws.get(), 0);
}

#[test]
fn test_format_source_reindents_editor_and_store() {
    let (mut model, _) = create_test_model();
    let messy = "classDiagram\nclass Animal {\n+name\n}\n\nAnimal <|-- Dog";
    model.replace_source(messy);
    model = send(model, Message::FormatSource, 0);

    assert_eq!(model.editor.text(), pretty_format(messy));
    assert_eq!(model.store.source_text(), pretty_format(messy));
}

#[test]
fn test_template_select_replaces_source() {
    let (mut model, _) = create_test_model();
    model = send(model, Message::OpenTemplates, 0);
    assert_eq!(model.overlay, Some(Overlay::Templates));

    model = send(model, Message::TemplateUp, 0);
    assert_eq!(model.template_selected, 0);
    model = send(model, Message::TemplateDown, 0);
    let expected = model.templates.load(model.templates.get(1).unwrap().file_name());
    model = send(model, Message::TemplateSelect, 0);

    assert_eq!(model.overlay, None);
    assert_eq!(model.editor.text(), expected);
    assert_eq!(model.store.source_text(), expected);
    assert_eq!(model.editor.cursor().line, 0);
    assert_eq!(model.editor.cursor().col, 0);
}

#[test]
fn test_template_down_stops_at_last() {
    let (mut model, _) = create_test_model();
    model = send(model, Message::OpenTemplates, 0);
    for _ in 0..10 {
        model = send(model, Message::TemplateDown, 0);
    }
    assert_eq!(model.template_selected, model.templates.len() - 1);
}

#[test]
fn test_share_link_opens_overlay_without_touching_address_bar() {
    let (mut model, _) = create_test_model();
    let before = model.store.location().replacements();
    model = send(model, Message::ShareLink, 0);

    let Some(Overlay::Share(link)) = &model.overlay else {
        panic!("expected share overlay, got {:?}", model.overlay);
    };
    assert!(link.starts_with("http://localhost:3000/?data="));
    assert_eq!(model.store.location().replacements(), before);
}

#[test]
fn test_quit_cancels_pending_work() {
    let (mut model, _) = create_test_model();
    model = send(model, Message::EditorInsertChar('a'), 0);
    assert!(model.has_pending_work());

    model = send(model, Message::Quit, 10);
    assert!(model.should_quit);
    assert!(!model.has_pending_work());
}

#[test]
fn test_toggle_editor_width() {
    let (mut model, _) = create_test_model();
    assert_eq!(model.editor_width_percent(), super::EDITOR_WIDTH_PERCENT);
    model = send(model, Message::ToggleEditorWidth, 0);
    assert_eq!(
        model.editor_width_percent(),
        super::EXPANDED_EDITOR_WIDTH_PERCENT
    );
}

#[test]
fn test_page_down_keeps_cursor_visible() {
    let (mut model, _) = create_test_model();
    let long: String = (0..100).map(|i| format!("A{i}-->B{i}\n")).collect();
    model.replace_source(&long);
    model = send(model, Message::EditorMoveToStart, 0);
    model = send(model, Message::EditorPageDown, 0);

    let line = model.editor.cursor().line;
    assert_eq!(line, model.editor_view_height());
    assert!(model.editor_scroll <= line);
    assert!(line < model.editor_scroll + model.editor_view_height());
}

#[test]
fn test_scroll_does_not_move_cursor() {
    let (mut model, _) = create_test_model();
    model = send(model, Message::EditorScrollDown(3), 0);
    assert_eq!(model.editor_scroll, 3);
    assert_eq!(model.editor.cursor().line, 0);
}

#[test]
fn test_copy_source_confirms_with_toast() {
    let (model, _) = create_test_model();
    let mut model = send(model, Message::CopySource, 0);
    super::effects::handle_message_side_effects(&mut model, &Message::CopySource);

    let (text, level) = model.active_toast().unwrap();
    assert_eq!(level, ToastLevel::Info);
    assert_eq!(text, "Code copied to clipboard");
    assert!(!model.pipeline.is_pending());
}

#[test]
fn test_ctrl_keys_map_to_actions() {
    let (model, _) = create_test_model();
    let ctrl = KeyModifiers::CONTROL;
    let cases = [
        ('s', Message::ShareLink),
        ('e', Message::ExportSvg),
        ('p', Message::ExportPng),
        ('t', Message::CycleTheme),
        ('o', Message::OpenTemplates),
        ('f', Message::FormatSource),
        ('y', Message::CopySource),
        ('x', Message::ToggleEditorWidth),
        ('q', Message::Quit),
        ('c', Message::Quit),
    ];
    for (c, expected) in cases {
        assert_eq!(
            App::handle_key(key(KeyCode::Char(c), ctrl), &model),
            Some(expected)
        );
    }
}

#[test]
fn test_plain_keys_edit_source() {
    let (model, _) = create_test_model();
    let none = KeyModifiers::NONE;
    assert_eq!(
        App::handle_key(key(KeyCode::Char('q'), none), &model),
        Some(Message::EditorInsertChar('q'))
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Enter, none), &model),
        Some(Message::EditorNewline)
    );
    assert_eq!(
        App::handle_key(key(KeyCode::F(1), none), &model),
        Some(Message::ToggleHelp)
    );
    assert_eq!(
        App::handle_event(&Event::Paste("A-->B".into()), &model),
        Some(Message::EditorInsertStr("A-->B".into()))
    );
}

#[test]
fn test_overlay_keys() {
    let (mut model, _) = create_test_model();
    let none = KeyModifiers::NONE;

    model.overlay = Some(Overlay::Help);
    assert_eq!(
        App::handle_key(key(KeyCode::Char('x'), none), &model),
        Some(Message::HideOverlay)
    );

    model.overlay = Some(Overlay::Templates);
    assert_eq!(
        App::handle_key(key(KeyCode::Char('j'), none), &model),
        Some(Message::TemplateDown)
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Enter, none), &model),
        Some(Message::TemplateSelect)
    );

    model.overlay = Some(Overlay::Share("http://x/?data=1".into()));
    assert_eq!(
        App::handle_key(key(KeyCode::Char('c'), none), &model),
        Some(Message::CopyShareLink)
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Esc, none), &model),
        Some(Message::HideOverlay)
    );
    assert_eq!(App::handle_event(&Event::Paste("x".into()), &model), None);
}

#[test]
fn test_mouse_wheel_in_editor_scrolls() {
    let (model, _) = create_test_model();
    let wheel = MouseEvent {
        kind: MouseEventKind::ScrollDown,
        column: 5,
        row: 5,
        modifiers: KeyModifiers::NONE,
    };
    assert_eq!(
        App::handle_mouse(wheel, &model),
        Some(Message::EditorScrollDown(3))
    );

    let in_preview = MouseEvent { column: 70, ..wheel };
    assert_eq!(App::handle_mouse(in_preview, &model), None);
}

#[test]
fn test_into_model_applies_builder_settings() {
    let app = App::new(AddressBar::default())
        .with_images_enabled(false)
        .with_defaults(StoreDefaults {
            source_text: "graph LR\n  A-->B".into(),
            theme: Theme::Neutral,
        });
    let model = app.into_model((100, 30));
    assert!(!model.images_enabled);
    assert_eq!(model.terminal_size, (100, 30));
    assert_eq!(model.pipeline.theme(), Theme::Neutral);
    assert!(!model.store.is_initialized());
}
