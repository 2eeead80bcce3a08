//! SpaceEditor end-to-end tests.
//!
//! # Invariants
//!
//! 1. **Validation first**: a rejected edit changes neither memory nor store.
//! 2. **Rollback**: a failed commit restores exactly the pre-edit state and
//!    records a notice.
//! 3. **Exclusion**: a second edit of a busy target fails fast.
//! 4. **Repair on load**: sanitizer repairs are written back only for an
//!    editor who owns the Space. Malformed nested values are repaired, not
//!    reported as errors.
//! 5. **Load exclusion**: a load and an edit never overlap.

mod common;

use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use common::{ChecksumSigner, ChecksumVerifier, FlakyStore, OWNER};
use fspace_layout::model::{GridPlacement, LayoutView, SpaceConfig, ViewName, WidgetInstance};
use fspace_layout::sanitize::{OverlapPolicy, SanitizeOptions};
use fspace_layout::settings::{FieldKind, FieldSpec, SchemaRegistry};
use fspace_runtime::space_store::tab_path;
use fspace_runtime::{
    EditError, EditTarget, EngineConfig, ObjectStore, PersistError, Signer, SpaceEditor,
    SpaceStore, StoreError, TabNameError, UnsignedFile, UploadOptions,
};
use pollster::block_on;
use serde_json::json;

// ============================================================================
// Fixtures
// ============================================================================

fn owner_store() -> SpaceStore<FlakyStore> {
    SpaceStore::new(FlakyStore::new(), OWNER, Arc::new(ChecksumVerifier))
        .with_signer(Arc::new(ChecksumSigner::new(OWNER)))
}

fn layout_config() -> SpaceConfig {
    let mut config = SpaceConfig::provisioned(ViewName::Desktop);
    for (id, kind) in [("text:1", "text"), ("feed:1", "feed")] {
        let _ = config
            .widgets
            .insert(id.to_string(), WidgetInstance::new(id, kind));
    }
    let _ = config.views.insert(
        ViewName::Desktop,
        LayoutView::Grid {
            placements: vec![
                GridPlacement::new("text:1", 0, 0, 2, 2),
                GridPlacement::new("feed:1", 2, 0, 2, 2),
            ],
        },
    );
    let _ = config.views.insert(
        ViewName::Mobile,
        LayoutView::Stack {
            placements: vec!["text:1".into(), "feed:1".into()],
        },
    );
    config
}

/// Seed the store with tabs `Profile` and `feed`, then load an editor.
fn seeded_editor(config: &EngineConfig) -> SpaceEditor<'_, FlakyStore> {
    let store = owner_store();
    block_on(store.save_tab("Profile", &layout_config())).expect("seed Profile");
    block_on(store.save_tab("feed", &SpaceConfig::provisioned(ViewName::Desktop)))
        .expect("seed feed");
    block_on(store.save_tab_order(&["Profile".to_string(), "feed".to_string()]))
        .expect("seed order");

    let editor = SpaceEditor::new(store, config, Some("a11ce".to_string()));
    block_on(editor.load()).expect("load");
    editor
}

fn stored_order(editor: &SpaceEditor<'_, FlakyStore>) -> Option<Vec<String>> {
    block_on(editor.store().load_tab_order()).expect("read order")
}

// ============================================================================
// 1. Validation before mutation
// ============================================================================

#[test]
fn rename_to_existing_name_rejected_before_mutation() {
    let config = EngineConfig::default();
    let editor = seeded_editor(&config);
    block_on(editor.rename_tab("feed", "Feed")).expect("recase own name");
    let uploads = editor.store().object_store().upload_count();

    let err = block_on(editor.create_tab("feed ")).unwrap_err();
    assert!(matches!(err, EditError::TabName(TabNameError::Duplicate { .. })));

    let err = block_on(editor.rename_tab("Profile", " FEED")).unwrap_err();
    assert!(matches!(
        err,
        EditError::TabName(TabNameError::Duplicate { ref existing }) if existing == "Feed"
    ));

    assert_eq!(editor.tab_order(), ["Profile", "Feed"]);
    assert_eq!(editor.store().object_store().upload_count(), uploads);
    assert!(editor.notices().is_empty());
}

#[test]
fn viewer_cannot_edit() {
    let config = EngineConfig::default();
    let mut editor = seeded_editor(&config);
    editor.set_identity(Some("0xB0B".to_string()));

    assert!(!editor.editability().is_editable);
    assert!(!editor.tab("Profile").expect("tab").is_editable);
    assert!(matches!(
        block_on(editor.create_tab("Mine")),
        Err(EditError::NotEditable)
    ));
    assert!(matches!(
        block_on(editor.reorder_tabs(vec!["feed".into(), "Profile".into()])),
        Err(EditError::NotEditable)
    ));
}

#[test]
fn structural_edits_are_validated() {
    let config = EngineConfig::default();
    let editor = seeded_editor(&config);

    assert!(matches!(
        block_on(editor.reorder_tabs(vec!["Profile".into()])),
        Err(EditError::InvalidReorder)
    ));
    assert!(matches!(
        block_on(editor.delete_tab("Nope")),
        Err(EditError::UnknownTab { .. })
    ));
    assert!(matches!(
        block_on(editor.move_widget("Profile", ViewName::Desktop, "gone:1", 0, 0)),
        Err(EditError::UnknownWidget { .. })
    ));

    block_on(editor.delete_tab("feed")).expect("delete feed");
    assert!(matches!(
        block_on(editor.delete_tab("Profile")),
        Err(EditError::LastTab)
    ));
}

// ============================================================================
// 2. Successful edits
// ============================================================================

#[test]
fn tab_lifecycle_persists_order() {
    let config = EngineConfig::default();
    let editor = seeded_editor(&config);

    let name = block_on(editor.create_tab("  Gallery ")).expect("create");
    assert_eq!(name, "Gallery");
    block_on(editor.rename_tab("Gallery", "Photos")).expect("rename");
    block_on(editor.reorder_tabs(vec![
        "Photos".into(),
        "Profile".into(),
        "feed".into(),
    ]))
    .expect("reorder");
    block_on(editor.delete_tab("feed")).expect("delete");

    assert_eq!(editor.tab_order(), ["Photos", "Profile"]);
    assert_eq!(stored_order(&editor), Some(vec!["Photos".into(), "Profile".into()]));
    let photos = editor.tab("Photos").expect("renamed tab");
    assert!(photos.is_editable);
    assert_eq!(photos.tab_names, ["Photos", "Profile"]);

    let stored = block_on(editor.store().list_tabs()).expect("list");
    assert!(stored.contains(&"Gallery".to_string()), "old blob is left behind");
}

#[test]
fn moving_onto_a_neighbor_shifts_it_down() {
    let config = EngineConfig::default();
    let editor = seeded_editor(&config);

    let outcome = block_on(editor.move_widget("Profile", ViewName::Desktop, "feed:1", 1, 1))
        .expect("move");
    assert!(outcome.has_changes);
    let tab = editor.tab("Profile").expect("tab");
    let grid = tab.views[&ViewName::Desktop].grid_placements().expect("grid");
    assert_eq!(grid[1], GridPlacement::new("feed:1", 1, 2, 2, 2));

    block_on(editor.move_widget("Profile", ViewName::Mobile, "feed:1", 0, 0))
        .expect("restack");
    let tab = editor.tab("Profile").expect("tab");
    assert_eq!(tab.views[&ViewName::Mobile].ids(), ["feed:1", "text:1"]);

    let reloaded = block_on(editor.store().load_tab("Profile", &SanitizeOptions::default()))
        .expect("reload")
        .expect("stored");
    assert_eq!(reloaded.sanitized.views, tab.views);
}

#[test]
fn widget_settings_are_validated_by_capability() {
    let config = EngineConfig::default();
    let registry = SchemaRegistry::new()
        .with_widget("text", [FieldSpec::required("text", FieldKind::String)]);
    let editor = seeded_editor(&config).with_settings_capability(Box::new(registry));

    let bad = serde_json::from_value(json!({"text": 42})).expect("settings");
    assert!(matches!(
        block_on(editor.save_widget_settings("Profile", "text:1", bad)),
        Err(EditError::Settings(_))
    ));

    let good = serde_json::from_value(json!({"text": "hello", "fidget Shadow": "none"}))
        .expect("settings");
    let outcome =
        block_on(editor.save_widget_settings("Profile", "text:1", good)).expect("save settings");
    let widget = &outcome.sanitized.widgets["text:1"];
    assert_eq!(widget.settings["text"], json!("hello"));
    assert!(widget.settings.contains_key("fidgetShadow"));
}

// ============================================================================
// 3. Rollback on failed commits
// ============================================================================

#[test]
fn failed_create_rolls_back_memory_and_notifies() {
    let config = EngineConfig::default();
    let editor = seeded_editor(&config);
    let before = editor.tab_order();

    editor.store().object_store().fail(true);
    let err = block_on(editor.create_tab("Gallery")).unwrap_err();
    assert!(matches!(
        err,
        EditError::Persist(PersistError::Store(StoreError::Unavailable(_)))
    ));

    assert_eq!(editor.tab_order(), before);
    assert!(editor.tab("Gallery").is_none());
    let notices = editor.notices().drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Failed to create tab");

    editor.store().object_store().fail(false);
    assert_eq!(stored_order(&editor), Some(before));
}

#[test]
fn failed_layout_commit_restores_only_that_tab() {
    let config = EngineConfig::default();
    let editor = seeded_editor(&config);
    let profile_before = editor.tab("Profile").expect("tab");
    let feed_before = editor.tab("feed").expect("tab");

    editor.store().object_store().fail(true);
    let err = block_on(editor.move_widget("Profile", ViewName::Desktop, "text:1", 6, 6))
        .unwrap_err();
    assert!(matches!(err, EditError::Persist(_)));

    assert_eq!(editor.tab("Profile"), Some(profile_before));
    assert_eq!(editor.tab("feed"), Some(feed_before));
}

#[test]
fn failed_delete_restores_tab_in_place() {
    let config = EngineConfig::default();
    let editor = seeded_editor(&config);
    block_on(editor.create_tab("Extra")).expect("create");
    let before = editor.tab_order();

    editor.store().object_store().fail(true);
    assert!(block_on(editor.delete_tab("feed")).is_err());
    assert_eq!(editor.tab_order(), before);
    assert!(editor.tab("feed").is_some());
}

// ============================================================================
// 4. Busy targets
// ============================================================================

#[test]
fn second_edit_of_busy_tab_fails_fast() {
    let config = EngineConfig::default();
    let editor = seeded_editor(&config);
    editor.store().object_store().suspend(true);

    let mut first = pin!(editor.move_widget("Profile", ViewName::Desktop, "text:1", 0, 4));
    let mut cx = Context::from_waker(Waker::noop());
    assert!(matches!(first.as_mut().poll(&mut cx), Poll::Pending));

    let err = block_on(editor.move_widget("Profile", ViewName::Desktop, "feed:1", 0, 8))
        .unwrap_err();
    assert!(matches!(
        err,
        EditError::Busy { target: EditTarget::Tab(ref tab) } if tab == "Profile"
    ));

    block_on(editor.create_tab("Other")).expect("disjoint target is free");

    let outcome = block_on(first.as_mut()).expect("first edit settles");
    assert!(outcome.sanitized.widgets.contains_key("text:1"));
    block_on(editor.move_widget("Profile", ViewName::Desktop, "feed:1", 0, 8))
        .expect("target released");
}

// ============================================================================
// 5. Load-time repair
// ============================================================================

fn broken_config() -> SpaceConfig {
    let mut config = layout_config();
    let _ = config
        .widgets
        .insert("orphan:1".into(), WidgetInstance::new("orphan:1", "orphan"));
    config
}

#[test]
fn load_persists_repairs_for_owner() {
    let store = owner_store();
    block_on(store.save_tab("Profile", &broken_config())).expect("seed");
    let config = EngineConfig::default();
    let editor = SpaceEditor::new(store, &config, Some(OWNER.to_string()));

    let report = block_on(editor.load()).expect("load");
    assert_eq!(report.repaired, ["Profile"]);
    assert_eq!(report.persisted, ["Profile"]);
    assert_eq!(editor.tab_order(), ["Profile"]);

    let stored = block_on(editor.store().load_tab("Profile", &SanitizeOptions::default()))
        .expect("reload")
        .expect("stored");
    assert!(!stored.has_changes);
}

#[test]
fn load_does_not_write_for_viewer_or_when_disabled() {
    for (identity, persist) in [(Some("0xB0B"), true), (Some(OWNER), false)] {
        let store = owner_store();
        block_on(store.save_tab("Profile", &broken_config())).expect("seed");
        let uploads = store.object_store().upload_count();
        let config = EngineConfig::default().with_persist_repairs(persist);
        let editor = SpaceEditor::new(store, &config, identity.map(str::to_string));

        let report = block_on(editor.load()).expect("load");
        assert_eq!(report.repaired, ["Profile"]);
        assert!(report.persisted.is_empty());
        assert_eq!(editor.store().object_store().upload_count(), uploads);
        assert!(!editor.tab("Profile").expect("tab").widgets.contains_key("orphan:1"));
    }
}

#[test]
fn empty_space_gets_default_tab() {
    let config = EngineConfig::default()
        .with_default_tab_name("Home")
        .with_overlap_policy(OverlapPolicy::Drop);
    let editor = SpaceEditor::new(owner_store(), &config, Some(OWNER.to_string()));
    let report = block_on(editor.load()).expect("load");
    assert_eq!(editor.tab_order(), ["Home"]);
    assert_eq!(report.missing, ["Home"]);
    let home = editor.tab("Home").expect("tab");
    assert_eq!(home.views.len(), 3);
}

/// Store `payload` verbatim as the signed document of `tab`.
fn seed_raw_tab(store: &SpaceStore<FlakyStore>, tab: &str, payload: &str) {
    let signed = ChecksumSigner::new(OWNER)
        .sign(UnsignedFile::json(payload, OWNER).with_file_name(tab))
        .expect("sign");
    let bytes = signed.to_json_bytes().expect("encode");
    block_on(
        store
            .object_store()
            .upload(&tab_path(OWNER, tab), bytes, UploadOptions::UPSERT),
    )
    .expect("upload");
}

#[test]
fn load_repairs_malformed_nested_fields() {
    let store = owner_store();
    seed_raw_tab(
        &store,
        "Profile",
        r#"{
            "views": {"desktop": {"layoutKind": "grid", "placements": [
                {"i": "text:1", "x": 0, "y": 0, "w": 2},
                {"i": "feed:1", "x": "left", "y": 0, "w": 2, "h": 2},
                {"i": "links:1", "x": 0, "y": 1, "w": 2, "h": 2}
            ]}},
            "widgets": {
                "text:1": {"id": "text:1", "widgetType": "text", "settings": null},
                "feed:1": {"id": "feed:1", "widgetType": "feed"},
                "links:1": {"id": "links:1", "widgetType": "links", "settings": {"urls": []}}
            }
        }"#,
    );
    let config = EngineConfig::default();
    let editor = SpaceEditor::new(store, &config, Some(OWNER.to_string()));

    let report = block_on(editor.load()).expect("malformed fields are repaired, not fatal");
    assert_eq!(report.repaired, ["Profile"]);
    assert_eq!(report.persisted, ["Profile"]);

    let tab = editor.tab("Profile").expect("tab");
    let grid = tab.views[&ViewName::Desktop].grid_placements().expect("grid");
    assert_eq!(
        grid,
        [
            GridPlacement::new("text:1", 0, 0, 2, 1),
            GridPlacement::new("links:1", 0, 1, 2, 2),
        ]
    );
    assert!(tab.widgets["text:1"].settings.is_empty());
    assert!(!tab.widgets.contains_key("feed:1"));

    let stored = block_on(editor.store().load_tab("Profile", &SanitizeOptions::default()))
        .expect("reload")
        .expect("stored");
    assert!(!stored.has_changes);
}

// ============================================================================
// 6. Load exclusion
// ============================================================================

#[test]
fn load_refuses_while_an_edit_is_in_flight() {
    let config = EngineConfig::default();
    let editor = seeded_editor(&config);
    editor.store().object_store().suspend(true);

    let mut pending = pin!(editor.move_widget("Profile", ViewName::Desktop, "text:1", 0, 4));
    let mut cx = Context::from_waker(Waker::noop());
    assert!(matches!(pending.as_mut().poll(&mut cx), Poll::Pending));

    let err = block_on(editor.load()).unwrap_err();
    assert!(matches!(
        err,
        EditError::Busy { target: EditTarget::Tab(ref tab) } if tab == "Profile"
    ));

    block_on(pending.as_mut()).expect("edit settles");
    block_on(editor.load()).expect("idle editor reloads");
    let tab = editor.tab("Profile").expect("tab");
    let grid = tab.views[&ViewName::Desktop].grid_placements().expect("grid");
    assert_eq!(grid[0], GridPlacement::new("text:1", 0, 4, 2, 2));
}

#[test]
fn edits_refuse_while_a_load_is_running() {
    let store = owner_store();
    block_on(store.save_tab("Profile", &broken_config())).expect("seed");
    store.object_store().suspend(true);
    let config = EngineConfig::default();
    let editor = SpaceEditor::new(store, &config, Some(OWNER.to_string()));

    // The repair write-back suspends, leaving the load in flight.
    let mut loading = pin!(editor.load());
    let mut cx = Context::from_waker(Waker::noop());
    assert!(matches!(loading.as_mut().poll(&mut cx), Poll::Pending));

    let err = block_on(editor.create_tab("Feed")).unwrap_err();
    assert!(matches!(err, EditError::Busy { target: EditTarget::Space }));

    let report = block_on(loading.as_mut()).expect("load settles");
    assert_eq!(report.persisted, ["Profile"]);
    block_on(editor.create_tab("Feed")).expect("space released");
}
