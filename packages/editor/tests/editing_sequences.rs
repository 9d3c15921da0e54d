//! End-to-end tests for frame lifecycle, selection, structural editing and
//! undo/redo sequences, driven through the workspace surface.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use webfoundry_common::{MemoryStore, NoopFormatter, ProjectStore};
use webfoundry_dom::{parse_document, serialize_document, NodeId};
use webfoundry_editor::{
    spawn_overlay_tracker, CursorId, EditorError, EditorEvent, Position, Relation, SavePipeline,
    StableKey, Workspace,
};

const PATH: &str = "pages/index.html";
const TWO_PARAGRAPHS: &str = "<html><head><title>t</title></head>\
     <body><p id=\"p1\">Hi</p><p id=\"p2\">Bye</p></body></html>";

fn init_logs() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn open(ws: &mut Workspace, html: &str) {
    let ticket = ws.select(PATH);
    ws.attach(PATH, parse_document(html).unwrap()).unwrap();
    ws.ready(PATH, None).unwrap();
    ticket.ready().await.unwrap();
}

fn find(ws: &Workspace, id: &str) -> NodeId {
    let doc = ws.frame(PATH).unwrap().document().unwrap();
    doc.find_by_attribute("id", id)
        .unwrap_or_else(|| panic!("no element with id {}", id))
}

fn markup(ws: &Workspace) -> String {
    serialize_document(ws.frame(PATH).unwrap().document().unwrap())
}

fn selection(ws: &Workspace, cursor: &CursorId) -> Vec<StableKey> {
    ws.frame(PATH).unwrap().selection(cursor).to_vec()
}

/// Tags of the body's element children, with their resolved text
fn body_outline(ws: &Workspace) -> Vec<(String, String)> {
    let doc = ws.frame(PATH).unwrap().document().unwrap();
    doc.element_children(doc.body())
        .into_iter()
        .map(|id| {
            let text = doc
                .children(id)
                .iter()
                .filter_map(|&c| doc.text(c))
                .collect::<String>();
            (doc.tag(id).unwrap().to_string(), text)
        })
        .collect()
}

fn select_nodes(ws: &mut Workspace, cursor: &CursorId, ids: &[&str]) {
    let nodes: Vec<NodeId> = ids.iter().map(|id| find(ws, id)).collect();
    ws.change_selection(PATH, cursor, nodes).unwrap();
}

#[tokio::test]
async fn select_attach_ready_lifecycle() {
    init_logs();
    let mut ws = Workspace::new("site");
    let ticket = ws.select(PATH);
    assert!(ws.is_open(PATH));
    assert!(!ws.frame(PATH).unwrap().is_ready());

    // a duplicate select is a no-op whose ticket resolves immediately
    ws.select(PATH).ready().await.unwrap();

    ws.attach(PATH, parse_document(TWO_PARAGRAPHS).unwrap())
        .unwrap();
    ws.ready(PATH, None).unwrap();
    ticket.ready().await.unwrap();
    assert!(ws.frame(PATH).unwrap().is_ready());
    assert!(ws.frame(PATH).unwrap().snapshot().is_some());

    ws.close(PATH).unwrap();
    assert!(!ws.is_open(PATH));
}

#[tokio::test]
async fn attach_failure_discards_the_frame() {
    let mut ws = Workspace::new("site");
    let ticket = ws.select(PATH);
    ws.ready(PATH, Some("iframe load failed".to_string()))
        .unwrap();

    assert!(!ws.is_open(PATH));
    match ticket.ready().await {
        Err(EditorError::AttachFailed(message)) => assert_eq!(message, "iframe load failed"),
        other => panic!("expected attach failure, got {:?}", other.map(|_| ())),
    }

    // the caller may retry by re-issuing select
    let ticket = ws.select(PATH);
    ws.attach(PATH, parse_document(TWO_PARAGRAPHS).unwrap())
        .unwrap();
    ws.ready(PATH, None).unwrap();
    ticket.ready().await.unwrap();
}

#[tokio::test]
async fn unknown_paths_are_hard_errors() {
    let mut ws = Workspace::new("site");
    assert!(matches!(
        ws.change_selection("nope.html", &CursorId::Primary, vec![]),
        Err(EditorError::FrameNotOpen(_))
    ));
    assert!(matches!(
        ws.undo("nope.html", &CursorId::Primary),
        Err(EditorError::FrameNotOpen(_))
    ));
    assert!(matches!(
        ws.ready("nope.html", None),
        Err(EditorError::FrameNotOpen(_))
    ));
}

#[tokio::test]
async fn create_next_sibling_with_undo_redo() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;

    select_nodes(&mut ws, &cursor, &["p1"]);
    let p1_key = selection(&ws, &cursor)[0].clone();

    ws.create_relative(PATH, Position::After, &cursor, "div", 1)
        .unwrap();
    assert_eq!(
        body_outline(&ws),
        vec![
            ("p".to_string(), "Hi".to_string()),
            ("div".to_string(), String::new()),
            ("p".to_string(), "Bye".to_string()),
        ]
    );
    let div_keys = selection(&ws, &cursor);
    assert_eq!(div_keys.len(), 1);
    assert_ne!(div_keys[0], p1_key);

    assert!(ws.undo(PATH, &cursor).unwrap());
    assert_eq!(
        body_outline(&ws),
        vec![
            ("p".to_string(), "Hi".to_string()),
            ("p".to_string(), "Bye".to_string()),
        ]
    );
    assert_eq!(selection(&ws, &cursor), vec![p1_key.clone()]);

    assert!(ws.redo(PATH, &cursor).unwrap());
    assert_eq!(body_outline(&ws)[1].0, "div");
    let redo_keys = selection(&ws, &cursor);
    assert_eq!(redo_keys.len(), 1);
    // re-materialized nodes get fresh identity
    assert_ne!(redo_keys[0], div_keys[0]);
    let frame = ws.frame(PATH).unwrap();
    let selected = frame.mapper().node(&redo_keys[0]).unwrap();
    assert_eq!(frame.document().unwrap().tag(selected), Some("div"));
}

#[tokio::test]
async fn grouped_delete_restores_positions_on_undo() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;
    let before = markup(&ws);

    select_nodes(&mut ws, &cursor, &["p1", "p2"]);
    ws.delete_selected(PATH, &cursor, 1).unwrap();

    assert!(body_outline(&ws).is_empty());
    // the fallback selection is non-empty: both parents collapse to the body
    let fallback = selection(&ws, &cursor);
    assert!(!fallback.is_empty());
    let frame = ws.frame(PATH).unwrap();
    let body = frame.document().unwrap().body();
    assert_eq!(frame.mapper().node(&fallback[0]), Some(body));

    assert!(ws.undo(PATH, &cursor).unwrap());
    assert_eq!(markup(&ws), before);
    assert_eq!(selection(&ws, &cursor).len(), 2);
}

#[tokio::test]
async fn single_delete_falls_back_to_successor_sibling() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;

    select_nodes(&mut ws, &cursor, &["p1"]);
    ws.delete_selected(PATH, &cursor, 1).unwrap();

    let keys = selection(&ws, &cursor);
    assert_eq!(keys.len(), 1);
    let frame = ws.frame(PATH).unwrap();
    let selected = frame.mapper().node(&keys[0]).unwrap();
    assert_eq!(
        frame.document().unwrap().attribute(selected, "id"),
        Some("p2")
    );
}

#[tokio::test]
async fn repeated_delete_walks_the_replacement_selection() {
    let mut ws = Workspace::new("site");
    open(
        &mut ws,
        "<body><p id=\"p1\">1</p><p id=\"p2\">2</p><p id=\"p3\">3</p></body>",
    )
    .await;
    let cursor = CursorId::Primary;
    let before = markup(&ws);

    select_nodes(&mut ws, &cursor, &["p1"]);
    ws.delete_selected(PATH, &cursor, 2).unwrap();

    assert_eq!(body_outline(&ws), vec![("p".to_string(), "3".to_string())]);

    // two iterations pushed two commands
    assert!(ws.undo(PATH, &cursor).unwrap());
    assert!(ws.undo(PATH, &cursor).unwrap());
    assert!(!ws.undo(PATH, &cursor).unwrap());
    assert_eq!(markup(&ws), before);
}

#[tokio::test]
async fn delete_never_removes_root_body_or_head() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;

    let body = ws.frame(PATH).unwrap().document().unwrap().body();
    ws.change_selection(PATH, &cursor, vec![body]).unwrap();
    ws.delete_selected(PATH, &cursor, 1).unwrap();

    let frame = ws.frame(PATH).unwrap();
    let doc = frame.document().unwrap();
    assert!(doc.is_attached(doc.body()));
    assert_eq!(body_outline(&ws).len(), 2);
    // nothing entered the history
    assert!(frame.history(&cursor).map_or(true, |h| !h.can_undo()));
}

#[tokio::test]
async fn undo_restores_a_whole_sequence_in_reverse() -> anyhow::Result<()> {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;
    let initial = markup(&ws);

    select_nodes(&mut ws, &cursor, &["p1"]);
    ws.create_relative(PATH, Position::After, &cursor, "div", 1)?;
    ws.delete_selected(PATH, &cursor, 1)?; // removes the div, selects p2
    ws.create_relative(PATH, Position::Before, &cursor, "span", 1)?;

    for _ in 0..3 {
        assert!(ws.undo(PATH, &cursor)?);
    }
    assert!(!ws.undo(PATH, &cursor)?);
    assert_eq!(markup(&ws), initial);
    Ok(())
}

#[tokio::test]
async fn redo_reproduces_the_pre_undo_state() -> anyhow::Result<()> {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;

    select_nodes(&mut ws, &cursor, &["p1"]);
    ws.create_relative(PATH, Position::After, &cursor, "div", 2)?;
    let after_create = markup(&ws);

    assert!(ws.undo(PATH, &cursor)?);
    assert_ne!(markup(&ws), after_create);
    assert!(ws.redo(PATH, &cursor)?);
    assert_eq!(markup(&ws), after_create);
    Ok(())
}

#[tokio::test]
async fn pushing_discards_the_redo_branch() -> anyhow::Result<()> {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;

    select_nodes(&mut ws, &cursor, &["p1"]);
    ws.create_relative(PATH, Position::After, &cursor, "div", 1)?;
    select_nodes(&mut ws, &cursor, &["p2"]);
    ws.create_relative(PATH, Position::After, &cursor, "section", 1)?;

    assert!(ws.undo(PATH, &cursor)?);
    select_nodes(&mut ws, &cursor, &["p1"]);
    ws.create_relative(PATH, Position::Before, &cursor, "aside", 1)?;

    // the undone branch is unreachable now
    assert!(!ws.redo(PATH, &cursor)?);
    let history = ws.frame(PATH).unwrap().history(&cursor).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.index(), 2);
    Ok(())
}

#[tokio::test]
async fn histories_are_independent_per_cursor() -> anyhow::Result<()> {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let primary = CursorId::Primary;
    let peer = CursorId::peer("peer-1");

    select_nodes(&mut ws, &primary, &["p1"]);
    ws.create_relative(PATH, Position::After, &primary, "div", 1)?;
    select_nodes(&mut ws, &peer, &["p2"]);
    ws.create_relative(PATH, Position::After, &peer, "span", 1)?;

    let tags: Vec<String> = body_outline(&ws).into_iter().map(|(tag, _)| tag).collect();
    assert_eq!(tags, vec!["p", "div", "p", "span"]);

    // undoing the primary's edit leaves the peer's span alone
    assert!(ws.undo(PATH, &primary)?);
    let tags: Vec<String> = body_outline(&ws).into_iter().map(|(tag, _)| tag).collect();
    assert_eq!(tags, vec!["p", "p", "span"]);

    assert!(ws.undo(PATH, &peer)?);
    let tags: Vec<String> = body_outline(&ws).into_iter().map(|(tag, _)| tag).collect();
    assert_eq!(tags, vec!["p", "p"]);

    // and the peer has nothing left while the primary can still redo
    assert!(!ws.undo(PATH, &peer)?);
    assert!(ws.redo(PATH, &primary)?);
    Ok(())
}

#[tokio::test]
async fn stale_nodes_never_enter_a_selection() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;

    let p1 = find(&ws, "p1");
    select_nodes(&mut ws, &cursor, &["p1"]);
    let old_key = selection(&ws, &cursor)[0].clone();

    ws.delete_selected(PATH, &cursor, 1).unwrap();

    // the detached node no longer resolves to a key
    ws.change_selection(PATH, &cursor, vec![p1]).unwrap();
    assert!(selection(&ws, &cursor).is_empty());

    // undo re-creates the mapping entry under a fresh key
    ws.undo(PATH, &cursor).unwrap();
    let restored = selection(&ws, &cursor);
    assert_eq!(restored.len(), 1);
    assert_ne!(restored[0], old_key);
    assert!(ws.frame(PATH).unwrap().mapper().node(&old_key).is_none());
}

#[tokio::test]
async fn copy_then_paste_clones_with_fresh_identity() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;

    select_nodes(&mut ws, &cursor, &["p1"]);
    let p1_key = selection(&ws, &cursor)[0].clone();
    ws.copy_selected(PATH, &cursor).unwrap();
    assert_eq!(
        ws.frame(PATH).unwrap().clipboard(&cursor),
        Some("<p id=\"p1\">Hi</p>")
    );

    select_nodes(&mut ws, &cursor, &["p2"]);
    ws.paste_relative(PATH, Position::After, &cursor).unwrap();

    assert_eq!(
        body_outline(&ws),
        vec![
            ("p".to_string(), "Hi".to_string()),
            ("p".to_string(), "Bye".to_string()),
            ("p".to_string(), "Hi".to_string()),
        ]
    );
    let keys = selection(&ws, &cursor);
    assert_eq!(keys.len(), 1);
    assert_ne!(keys[0], p1_key);

    // reversible like any other structural edit
    ws.undo(PATH, &cursor).unwrap();
    assert_eq!(body_outline(&ws).len(), 2);
    ws.redo(PATH, &cursor).unwrap();
    assert_eq!(body_outline(&ws).len(), 3);
}

#[tokio::test]
async fn paste_preserves_clipboard_order_at_both_edges() {
    let mut ws = Workspace::new("site");
    open(
        &mut ws,
        "<body><p id=\"p1\">Hi</p><p id=\"p2\">Bye</p>\
         <div id=\"a\"></div><div id=\"b\"></div></body>",
    )
    .await;
    let cursor = CursorId::Primary;

    select_nodes(&mut ws, &cursor, &["p1", "p2"]);
    ws.copy_selected(PATH, &cursor).unwrap();

    select_nodes(&mut ws, &cursor, &["a"]);
    ws.paste_relative(PATH, Position::Append, &cursor).unwrap();
    select_nodes(&mut ws, &cursor, &["b"]);
    ws.paste_relative(PATH, Position::Prepend, &cursor).unwrap();

    let doc = ws.frame(PATH).unwrap().document().unwrap();
    for host in ["a", "b"] {
        let host_node = doc.find_by_attribute("id", host).unwrap();
        let texts: Vec<String> = doc
            .element_children(host_node)
            .into_iter()
            .map(|p| {
                doc.children(p)
                    .iter()
                    .filter_map(|&c| doc.text(c))
                    .collect::<String>()
            })
            .collect();
        assert_eq!(texts, vec!["Hi".to_string(), "Bye".to_string()], "host {}", host);
    }
}

#[tokio::test]
async fn paste_distributes_fragments_cyclically() {
    let mut ws = Workspace::new("site");
    open(
        &mut ws,
        "<body><p id=\"p1\">Hi</p><p id=\"p2\">Bye</p>\
         <div id=\"a\"></div><div id=\"b\"></div><div id=\"c\"></div></body>",
    )
    .await;
    let cursor = CursorId::Primary;

    select_nodes(&mut ws, &cursor, &["p1", "p2"]);
    ws.copy_selected(PATH, &cursor).unwrap();

    select_nodes(&mut ws, &cursor, &["a", "b", "c"]);
    ws.paste_relative(PATH, Position::Append, &cursor).unwrap();

    let doc = ws.frame(PATH).unwrap().document().unwrap();
    let expected = [("a", "Hi"), ("b", "Bye"), ("c", "Hi")];
    for (host, text) in expected {
        let host_node = doc.find_by_attribute("id", host).unwrap();
        let children = doc.element_children(host_node);
        assert_eq!(children.len(), 1, "host {}", host);
        let got: String = doc
            .children(children[0])
            .iter()
            .filter_map(|&c| doc.text(c))
            .collect();
        assert_eq!(got, text, "host {}", host);
    }
    assert_eq!(selection(&ws, &cursor).len(), 3);
}

#[tokio::test]
async fn paste_on_empty_clipboard_or_selection_is_a_noop() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;
    let before = markup(&ws);

    // nothing copied yet
    select_nodes(&mut ws, &cursor, &["p1"]);
    ws.paste_relative(PATH, Position::After, &cursor).unwrap();
    assert_eq!(markup(&ws), before);

    // copied, but nothing selected
    ws.copy_selected(PATH, &cursor).unwrap();
    ws.change_selection(PATH, &cursor, vec![]).unwrap();
    ws.paste_relative(PATH, Position::After, &cursor).unwrap();
    assert_eq!(markup(&ws), before);
    assert!(ws.frame(PATH).unwrap().history(&cursor).map_or(true, |h| !h.can_undo()));
}

#[tokio::test]
async fn peer_clipboards_stay_private_to_their_cursor() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let primary = CursorId::Primary;
    let peer = CursorId::peer("peer-1");

    select_nodes(&mut ws, &primary, &["p1"]);
    ws.copy_selected(PATH, &primary).unwrap();

    // the peer never copied, and does not inherit the shared slot
    select_nodes(&mut ws, &peer, &["p2"]);
    ws.paste_relative(PATH, Position::After, &peer).unwrap();
    assert_eq!(body_outline(&ws).len(), 2);

    // the primary's copy reached the process-wide slot
    assert_eq!(
        ws.shared_clipboard().get().as_deref(),
        Some("<p id=\"p1\">Hi</p>")
    );
}

#[tokio::test]
async fn shared_clipboard_carries_across_workspaces() {
    let shared = webfoundry_editor::SharedClipboard::new();
    let mut first = Workspace::new("site").with_shared_clipboard(shared.clone());
    open(&mut first, TWO_PARAGRAPHS).await;
    select_nodes(&mut first, &CursorId::Primary, &["p1"]);
    first.copy_selected(PATH, &CursorId::Primary).unwrap();

    let mut second = Workspace::new("site").with_shared_clipboard(shared);
    let ticket = second.select("pages/other.html");
    second
        .attach(
            "pages/other.html",
            parse_document("<body><p id=\"host\">x</p></body>").unwrap(),
        )
        .unwrap();
    second.ready("pages/other.html", None).unwrap();
    ticket.ready().await.unwrap();

    let host = second
        .frame("pages/other.html")
        .unwrap()
        .document()
        .unwrap()
        .find_by_attribute("id", "host")
        .unwrap();
    second
        .change_selection("pages/other.html", &CursorId::Primary, vec![host])
        .unwrap();
    second
        .paste_relative("pages/other.html", Position::After, &CursorId::Primary)
        .unwrap();

    let doc = second.frame("pages/other.html").unwrap().document().unwrap();
    assert_eq!(doc.element_children(doc.body()).len(), 2);
}

#[tokio::test]
async fn toggle_clears_and_restores_the_selection() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;

    select_nodes(&mut ws, &cursor, &["p1", "p2"]);
    let keys = selection(&ws, &cursor);

    ws.toggle_selection(PATH, &cursor).unwrap();
    assert!(selection(&ws, &cursor).is_empty());

    ws.toggle_selection(PATH, &cursor).unwrap();
    assert_eq!(selection(&ws, &cursor), keys);
}

#[tokio::test]
async fn relative_navigation_walks_the_tree() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;

    select_nodes(&mut ws, &cursor, &["p1"]);
    ws.select_relative(PATH, Relation::NextSibling, &cursor, 1)
        .unwrap();
    let frame = ws.frame(PATH).unwrap();
    let doc = frame.document().unwrap();
    let selected = frame.mapper().node(&selection(&ws, &cursor)[0]).unwrap();
    assert_eq!(doc.attribute(selected, "id"), Some("p2"));

    // overshooting is not an error, the selection just stops moving
    ws.select_relative(PATH, Relation::NextSibling, &cursor, 5)
        .unwrap();
    let frame = ws.frame(PATH).unwrap();
    let selected = frame.mapper().node(&selection(&ws, &cursor)[0]).unwrap();
    assert_eq!(frame.document().unwrap().attribute(selected, "id"), Some("p2"));

    ws.select_relative(PATH, Relation::Parent, &cursor, 1).unwrap();
    let frame = ws.frame(PATH).unwrap();
    let body = frame.document().unwrap().body();
    assert_eq!(frame.mapper().node(&selection(&ws, &cursor)[0]), Some(body));

    // the parent of the body lies outside the editable subtree
    ws.select_relative(PATH, Relation::Parent, &cursor, 1).unwrap();
    let frame = ws.frame(PATH).unwrap();
    assert_eq!(
        frame.mapper().node(&selection(&ws, &cursor)[0]),
        Some(frame.document().unwrap().body())
    );

    ws.select_relative(PATH, Relation::FirstChild, &cursor, 1)
        .unwrap();
    ws.select_relative(PATH, Relation::NextSibling, &cursor, 1)
        .unwrap();
    ws.select_relative(PATH, Relation::PrevSibling, &cursor, 1)
        .unwrap();
    let frame = ws.frame(PATH).unwrap();
    let selected = frame.mapper().node(&selection(&ws, &cursor)[0]).unwrap();
    assert_eq!(frame.document().unwrap().attribute(selected, "id"), Some("p1"));
}

#[tokio::test]
async fn selection_events_fan_out_serializably() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let mut events = ws.subscribe();

    select_nodes(&mut ws, &CursorId::Primary, &["p1"]);
    let event = events.try_recv().unwrap();
    match &event {
        EditorEvent::SelectionChanged { path, cursor, keys } => {
            assert_eq!(path, PATH);
            assert_eq!(cursor, &CursorId::Primary);
            assert_eq!(keys.len(), 1);
        }
        other => panic!("unexpected event {:?}", other),
    }

    // payloads serialize for the collaboration layer
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("SelectionChanged"));

    // emitted unconditionally, even when the set is unchanged
    select_nodes(&mut ws, &CursorId::Primary, &["p1"]);
    assert!(matches!(
        events.try_recv(),
        Ok(EditorEvent::SelectionChanged { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn edits_reach_the_store_through_the_debounced_pipeline() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = SavePipeline::spawn(
        store.clone(),
        Arc::new(NoopFormatter),
        Duration::from_millis(200),
    );
    let mut ws = Workspace::new("site").with_pipeline(pipeline);
    open(&mut ws, TWO_PARAGRAPHS).await;

    // opening alone persists nothing
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(store.load("site", PATH).unwrap().is_none());

    select_nodes(&mut ws, &CursorId::Primary, &["p1"]);
    ws.create_relative(PATH, Position::After, &CursorId::Primary, "div", 1)
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let saved = String::from_utf8(store.load("site", PATH).unwrap().unwrap()).unwrap();
    assert!(saved.contains("<div></div>"));
    assert!(saved.starts_with("<!doctype html>"));

    // undo schedules a further save reflecting the reverted state
    ws.undo(PATH, &CursorId::Primary).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let saved = String::from_utf8(store.load("site", PATH).unwrap().unwrap()).unwrap();
    assert!(!saved.contains("<div></div>"));
}

#[tokio::test]
async fn replace_document_retires_every_key() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    select_nodes(&mut ws, &CursorId::Primary, &["p1"]);
    let old_key = selection(&ws, &CursorId::Primary)[0].clone();

    ws.replace_document(PATH, "<body><h1 id=\"title\">New</h1></body>")
        .unwrap();

    let frame = ws.frame(PATH).unwrap();
    assert!(frame.mapper().node(&old_key).is_none());
    assert!(markup(&ws).contains("<h1 id=\"title\">New</h1>"));
    // the replacement is not undoable
    assert!(!ws.undo(PATH, &CursorId::Primary).unwrap());
}

#[tokio::test(start_paused = true)]
async fn overlay_tracker_follows_selection_cardinality() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let mut events = ws.subscribe();
    let ws = Arc::new(Mutex::new(ws));

    let handle = spawn_overlay_tracker(ws.clone(), PATH, Duration::from_millis(16));
    tokio::time::sleep(Duration::from_millis(40)).await;

    {
        let mut ws = ws.lock().unwrap();
        let nodes = {
            let doc = ws.frame(PATH).unwrap().document().unwrap();
            doc.element_children(doc.body())
        };
        ws.change_selection(PATH, &CursorId::Primary, nodes).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(
        ws.lock().unwrap().frame(PATH).unwrap().overlay_count(&CursorId::Primary),
        2
    );
    let mut saw_overlays = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, EditorEvent::OverlaysChanged { .. }) {
            saw_overlays = true;
        }
    }
    assert!(saw_overlays);

    {
        let mut ws = ws.lock().unwrap();
        ws.change_selection(PATH, &CursorId::Primary, vec![]).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(
        ws.lock().unwrap().frame(PATH).unwrap().overlay_count(&CursorId::Primary),
        0
    );

    // the tracker dies with its frame
    ws.lock().unwrap().close(PATH).unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    handle.await.unwrap();
}

#[tokio::test]
async fn pointer_down_selects_for_the_primary_cursor() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;

    let p2 = find(&ws, "p2");
    ws.pointer_down(PATH, p2).unwrap();

    let keys = selection(&ws, &CursorId::Primary);
    assert_eq!(keys.len(), 1);
    assert_eq!(ws.frame(PATH).unwrap().mapper().node(&keys[0]), Some(p2));
}

#[tokio::test]
async fn reset_closes_every_open_frame() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let mut events = ws.subscribe();

    ws.reset();
    assert!(!ws.is_open(PATH));
    assert!(matches!(
        events.try_recv(),
        Ok(EditorEvent::FrameClosed { .. })
    ));
}

#[tokio::test]
async fn key_chords_drive_the_editor() {
    let mut ws = Workspace::new("site");
    open(&mut ws, TWO_PARAGRAPHS).await;
    let cursor = CursorId::Primary;

    select_nodes(&mut ws, &cursor, &["p1"]);
    assert!(ws.key_down(PATH, &cursor, "Enter").unwrap());
    assert_eq!(body_outline(&ws).len(), 3);

    assert!(ws.key_down(PATH, &cursor, "Ctrl-z").unwrap());
    assert_eq!(body_outline(&ws).len(), 2);

    assert!(ws.key_down(PATH, &cursor, "Ctrl-y").unwrap());
    assert_eq!(body_outline(&ws).len(), 3);

    assert!(!ws.key_down(PATH, &cursor, "Ctrl-q").unwrap());
}
