//! End-to-end tests: `App` driving an `HttpCategoryRepository` against a
//! mock category API.

use std::sync::Arc;

use taxon::api::{ClientOptions, HttpCategoryRepository};
use taxon::app::{App, AppEvent, LoadState};
use taxon::form::{FormPhase, FormSettings};
use taxon::i18n::Messages;
use taxon::preview::TempDirPreviewStore;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCENARIO: &str = r#"{"data":[
    {"id":1,"name":"Tech","slug":"tech","courseCount":4},
    {"id":2,"name":"Web","slug":"web","parentId":1,"courseCount":2},
    {"id":3,"name":"Orphan","slug":"orphan","parentId":99}
]}"#;

struct Harness {
    app: App,
    tx: mpsc::Sender<AppEvent>,
    rx: mpsc::Receiver<AppEvent>,
    _preview_dir: PreviewDir,
}

/// Per-test preview directory, removed on drop.
struct PreviewDir(std::path::PathBuf);

impl Drop for PreviewDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

impl Harness {
    fn new(server: &MockServer, tag: &str) -> Self {
        let repo = HttpCategoryRepository::new(&server.uri(), ClientOptions::default()).unwrap();
        let dir = std::env::temp_dir().join(format!(
            "taxon_it_{}_{}",
            tag,
            std::process::id()
        ));
        let previews = TempDirPreviewStore::new(&dir).unwrap();
        let app = App::new(
            Arc::new(repo),
            Arc::new(previews),
            Messages::default(),
            FormSettings {
                max_image_bytes: 1024 * 1024,
                exclude_descendants: false,
            },
        );
        let (tx, rx) = mpsc::channel(32);
        Self {
            app,
            tx,
            rx,
            _preview_dir: PreviewDir(dir),
        }
    }

    /// Wait for the next background event and fold it in.
    async fn pump(&mut self) {
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), self.rx.recv())
            .await
            .expect("timed out waiting for app event")
            .expect("event channel closed");
        self.app.handle_event(event, &self.tx);
    }

    async fn load(&mut self) {
        self.app.reload(&self.tx);
        self.pump().await;
    }

    fn names(&self) -> Vec<(String, usize)> {
        self.app
            .rows
            .iter()
            .map(|r| (r.name.clone(), r.depth))
            .collect()
    }
}

async fn mount_list(server: &MockServer, body: &str, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path("/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()));
    match times {
        Some(n) => mock.up_to_n_times(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

#[tokio::test]
async fn test_load_builds_indented_tree() {
    let server = MockServer::start().await;
    mount_list(&server, SCENARIO, None).await;
    let mut h = Harness::new(&server, "load");

    h.load().await;

    assert_eq!(h.app.load_state, LoadState::Loaded);
    assert_eq!(
        h.names(),
        vec![
            ("Tech".to_string(), 0),
            ("Web".to_string(), 1),
            ("Orphan".to_string(), 0),
        ]
    );
    assert_eq!(h.app.rows[0].course_count, 4);
    assert_eq!(h.app.rows[0].child_count, 1);
}

#[tokio::test]
async fn test_load_failure_shows_empty_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let mut h = Harness::new(&server, "load_fail");

    h.load().await;

    assert!(matches!(h.app.load_state, LoadState::Failed(_)));
    assert!(h.app.rows.is_empty());
}

#[tokio::test]
async fn test_create_then_reload_shows_new_category() {
    let server = MockServer::start().await;
    mount_list(&server, SCENARIO, Some(1)).await;
    Mock::given(method("POST"))
        .and(path("/categories"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_string(r#"{"id":4,"name":"Data Science","slug":"data-science"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_list(
        &server,
        r#"[{"id":1,"name":"Tech","slug":"tech"},{"id":4,"name":"Data Science","slug":"data-science","parentId":1}]"#,
        None,
    )
    .await;
    let mut h = Harness::new(&server, "create");
    h.load().await;

    h.app.open_create();
    {
        let form = h.app.form.as_mut().unwrap();
        form.set_name("Data Science");
        form.cycle_parent(true);
    }
    h.app.submit_form(&h.tx);
    h.pump().await; // saved
    assert!(h.app.form.is_none());
    h.pump().await; // reloaded

    assert_eq!(
        h.names(),
        vec![("Tech".to_string(), 0), ("Data Science".to_string(), 1)]
    );
}

#[tokio::test]
async fn test_rejected_update_surfaces_server_message() {
    let server = MockServer::start().await;
    mount_list(&server, SCENARIO, None).await;
    Mock::given(method("PUT"))
        .and(path("/categories/2"))
        .respond_with(
            ResponseTemplate::new(422).set_body_string(r#"{"message":"Slug already taken"}"#),
        )
        .mount(&server)
        .await;
    let mut h = Harness::new(&server, "update_fail");
    h.load().await;

    h.app.nav_down();
    h.app.open_edit();
    h.app.form.as_mut().unwrap().set_slug("tech");
    h.app.submit_form(&h.tx);
    h.pump().await;

    let form = h.app.form.as_ref().expect("form stays open");
    assert_eq!(
        form.phase(),
        &FormPhase::Failed {
            message: "Slug already taken".to_string()
        }
    );
    assert_eq!(form.draft().slug, "tech");
}

#[tokio::test]
async fn test_failed_delete_keeps_row() {
    let server = MockServer::start().await;
    mount_list(&server, SCENARIO, None).await;
    Mock::given(method("DELETE"))
        .and(path("/categories/1"))
        .respond_with(
            ResponseTemplate::new(409).set_body_string(r#"{"error":"Category has courses"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    let mut h = Harness::new(&server, "delete_fail");
    h.load().await;

    h.app.request_delete();
    h.app.confirm_pending(&h.tx);
    h.pump().await;

    assert_eq!(h.app.rows.len(), 3);
    assert!(!h.app.is_loading());
    let (msg, _) = h.app.status_message.as_ref().unwrap();
    assert!(msg.contains("Category has courses"));
}

#[tokio::test]
async fn test_confirmed_delete_reloads() {
    let server = MockServer::start().await;
    mount_list(&server, SCENARIO, Some(1)).await;
    Mock::given(method("DELETE"))
        .and(path("/categories/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    mount_list(
        &server,
        r#"[{"id":1,"name":"Tech"},{"id":2,"name":"Web","parentId":1}]"#,
        None,
    )
    .await;
    let mut h = Harness::new(&server, "delete_ok");
    h.load().await;

    h.app.nav_down();
    h.app.nav_down();
    h.app.request_delete();
    h.app.confirm_pending(&h.tx);
    h.pump().await; // deleted
    h.pump().await; // reloaded

    assert_eq!(h.app.rows.len(), 2);
}
