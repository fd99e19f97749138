//! Full sync cycles against a mock tracker served over real HTTP, with
//! settings and images on disk.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quickinfo_config::{FileSettingsStore, SettingsStore, WorkspaceLayout};
use quickinfo_core::{RenderedPresentation, Scope, Setting};
use quickinfo_service::test_helpers::{spawn_mock_tracker, MockServer, MockTracker};
use quickinfo_service::JiraClient;
use quickinfo_store::ImageCache;
use quickinfo_sync::{PromptRequest, StatusSurface, SyncController, SyncState};
use serde_json::json;
use tempfile::TempDir;

#[derive(Default)]
struct RecordingSurface {
    rendered: Mutex<Vec<RenderedPresentation>>,
    errors: Mutex<Vec<String>>,
    answers: Mutex<VecDeque<String>>,
}

impl RecordingSurface {
    fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSurface for RecordingSurface {
    fn render(&self, presentation: &RenderedPresentation) {
        self.rendered.lock().unwrap().push(presentation.clone());
    }

    fn report_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    async fn prompt(&self, _request: PromptRequest) -> Option<String> {
        self.answers.lock().unwrap().pop_front()
    }

    async fn open_external(&self, _url: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

struct Harness {
    controller: SyncController,
    surface: Arc<RecordingSurface>,
    cache: ImageCache,
    tmp: TempDir,
}

impl Harness {
    /// One workspace folder, a valid token file, and `url`/`issue` written to
    /// the folder settings when given.
    fn new(url: Option<&str>, issue: Option<&str>) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("repo");
        std::fs::create_dir_all(&folder).unwrap();
        let token_path = tmp.path().join("pat.txt");
        std::fs::write(&token_path, "secret\n").unwrap();

        let store = FileSettingsStore::new(
            WorkspaceLayout::single_folder(&folder),
            Some(tmp.path().join("global")),
        );
        store
            .write(Scope::Global, Setting::TokenPath, token_path.to_str().unwrap())
            .unwrap();
        if let Some(url) = url {
            store.write(Scope::Folder(0), Setting::Url, url).unwrap();
        }
        if let Some(issue) = issue {
            store.write(Scope::Folder(0), Setting::Issue, issue).unwrap();
        }

        Self::with_store(store, tmp)
    }

    fn with_store(store: FileSettingsStore, tmp: TempDir) -> Self {
        let cache = ImageCache::new(tmp.path().join("images"));
        let surface = Arc::new(RecordingSurface::default());
        let controller = SyncController::new(
            store,
            Arc::new(JiraClient::new().unwrap()),
            cache.clone(),
            surface.clone(),
        );
        Self {
            controller,
            surface,
            cache,
            tmp,
        }
    }
}

fn issue_with_image() -> serde_json::Value {
    json!({
        "status": { "name": "In Progress" },
        "summary": "Fix login",
        "assignee": { "displayName": "Grace Hopper" },
        "description": "h2. Repro\nSee !image-1.png|width=200! for details.",
        "attachment": [
            { "filename": "image-1.png", "thumbnail": "{base}/thumbnails/image-1.png" },
            { "filename": "report.pdf", "thumbnail": null }
        ],
        "comment": { "comments": [{}, {}] }
    })
}

async fn tracker_with_image() -> MockServer {
    spawn_mock_tracker(
        MockTracker::new()
            .require_token("secret")
            .issue("PROJ-7", issue_with_image())
            .thumbnail("image-1.png", b"\x89PNG fake"),
    )
    .await
}

fn cache_files(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn startup_renders_issue_with_local_image() {
    let server = tracker_with_image().await;
    let h = Harness::new(Some(&server.base_url), Some("PROJ-7"));

    let presentation = h.controller.startup().await.unwrap();

    assert_eq!(
        presentation.label,
        "PROJ-7 | In Progress | Fix login ( Grace Hopper )"
    );
    let tooltip = &presentation.tooltip.markdown;
    assert!(tooltip.starts_with(&format!(
        "Click to open [{0}/browse/PROJ-7]({0}/browse/PROJ-7)",
        server.base_url
    )));
    assert!(tooltip.contains("__2 comments, 2 attachments__"));
    assert!(tooltip.contains("## Repro"));
    let image_uri = h.cache.file_uri("image-1.png").unwrap();
    assert!(tooltip.contains(&format!("![]({image_uri})")));
    assert!(image_uri.starts_with("file://"));
    assert!(presentation.tooltip.trusted);

    assert_eq!(cache_files(h.cache.dir()), vec!["image-1.png"]);
    assert_eq!(
        std::fs::read(h.cache.path_for("image-1.png").unwrap()).unwrap(),
        b"\x89PNG fake"
    );
    assert!(h.surface.errors().is_empty());
    assert_eq!(h.controller.state(), SyncState::Idle);
}

#[tokio::test]
async fn second_cycle_downloads_nothing() {
    let server = tracker_with_image().await;
    let h = Harness::new(Some(&server.base_url), Some("PROJ-7"));

    let first = h.controller.startup().await.unwrap();
    assert_eq!(server.thumbnail_hits(), 1);

    let second = h.controller.startup().await.unwrap();
    assert_eq!(server.thumbnail_hits(), 1);
    assert_eq!(server.issue_hits(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn not_found_renders_error_label_without_cache_writes() {
    let server = spawn_mock_tracker(MockTracker::new().require_token("secret")).await;
    let h = Harness::new(Some(&server.base_url), Some("PROJ-404"));

    let presentation = h.controller.startup().await.unwrap();

    assert!(presentation.label.contains("PROJ-404"));
    assert!(presentation.click_action.is_none());
    assert_eq!(server.thumbnail_hits(), 0);
    assert!(cache_files(h.cache.dir()).is_empty());

    let errors = h.surface.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains(&server.base_url));
    assert!(errors[0].contains("pat.txt"));
}

#[tokio::test]
async fn missing_token_file_degrades_to_unauthenticated_request() {
    let server = tracker_with_image().await;
    let h = Harness::new(Some(&server.base_url), Some("PROJ-7"));
    std::fs::remove_file(h.tmp.path().join("pat.txt")).unwrap();

    let presentation = h.controller.startup().await.unwrap();

    // One report for the token, one for the 401 that follows.
    let errors = h.surface.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("pat.txt"));
    assert!(presentation.label.contains("PROJ-7"));
    assert!(presentation.click_action.is_none());
    assert_eq!(server.issue_hits(), 1);
}

#[tokio::test]
async fn token_file_is_read_once_until_path_changes() {
    let server = tracker_with_image().await;
    let h = Harness::new(Some(&server.base_url), Some("PROJ-7"));

    h.controller.startup().await.unwrap();
    std::fs::remove_file(h.tmp.path().join("pat.txt")).unwrap();

    // Cached token still authenticates.
    let presentation = h.controller.startup().await.unwrap();
    assert!(presentation.click_action.is_some());
    assert!(h.surface.errors().is_empty());

    let new_path = h.tmp.path().join("new-pat.txt");
    std::fs::write(&new_path, "wrong").unwrap();
    h.controller
        .set_setting(Setting::TokenPath, new_path.to_str().unwrap(), Scope::Global)
        .await
        .unwrap();

    let presentation = h.controller.startup().await.unwrap();
    assert!(presentation.click_action.is_none());
    assert!(h.surface.errors()[0].contains("new-pat.txt"));
}

#[tokio::test]
async fn change_issue_without_workspace_writes_global_settings() {
    let server = tracker_with_image().await;
    let tmp = tempfile::tempdir().unwrap();
    let token_path = tmp.path().join("pat.txt");
    std::fs::write(&token_path, "secret").unwrap();
    let global = tmp.path().join("global");
    let store = FileSettingsStore::new(WorkspaceLayout::empty(), Some(global.clone()));
    store
        .write(Scope::Global, Setting::TokenPath, token_path.to_str().unwrap())
        .unwrap();

    let h = Harness::with_store(store, tmp);
    h.surface
        .answers
        .lock()
        .unwrap()
        .push_back(server.base_url.clone());

    let presentation = h.controller.change_issue(Some("PROJ-7".into())).await.unwrap();
    assert_eq!(
        presentation.label,
        "PROJ-7 | In Progress | Fix login ( Grace Hopper )"
    );

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(global.join("settings.json")).unwrap())
            .unwrap();
    assert_eq!(saved["issue"], "PROJ-7");
    assert_eq!(saved["url"], server.base_url.as_str());
}

#[tokio::test]
async fn shutdown_purges_downloaded_images() {
    let server = tracker_with_image().await;
    let h = Harness::new(Some(&server.base_url), Some("PROJ-7"));

    h.controller.startup().await.unwrap();
    assert_eq!(cache_files(h.cache.dir()).len(), 1);

    h.controller.shutdown().await;
    assert!(cache_files(h.cache.dir()).is_empty());
}

#[tokio::test]
async fn remove_thumbnails_reports_count() {
    let server = tracker_with_image().await;
    let h = Harness::new(Some(&server.base_url), Some("PROJ-7"));

    assert_eq!(h.controller.remove_thumbnails().await, 0);
    h.controller.startup().await.unwrap();
    assert_eq!(h.controller.remove_thumbnails().await, 1);

    // Purged images are fetched again on the next cycle.
    h.controller.startup().await.unwrap();
    assert_eq!(server.thumbnail_hits(), 2);
}
