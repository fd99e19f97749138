use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use quickinfo_config::{ConfigError, ConfigResolver, SettingsChange, SettingsStore};
use quickinfo_core::{
    browse_url, IssueFields, IssueKey, QuickInfoError, RenderedPresentation, Scope, Setting,
    TrackerConfig,
};
use quickinfo_render::build_presentation;
use quickinfo_service::IssueTracker;
use quickinfo_store::{materialize, rewrite, ImageCache};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::credential::CredentialLoader;
use crate::surface::{PromptRequest, StatusSurface};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Idle,
    Resolving,
    Fetching,
    Rendering,
}

/// What started a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Startup,
    IssueChanged,
    UrlChanged,
    Manual,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Startup => "startup",
            Self::IssueChanged => "issue changed",
            Self::UrlChanged => "url changed",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Mutable per-session state: the settings cascade and the cached token.
struct Session {
    resolver: ConfigResolver<Box<dyn SettingsStore>>,
    credentials: CredentialLoader,
}

impl Session {
    fn apply(&mut self, change: &SettingsChange) {
        if change.affects(Setting::TokenPath) {
            self.credentials.invalidate();
        }
    }
}

/// Drives resolve → fetch → render cycles and the user-facing actions around them.
///
/// Overlapping cycles are not serialized: each one renders when it finishes,
/// so the last cycle to complete decides what the surface shows.
pub struct SyncController {
    session: Mutex<Session>,
    tracker: Arc<dyn IssueTracker>,
    cache: ImageCache,
    surface: Arc<dyn StatusSurface>,
    default_issue: Option<String>,
    state: watch::Sender<SyncState>,
    cycles: AtomicU64,
}

impl SyncController {
    pub fn new(
        store: impl SettingsStore + 'static,
        tracker: Arc<dyn IssueTracker>,
        cache: ImageCache,
        surface: Arc<dyn StatusSurface>,
    ) -> Self {
        let store: Box<dyn SettingsStore> = Box::new(store);
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            session: Mutex::new(Session {
                resolver: ConfigResolver::new(store),
                credentials: CredentialLoader::new(),
            }),
            tracker,
            cache,
            surface,
            default_issue: None,
            state,
            cycles: AtomicU64::new(0),
        }
    }

    /// Issue key used when none is configured in any scope.
    pub fn with_default_issue(mut self, issue_key: Option<String>) -> Self {
        self.default_issue = issue_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Current settings, with the default issue key filled in when unset.
    pub async fn resolve_config(&self) -> TrackerConfig {
        let session = self.session.lock().await;
        self.effective_config(&session)
    }

    pub async fn resolve(&self, setting: Setting) -> String {
        self.session.lock().await.resolver.resolve(setting)
    }

    fn effective_config(&self, session: &Session) -> TrackerConfig {
        let mut config = session.resolver.resolve_config();
        if config.issue_key.is_empty() {
            if let Some(key) = &self.default_issue {
                debug!("no issue configured, using {key} from the workspace path");
                config.issue_key = key.clone();
            }
        }
        config
    }

    /// Sync once if both the URL and the issue key are known.
    pub async fn startup(&self) -> Option<RenderedPresentation> {
        let config = self.resolve_config().await;
        if !config.is_syncable() {
            debug!("url or issue not configured, skipping startup sync");
            return None;
        }
        Some(self.run_cycle(SyncTrigger::Startup).await)
    }

    /// Store a new issue key (prompting when `input` is `None`), ask for a URL
    /// if none is configured yet, then sync.
    ///
    /// The key goes to the first folder, the narrowest scope, so an older
    /// folder value cannot shadow it; with no workspace open it lands in the
    /// global scope.
    pub async fn change_issue(&self, input: Option<String>) -> Option<RenderedPresentation> {
        let Some(key) = self.answer(input, PromptRequest::issue()).await else {
            self.surface.report_error("No issue provided.");
            return None;
        };
        if let Err(e) = self.set_setting(Setting::Issue, &key, Scope::Folder(0)).await {
            self.report_config_error(&e);
            return None;
        }

        if self.resolve(Setting::Url).await.is_empty() {
            match self.answer(None, PromptRequest::url()).await {
                Some(url) => {
                    if let Err(e) = self.set_setting(Setting::Url, &url, Scope::Global).await {
                        self.report_config_error(&e);
                    }
                }
                // The cycle below reports the missing URL.
                None => debug!("url prompt dismissed"),
            }
        }

        Some(self.run_cycle(SyncTrigger::IssueChanged).await)
    }

    /// Store a new base URL globally and re-sync when an issue key is known.
    pub async fn change_url(&self, input: Option<String>) -> Option<RenderedPresentation> {
        let Some(url) = self.answer(input, PromptRequest::url()).await else {
            self.surface.report_error("No URL provided.");
            return None;
        };
        if let Err(e) = self.set_setting(Setting::Url, &url, Scope::Global).await {
            self.report_config_error(&e);
            return None;
        }

        let config = self.resolve_config().await;
        if config.base_url != url {
            warn!(
                "url {} from a narrower scope overrides the global value",
                config.base_url
            );
        }
        if config.issue_key.is_empty() {
            return None;
        }
        Some(self.run_cycle(SyncTrigger::UrlChanged).await)
    }

    /// Write a setting and apply its side effects to the session.
    /// The returned change names the scope actually written.
    pub async fn set_setting(
        &self,
        setting: Setting,
        value: &str,
        scope: Scope,
    ) -> Result<SettingsChange, ConfigError> {
        let mut session = self.session.lock().await;
        let change = session.resolver.set(setting, value, scope)?;
        info!("{setting} set in {} scope", change.scope.display_name());
        session.apply(&change);
        Ok(change)
    }

    /// React to a settings change made outside this controller.
    pub async fn on_settings_changed(&self, change: &SettingsChange) {
        self.session.lock().await.apply(change);
    }

    /// Open `{url}/browse/{issue}` for the configured issue.
    pub async fn open_in_browser(&self) -> bool {
        let config = self.resolve_config().await;
        self.open_issue(&config.base_url, &config.issue_key).await
    }

    /// Open the browse page for an explicit click target.
    pub async fn open_issue(&self, base_url: &str, issue_key: &str) -> bool {
        if base_url.trim().is_empty() || issue_key.trim().is_empty() {
            self.surface
                .report_error("Base URL and/or issue is missing.");
            return false;
        }
        let url = browse_url(base_url, issue_key);
        match self.surface.open_external(&url).await {
            Ok(()) => {
                info!("opened {url}");
                true
            }
            Err(e) => {
                error!("failed to open {url}: {e:#}");
                self.surface
                    .report_error(&format!("Couldn't open {url}: {e:#}"));
                false
            }
        }
    }

    /// Empty the image cache. Returns the number of files removed.
    pub async fn remove_thumbnails(&self) -> usize {
        match self.cache.purge().await {
            Ok(count) => {
                info!("removed {count} cached images from {}", self.cache.dir().display());
                count
            }
            Err(e) => {
                error!("failed to purge image cache: {e}");
                self.surface
                    .report_error(&format!("Couldn't remove thumbnails: {e}"));
                0
            }
        }
    }

    pub async fn shutdown(&self) {
        match self.cache.purge().await {
            Ok(count) => debug!("shutdown: purged {count} cached images"),
            Err(e) => warn!("shutdown: failed to purge image cache: {e}"),
        }
    }

    /// Run one cycle on its own task.
    pub fn spawn_cycle(self: &Arc<Self>, trigger: SyncTrigger) -> CycleHandle {
        let this = Arc::clone(self);
        CycleHandle {
            task: tokio::spawn(async move { this.run_cycle(trigger).await }),
        }
    }

    /// Resolve, fetch and render. Always renders something: any failure is
    /// reported once and the cycle continues with the fields absent.
    pub async fn run_cycle(&self, trigger: SyncTrigger) -> RenderedPresentation {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let _idle = IdleOnDrop(&self.state);
        info!("cycle {cycle} started ({trigger})");

        self.state.send_replace(SyncState::Resolving);
        let (config, token) = {
            let mut session = self.session.lock().await;
            let config = self.effective_config(&session);
            let token = match session.credentials.token(&config.token_path).await {
                Ok(token) => token,
                Err(e) => {
                    self.report(&e);
                    String::new()
                }
            };
            (config, token)
        };

        self.state.send_replace(SyncState::Fetching);
        let fields = self.fetch(&config, &token).await;

        self.state.send_replace(SyncState::Rendering);
        let presentation = build_presentation(&config, fields.as_ref());
        self.surface.render(&presentation);
        info!("cycle {cycle} rendered: {}", presentation.label);
        presentation
    }

    async fn fetch(&self, config: &TrackerConfig, token: &str) -> Option<IssueFields> {
        if config.base_url.is_empty() {
            self.report(&QuickInfoError::ConfigMissing(Setting::Url));
            return None;
        }
        let key = match IssueKey::parse(&config.issue_key) {
            Ok(key) => key,
            Err(e) => {
                self.report(&e);
                return None;
            }
        };

        debug!("fetching {key} from {}", config.base_url);
        let fields = match self.tracker.fetch_issue(&config.base_url, token, &key).await {
            Ok(fields) => fields,
            Err(e) => {
                self.report(&QuickInfoError::RemoteUnreachable {
                    base_url: config.base_url.clone(),
                    token_path: config.token_path.clone(),
                    detail: e.to_string(),
                });
                return None;
            }
        };

        let fields = rewrite(fields, &self.cache);
        match materialize(&fields, &self.cache, self.tracker.as_ref(), token).await {
            Ok(report) => debug!(
                "{key}: {} images downloaded, {} skipped",
                report.downloaded.len(),
                report.skipped.len()
            ),
            // Missing images only degrade the tooltip.
            Err(e) => self.report(&e),
        }
        Some(fields)
    }

    async fn answer(&self, input: Option<String>, request: PromptRequest) -> Option<String> {
        let raw = match input {
            Some(value) => Some(value),
            None => self.surface.prompt(request).await,
        };
        raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn report(&self, err: &QuickInfoError) {
        error!("{err}");
        self.surface.report_error(&err.to_string());
    }

    fn report_config_error(&self, err: &ConfigError) {
        error!("{err}");
        self.surface
            .report_error(&format!("Couldn't save setting: {err}"));
    }
}

struct IdleOnDrop<'a>(&'a watch::Sender<SyncState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(SyncState::Idle);
    }
}

/// A sync cycle running on its own task.
pub struct CycleHandle {
    task: JoinHandle<RenderedPresentation>,
}

impl CycleHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// `None` if the cycle was cancelled before it rendered.
    pub async fn join(self) -> Option<RenderedPresentation> {
        match self.task.await {
            Ok(presentation) => Some(presentation),
            Err(e) if e.is_cancelled() => {
                debug!("sync cycle cancelled");
                None
            }
            Err(e) => {
                error!("sync cycle failed: {e}");
                None
            }
        }
    }
}
