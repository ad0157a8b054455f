//! Session lifecycle: load, edit, build, export
//!
//! ```text
//! Idle -> Loaded -> Editing -> Building -> Exported | Failed
//! ```
//!
//! A failed build keeps the session so the user can adjust and retry.
//! Loading or resetting bumps the [`Epoch`], which makes any background
//! render or build from before the bump stale.

use crate::backend::{DocumentBackend, PageGeometry};
use crate::config::EngineConfig;
use crate::error::{EditError, Result};
use crate::rebuild;
use crate::session::EditSession;
use crate::tools::suggested_filename;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{info, warn};

/// Monotonic session counter shared with background tasks
#[derive(Debug, Clone, Default)]
pub struct Epoch(Arc<AtomicU64>);

impl Epoch {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Start a new session; returns its number.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Fails with [`EditError::Stale`] unless `started` is still current.
    pub fn check(&self, started: u64) -> Result<()> {
        let current = self.current();
        if current == started {
            Ok(())
        } else {
            Err(EditError::Stale {
                expected: current,
                actual: started,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Loaded,
    Editing,
    Building,
    Exported,
    Failed,
}

/// Finished output, ready for the host to save or download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub suggested_filename: String,
}

/// Where finished output goes. The engine never saves files itself.
pub trait ExportSink {
    fn deliver(&mut self, artifact: ExportArtifact) -> Result<()>;
}

impl ExportSink for Vec<ExportArtifact> {
    fn deliver(&mut self, artifact: ExportArtifact) -> Result<()> {
        self.push(artifact);
        Ok(())
    }
}

struct LoadedDocument<S> {
    name: String,
    source: Arc<S>,
    session: EditSession,
}

pub struct Engine<B: DocumentBackend> {
    backend: Arc<B>,
    config: EngineConfig,
    epoch: Epoch,
    state: SessionState,
    document: Option<LoadedDocument<B::Source>>,
    last_error: Option<EditError>,
    /// Alive while the caller still holds the running background build
    build_ticket: Option<Weak<()>>,
}

impl<B: DocumentBackend> Engine<B> {
    pub fn new(backend: B, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend: Arc::new(backend),
            config,
            epoch: Epoch::default(),
            state: SessionState::Idle,
            document: None,
            last_error: None,
            build_ticket: None,
        })
    }

    pub fn state(&self) -> SessionState {
        if self.build_abandoned() {
            SessionState::Editing
        } else {
            self.state
        }
    }

    /// A background build whose handle was dropped without finishing.
    fn build_abandoned(&self) -> bool {
        self.state == SessionState::Building
            && self
                .build_ticket
                .as_ref()
                .is_some_and(|ticket| ticket.strong_count() == 0)
    }

    fn release_abandoned_build(&mut self) {
        if self.build_abandoned() {
            info!("background build cancelled, session kept");
            self.state = SessionState::Editing;
            self.build_ticket = None;
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle for background tasks that must notice a reload.
    pub fn epoch(&self) -> Epoch {
        self.epoch.clone()
    }

    /// Error from the last failed build, if the engine is in `Failed`.
    pub fn last_error(&self) -> Option<&EditError> {
        self.last_error.as_ref()
    }

    pub fn document_name(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.name.as_str())
    }

    pub fn source(&self) -> Option<Arc<B::Source>> {
        self.document.as_ref().map(|d| Arc::clone(&d.source))
    }

    /// Open `bytes` as the new document, dropping whatever was loaded.
    ///
    /// On failure the engine is left `Idle`.
    pub fn load(&mut self, name: &str, bytes: &[u8]) -> Result<usize> {
        let epoch = self.epoch.advance();
        self.document = None;
        self.last_error = None;
        self.build_ticket = None;
        self.state = SessionState::Idle;

        let source = self.backend.open(bytes)?;
        let page_count = self.backend.page_count(&source);
        let session = EditSession::new(page_count)?;
        self.document = Some(LoadedDocument {
            name: name.to_string(),
            source: Arc::new(source),
            session,
        });
        self.state = SessionState::Loaded;
        info!(name, page_count, epoch, "document loaded");
        Ok(page_count)
    }

    /// Drop the document and any pending work.
    pub fn reset(&mut self) {
        self.epoch.advance();
        self.document = None;
        self.last_error = None;
        self.build_ticket = None;
        self.state = SessionState::Idle;
    }

    fn loaded(&self) -> Result<&LoadedDocument<B::Source>> {
        self.document
            .as_ref()
            .ok_or_else(|| EditError::InvalidState("no document loaded".into()))
    }

    pub fn session(&self) -> Result<&EditSession> {
        self.loaded().map(|d| &d.session)
    }

    /// Session for recording edits; moves the engine to `Editing`.
    pub fn session_mut(&mut self) -> Result<&mut EditSession> {
        self.release_abandoned_build();
        if self.state == SessionState::Building {
            return Err(EditError::InvalidState(
                "cannot edit while a build is running".into(),
            ));
        }
        let document = self
            .document
            .as_mut()
            .ok_or_else(|| EditError::InvalidState("no document loaded".into()))?;
        self.state = SessionState::Editing;
        self.last_error = None;
        Ok(&mut document.session)
    }

    pub fn page_geometry(&self, index: usize) -> Result<PageGeometry> {
        let document = self.loaded()?;
        let page_count = document.session.page_count();
        if index >= page_count {
            return Err(EditError::PageOutOfRange { index, page_count });
        }
        self.backend.page_geometry(&document.source, index)
    }

    /// Name for the output of the loaded document.
    pub fn suggested_filename(&self, suffix: Option<&str>) -> Result<String> {
        let document = self.loaded()?;
        let suffix = suffix.unwrap_or(self.config.output.filename_suffix.as_str());
        Ok(suggested_filename(&document.name, suffix))
    }

    fn begin_build(&mut self) -> Result<()> {
        self.release_abandoned_build();
        match self.state {
            SessionState::Idle => Err(EditError::InvalidState("no document loaded".into())),
            SessionState::Building => Err(EditError::InvalidState("a build is already running".into())),
            _ => {
                self.state = SessionState::Building;
                Ok(())
            }
        }
    }

    fn end_build(&mut self, result: &Result<Vec<u8>>) {
        self.build_ticket = None;
        match result {
            Ok(_) => {
                self.state = SessionState::Exported;
                self.last_error = None;
            }
            Err(e) => {
                warn!(error = %e, "build failed, session kept");
                self.state = SessionState::Failed;
                self.last_error = Some(e.clone());
            }
        }
    }

    /// Finalize the session and rebuild the document.
    pub fn build(&mut self, suffix: Option<&str>) -> Result<ExportArtifact> {
        let filename = self.suggested_filename(suffix)?;
        self.begin_build()?;
        let result = {
            let document = self.loaded()?;
            let plan = document.session.finalize();
            rebuild::build(&*self.backend, &document.source, &plan, &self.config.output)
        };
        self.end_build(&result);
        Ok(ExportArtifact {
            bytes: result?,
            suggested_filename: filename,
        })
    }

    /// Build and hand the result to `sink`.
    pub fn export(&mut self, sink: &mut impl ExportSink, suffix: Option<&str>) -> Result<()> {
        let artifact = self.build(suffix)?;
        sink.deliver(artifact)
    }
}

#[cfg(feature = "async")]
pub use background::PendingBuild;

#[cfg(feature = "async")]
mod background {
    use super::*;
    use tokio::task::JoinHandle;
    use tracing::debug;

    /// A build running on a blocking task
    ///
    /// Dropping it cancels the build: the result is discarded and the
    /// engine goes back to `Editing` with the session kept.
    #[must_use = "finish, cancel or drop the build to leave the Building state"]
    pub struct PendingBuild {
        epoch: u64,
        suggested_filename: String,
        handle: JoinHandle<Result<Vec<u8>>>,
        _ticket: Arc<()>,
    }

    impl PendingBuild {
        pub fn epoch(&self) -> u64 {
            self.epoch
        }
    }

    impl Drop for PendingBuild {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    impl<B> Engine<B>
    where
        B: DocumentBackend + Send + Sync + 'static,
        B::Source: Send + Sync + 'static,
    {
        /// Start building without blocking the caller.
        ///
        /// Must be called inside a tokio runtime.
        pub fn start_build(&mut self, suffix: Option<&str>) -> Result<PendingBuild> {
            let suggested_filename = self.suggested_filename(suffix)?;
            self.begin_build()?;
            let (source, plan) = {
                let document = self.loaded()?;
                (Arc::clone(&document.source), document.session.finalize())
            };
            let backend = Arc::clone(&self.backend);
            let options = self.config.output.clone();
            let epoch = self.epoch.current();
            debug!(epoch, pages = plan.len(), "starting background build");

            let handle = tokio::task::spawn_blocking(move || {
                rebuild::build(&*backend, &source, &plan, &options)
            });
            let ticket = Arc::new(());
            self.build_ticket = Some(Arc::downgrade(&ticket));
            Ok(PendingBuild {
                epoch,
                suggested_filename,
                handle,
                _ticket: ticket,
            })
        }

        /// Abandon `pending` and return to `Editing`, keeping the session.
        ///
        /// A build from an earlier session is simply dropped.
        pub fn cancel_build(&mut self, pending: PendingBuild) {
            debug!(epoch = pending.epoch, "cancelling background build");
            drop(pending);
            self.release_abandoned_build();
        }

        /// Wait for `pending`. A result from an earlier session is
        /// discarded with [`EditError::Stale`] and leaves the engine alone.
        pub async fn finish_build(&mut self, mut pending: PendingBuild) -> Result<ExportArtifact> {
            let joined = (&mut pending.handle).await;
            if let Err(stale) = self.epoch.check(pending.epoch) {
                warn!(epoch = pending.epoch, "discarding stale build");
                return Err(stale);
            }
            let result = joined.unwrap_or_else(|e| {
                Err(EditError::SerializationFailure(format!(
                    "build task failed: {}",
                    e
                )))
            });
            self.end_build(&result);
            Ok(ExportArtifact {
                bytes: result?,
                suggested_filename: std::mem::take(&mut pending.suggested_filename),
            })
        }
    }
}
