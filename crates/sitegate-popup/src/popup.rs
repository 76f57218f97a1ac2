//! The popup: every component wired to one transport.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::animation::RegionSurface;
use crate::controls::ControlState;
use crate::import::{FileImporter, ImportAlert, ImportError, ImportOutcome, PickedFile};
use crate::info_panel::{InfoPanel, InfoSnapshot, InfoTarget, TextContent};
use crate::loader::LoaderSnapshot;
use crate::reconciler::{ReconcileReport, Reconciler};
use crate::toggles::Toggles;
use crate::transport::Transport;
use crate::warning::{FileInputRestriction, Warning, WarningDisplay, WarningKind};

/// The extension's options page.
pub trait OptionsPage: Send + Sync {
    fn open(&self);
}

/// Observable state of the whole popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupSnapshot {
    pub session: ControlState,
    pub allow_list: ControlState,
    pub loader: LoaderSnapshot,
    pub info: InfoSnapshot,
    pub warning: Option<Warning>,
    pub import_alert: Option<ImportAlert>,
    pub report: Option<ReconcileReport>,
}

/// Popup over a transport `T`, a loader surface `L` and an info surface `I`.
pub struct Popup<T, L, I> {
    transport: Arc<T>,
    toggles: Toggles<T, L>,
    info: InfoPanel<I>,
    importer: FileImporter<T>,
    warnings: WarningDisplay,
    options: Option<Arc<dyn OptionsPage>>,
    report: OnceCell<ReconcileReport>,
}

impl<T, L, I> Popup<T, L, I>
where
    T: Transport,
    L: RegionSurface,
    I: RegionSurface + TextContent,
{
    pub fn new(
        transport: Arc<T>,
        loader_surface: L,
        info_surface: I,
        targets: Vec<InfoTarget>,
    ) -> Self {
        Self {
            toggles: Toggles::new(Arc::clone(&transport), loader_surface),
            info: InfoPanel::new(info_surface, targets),
            importer: FileImporter::new(Arc::clone(&transport)),
            warnings: WarningDisplay::new(),
            options: None,
            report: OnceCell::new(),
            transport,
        }
    }

    #[must_use]
    pub fn with_options_page(mut self, page: Arc<dyn OptionsPage>) -> Self {
        self.options = Some(page);
        self
    }

    /// Reconcile with the background. Runs once; later calls return the
    /// first report without sending anything.
    pub async fn open(&self) -> ReconcileReport {
        if let Some(report) = self.report.get() {
            debug!("Popup already open");
            return *report;
        }
        *self
            .report
            .get_or_init(|| async {
                let report =
                    Reconciler::new(self.transport.as_ref(), &self.toggles, &self.warnings)
                        .run()
                        .await;
                info!(allow_list = ?report.allow_list, session = ?report.session, "Popup reconciled");
                report
            })
            .await
    }

    /// Open the options page. Returns `false` if there is none.
    pub fn open_options(&self) -> bool {
        let Some(page) = &self.options else {
            debug!("No options page");
            return false;
        };
        page.open();
        true
    }

    pub const fn toggles(&self) -> &Toggles<T, L> {
        &self.toggles
    }

    pub const fn info(&self) -> &InfoPanel<I> {
        &self.info
    }

    pub const fn warnings(&self) -> &WarningDisplay {
        &self.warnings
    }

    /// Import a picked file through the loader's file input.
    pub async fn import_file(&self, file: &impl PickedFile) -> Result<ImportOutcome, ImportError> {
        if !self.toggles.loader().accepts_files().await {
            debug!(name = file.name(), "File input unavailable");
            return Err(ImportError::Unavailable);
        }
        self.importer.import(file).await
    }

    /// Show `message` and remove or disable the file input.
    pub async fn restrict_file_input(
        &self,
        message: impl Into<String>,
        action: FileInputRestriction,
    ) {
        let kind = WarningKind::FileInputRestriction { action };
        self.warnings
            .show(Warning {
                message: message.into(),
                kind: Some(kind),
                visible: true,
            })
            .await;
        self.toggles.loader().apply_restriction(kind).await;
    }

    pub async fn snapshot(&self) -> PopupSnapshot {
        PopupSnapshot {
            session: self.toggles.session().snapshot().await,
            allow_list: self.toggles.allow_list().snapshot().await,
            loader: self.toggles.loader().snapshot().await,
            info: self.info.snapshot().await,
            warning: self.warnings.current().await,
            import_alert: self.importer.alert().await,
            report: self.report.get().copied(),
        }
    }
}
