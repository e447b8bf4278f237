use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use chatmark_core::{
    artifact_filename, build_export_document, sanitize_title, MessageSection, RecoverySettings,
};
use export_logging::export_info;
use scraper::Html;

use crate::convert::{DomMessageConverter, MessageConverter};
use crate::loader::HistoryLoader;
use crate::page::PageDriver;
use crate::persist::ArtifactWriter;
use crate::platform::{Platform, PlatformProfile};
use crate::types::{ExportError, ExportEvent, ExportProgress, ProgressSink, Stage};

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
    pub recovery: RecoverySettings,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            recovery: RecoverySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub artifact: PathBuf,
    pub message_count: usize,
    pub recovery_rounds: u32,
}

/// End-to-end export: recover history, enumerate messages, convert each to
/// Markdown, assemble the document and write the artifact atomically.
///
/// One export at a time: a second trigger while one is in flight is rejected
/// with [`ExportError::AlreadyRunning`] rather than interleaving scroll
/// manipulation on the same container.
pub struct Exporter {
    settings: ExportSettings,
    converter: DomMessageConverter,
    in_flight: AtomicBool,
}

impl Exporter {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            converter: DomMessageConverter,
            in_flight: AtomicBool::new(false),
        }
    }

    pub async fn export(
        &self,
        page: &dyn PageDriver,
        profile_override: Option<PlatformProfile>,
        sink: &dyn ProgressSink,
    ) -> Result<ExportSummary, ExportError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let profile = match profile_override {
            Some(profile) => profile,
            None => {
                let platform =
                    Platform::from_host(page.host()).ok_or_else(|| {
                        ExportError::UnsupportedPlatform {
                            host: page.host().to_string(),
                        }
                    })?;
                PlatformProfile::builtin(platform)
            }
        };

        let loader = HistoryLoader::new(self.settings.recovery);
        let report = loader.recover(page.scroll_region(), sink).await;

        sink.emit(ExportEvent::Progress(ExportProgress {
            stage: Stage::Building,
            status: "building document".to_string(),
        }));

        let html = page.snapshot().await?;
        let doc = Html::parse_document(&html);

        let title = sanitize_title(&profile.locate_title(&doc).unwrap_or_default());
        let messages = profile.select_messages(&doc)?;
        let total = messages.len();

        let mut sections = Vec::new();
        for element in messages {
            let role = profile.role_rule.classify(element);
            let markdown = self.converter.to_markdown(Some(element), role);
            if markdown.is_empty() {
                continue;
            }
            sections.push(MessageSection { role, markdown });
        }
        export_info!(
            "converted {} of {total} messages ({} recovery rounds) for '{title}'",
            sections.len(),
            report.rounds
        );

        let document = build_export_document(&title, &sections);

        sink.emit(ExportEvent::Progress(ExportProgress {
            stage: Stage::Writing,
            status: "writing artifact".to_string(),
        }));

        let writer = ArtifactWriter::new(self.settings.output_dir.clone());
        let artifact = writer.write(&artifact_filename(&title), &document)?;

        let summary = ExportSummary {
            artifact: artifact.clone(),
            message_count: sections.len(),
            recovery_rounds: report.rounds,
        };
        sink.emit(ExportEvent::Completed {
            artifact,
            message_count: summary.message_count,
        });
        Ok(summary)
    }
}

/// Clears the in-flight flag on every exit path.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ExportError> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(ExportError::AlreadyRunning);
        }
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
