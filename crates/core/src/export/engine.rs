//! Export engine: serializes done task items into an archive.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::archive::ArchiveWriter;
use crate::codec::{CodecRegistry, ExportItem};
use crate::config::ExportConfig;
use crate::item::TaskItemStore;
use crate::media::MediaSourceRegistry;
use crate::task::{Task, TaskStatus, TaskStore};

use super::error::ExportError;
use super::naming::{archive_name, reference_url};
use super::types::{ExportOptions, ExportResult};

/// Selects done items of a task, serializes them through the template's
/// codec and stores one archive on the task's media source.
pub struct ExportEngine {
    config: ExportConfig,
    tasks: Arc<dyn TaskStore>,
    items: Arc<dyn TaskItemStore>,
    sources: MediaSourceRegistry,
    codecs: CodecRegistry,
    archive: Arc<dyn ArchiveWriter>,
}

impl ExportEngine {
    pub fn new(
        config: ExportConfig,
        tasks: Arc<dyn TaskStore>,
        items: Arc<dyn TaskItemStore>,
        sources: MediaSourceRegistry,
        codecs: CodecRegistry,
        archive: Arc<dyn ArchiveWriter>,
    ) -> Self {
        Self {
            config,
            tasks,
            items,
            sources,
            codecs,
            archive,
        }
    }

    /// Runs an export. An empty selection is not an error and produces no
    /// archive.
    pub async fn run(
        &self,
        task: &Task,
        options: ExportOptions,
    ) -> Result<ExportResult, ExportError> {
        if task.status == TaskStatus::Deleted {
            return Err(ExportError::TaskDeleted(task.id));
        }

        let template = self
            .tasks
            .get_template(task.task_template_id)?
            .ok_or(ExportError::TemplateNotFound(task.task_template_id))?;
        let codec = self
            .codecs
            .get(&template.template.parser)
            .ok_or_else(|| ExportError::UnknownCodec(template.template.parser.clone()))?;
        let source = self
            .sources
            .get(task.media_source_id)
            .map_err(|_| ExportError::MediaSourceNotFound(task.media_source_id))?;

        let selected = self.items.select_for_export(task.id, &options.selection())?;
        if selected.is_empty() {
            info!(task_id = task.id, "Nothing to export");
            return Ok(ExportResult::empty());
        }

        let ids: Vec<_> = selected.iter().map(|s| s.item.media_item_id.clone()).collect();
        let mut media: HashMap<_, _> = source
            .get_items(&ids)
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();

        let mut files = Vec::new();
        for selected_item in selected {
            let Some(media_item) = media.remove(&selected_item.item.media_item_id) else {
                warn!(
                    task_id = task.id,
                    task_item_id = selected_item.item.id,
                    media_item_id = %selected_item.item.media_item_id,
                    "Media item no longer available, skipping"
                );
                continue;
            };

            let export_item = ExportItem {
                reference_url: reference_url(&self.config.base_url, task, &selected_item.item),
                item: selected_item.item,
                media: media_item,
                annotations: selected_item.annotations,
            };
            match codec.serialize(&export_item)? {
                Some(file) => files.push(file),
                None => debug!(
                    task_id = task.id,
                    task_item_id = export_item.item.id,
                    "Codec produced no output, skipping"
                ),
            }
        }

        if files.is_empty() {
            info!(task_id = task.id, "No item produced export output");
            return Ok(ExportResult::empty());
        }

        let name = archive_name(&task.name, options.name.as_deref(), Utc::now());
        let file = self.archive.write(&name, &files, source.as_ref()).await?;
        let count = files.len() as u64;

        info!(
            task_id = task.id,
            count,
            file = %file.path,
            "Export finished"
        );
        Ok(ExportResult {
            file: Some(file),
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecError;
    use crate::item::{NewAnnotation, NewTaskItem, TaskItemStatus};
    use crate::sqlite::SqliteStore;
    use crate::testing::{fixtures, MockArchiveWriter, MockCodec, MockMediaSource};
    use serde_json::json;

    struct Harness {
        store: Arc<SqliteStore>,
        source: Arc<MockMediaSource>,
        codec: Arc<MockCodec>,
        archive: Arc<MockArchiveWriter>,
        engine: ExportEngine,
    }

    fn harness() -> Harness {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let source = Arc::new(MockMediaSource::new());
        let codec = Arc::new(MockCodec::with_kind("native"));
        let archive = Arc::new(MockArchiveWriter::new());

        let mut codecs = CodecRegistry::new();
        codecs.register(codec.clone());
        let engine = ExportEngine::new(
            ExportConfig {
                base_url: "https://nota.example".to_string(),
                directory: "exports".to_string(),
            },
            store.clone(),
            store.clone(),
            MediaSourceRegistry::new().with_source(fixtures::MEDIA_SOURCE_ID, source.clone()),
            codecs,
            archive.clone(),
        );

        Harness {
            store,
            source,
            codec,
            archive,
            engine,
        }
    }

    /// Creates done items with one annotation each for the given media ids.
    async fn seed_done_items(h: &Harness, task: &Task, media: &[&str]) -> Vec<i64> {
        h.source.set_items(fixtures::media_items(media)).await;
        let mut ids = Vec::new();
        for media_id in media {
            let item = h
                .store
                .create_item(NewTaskItem {
                    task_id: task.id,
                    media_item_id: (*media_id).into(),
                    created_by: task.created_by,
                    annotations: vec![NewAnnotation {
                        labels_name: "bbox".to_string(),
                        labels: json!({"class": "car"}),
                        boundaries: None,
                        status: 1,
                        created_by: task.created_by,
                    }],
                })
                .unwrap();
            h.store
                .set_item_status(item.id, TaskItemStatus::Done, Utc::now())
                .unwrap();
            ids.push(item.id);
        }
        ids
    }

    #[tokio::test]
    async fn test_export_done_items() {
        let h = harness();
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        let ids = seed_done_items(&h, &task, &["images/a.jpg", "images/b.jpg"]).await;

        let result = h.engine.run(&task, ExportOptions::default()).await.unwrap();

        assert_eq!(result.count, 2);
        assert!(result.file.is_some());
        assert_eq!(h.codec.serialized(), ids);

        let writes = h.archive.recorded_writes().await;
        assert_eq!(writes.len(), 1);
        assert!(writes[0].name.starts_with("street scenes_"));
        assert!(writes[0].name.ends_with(".tar.gz"));
        assert_eq!(writes[0].entries.len(), 2);
        assert_eq!(writes[0].source, "mock");
    }

    #[tokio::test]
    async fn test_reference_url_passed_to_codec() {
        let h = harness();
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        let ids = seed_done_items(&h, &task, &["images/a.jpg"]).await;

        h.engine.run(&task, ExportOptions::default()).await.unwrap();

        assert_eq!(
            h.codec.reference_urls(),
            vec![format!(
                "https://nota.example/annotation/{}/{}/??/{}",
                task.project_id, task.id, ids[0]
            )]
        );
    }

    #[tokio::test]
    async fn test_empty_selection_short_circuits() {
        let h = harness();
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        h.store
            .create_item(NewTaskItem {
                task_id: task.id,
                media_item_id: "images/open.jpg".into(),
                created_by: 1,
                annotations: vec![],
            })
            .unwrap();

        let result = h.engine.run(&task, ExportOptions::default()).await.unwrap();

        assert_eq!(result, ExportResult::empty());
        assert!(h.codec.serialized().is_empty());
        assert!(h.archive.recorded_writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_codec_veto_excludes_item() {
        let h = harness();
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        seed_done_items(&h, &task, &["images/a.jpg", "images/b.jpg"]).await;
        h.codec.skip_media("images/a.jpg");

        let result = h.engine.run(&task, ExportOptions::default()).await.unwrap();
        assert_eq!(result.count, 1);

        let writes = h.archive.recorded_writes().await;
        assert_eq!(writes[0].entries.len(), 1);
        assert_eq!(writes[0].entries[0].name, "images/b.jpg.mock");
    }

    #[tokio::test]
    async fn test_codec_failure_aborts_export() {
        let h = harness();
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        seed_done_items(&h, &task, &["images/a.jpg"]).await;
        h.codec.set_serialize_error(Some("broken".to_string()));

        let result = h.engine.run(&task, ExportOptions::default()).await;
        assert!(matches!(
            result,
            Err(ExportError::Serialization(CodecError::Serialize { .. }))
        ));
        assert!(h.archive.recorded_writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_media_is_skipped() {
        let h = harness();
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        seed_done_items(&h, &task, &["images/a.jpg", "images/b.jpg"]).await;
        h.source.set_items(fixtures::media_items(&["images/b.jpg"])).await;

        let result = h.engine.run(&task, ExportOptions::default()).await.unwrap();
        assert_eq!(result.count, 1);
    }

    #[tokio::test]
    async fn test_explicit_name() {
        let h = harness();
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        seed_done_items(&h, &task, &["images/a.jpg"]).await;

        let options = ExportOptions {
            name: Some("weekly".to_string()),
            ..Default::default()
        };
        let result = h.engine.run(&task, options).await.unwrap();
        assert_eq!(result.file.unwrap().name, "weekly.tar.gz");
    }

    #[tokio::test]
    async fn test_archive_failure_is_surfaced() {
        let h = harness();
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        seed_done_items(&h, &task, &["images/a.jpg"]).await;
        h.archive.set_next_error(Some("disk full".to_string())).await;

        let result = h.engine.run(&task, ExportOptions::default()).await;
        assert!(matches!(result, Err(ExportError::Archive(_))));
    }

    #[tokio::test]
    async fn test_deleted_task_is_refused() {
        let h = harness();
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        let task = h.store.soft_delete(task.id, 1).unwrap();

        let result = h.engine.run(&task, ExportOptions::default()).await;
        assert!(matches!(result, Err(ExportError::TaskDeleted(_))));
    }
}
