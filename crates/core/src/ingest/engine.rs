//! Ingestion engine: pulls media items into a task.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::codec::{AnnotationCodec, CodecRegistry, RawAnnotation};
use crate::config::IngestionConfig;
use crate::item::{NewAnnotation, NewTaskItem, TaskItemStore};
use crate::media::{ItemRef, MediaItem, MediaSource, MediaSourceRegistry, SearchFilter};
use crate::task::{Task, TaskStateMachine, TaskStatus, TaskStore, TaskTemplate};

use super::error::IngestionError;
use super::types::{IngestionResult, RunOutcome};

/// Discovers a task's media items, imports their annotations and creates
/// task items.
///
/// Runs for one task must be serialized by the caller.
pub struct IngestionEngine {
    config: IngestionConfig,
    tasks: Arc<dyn TaskStore>,
    items: Arc<dyn TaskItemStore>,
    sources: MediaSourceRegistry,
    codecs: CodecRegistry,
}

impl IngestionEngine {
    pub fn new(
        config: IngestionConfig,
        tasks: Arc<dyn TaskStore>,
        items: Arc<dyn TaskItemStore>,
        sources: MediaSourceRegistry,
        codecs: CodecRegistry,
    ) -> Self {
        Self {
            config,
            tasks,
            items,
            sources,
            codecs,
        }
    }

    /// Runs ingestion for a task.
    ///
    /// A first run (`refresh == false`) is only accepted while the task is
    /// `Creating` or `CreatingError`, and moves it to `Ready` or
    /// `CreatingError`. A refresh only adds media items not yet attached to
    /// the task and never changes its status.
    pub async fn run(&self, task: &Task, refresh: bool) -> RunOutcome {
        let prior = match self.admit(task, refresh) {
            Ok(prior) => prior,
            Err(e) => {
                error!(task_id = task.id, refresh, error = %e, "Ingestion refused");
                return RunOutcome::Failed(e);
            }
        };

        let outcome = match self.ingest(task).await {
            Ok(result) => {
                info!(
                    task_id = task.id,
                    refresh,
                    added = result.added,
                    auto_created = result.auto_created,
                    "Ingestion finished"
                );
                RunOutcome::Completed(result)
            }
            Err(e) => {
                error!(task_id = task.id, refresh, error = %e, "Ingestion failed");
                RunOutcome::Failed(e)
            }
        };

        if let Some(next) = TaskStateMachine::after_ingestion(prior, refresh, !outcome.is_failed())
        {
            match self.tasks.update_status(task.id, next) {
                Ok(_) => debug!(task_id = task.id, status = %next, "Task status updated"),
                Err(e) => error!(
                    task_id = task.id,
                    status = %next,
                    error = %e,
                    "Failed to update task status"
                ),
            }
        }

        outcome
    }

    /// Checks the stored status and returns the status the run starts from.
    fn admit(&self, task: &Task, refresh: bool) -> Result<TaskStatus, IngestionError> {
        let status = self
            .tasks
            .get(task.id)?
            .ok_or(IngestionError::TaskNotFound(task.id))?
            .status;

        match status {
            TaskStatus::Deleted => Err(IngestionError::TaskDeleted(task.id)),
            _ if refresh => Ok(status),
            TaskStatus::Creating => Ok(status),
            // A failed creation is retried; items it committed are kept
            TaskStatus::CreatingError => {
                self.tasks.update_status(task.id, TaskStatus::Creating)?;
                Ok(TaskStatus::Creating)
            }
            other => Err(IngestionError::AlreadyCreated {
                task_id: task.id,
                status: other,
            }),
        }
    }

    async fn ingest(&self, task: &Task) -> Result<IngestionResult, IngestionError> {
        let template = self
            .tasks
            .get_template(task.task_template_id)?
            .ok_or(IngestionError::TemplateNotFound(task.task_template_id))?;
        let source = self
            .sources
            .get(task.media_source_id)
            .map_err(|_| IngestionError::MediaSourceNotFound(task.media_source_id))?;
        let codec = self
            .codecs
            .get(&template.template.parser)
            .ok_or_else(|| IngestionError::UnknownCodec(template.template.parser.clone()))?;

        let options = &task.media_source_config.options;
        let filter = SearchFilter {
            path: options.path.clone(),
            task_template_id: template.id,
            extensions: template.template.media_extensions.clone(),
            limit: options.limit,
            exclude_already_used: options.exclude_already_used,
        };
        let mut ids = source
            .search_item_ids(&filter, &task.media_source_config.conditions)
            .await?;

        // Snapshot taken before any write of this run. A first run sees the
        // items left behind by an earlier failed attempt.
        let mut attached = self.items.media_item_ids(task.id)?;
        ids.retain(|id| attached.insert(id.clone()));
        debug!(task_id = task.id, candidates = ids.len(), "Media items discovered");

        let mut added = 0;
        if !ids.is_empty() {
            let mut by_id: HashMap<_, _> = source
                .get_items(&ids)
                .await?
                .into_iter()
                .map(|media| (media.id.clone(), media))
                .collect();
            let candidates: Vec<MediaItem> =
                ids.iter().filter_map(|id| by_id.remove(id)).collect();
            if candidates.len() < ids.len() {
                warn!(
                    task_id = task.id,
                    missing = ids.len() - candidates.len(),
                    "Some discovered media items could not be fetched"
                );
            }

            added = self
                .create_items(task, source.as_ref(), codec.as_ref(), candidates)
                .await?;
        }

        let auto_created = self.auto_create(task, &template)?;

        Ok(IngestionResult {
            added,
            auto_created,
        })
    }

    /// Reads annotation documents with bounded parallelism and creates the
    /// task items sequentially in discovery order.
    async fn create_items(
        &self,
        task: &Task,
        source: &dyn MediaSource,
        codec: &dyn AnnotationCodec,
        candidates: Vec<MediaItem>,
    ) -> Result<u64, IngestionError> {
        let suffix = self.config.annotation_suffix.as_str();
        let mut loads = stream::iter(candidates)
            .map(|media| async move {
                let annotations = load_annotations(source, codec, &media, suffix).await;
                (media, annotations)
            })
            .buffered(self.config.max_parallel_reads.max(1));

        let mut added = 0;
        while let Some((media, annotations)) = loads.next().await {
            let annotations = annotations?;
            let imported = annotations.len();
            self.items.create_item(NewTaskItem {
                task_id: task.id,
                media_item_id: media.id.clone(),
                created_by: task.created_by,
                annotations: annotations
                    .into_iter()
                    .map(|raw| raw.into_new(task.created_by))
                    .collect(),
            })?;
            added += 1;
            debug!(
                task_id = task.id,
                media_item_id = %media.id,
                imported,
                "Task item created"
            );
        }
        Ok(added)
    }

    /// Synthesizes default annotations for auto-create kinds on every open
    /// item still missing one.
    fn auto_create(&self, task: &Task, template: &TaskTemplate) -> Result<u64, IngestionError> {
        let mut created = 0;
        for definition in template.template.auto_create_definitions() {
            let missing = self
                .items
                .items_missing_annotation(task.id, &definition.name)?;
            if missing.is_empty() {
                continue;
            }

            let labels = definition.default_labels();
            for item in &missing {
                self.items.create_annotation(
                    item.id,
                    NewAnnotation {
                        labels_name: definition.name.clone(),
                        labels: labels.clone(),
                        boundaries: None,
                        status: 0,
                        created_by: task.created_by,
                    },
                )?;
            }
            created += missing.len() as u64;
            debug!(
                task_id = task.id,
                labels_name = %definition.name,
                count = missing.len(),
                "Default annotations created"
            );
        }
        Ok(created)
    }
}

/// Fetches and parses the sibling annotation document of a media item, if any.
async fn load_annotations(
    source: &dyn MediaSource,
    codec: &dyn AnnotationCodec,
    media: &MediaItem,
    suffix: &str,
) -> Result<Vec<RawAnnotation>, IngestionError> {
    let sidecar = ItemRef::sidecar(media, suffix);
    if !source.stat_item(&sidecar).await? {
        return Ok(Vec::new());
    }

    let mut stream = source.read_item(&sidecar).await?;
    let mut contents = Vec::new();
    while let Some(chunk) = stream.next().await {
        contents.extend_from_slice(&chunk?);
    }

    let document: serde_json::Value =
        serde_json::from_slice(&contents).map_err(|e| IngestionError::Parse {
            document: sidecar.relative_path(),
            reason: e.to_string(),
        })?;
    let parsed = codec.parse(&document).map_err(|e| IngestionError::Parse {
        document: sidecar.relative_path(),
        reason: e.to_string(),
    })?;

    Ok(parsed.annotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::TaskItemStatus;
    use crate::sqlite::SqliteStore;
    use crate::testing::{fixtures, MockCodec, MockMediaSource};
    use chrono::Utc;
    use serde_json::json;

    struct Harness {
        store: Arc<SqliteStore>,
        source: Arc<MockMediaSource>,
        codec: Arc<MockCodec>,
        engine: IngestionEngine,
    }

    fn harness() -> Harness {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let source = Arc::new(MockMediaSource::new());
        let codec = Arc::new(MockCodec::with_kind("native"));

        let mut codecs = CodecRegistry::new();
        codecs.register(codec.clone());
        let engine = IngestionEngine::new(
            IngestionConfig::default(),
            store.clone(),
            store.clone(),
            MediaSourceRegistry::new().with_source(fixtures::MEDIA_SOURCE_ID, source.clone()),
            codecs,
        );

        Harness {
            store,
            source,
            codec,
            engine,
        }
    }

    #[tokio::test]
    async fn test_first_run_creates_items_and_marks_ready() {
        let h = harness();
        h.source
            .set_items(fixtures::media_items(&["images/a.jpg", "images/b.jpg"]))
            .await;
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images/");

        let outcome = h.engine.run(&task, false).await;

        assert_eq!(outcome.added_count(), 2);
        assert_eq!(h.store.count_items(task.id).unwrap(), 2);
        assert_eq!(
            h.store.get(task.id).unwrap().unwrap().status,
            TaskStatus::Ready
        );
    }

    #[tokio::test]
    async fn test_search_filter_built_from_task() {
        let h = harness();
        let (template, mut task) = fixtures::seed_task(h.store.as_ref(), "images/");
        task.media_source_config.options.limit = Some(5);
        task.media_source_config.options.exclude_already_used = true;
        task.media_source_config.conditions = vec![crate::media::Condition(json!({"tag": "x"}))];

        h.engine.run(&task, false).await;

        let searches = h.source.recorded_searches().await;
        assert_eq!(searches.len(), 1);
        let filter = &searches[0].filter;
        assert_eq!(filter.path, "images/");
        assert_eq!(filter.task_template_id, template.id);
        assert_eq!(filter.extensions, template.template.media_extensions);
        assert_eq!(filter.limit, Some(5));
        assert!(filter.exclude_already_used);
        assert_eq!(searches[0].conditions, task.media_source_config.conditions);
    }

    #[tokio::test]
    async fn test_imports_sidecar_annotations() {
        let h = harness();
        h.source
            .set_items(fixtures::media_items(&["images/a.jpg", "images/b.jpg"]))
            .await;
        h.source
            .add_file(
                "images/a.jpg.json",
                json!({"annotations": [{"labelsName": "bbox", "labels": {"class": "car"}}]})
                    .to_string()
                    .into_bytes(),
            )
            .await;
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");

        let outcome = h.engine.run(&task, false).await;
        assert_eq!(outcome.added_count(), 2);
        assert_eq!(h.codec.parse_calls().len(), 1);
        assert_eq!(h.source.recorded_reads().await, vec!["images/a.jpg.json".to_string()]);

        // Only b.jpg is still missing a bbox
        let missing = h.store.items_missing_annotation(task.id, "bbox").unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].media_item_id.as_str(), "images/b.jpg");
    }

    #[tokio::test]
    async fn test_malformed_document_aborts_but_keeps_earlier_items() {
        let h = harness();
        h.source
            .set_items(fixtures::media_items(&[
                "images/a.jpg",
                "images/b.jpg",
                "images/c.jpg",
            ]))
            .await;
        h.source
            .add_file("images/b.jpg.json", b"{not json".to_vec())
            .await;
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");

        let outcome = h.engine.run(&task, false).await;

        assert!(matches!(
            outcome.error(),
            Some(IngestionError::Parse { document, .. }) if document == "images/b.jpg.json"
        ));
        assert_eq!(outcome.added_count(), 0);
        assert_eq!(h.store.count_items(task.id).unwrap(), 1);
        assert_eq!(
            h.store.get(task.id).unwrap().unwrap().status,
            TaskStatus::CreatingError
        );
    }

    #[tokio::test]
    async fn test_codec_schema_error_is_parse_error() {
        let h = harness();
        h.source.set_items(fixtures::media_items(&["images/a.jpg"])).await;
        h.source.add_file("images/a.jpg.json", b"{}".to_vec()).await;
        h.codec.set_parse_error(Some("unexpected layout".to_string()));
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");

        let outcome = h.engine.run(&task, false).await;
        assert!(matches!(outcome.error(), Some(IngestionError::Parse { .. })));
        assert_eq!(h.store.count_items(task.id).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_status() {
        let h = harness();
        h.source.set_items(fixtures::media_items(&["images/a.jpg"])).await;
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        h.engine.run(&task, false).await;
        let task = h.store.get(task.id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Ready);

        h.source.set_search_error(Some("bucket unavailable".to_string())).await;
        let outcome = h.engine.run(&task, true).await;

        assert!(matches!(outcome.error(), Some(IngestionError::Discovery(_))));
        assert_eq!(outcome.added_count(), 0);
        assert_eq!(
            h.store.get(task.id).unwrap().unwrap().status,
            TaskStatus::Ready
        );
    }

    #[tokio::test]
    async fn test_deleted_task_is_refused() {
        let h = harness();
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        let task = h.store.soft_delete(task.id, 1).unwrap();

        let outcome = h.engine.run(&task, true).await;
        assert!(matches!(outcome.error(), Some(IngestionError::TaskDeleted(_))));
        assert!(h.source.recorded_searches().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_codec_fails_creation() {
        let h = harness();
        let template = h
            .store
            .create_template(fixtures::template_request("coco"))
            .unwrap();
        let task = fixtures::seed_task_for_template(h.store.as_ref(), &template, "images");

        let outcome = h.engine.run(&task, false).await;
        assert!(matches!(outcome.error(), Some(IngestionError::UnknownCodec(kind)) if kind == "coco"));
        assert_eq!(
            h.store.get(task.id).unwrap().unwrap().status,
            TaskStatus::CreatingError
        );
    }

    #[tokio::test]
    async fn test_retry_after_creating_error() {
        let h = harness();
        h.source.set_items(fixtures::media_items(&["images/a.jpg"])).await;
        h.source.set_search_error(Some("timeout".to_string())).await;
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");

        h.engine.run(&task, false).await;
        let task = h.store.get(task.id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::CreatingError);

        h.source.set_search_error(None).await;
        let outcome = h.engine.run(&task, false).await;
        assert_eq!(outcome.added_count(), 1);
        assert_eq!(
            h.store.get(task.id).unwrap().unwrap().status,
            TaskStatus::Ready
        );
    }

    #[tokio::test]
    async fn test_retry_after_partial_failure_keeps_one_item_per_media() {
        let h = harness();
        h.source
            .set_items(fixtures::media_items(&["images/a.jpg", "images/b.jpg"]))
            .await;
        h.source
            .add_file("images/b.jpg.json", b"{broken".to_vec())
            .await;
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");

        h.engine.run(&task, false).await;
        let task = h.store.get(task.id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::CreatingError);
        assert_eq!(h.store.count_items(task.id).unwrap(), 1);

        h.source
            .add_file("images/b.jpg.json", br#"{"annotations": []}"#.to_vec())
            .await;
        let outcome = h.engine.run(&task, false).await;

        assert_eq!(outcome.added_count(), 1);
        assert_eq!(h.store.count_items(task.id).unwrap(), 2);
        assert_eq!(h.store.media_item_ids(task.id).unwrap().len(), 2);
        assert_eq!(
            h.store.get(task.id).unwrap().unwrap().status,
            TaskStatus::Ready
        );
    }

    #[tokio::test]
    async fn test_first_run_refused_once_created() {
        let h = harness();
        h.source.set_items(fixtures::media_items(&["images/a.jpg"])).await;
        let (_, stale) = fixtures::seed_task(h.store.as_ref(), "images");
        h.engine.run(&stale, false).await;
        let task = h.store.get(stale.id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Ready);

        // The stored status decides, not the caller's copy
        for copy in [&task, &stale] {
            let outcome = h.engine.run(copy, false).await;
            assert!(matches!(
                outcome.error(),
                Some(IngestionError::AlreadyCreated { status: TaskStatus::Ready, .. })
            ));
        }

        assert_eq!(h.source.recorded_searches().await.len(), 1);
        assert_eq!(h.store.count_items(task.id).unwrap(), 1);
        assert_eq!(
            h.store.get(task.id).unwrap().unwrap().status,
            TaskStatus::Ready
        );
    }

    #[tokio::test]
    async fn test_first_run_refused_on_hidden_task() {
        let h = harness();
        h.source.set_items(fixtures::media_items(&["images/a.jpg"])).await;
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        h.engine.run(&task, false).await;
        let task = h.store.update_status(task.id, TaskStatus::Hidden).unwrap();

        let outcome = h.engine.run(&task, false).await;
        assert!(matches!(
            outcome.error(),
            Some(IngestionError::AlreadyCreated { status: TaskStatus::Hidden, .. })
        ));
        assert_eq!(h.store.count_items(task.id).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_auto_create_skips_done_items() {
        let h = harness();
        h.source
            .set_items(fixtures::media_items(&["images/a.jpg", "images/b.jpg"]))
            .await;
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");
        let finished = h
            .store
            .create_item(NewTaskItem {
                task_id: task.id,
                media_item_id: "images/z.jpg".into(),
                created_by: task.created_by,
                annotations: vec![],
            })
            .unwrap();
        h.store
            .set_item_status(finished.id, TaskItemStatus::Done, Utc::now())
            .unwrap();

        let result = h.engine.run(&task, false).await.into_result().unwrap();
        assert_eq!(result.added, 2);
        assert_eq!(result.auto_created, 2);

        // Refreshing does not synthesize a second default annotation
        let task = h.store.get(task.id).unwrap().unwrap();
        let result = h.engine.run(&task, true).await.into_result().unwrap();
        assert_eq!(result, IngestionResult::default());
        assert!(h
            .store
            .items_missing_annotation(task.id, fixtures::AUTO_LABELS)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_ids_from_source_create_one_item() {
        let h = harness();
        let mut items = fixtures::media_items(&["images/a.jpg"]);
        items.push(items[0].clone());
        h.source.set_items(items).await;
        let (_, task) = fixtures::seed_task(h.store.as_ref(), "images");

        let outcome = h.engine.run(&task, false).await;
        assert_eq!(outcome.added_count(), 1);
    }
}
