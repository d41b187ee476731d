//! Testing utilities and mock implementations of the collaborator traits.
//!
//! The mocks record their calls and can be told to fail, so that engine
//! behavior can be tested without a real media store.
//!
//! # Example
//!
//! ```rust,ignore
//! use nota_core::testing::{fixtures, MockArchiveWriter, MockCodec, MockMediaSource};
//!
//! let source = MockMediaSource::new();
//! source.set_items(fixtures::media_items(&["images/a.jpg", "images/b.jpg"])).await;
//!
//! let codec = MockCodec::with_kind("native");
//! codec.skip_media("images/a.jpg");
//!
//! // Wire into IngestionEngine / ExportEngine...
//! ```

mod mock_archive_writer;
mod mock_codec;
mod mock_media_source;

pub use mock_archive_writer::{MockArchiveWriter, RecordedArchive};
pub use mock_codec::MockCodec;
pub use mock_media_source::{MockMediaSource, RecordedSearch, RecordedWrite};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;
    use serde_json::json;

    use crate::item::{TaskItem, TaskItemStatus};
    use crate::media::{MediaItem, MediaItemId};
    use crate::task::{
        AnnotationDefinition, AnnotationOptions, CreateTaskRequest, CreateTemplateRequest,
        LabelDefinition, MediaSourceConfig, SourceOptions, Task, TaskStatus, TaskStore,
        TaskTemplate, TemplateBody,
    };

    /// Media source id used by the seeded tasks.
    pub const MEDIA_SOURCE_ID: i64 = 1;

    /// Project id used by the seeded tasks.
    pub const PROJECT_ID: i64 = 1;

    /// User that creates the seeded tasks.
    pub const CREATED_BY: i64 = 42;

    /// Name of the auto-created annotation kind of the fixture template.
    pub const AUTO_LABELS: &str = "quality";

    /// A media item whose id is its path (`images/cat.jpg`).
    pub fn media_item(id: &str) -> MediaItem {
        let (path, name) = id.rsplit_once('/').unwrap_or(("", id));
        MediaItem {
            id: MediaItemId::from(id),
            name: name.to_string(),
            path: path.to_string(),
            metadata: json!({}),
        }
    }

    pub fn media_items(ids: &[&str]) -> Vec<MediaItem> {
        ids.iter().map(|id| media_item(id)).collect()
    }

    /// Template body with a `bbox` kind and an auto-created `quality` kind.
    pub fn template_body(parser: &str) -> TemplateBody {
        TemplateBody {
            parser: parser.to_string(),
            media_extensions: vec!["jpg".to_string(), "png".to_string()],
            annotations: vec![
                AnnotationDefinition {
                    name: "bbox".to_string(),
                    labels: vec![LabelDefinition {
                        name: "class".to_string(),
                        default_value: None,
                        extra: Default::default(),
                    }],
                    options: AnnotationOptions { auto_create: false },
                    extra: Default::default(),
                },
                AnnotationDefinition {
                    name: AUTO_LABELS.to_string(),
                    labels: vec![
                        LabelDefinition {
                            name: "score".to_string(),
                            default_value: Some(json!(0)),
                            extra: Default::default(),
                        },
                        LabelDefinition {
                            name: "note".to_string(),
                            default_value: None,
                            extra: Default::default(),
                        },
                    ],
                    options: AnnotationOptions { auto_create: true },
                    extra: Default::default(),
                },
            ],
        }
    }

    pub fn template_request(parser: &str) -> CreateTemplateRequest {
        CreateTemplateRequest {
            project_id: PROJECT_ID,
            name: "street objects".to_string(),
            template: template_body(parser),
        }
    }

    pub fn task_request(template_id: i64, path: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            project_id: PROJECT_ID,
            name: "street scenes".to_string(),
            description: None,
            task_template_id: template_id,
            media_source_id: MEDIA_SOURCE_ID,
            media_source_config: MediaSourceConfig {
                options: SourceOptions {
                    path: path.to_string(),
                    limit: None,
                    exclude_already_used: false,
                },
                conditions: vec![],
            },
            is_fetch_scheduled: false,
            is_export_scheduled: false,
            fetch_schedule: None,
            export_schedule: None,
            created_by: CREATED_BY,
        }
    }

    /// Stores a `native` template and a task reading from `path`.
    pub fn seed_task(store: &dyn TaskStore, path: &str) -> (TaskTemplate, Task) {
        let template = store
            .create_template(template_request("native"))
            .expect("create template");
        let task = seed_task_for_template(store, &template, path);
        (template, task)
    }

    pub fn seed_task_for_template(
        store: &dyn TaskStore,
        template: &TaskTemplate,
        path: &str,
    ) -> Task {
        store
            .create_task(task_request(template.id, path))
            .expect("create task")
    }

    /// An unsaved ready task and one of its items.
    pub fn task_and_item(task_id: i64, item_id: i64) -> (Task, TaskItem) {
        let now = Utc::now();
        let task = Task {
            id: task_id,
            project_id: PROJECT_ID,
            name: "street scenes".to_string(),
            description: None,
            status: TaskStatus::Ready,
            task_template_id: 1,
            media_source_id: MEDIA_SOURCE_ID,
            media_source_config: MediaSourceConfig::default(),
            is_fetch_scheduled: false,
            is_export_scheduled: false,
            fetch_schedule: None,
            export_schedule: None,
            created_by: CREATED_BY,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        let item = TaskItem {
            id: item_id,
            task_id,
            media_item_id: MediaItemId::from("images/cat.jpg"),
            status: TaskItemStatus::Done,
            task_assignment_id: None,
            created_by: CREATED_BY,
            created_at: now,
            updated_at: now,
        };
        (task, item)
    }
}
