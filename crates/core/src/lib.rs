pub mod archive;
pub mod codec;
pub mod config;
pub mod export;
pub mod ingest;
pub mod item;
pub mod jobs;
pub mod media;
pub mod sqlite;
pub mod task;
pub mod testing;

pub use archive::{ArchiveError, ArchiveWriter, TarGzArchiveWriter};
pub use codec::{
    AnnotationCodec, CodecError, CodecRegistry, ExportItem, NativeJsonCodec, ParsedAnnotations,
    RawAnnotation, SerializedFile,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    ExportConfig, IngestionConfig, LoggingConfig, MediaSourceEntry, MediaSourceKind,
};
pub use export::{ExportEngine, ExportError, ExportOptions, ExportResult};
pub use ingest::{IngestionEngine, IngestionError, IngestionResult, RunOutcome};
pub use item::{
    Annotation, AssignmentStatus, ExportSelection, NewAnnotation, NewTaskItem, SelectedItem,
    TaskAssignment, TaskItem, TaskItemError, TaskItemStatus, TaskItemStore,
};
pub use jobs::{JobError, JobKind, JobRecord, JobStatus, JobStore, NewJobRecord};
pub use media::{
    ByteStream, Condition, FileDescriptor, FsMediaSource, ItemRef, MediaItem, MediaItemId,
    MediaSource, MediaSourceError, MediaSourceRegistry, SearchFilter,
};
pub use sqlite::SqliteStore;
pub use task::{
    CreateTaskRequest, CreateTemplateRequest, Task, TaskError, TaskStateMachine, TaskStatus,
    TaskStore, TaskSummary, TaskTemplate, TaskWithCounts, TemplateBody,
};
