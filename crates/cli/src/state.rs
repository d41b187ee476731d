use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use nota_core::{
    CodecRegistry, Config, ExportEngine, FsMediaSource, IngestionEngine, JobStore,
    MediaSourceKind, MediaSourceRegistry, SqliteStore, TarGzArchiveWriter, TaskItemStore,
    TaskStore,
};

/// Stores, media sources and codecs shared by the commands
pub struct AppState {
    config: Config,
    store: Arc<SqliteStore>,
    sources: MediaSourceRegistry,
    codecs: CodecRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let store = Arc::new(
            SqliteStore::new(&config.database.path).with_context(|| {
                format!("Failed to open database at {:?}", config.database.path)
            })?,
        );
        info!("Database opened at {:?}", config.database.path);

        let mut sources = MediaSourceRegistry::new();
        for entry in &config.media_sources {
            match entry.kind {
                MediaSourceKind::Filesystem => {
                    info!(
                        "Registering filesystem media source {} ({}) at {:?}",
                        entry.id, entry.name, entry.root
                    );
                    let source = FsMediaSource::new(entry.root.clone())
                        .with_annotation_suffix(config.ingestion.annotation_suffix.clone())
                        .with_usage_index(Arc::clone(&store) as Arc<dyn TaskItemStore>);
                    sources.register(entry.id, Arc::new(source));
                }
            }
        }

        Ok(Self {
            config,
            store,
            sources,
            codecs: CodecRegistry::with_builtin(),
        })
    }

    pub fn tasks(&self) -> &dyn TaskStore {
        self.store.as_ref()
    }

    pub fn jobs(&self) -> &dyn JobStore {
        self.store.as_ref()
    }

    pub fn ingestion_engine(&self) -> IngestionEngine {
        IngestionEngine::new(
            self.config.ingestion.clone(),
            Arc::clone(&self.store) as Arc<dyn TaskStore>,
            Arc::clone(&self.store) as Arc<dyn TaskItemStore>,
            self.sources.clone(),
            self.codecs.clone(),
        )
    }

    pub fn export_engine(&self) -> ExportEngine {
        ExportEngine::new(
            self.config.export.clone(),
            Arc::clone(&self.store) as Arc<dyn TaskStore>,
            Arc::clone(&self.store) as Arc<dyn TaskItemStore>,
            self.sources.clone(),
            self.codecs.clone(),
            Arc::new(TarGzArchiveWriter::new(self.config.export.directory.clone())),
        )
    }
}
