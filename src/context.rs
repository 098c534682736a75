//! Shared application context handed to actors and services

use std::sync::Arc;

use crate::{
    adapter::{bus::InMemoryBus, storage::StorageFactory},
    config::AppConfig,
    domain::{employee::IdAllocator, error::WorkflowError},
    port::{bus::MessageBus, storage::EmployeeStorage},
    service::publisher::OutcomePublisher
};

/// Everything the workflow needs from its environment
#[derive(Clone)]
pub struct AppContext {
    pub config:    AppConfig,
    pub storage:   Arc<dyn EmployeeStorage>,
    pub bus:       Arc<dyn MessageBus>,
    pub ids:       Arc<IdAllocator>,
    pub publisher: Arc<OutcomePublisher>
}

impl AppContext {
    /// Build storage and bus from configuration
    pub async fn init(config: AppConfig) -> Result<Self, WorkflowError> {
        config.validate()?;
        config.ensure_dirs_exist()?;

        let storage = StorageFactory::create(config.storage_type, Some(&config.database_path))?;
        let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new(&config.bus));

        Self::with_parts(config, storage, bus).await
    }

    /// Assemble a context around existing adapters
    pub async fn with_parts(
        config: AppConfig,
        storage: Arc<dyn EmployeeStorage>,
        bus: Arc<dyn MessageBus>
    ) -> Result<Self, WorkflowError> {
        let last_id = storage.highest_id().await?;
        let publisher =
            Arc::new(OutcomePublisher::new(bus.clone(), config.topics.status.clone(), config.publish_timeout()));

        Ok(Self { config, storage, bus, ids: Arc::new(IdAllocator::starting_after(last_id)), publisher })
    }
}
