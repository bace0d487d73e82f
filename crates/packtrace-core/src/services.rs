//! Wiring of every service over one store and one random source.

use std::sync::Arc;

use crate::{
    aggregation::{AggregationEngine, SerialAllocator},
    catalogue::CatalogueService,
    config::Config,
    runs::RunService,
    sim::{LineController, LineStateStore, Printer, SimRng, Verifier},
    store::{SqliteStore, TrackStore},
    Result,
};

pub struct Services {
    pub store: Arc<dyn TrackStore>,
    pub catalogue: CatalogueService,
    pub runs: RunService,
    pub printer: Printer,
    pub verifier: Verifier,
    pub line: LineController,
    pub aggregation: AggregationEngine,
}

impl Services {
    /// Opens the configured database and builds every service over it.
    pub async fn connect(config: &Config) -> Result<Self> {
        let store = SqliteStore::connect(&config.database.url).await?;
        Self::from_store(Arc::new(store), config)
    }

    pub fn from_store(store: Arc<dyn TrackStore>, config: &Config) -> Result<Self> {
        config.validate()?;
        let rng = Arc::new(SimRng::from_seed(config.simulator.seed));
        let allocator = SerialAllocator::new(config.aggregation.pallet_serial_base)?;

        Ok(Self {
            catalogue: CatalogueService::new(Arc::clone(&store)),
            runs: RunService::new(Arc::clone(&store), config.runs.serial_width),
            printer: Printer::new(
                Arc::clone(&store),
                Arc::clone(&rng),
                config.simulator.printer,
            ),
            verifier: Verifier::new(Arc::clone(&store), rng, config.simulator.verifier),
            line: LineController::new(Arc::clone(&store), Arc::new(LineStateStore::new())),
            aggregation: AggregationEngine::new(Arc::clone(&store), allocator),
            store,
        })
    }
}
