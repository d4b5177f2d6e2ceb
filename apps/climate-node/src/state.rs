use crate::display::{DisplayController, LatestSample};
use crate::sensor::SensorSource;
use crate::store::Store;
use crate::thresholds::Thresholds;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub node_id: String,
    pub thresholds: Thresholds,
    pub store: Store,
    pub sensor: Arc<dyn SensorSource>,
    pub latest: LatestSample,
    pub display: DisplayController,
    pub history_limit_max: usize,
}

