use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    /// Minimum time between two scheduled UI deliveries while loading.
    /// Zero schedules a delivery after every discovered item.
    pub update_interval: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(1000),
        }
    }
}

impl LoaderSettings {
    pub fn with_update_interval(mut self, update_interval: Duration) -> Self {
        self.update_interval = update_interval;
        self
    }
}
