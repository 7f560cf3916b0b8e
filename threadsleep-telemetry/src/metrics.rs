//! ## threadsleep-telemetry::metrics
//! **Prometheus counters for clock activity**

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct ClockMetrics {
    pub registry: Registry,
    pub sleeps_registered: IntCounter,
    pub sleeps_passthrough: IntCounter,
    pub wakeups: IntCounter,
    pub advances: IntCounter,
    pub pending: IntGauge,
}

impl ClockMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let sleeps_registered = IntCounter::new(
            "threadsleep_sleeps_registered_total",
            "Sleeps parked on the virtual clock",
        )?;
        let sleeps_passthrough = IntCounter::new(
            "threadsleep_sleeps_passthrough_total",
            "Sleeps below the threshold handed to the real primitive",
        )?;
        let wakeups = IntCounter::new(
            "threadsleep_wakeups_total",
            "Parked sleepers released by advance or unblock_all",
        )?;
        let advances = IntCounter::new("threadsleep_advances_total", "Calls to advance")?;
        let pending = IntGauge::new(
            "threadsleep_pending_sleeps",
            "Sleepers currently parked on the clock",
        )?;

        registry.register(Box::new(sleeps_registered.clone()))?;
        registry.register(Box::new(sleeps_passthrough.clone()))?;
        registry.register(Box::new(wakeups.clone()))?;
        registry.register(Box::new(advances.clone()))?;
        registry.register(Box::new(pending.clone()))?;

        Ok(Self {
            registry,
            sleeps_registered,
            sleeps_passthrough,
            wakeups,
            advances,
            pending,
        })
    }

    /// Renders every metric in the prometheus text format.
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    #[inline]
    pub fn inc_registered(&self) {
        self.sleeps_registered.inc();
    }

    #[inline]
    pub fn inc_passthrough(&self) {
        self.sleeps_passthrough.inc();
    }

    #[inline]
    pub fn inc_wakeups(&self, count: u64) {
        self.wakeups.inc_by(count);
    }

    #[inline]
    pub fn inc_advances(&self) {
        self.advances.inc();
    }

    #[inline]
    pub fn set_pending(&self, pending: usize) {
        self.pending.set(pending as i64);
    }
}
