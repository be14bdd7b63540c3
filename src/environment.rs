use chrono::{DateTime, Duration, Utc};

use crate::bodies::sim_object::ReferenceSatellite;

/// Session state shared by every object within a tick.
#[derive(Clone, Debug)]
pub struct Environment {
    pub start_time: DateTime<Utc>, // Wall-clock start of the session.
    pub sim_time_s: f64,           // Elapsed seconds used by the latest tick.
    pub step_count: u64,           // Number of ticks run.
    pub current_time: DateTime<Utc>,
    pub reference: ReferenceSatellite,
}

impl Environment {
    pub fn new(start_time: DateTime<Utc>, reference: ReferenceSatellite) -> Environment {
        Environment {
            start_time,
            sim_time_s: 0f64,
            step_count: 0u64,
            current_time: start_time,
            reference,
        }
    }

    /// Move the session clock to a new elapsed-time snapshot. All objects propagated in
    /// the following tick use this same value.
    ///
    /// ### Argument
    /// * 'elapsed_s' - Seconds since session start.
    ///
    pub fn advance_to(&mut self, elapsed_s: f64) {
        self.sim_time_s = elapsed_s;
        self.step_count += 1;
        self.current_time = self.start_time + Duration::milliseconds((elapsed_s * 1000.0) as i64);
    }

    pub fn get_sim_time(&self) -> f64 {
        self.sim_time_s
    }
}
