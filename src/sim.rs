//! Session loop: a fixed tick recomputing every object's state and threat, and a slower
//! catalog refresh running in the background.
//!
//! Both run on one task so ticks are strictly serialized and the working set needs no
//! lock. A catalog fetch is spawned and its result swapped in whole when it completes;
//! a slow or failing store never delays a tick.

use std::{future, sync::Arc};

use rand::RngCore;
use rayon::prelude::*;
use serde::Serialize;
use tokio::{
    sync::{watch, Notify},
    task::{JoinError, JoinHandle},
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    bodies::sim_object::{CatalogRecord, OrbitalObject},
    environment::Environment,
    error::{CatalogError, StoreError},
    input::RuntimeParameters,
    propagate::{self, PropagatedState},
    store::RecordStore,
    threat,
};

/// Read-only picture of the working set published after every tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationView {
    pub sim_time_s: f64,
    pub step_count: u64,
    pub objects: Vec<OrbitalObject>,
    pub active_threats: Vec<OrbitalObject>,
}

type CatalogFetch = JoinHandle<Result<Vec<CatalogRecord>, StoreError>>;

pub struct Simulation {
    env: Environment,
    objects: Vec<OrbitalObject>,
    catalog: Arc<dyn RecordStore<CatalogRecord>>,
    rng: Box<dyn RngCore + Send>,
    params: RuntimeParameters,
    view_tx: watch::Sender<Arc<SimulationView>>,
    refresh_requested: Arc<Notify>,
}

impl Simulation {
    pub fn new(
        env: Environment,
        catalog: Arc<dyn RecordStore<CatalogRecord>>,
        rng: Box<dyn RngCore + Send>,
        params: RuntimeParameters,
    ) -> Simulation {
        let (view_tx, _) = watch::channel(Arc::new(SimulationView::default()));

        Simulation {
            env,
            objects: Vec::new(),
            catalog,
            rng,
            params,
            view_tx,
            refresh_requested: Arc::new(Notify::new()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SimulationView>> {
        self.view_tx.subscribe()
    }

    /// Handle for requesting an immediate catalog refresh while the loop runs.
    pub fn refresh_trigger(&self) -> Arc<Notify> {
        Arc::clone(&self.refresh_requested)
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn objects(&self) -> &[OrbitalObject] {
        &self.objects
    }

    pub fn active_threats(&self) -> Vec<OrbitalObject> {
        threat::rank_threats(&self.objects, self.params.active_threat_count)
    }

    /// Recompute the derived fields of every object for one elapsed-time snapshot.
    ///
    /// ### Argument
    /// * 'elapsed_s' - Seconds since session start, shared by all objects of this tick.
    ///
    pub fn tick(&mut self, elapsed_s: f64) {
        self.env.advance_to(elapsed_s);
        self.evaluate();
        self.publish();

        debug!(
            step = self.env.step_count,
            sim_time_s = elapsed_s,
            tracked = self.objects.len(),
            "tick"
        );
    }

    fn evaluate(&mut self) {
        let elapsed_s = self.env.get_sim_time();
        // Propagation is independent per object, threat draws stay sequential so a
        // seeded source gives reproducible results.
        let states: Vec<PropagatedState> = self
            .objects
            .par_iter()
            .map(|obj| propagate::propagate(obj.elements(), elapsed_s))
            .collect();

        let reference = &self.env.reference;
        let rng = self.rng.as_mut();
        for (obj, state) in self.objects.iter_mut().zip(states) {
            obj.threat = threat::assess(&state, reference, &mut *rng);
            obj.state = state;
        }
    }

    fn publish(&self) {
        let view = SimulationView {
            sim_time_s: self.env.get_sim_time(),
            step_count: self.env.step_count,
            objects: self.objects.clone(),
            active_threats: self.active_threats(),
        };
        self.view_tx.send_replace(Arc::new(view));
    }

    /// Replace the working set with a freshly fetched catalog, evaluated at the current
    /// elapsed-time snapshot.
    pub fn replace_catalog(&mut self, records: Vec<CatalogRecord>) {
        self.objects = records.iter().map(OrbitalObject::from_record).collect();
        self.evaluate();
        self.publish();

        info!(tracked = self.objects.len(), "catalog refreshed");
    }

    /// Apply the outcome of a catalog fetch. A failure keeps the last known working set.
    pub fn apply_catalog_fetch(&mut self, fetched: Result<Vec<CatalogRecord>, CatalogError>) {
        match fetched {
            Ok(records) => self.replace_catalog(records),
            Err(err) => warn!(
                error = %err,
                tracked = self.objects.len(),
                "keeping last known catalog, retrying on next refresh"
            ),
        }
    }

    fn spawn_catalog_fetch(&self) -> CatalogFetch {
        let catalog = Arc::clone(&self.catalog);
        let (order, limit) = (self.params.catalog_order, self.params.catalog_limit);

        tokio::spawn(async move { catalog.list(order, Some(limit)).await })
    }

    /// Drive ticks and catalog refreshes until `cancel` fires.
    ///
    /// ### Argument
    /// * 'cancel' - Session teardown signal. Timers and any in-flight fetch are dropped.
    ///
    pub async fn run(&mut self, cancel: CancellationToken) {
        let session_start = Instant::now();
        let mut tick = time::interval(self.params.tick_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut refresh = time::interval(self.params.refresh_period);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let refresh_requested = self.refresh_requested.clone();
        let mut pending: Option<CatalogFetch> = None;

        info!(
            reference = %self.env.reference.name,
            tick_ms = self.params.tick_period.as_millis() as u64,
            refresh_s = self.params.refresh_period.as_secs(),
            "simulation started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                joined = join_fetch(&mut pending), if pending.is_some() => {
                    pending = None;
                    self.apply_catalog_fetch(flatten_fetch(joined));
                }
                _ = tick.tick() => {
                    self.tick(session_start.elapsed().as_secs_f64());
                }
                _ = refresh.tick(), if pending.is_none() => {
                    pending = Some(self.spawn_catalog_fetch());
                }
                _ = refresh_requested.notified(), if pending.is_none() => {
                    debug!("manual catalog refresh");
                    pending = Some(self.spawn_catalog_fetch());
                }
            }
        }

        if let Some(fetch) = pending.take() {
            fetch.abort();
        }
        info!(steps = self.env.step_count, "simulation stopped");
    }
}

async fn join_fetch(
    pending: &mut Option<CatalogFetch>,
) -> Result<Result<Vec<CatalogRecord>, StoreError>, JoinError> {
    match pending {
        Some(fetch) => fetch.await,
        None => future::pending().await,
    }
}

fn flatten_fetch(
    joined: Result<Result<Vec<CatalogRecord>, StoreError>, JoinError>,
) -> Result<Vec<CatalogRecord>, CatalogError> {
    match joined {
        Ok(fetched) => fetched.map_err(CatalogError::FetchFailure),
        Err(join_err) => Err(CatalogError::FetchFailure(StoreError::Unavailable(
            join_err.to_string(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bodies::sim_object::{ObjectClass, ReferenceSatellite},
        store::{MemoryStore, SortKey},
        threat::ThreatLevel,
    };
    use approx::assert_abs_diff_eq;
    use async_trait::async_trait;
    use chrono::Utc;
    use rand::{rngs::StdRng, SeedableRng};
    use std::time::Duration;

    struct OfflineStore;

    #[async_trait]
    impl RecordStore<CatalogRecord> for OfflineStore {
        async fn list(&self, _: SortKey, _: Option<usize>) -> Result<Vec<CatalogRecord>, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        async fn bulk_create(&self, _: Vec<CatalogRecord>) -> Result<Vec<CatalogRecord>, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        async fn create(&self, _: CatalogRecord) -> Result<CatalogRecord, StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }

        async fn delete(&self, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    struct HangingStore;

    #[async_trait]
    impl RecordStore<CatalogRecord> for HangingStore {
        async fn list(&self, _: SortKey, _: Option<usize>) -> Result<Vec<CatalogRecord>, StoreError> {
            future::pending().await
        }

        async fn bulk_create(&self, _: Vec<CatalogRecord>) -> Result<Vec<CatalogRecord>, StoreError> {
            future::pending().await
        }

        async fn create(&self, _: CatalogRecord) -> Result<CatalogRecord, StoreError> {
            future::pending().await
        }

        async fn delete(&self, _: &str) -> Result<(), StoreError> {
            future::pending().await
        }
    }

    /// ISS-like circular orbit, at epoch directly above the reference satellite.
    fn record(name: &str, semimajor_axis: Option<f64>) -> CatalogRecord {
        CatalogRecord {
            id: name.to_string(),
            name: name.to_string(),
            object_type: ObjectClass::Satellite,
            mean_motion: Some(15.5),
            inclination: Some(51.6),
            ra_of_asc_node: Some(0.0),
            arg_of_pericenter: Some(0.0),
            mean_anomaly: Some(0.0),
            semimajor_axis,
            ..Default::default()
        }
    }

    fn simulation(catalog: Arc<dyn RecordStore<CatalogRecord>>) -> Simulation {
        Simulation::new(
            Environment::new(Utc::now(), ReferenceSatellite::default()),
            catalog,
            Box::new(StdRng::seed_from_u64(11)),
            RuntimeParameters::default(),
        )
    }

    #[test]
    fn test_tick_scenario_object() {
        let mut sim = simulation(Arc::new(MemoryStore::<CatalogRecord>::new()));
        sim.replace_catalog(vec![record("ISS", Some(6921.0))]);
        sim.tick(0.0);

        let obj = &sim.objects()[0];
        assert_abs_diff_eq!(obj.state.altitude, 550.0, epsilon = 1e-9);
        assert_abs_diff_eq!(obj.state.velocity, 7.8, epsilon = 0.01);
        assert_eq!(obj.threat.level, ThreatLevel::Critical);
        assert!(obj.threat.time_to_impact.is_some());
        assert_eq!(sim.environment().step_count, 1);
    }

    #[test]
    fn test_tick_uses_one_snapshot() {
        let mut sim = simulation(Arc::new(MemoryStore::<CatalogRecord>::new()));
        sim.replace_catalog(vec![record("A", Some(6921.0)), record("B", Some(6921.0))]);
        sim.tick(1234.5);

        let objects = sim.objects();
        let expected = propagate::propagate(objects[0].elements(), 1234.5);
        assert_eq!(objects[0].state, expected);
        assert_eq!(objects[1].state, expected);
    }

    #[test]
    fn test_incomplete_object_is_isolated() {
        let mut sim = simulation(Arc::new(MemoryStore::<CatalogRecord>::new()));
        sim.replace_catalog(vec![record("broken", None), record("ISS", Some(6921.0))]);
        sim.tick(60.0);

        assert_eq!(sim.objects()[0].state, propagate::FALLBACK_STATE);
        assert_eq!(
            sim.objects()[1].state,
            propagate::propagate(sim.objects()[1].elements(), 60.0)
        );
    }

    #[test]
    fn test_active_threats_ranked() {
        let mut sim = simulation(Arc::new(MemoryStore::<CatalogRecord>::new()));
        sim.replace_catalog(vec![
            record("medium", Some(6921.0 + 150.0)),
            record("critical", Some(6921.0 + 10.0)),
            record("none", Some(6921.0 + 1000.0)),
            record("high", Some(6921.0 + 75.0)),
        ]);
        sim.tick(0.0);

        let ranked: Vec<String> = sim.active_threats().into_iter().map(|o| o.name).collect();
        assert_eq!(ranked, vec!["critical", "high", "medium"]);

        let view = sim.subscribe().borrow().clone();
        assert_eq!(view.active_threats.len(), 3);
        assert_eq!(view.objects.len(), 4);
    }

    #[test]
    fn test_failed_fetch_keeps_working_set() {
        let mut sim = simulation(Arc::new(MemoryStore::<CatalogRecord>::new()));
        sim.replace_catalog(vec![record("ISS", Some(6921.0))]);

        sim.apply_catalog_fetch(Err(CatalogError::FetchFailure(StoreError::Unavailable(
            "timeout".to_string(),
        ))));
        assert_eq!(sim.objects().len(), 1);

        sim.apply_catalog_fetch(Ok(vec![]));
        assert!(sim.objects().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_refreshes_and_stops() {
        let store = Arc::new(MemoryStore::new());
        store.create(record("ISS", Some(6921.0))).await.unwrap();

        let mut sim = simulation(store.clone());
        let mut view = sim.subscribe();
        let refresh = sim.refresh_trigger();
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                sim.run(cancel).await;
                sim
            }
        });

        view.wait_for(|v| v.objects.len() == 1).await.unwrap();
        store.create(record("ISS-2", Some(6921.0))).await.unwrap();
        refresh.notify_one();
        view.wait_for(|v| v.objects.len() == 2).await.unwrap();

        time::sleep(Duration::from_secs(5)).await;
        assert!(view.borrow().step_count >= 5);

        cancel.cancel();
        let sim = task.await.unwrap();
        assert_eq!(sim.objects().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_store_does_not_stop_ticks() {
        let mut sim = simulation(Arc::new(OfflineStore));
        let view = sim.subscribe();
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                sim.run(cancel).await;
                sim
            }
        });

        time::sleep(Duration::from_secs(65)).await;
        assert!(view.borrow().step_count >= 60);

        cancel.cancel();
        let sim = task.await.unwrap();
        assert!(sim.objects().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_does_not_stall_ticks() {
        let mut sim = simulation(Arc::new(HangingStore));
        sim.replace_catalog(vec![record("ISS", Some(6921.0))]);
        let view = sim.subscribe();
        let refresh = sim.refresh_trigger();
        let cancel = CancellationToken::new();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                sim.run(cancel).await;
                sim
            }
        });

        // Spans three refresh intervals with the first fetch never returning.
        time::sleep(Duration::from_secs(95)).await;
        refresh.notify_one();
        time::sleep(Duration::from_secs(5)).await;
        {
            let view = view.borrow();
            assert!(view.step_count >= 95);
            assert_eq!(view.objects.len(), 1);
            assert_abs_diff_eq!(view.sim_time_s, 100.0, epsilon = 1.0);
        }

        cancel.cancel();
        let sim = task.await.unwrap();
        assert_eq!(sim.objects().len(), 1);
    }
}
