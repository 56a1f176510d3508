// End-to-end care scenarios: the lifecycle engine driven through the durable
// SQLite scheduler, the way the gateway's worker pool drives it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use rusqlite::Connection;
use sprout_core::{config::CareConfig, CareJob, PlantId};
use sprout_garden::schedule::{register_care_schedule, request_fertilizer, request_plant};
use sprout_garden::{
    AlertSink, CareEngine, HealthStatus, PlantAlert, PlantStore, SqlitePlantStore,
};
use sprout_scheduler::{JobStatus, Schedule, SchedulerHandle};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

#[derive(Default)]
struct CollectingSink(Mutex<Vec<PlantAlert>>);

impl AlertSink for CollectingSink {
    fn raise(&self, alert: &PlantAlert) {
        self.0.lock().unwrap().push(alert.clone());
    }
}

/// Counts warnings emitted by the garden crate.
#[derive(Clone, Default)]
struct GardenWarnings(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for GardenWarnings {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() == Level::WARN && meta.target().starts_with("sprout_garden") {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct Garden {
    scheduler: SchedulerHandle,
    store: Arc<SqlitePlantStore>,
    alerts: Arc<CollectingSink>,
    engine: CareEngine,
    care: CareConfig,
}

fn garden() -> Garden {
    let scheduler = SchedulerHandle::new(Connection::open_in_memory().unwrap()).unwrap();
    let store = Arc::new(SqlitePlantStore::new(Connection::open_in_memory().unwrap()).unwrap());
    let alerts = Arc::new(CollectingSink::default());
    let care = CareConfig::default();
    let engine = CareEngine::new(
        store.clone(),
        Arc::new(scheduler.clone()),
        alerts.clone(),
        &care,
    );
    Garden {
        scheduler,
        store,
        alerts,
        engine,
        care,
    }
}

impl Garden {
    /// Run every job due at `at`, reporting results back like a worker does.
    fn drain(&self, at: chrono::DateTime<Utc>) -> Vec<String> {
        let mut ran = Vec::new();
        for job in self.scheduler.claim_due(at).unwrap() {
            let payload = CareJob::from_action(&job.action).unwrap();
            match self.engine.run(&payload) {
                Ok(()) => {
                    self.scheduler.complete(&job.id, at).unwrap();
                }
                Err(e) => {
                    self.scheduler.fail(&job.id, &e.to_string(), at).unwrap();
                }
            }
            ran.push(job.name);
        }
        ran
    }

    fn only_plant(&self) -> sprout_garden::Plant {
        let mut plants = self.store.list_all().unwrap();
        assert_eq!(plants.len(), 1);
        plants.remove(0)
    }
}

#[test]
fn fern_is_planted_through_the_queue() {
    let g = garden();
    let job_id = request_plant(&g.scheduler, "Fern").unwrap();

    // Accepted, not yet executed.
    assert!(g.store.list_all().unwrap().is_empty());
    assert_eq!(g.drain(Utc::now()), vec!["create_plant"]);

    let plant = g.only_plant();
    assert_eq!(plant.plant_type, "Fern");
    assert_eq!(plant.water_level, 50);
    assert_eq!(plant.growth_points, 0);
    assert_eq!(plant.health_status, HealthStatus::Healthy);
    assert_eq!(g.scheduler.get_job(&job_id).unwrap().status, JobStatus::Completed);
}

#[test]
fn overwatered_plant_is_alerted_a_day_later() {
    let g = garden();
    let id = g.engine.create_plant("Fern").unwrap();
    let mut plant = g.store.get_by_id(id).unwrap().unwrap();
    plant.water_level = 90;
    g.store.save_batch(&[plant]).unwrap();

    let now = Utc::now();
    g.engine.health_check().unwrap();
    assert_eq!(
        g.store.get_by_id(id).unwrap().unwrap().health_status,
        HealthStatus::Overwatered
    );

    let jobs = g.scheduler.list_jobs().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].name, "notify_if_unhealthy");
    match &jobs[0].schedule {
        Schedule::Once { at } => {
            let offset = *at - now;
            assert!(offset >= Duration::hours(24) && offset < Duration::hours(24) + Duration::minutes(1));
        }
        other => panic!("expected one-shot schedule, got {other:?}"),
    }

    // Nothing fires early.
    assert!(g.drain(now + Duration::hours(23)).is_empty());
    assert_eq!(g.drain(now + Duration::hours(25)), vec!["notify_if_unhealthy"]);

    let alerts = g.alerts.0.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].plant_id, id);
    assert_eq!(alerts[0].status, HealthStatus::Overwatered);
}

#[test]
fn recovered_plant_is_not_alerted() {
    let g = garden();
    let id = g.engine.create_plant("Cactus").unwrap();
    let mut plant = g.store.get_by_id(id).unwrap().unwrap();
    plant.water_level = 10;
    g.store.save_batch(&[plant]).unwrap();

    g.engine.health_check().unwrap();
    // Three daily waterings bring it back to 40: healthy again.
    for _ in 0..3 {
        g.engine.water_all().unwrap();
    }
    g.engine.health_check().unwrap();

    assert_eq!(g.drain(Utc::now() + Duration::hours(25)), vec!["notify_if_unhealthy"]);
    assert!(g.alerts.0.lock().unwrap().is_empty());
}

#[test]
fn fertilizer_lands_after_two_hours() {
    let g = garden();
    let id = g.engine.create_plant("Fern").unwrap();
    let now = Utc::now();
    request_fertilizer(&g.scheduler, id, &g.care).unwrap();

    assert!(g.drain(now + Duration::minutes(119)).is_empty());
    assert_eq!(g.only_plant().growth_points, 0);

    assert_eq!(g.drain(now + Duration::minutes(121)), vec!["apply_fertilizer"]);
    assert_eq!(g.only_plant().growth_points, 25);
}

#[test]
fn fertilizer_for_deleted_plant_only_warns() {
    let g = garden();
    let job_id = request_fertilizer(&g.scheduler, PlantId(77), &g.care).unwrap();

    let warnings = GardenWarnings::default();
    let subscriber = tracing_subscriber::registry().with(warnings.clone());
    tracing::subscriber::with_default(subscriber, || {
        g.drain(Utc::now() + Duration::hours(3));
    });
    assert_eq!(warnings.0.load(Ordering::SeqCst), 1);

    let job = g.scheduler.get_job(&job_id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.last_error, None);
    assert!(g.store.list_all().unwrap().is_empty());
}

#[test]
fn recurring_registration_survives_restart() {
    let g = garden();
    register_care_schedule(&g.scheduler, &g.care).unwrap();
    register_care_schedule(&g.scheduler, &g.care).unwrap();

    let mut keys: Vec<String> = g
        .scheduler
        .list_jobs()
        .unwrap()
        .into_iter()
        .filter_map(|j| j.key)
        .collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "health-check-all-plants",
            "sunlight-all-plants",
            "water-all-plants"
        ]
    );
}

#[test]
fn a_day_of_recurring_care() {
    let g = garden();
    g.engine.create_plant("Fern").unwrap();
    register_care_schedule(&g.scheduler, &g.care).unwrap();

    // Every recurring job fires at least once within 25 hours; each drain
    // reschedules it to the following occurrence.
    let start = Utc::now();
    let mut ran = Vec::new();
    for hour in 1..=25 {
        ran.extend(g.drain(start + Duration::hours(hour)));
    }

    let count = |name: &str| ran.iter().filter(|n| n.as_str() == name).count();
    // Midnight may fall inside both the first and the last hour of the window.
    let waterings = count("water_all_plants");
    assert!((1..=2).contains(&waterings));
    assert!((6..=7).contains(&count("sunlight_all_plants")));
    assert_eq!(count("health_check_all_plants"), 25);

    let plant = g.only_plant();
    assert_eq!(plant.water_level, 50 + 10 * waterings as u8);
    assert_eq!(plant.growth_points, 5 * count("sunlight_all_plants") as u32);
    assert_eq!(plant.health_status, HealthStatus::Healthy);
}
