use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tackle::{
    CachePolicy, CancellationToken, CollectionOptions, DataSource, ExecutionEvent,
    ExecutionListener, ExecutionToken, Link, LinkExt, MemoryCache, ResultCache, RowOptions,
    Sqlite,
};
use tackle_tests::{
    EMPLOYEE_LABELS, Employee, ScriptedExecutor, ada, affected, employee_row, grace, init_logs,
    rows,
};

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

#[tokio::test]
async fn read_or_cache_short_circuits_the_second_run() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let cache: Arc<dyn ResultCache> = Arc::new(MemoryCache::new());
    let mut executor = ScriptedExecutor::new().expect(rows(
        &EMPLOYEE_LABELS,
        vec![employee_row(&ada()), employee_row(&grace())],
    ));

    let query = || {
        ds.from::<Employee>()
            .to_collection::<Employee>(CollectionOptions::NONE)
            .unwrap()
            .read_or_cache(cache.clone(), CachePolicy::forever())
    };
    let first = query().execute(&mut executor, &cancel()).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(executor.commands.len(), 1);

    // Same text and values: served from the cache, the executor is idle.
    let second = query().execute(&mut executor, &cancel()).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(executor.commands.len(), 1);
}

#[tokio::test]
async fn different_parameters_cache_separately() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let cache: Arc<dyn ResultCache> = Arc::new(MemoryCache::new());
    let mut executor = ScriptedExecutor::new()
        .expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&ada())]))
        .expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&grace())]));

    let by_key = |key: i32| {
        ds.get_by_key::<Employee>([key], RowOptions::NONE)
            .unwrap()
            .read_or_cache(cache.clone(), CachePolicy::forever())
    };
    let first: Employee = by_key(1).execute(&mut executor, &cancel()).await.unwrap();
    let second: Employee = by_key(2).execute(&mut executor, &cancel()).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(executor.commands.len(), 2);
}

#[tokio::test]
async fn invalidation_forces_a_fresh_read() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let cache: Arc<dyn ResultCache> = Arc::new(MemoryCache::new());
    let mut executor = ScriptedExecutor::new()
        .expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&ada())]))
        .expect(affected(1, None))
        .expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&grace())]));

    let read = || {
        ds.get_by_key::<Employee>([1i32], RowOptions::NONE)
            .unwrap()
            .read_or_cache(cache.clone(), CachePolicy::forever())
    };
    let before: Employee = read().execute(&mut executor, &cancel()).await.unwrap();
    assert_eq!(before, ada());

    // The write invalidates; an empty key list clears everything.
    ds.update(&grace())
        .unwrap()
        .invalidate_cache(cache.clone(), vec![])
        .execute(&mut executor, &cancel())
        .await
        .unwrap();

    let after: Employee = read().execute(&mut executor, &cancel()).await.unwrap();
    assert_eq!(after, grace());
    assert_eq!(executor.commands.len(), 3);
}

#[tokio::test]
async fn expired_entries_are_not_served() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let cache: Arc<dyn ResultCache> = Arc::new(MemoryCache::new());
    let mut executor = ScriptedExecutor::new()
        .expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&ada())]))
        .expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&ada())]));

    let read = || {
        ds.get_by_key::<Employee>([1i32], RowOptions::NONE)
            .unwrap()
            .read_or_cache(cache.clone(), CachePolicy::expiring(Duration::ZERO))
    };
    read().execute(&mut executor, &cancel()).await.unwrap();
    read().execute(&mut executor, &cancel()).await.unwrap();
    assert_eq!(executor.commands.len(), 2);
}

#[tokio::test]
async fn tags_and_timeouts_decorate_the_token() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let mut executor = ScriptedExecutor::new().expect(vec![]);
    let _ = ds
        .from::<Employee>()
        .to_table()
        .unwrap()
        .tagged("reports/weekly */ sneaky")
        .with_timeout(Duration::from_secs(5))
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    let command = executor.last_command();
    assert!(command.sql.ends_with("/* reports/weekly  sneaky */"));
    assert_eq!(command.timeout, Some(Duration::from_secs(5)));
}

struct Collector(Mutex<Vec<String>>);

impl Collector {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Vec::new())))
    }

    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl ExecutionListener for Collector {
    fn on_event(&self, _token: &ExecutionToken, event: &ExecutionEvent) {
        let label = match event {
            ExecutionEvent::Started => "started",
            ExecutionEvent::Finished { .. } => "finished",
            ExecutionEvent::Failed { .. } => "failed",
            ExecutionEvent::Canceled { .. } => "canceled",
        };
        self.0.lock().unwrap().push(label.to_owned());
    }
}

#[tokio::test]
async fn listeners_attach_per_command_or_per_source() {
    init_logs();
    let per_command = Collector::new();
    let per_source = Collector::new();
    let ds = DataSource::new("hr", Sqlite).with_listener(per_source.clone());
    let mut executor = ScriptedExecutor::new()
        .expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&ada())]))
        .expect(vec![]);

    let _ = ds
        .from::<Employee>()
        .to_table()
        .unwrap()
        .with_listener(per_command.clone())
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(per_command.events(), ["started", "finished"]);
    assert_eq!(per_source.events(), ["started", "finished"]);

    // The per-command listener does not leak onto other commands.
    let _ = ds
        .from::<Employee>()
        .to_table()
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(per_command.events(), ["started", "finished"]);
    assert_eq!(
        per_source.events(),
        ["started", "finished", "started", "finished"]
    );
}
