use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tackle_core::{
    ColumnMetadata, Error, MetadataCache, ObjectName, Result, SchemaProvider,
    TableOrViewMetadata, Value,
};

struct CountingProvider {
    loads: AtomicUsize,
}

impl CountingProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
        })
    }
}

impl SchemaProvider for CountingProvider {
    fn load_table_or_view(&self, name: &ObjectName) -> Result<Option<TableOrViewMetadata>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if name.name.eq_ignore_ascii_case("Employee") {
            Ok(Some(TableOrViewMetadata::table(
                name.clone(),
                vec![ColumnMetadata::new("EmployeeKey", Value::Int32(None)).key()],
            )))
        } else {
            Ok(None)
        }
    }

    fn list_tables(&self) -> Result<Vec<ObjectName>> {
        Ok(vec![ObjectName::parse("Employee")])
    }
}

#[test]
fn loads_once_per_distinct_name() {
    let provider = CountingProvider::new();
    let cache = MetadataCache::with_provider(provider.clone());
    let a = cache.table_or_view(&ObjectName::parse("Employee")).unwrap();
    // Case variation must hit the same entry.
    let b = cache.table_or_view(&ObjectName::parse("EMPLOYEE")).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(provider.loads.load(Ordering::SeqCst), 1);
}

#[test]
fn unknown_objects_fail_and_are_not_cached() {
    let provider = CountingProvider::new();
    let cache = MetadataCache::with_provider(provider.clone());
    for _ in 0..2 {
        let err = cache.table_or_view(&ObjectName::parse("Nope")).unwrap_err();
        assert!(matches!(err, Error::MissingObject(..)));
    }
    // A miss is retried, never cached as an empty record.
    assert_eq!(provider.loads.load(Ordering::SeqCst), 2);
}

#[test]
fn reset_forces_a_reload() {
    let provider = CountingProvider::new();
    let cache = MetadataCache::with_provider(provider.clone());
    cache.table_or_view(&ObjectName::parse("Employee")).unwrap();
    cache.reset();
    assert!(cache.is_empty());
    cache.table_or_view(&ObjectName::parse("Employee")).unwrap();
    assert_eq!(provider.loads.load(Ordering::SeqCst), 2);
}

#[test]
fn preload_walks_the_listing() {
    let provider = CountingProvider::new();
    let cache = MetadataCache::with_provider(provider);
    assert_eq!(cache.preload_tables().unwrap(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn registration_bypasses_the_provider() {
    let cache = MetadataCache::new();
    cache.register_table(TableOrViewMetadata::table(
        ObjectName::parse("Local"),
        vec![ColumnMetadata::new("Id", Value::Int64(None)).key().identity()],
    ));
    let table = cache.table_or_view(&ObjectName::parse("local")).unwrap();
    assert!(table.has_identity());
    assert_eq!(table.key_columns().count(), 1);
}
