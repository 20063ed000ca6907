use futures::{StreamExt, TryStreamExt};
use std::{pin::pin, sync::Arc, time::Duration};
use tackle::{
    AccessGate, CancellationToken, DataSource, Error, Executor, Link, LinkExt, QueryResult,
    SerializedExecutor, Sqlite,
};
use tackle_tests::{
    EMPLOYEE_LABELS, Employee, ScriptItem, ScriptedExecutor, ada, affected, employee_row, grace,
    init_logs, rows,
};

#[tokio::test]
async fn cancellation_before_the_first_row() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let mut executor =
        ScriptedExecutor::new().expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&ada())]));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = ds
        .from::<Employee>()
        .to_table()
        .unwrap()
        .execute(&mut executor, &cancel)
        .await
        .unwrap_err();
    assert!(err.is_canceled());
}

#[tokio::test]
async fn cancellation_between_rows_stops_the_cursor() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let mut executor = ScriptedExecutor::new().expect(rows(
        &EMPLOYEE_LABELS,
        vec![employee_row(&ada()), employee_row(&grace())],
    ));
    let cancel = CancellationToken::new();
    let command = ds.from::<Employee>().to_rows().unwrap();
    let mut stream = pin!(command.stream(&mut executor, &cancel));

    let first = stream.try_next().await.unwrap().unwrap();
    assert_eq!(first.values[0], tackle::Value::Int32(Some(1)));
    cancel.cancel();
    let err = stream.try_next().await.unwrap_err();
    assert!(err.is_canceled());
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn cancellation_is_observable_from_clones() {
    let cancel = CancellationToken::new();
    let clone = cancel.clone();
    assert!(!clone.is_canceled());
    cancel.cancel();
    assert!(clone.is_canceled());
    // Idempotent.
    cancel.cancel();
    assert!(cancel.is_canceled());
}

#[tokio::test]
async fn backend_failures_keep_their_variant() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let mut executor = ScriptedExecutor::new().expect(vec![
        ScriptItem::Affected(Default::default()),
        ScriptItem::Fail("disk on fire".into()),
    ]);
    let err = ds
        .insert(&ada())
        .unwrap()
        .execute(&mut executor, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Backend(..)));
    assert!(!err.is_canceled());
    assert!(err.to_string().contains("disk on fire"));
}

#[tokio::test]
async fn executor_helpers_filter_the_run_stream() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let mut executor = ScriptedExecutor::new()
        .expect({
            let mut script = rows(&EMPLOYEE_LABELS, vec![employee_row(&ada())]);
            script.extend(affected(1, None));
            script
        })
        .expect(affected(3, Some(9)));
    let cancel = CancellationToken::new();

    let token = ds.from::<Employee>().to_rows().unwrap();
    let fetched: Vec<_> = executor
        .fetch(token.token(), &cancel)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(fetched.len(), 1);

    let write = ds.insert(&ada()).unwrap();
    let result = executor.execute(write.token(), &cancel).await.unwrap();
    assert_eq!(result.rows_affected, 3);
    assert_eq!(result.last_affected_id, Some(9));
}

#[tokio::test]
async fn serialized_executor_passes_results_through() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let gate = AccessGate::new();
    let inner = ScriptedExecutor::new()
        .expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&ada())]))
        .expect(affected(1, None));
    let mut executor = SerializedExecutor::new(inner, gate);
    let cancel = CancellationToken::new();

    let table = ds
        .from::<Employee>()
        .to_table()
        .unwrap()
        .execute(&mut executor, &cancel)
        .await
        .unwrap();
    assert_eq!(table.len(), 1);

    let result = ds
        .insert(&ada())
        .unwrap()
        .execute(&mut executor, &cancel)
        .await
        .unwrap();
    assert_eq!(result.rows_affected, 1);
}

#[tokio::test]
async fn write_lock_excludes_readers_until_the_cursor_is_dropped() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let gate = AccessGate::new();
    let cancel = CancellationToken::new();

    let writer_inner = ScriptedExecutor::new().expect(affected(1, None));
    let mut writer = SerializedExecutor::new(writer_inner, gate.clone());
    let reader_inner =
        ScriptedExecutor::new().expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&ada())]));
    let mut reader = SerializedExecutor::new(reader_inner, gate);

    let write_token = ds.insert(&ada()).unwrap();
    // Box::pin so the later `drop` drops the stream itself; `pin!` would hand
    // out a `Pin<&mut _>` whose drop releases only the reference.
    let mut write_stream = Box::pin(writer.run(write_token.token(), &cancel));
    // First poll acquires the write guard and holds it for the cursor's life.
    let item = write_stream.try_next().await.unwrap().unwrap();
    assert!(matches!(item, QueryResult::Affected(..)));

    let read_token = ds.from::<Employee>().to_table().unwrap();
    {
        let mut read_stream = pin!(reader.run(read_token.token(), &cancel));
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), read_stream.try_next()).await;
        assert!(blocked.is_err(), "read acquired the gate during a write");
    }

    drop(write_stream);
    let mut read_stream = pin!(reader.run(read_token.token(), &cancel));
    let row = read_stream.try_next().await.unwrap();
    assert!(row.is_some());
}

#[tokio::test]
async fn readers_share_the_gate() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let gate = AccessGate::new();
    let cancel = CancellationToken::new();
    let mut a = SerializedExecutor::new(
        ScriptedExecutor::new().expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&ada())])),
        gate.clone(),
    );
    let mut b = SerializedExecutor::new(
        ScriptedExecutor::new().expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&grace())])),
        gate,
    );
    let token = ds.from::<Employee>().to_table().unwrap();

    let mut sa = pin!(a.run(token.token(), &cancel));
    let first = sa.try_next().await.unwrap();
    assert!(first.is_some());
    // With the first read guard still held, a second read proceeds.
    let mut sb = pin!(b.run(token.token(), &cancel));
    let second = tokio::time::timeout(Duration::from_millis(50), sb.try_next())
        .await
        .expect("concurrent read was blocked by another read")
        .unwrap();
    assert!(second.is_some());
}

#[tokio::test]
async fn arrival_order_is_preserved() {
    init_logs();
    let ds = DataSource::new("hr", Sqlite);
    let mut executor = ScriptedExecutor::new().expect(rows(
        &EMPLOYEE_LABELS,
        vec![
            employee_row(&grace()),
            employee_row(&ada()),
        ],
    ));
    let command = ds.from::<Employee>().to_rows().unwrap();
    let rows = command
        .execute(&mut executor, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(rows[0].values[0], tackle::Value::Int32(Some(2)));
    assert_eq!(rows[1].values[0], tackle::Value::Int32(Some(1)));
}
