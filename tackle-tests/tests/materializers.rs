use tackle::{
    CancellationToken, CollectionOptions, ColumnMetadata, DataSource, Entity, Error, Link,
    ListOptions, ObjectName, Result, RowOptions, RowView, Sqlite, Value,
};
use tackle_tests::{
    EMPLOYEE_LABELS, Employee, ScriptedExecutor, ada, employee_row, grace, init_logs, rows,
};

fn source() -> DataSource<Sqlite> {
    DataSource::new("test", Sqlite)
}

fn cancel() -> CancellationToken {
    CancellationToken::new()
}

#[tokio::test]
async fn object_requires_exactly_one_row() {
    init_logs();
    let ds = source();
    let mut executor = ScriptedExecutor::new()
        .expect(rows(&EMPLOYEE_LABELS, vec![employee_row(&ada())]));
    let found: Employee = ds
        .from::<Employee>()
        .to_object(RowOptions::NONE)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(found, ada());
}

#[tokio::test]
async fn object_row_policies() {
    init_logs();
    let ds = source();

    // Zero rows without the allowance fails.
    let mut executor = ScriptedExecutor::new().expect(vec![]);
    let err = ds
        .from::<Employee>()
        .to_object::<Employee>(RowOptions::NONE)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingData));

    // Two rows without the allowance fails.
    let mut executor = ScriptedExecutor::new().expect(rows(
        &EMPLOYEE_LABELS,
        vec![employee_row(&ada()), employee_row(&grace())],
    ));
    let err = ds
        .from::<Employee>()
        .to_object::<Employee>(RowOptions::NONE)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedData(..)));

    // DISCARD_EXTRA_ROWS keeps the first row in cursor order.
    let mut executor = ScriptedExecutor::new().expect(rows(
        &EMPLOYEE_LABELS,
        vec![employee_row(&ada()), employee_row(&grace())],
    ));
    let found: Employee = ds
        .from::<Employee>()
        .to_object(RowOptions::DISCARD_EXTRA_ROWS)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(found, ada());

    // The optional shape turns zero rows into None.
    let mut executor = ScriptedExecutor::new().expect(vec![]);
    let found: Option<Employee> = ds
        .from::<Employee>()
        .to_optional_object(RowOptions::NONE)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn collection_materializes_every_row() {
    init_logs();
    let ds = source();
    let mut executor = ScriptedExecutor::new().expect(rows(
        &EMPLOYEE_LABELS,
        vec![employee_row(&ada()), employee_row(&grace())],
    ));
    let all: Vec<Employee> = ds
        .from::<Employee>()
        .to_collection(CollectionOptions::NONE)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(all, vec![ada(), grace()]);

    let mut executor = ScriptedExecutor::new().expect(vec![]);
    let none: Vec<Employee> = ds
        .from::<Employee>()
        .to_collection(CollectionOptions::NONE)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn null_in_non_nullable_binding_names_the_column() {
    init_logs();
    let ds = source();
    let mut executor = ScriptedExecutor::new().expect(rows(
        &EMPLOYEE_LABELS,
        vec![vec![
            Value::Int32(Some(1)),
            Value::Varchar(None),
            Value::Varchar(Some("Lovelace".into())),
            Value::Varchar(None),
        ]],
    ));
    let err = ds
        .from::<Employee>()
        .to_object::<Employee>(RowOptions::NONE)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap_err();
    match err {
        Error::UnexpectedData(message) => assert!(message.contains("FirstName")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn scalar_policies() {
    init_logs();
    let ds = source();

    let mut executor = ScriptedExecutor::new()
        .expect(rows(&["Count"], vec![vec![Value::Int64(Some(42))]]));
    let count: i64 = ds
        .from::<Employee>()
        .select(["EmployeeKey"])
        .to_scalar()
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(count, 42);

    let mut executor = ScriptedExecutor::new().expect(vec![]);
    let err = ds
        .from::<Employee>()
        .select(["EmployeeKey"])
        .to_scalar::<i64>()
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingData));

    // Two rows fail unless the scalar opts into discarding extras.
    let two_keys = || {
        rows(
            &["EmployeeKey"],
            vec![vec![Value::Int32(Some(1))], vec![Value::Int32(Some(2))]],
        )
    };
    let mut executor = ScriptedExecutor::new().expect(two_keys());
    let err = ds
        .from::<Employee>()
        .select(["EmployeeKey"])
        .to_scalar::<i32>()
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedData(..)));

    let mut executor = ScriptedExecutor::new().expect(two_keys());
    let first: i32 = ds
        .from::<Employee>()
        .select(["EmployeeKey"])
        .to_scalar()
        .unwrap()
        .with_options(RowOptions::DISCARD_EXTRA_ROWS)
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(first, 1);

    // The optional shape maps zero rows and NULL to None.
    let mut executor = ScriptedExecutor::new()
        .expect(rows(&["Title"], vec![vec![Value::Varchar(None)]]));
    let title: Option<String> = ds
        .from::<Employee>()
        .select(["Title"])
        .to_optional_scalar()
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert!(title.is_none());
}

#[tokio::test]
async fn list_column_policies() {
    init_logs();
    let ds = source();
    let two_column = || {
        rows(
            &["FirstName", "LastName"],
            vec![
                vec![
                    Value::Varchar(Some("Ada".into())),
                    Value::Varchar(Some("Lovelace".into())),
                ],
                vec![
                    Value::Varchar(Some("Grace".into())),
                    Value::Varchar(Some("Hopper".into())),
                ],
            ],
        )
    };

    // Extra columns without a policy fail.
    let mut executor = ScriptedExecutor::new().expect(two_column());
    let err = ds
        .from::<Employee>()
        .to_list::<String>(ListOptions::NONE)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedData(..)));

    let mut executor = ScriptedExecutor::new().expect(two_column());
    let firsts: Vec<String> = ds
        .from::<Employee>()
        .to_list(ListOptions::IGNORE_EXTRA_COLUMNS)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(firsts, ["Ada", "Grace"]);

    let mut executor = ScriptedExecutor::new().expect(two_column());
    let flat: Vec<String> = ds
        .from::<Employee>()
        .to_list(ListOptions::FLATTEN_EXTRA_COLUMNS)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(flat, ["Ada", "Lovelace", "Grace", "Hopper"]);

    // NULLs either fail the element type or are discarded.
    let with_null = || {
        rows(
            &["Title"],
            vec![
                vec![Value::Varchar(Some("Countess".into()))],
                vec![Value::Varchar(None)],
            ],
        )
    };
    let mut executor = ScriptedExecutor::new().expect(with_null());
    let err = ds
        .from::<Employee>()
        .select(["Title"])
        .to_list::<String>(ListOptions::NONE)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnexpectedData(..)));

    let mut executor = ScriptedExecutor::new().expect(with_null());
    let titles: Vec<String> = ds
        .from::<Employee>()
        .select(["Title"])
        .to_list(ListOptions::DISCARD_NULLS)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(titles, ["Countess"]);
}

#[tokio::test]
async fn table_buffers_untyped_and_converts_late() {
    init_logs();
    let ds = source();
    let mut executor = ScriptedExecutor::new().expect(rows(
        &EMPLOYEE_LABELS,
        vec![employee_row(&ada()), employee_row(&grace())],
    ));
    let table = ds
        .from::<Employee>()
        .to_table()
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.row(0).unwrap().get("LastName"),
        Some(&Value::Varchar(Some("Lovelace".into())))
    );
    assert_eq!(
        table.row(1).unwrap().require::<i32>("employeekey").unwrap(),
        2
    );
    let typed: Vec<Employee> = table.to_objects().unwrap();
    assert_eq!(typed, vec![ada(), grace()]);
}

/// Nested object bound from `prefix.column` labels.
#[derive(Debug, Clone, PartialEq)]
struct Customer {
    id: i64,
    name: String,
    address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq)]
struct Address {
    street: String,
    city: String,
}

impl Entity for Customer {
    fn object_name() -> ObjectName {
        ObjectName::parse("Customer")
    }

    fn columns() -> Vec<ColumnMetadata> {
        vec![
            ColumnMetadata::new("Id", Value::Int64(None)).key(),
            ColumnMetadata::new("Name", Value::Varchar(None)).not_null(),
            ColumnMetadata::new("address.Street", Value::Varchar(None)),
            ColumnMetadata::new("address.City", Value::Varchar(None)),
        ]
    }

    fn to_row(&self) -> Vec<(String, Value)> {
        vec![
            ("id".into(), Value::Int64(Some(self.id))),
            ("name".into(), Value::Varchar(Some(self.name.clone()))),
        ]
    }

    fn key(&self) -> Vec<Value> {
        vec![Value::Int64(Some(self.id))]
    }

    fn from_values(_values: &[Value]) -> Result<Self> {
        Err(Error::Mapping("Customer binds by label only".into()))
    }

    fn from_row(view: &RowView<'_>) -> Result<Self> {
        let address = view.scoped("address");
        Ok(Self {
            id: view.require("Id")?,
            name: view.require("Name")?,
            address: if address.has_values() {
                Some(Address {
                    street: address.require("Street")?,
                    city: address.require("City")?,
                })
            } else {
                None
            },
        })
    }
}

#[tokio::test]
async fn decomposition_binds_prefixed_labels() {
    init_logs();
    let ds = source();
    let labels = ["Id", "Name", "address.Street", "address.City"];
    let mut executor = ScriptedExecutor::new().expect(rows(
        &labels,
        vec![
            vec![
                Value::Int64(Some(1)),
                Value::Varchar(Some("Acme".into())),
                Value::Varchar(Some("1 Main St".into())),
                Value::Varchar(Some("Springfield".into())),
            ],
            // All-NULL prefix means an absent nested object.
            vec![
                Value::Int64(Some(2)),
                Value::Varchar(Some("Globex".into())),
                Value::Varchar(None),
                Value::Varchar(None),
            ],
        ],
    ));
    let customers: Vec<Customer> = ds
        .from::<Customer>()
        .to_collection(CollectionOptions::NONE)
        .unwrap()
        .execute(&mut executor, &cancel())
        .await
        .unwrap();
    assert_eq!(
        customers[0].address,
        Some(Address {
            street: "1 Main St".into(),
            city: "Springfield".into(),
        })
    );
    assert_eq!(customers[1].address, None);
}
