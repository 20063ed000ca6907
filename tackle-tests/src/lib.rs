//! Shared fixtures: a scripted executor standing in for a live database, and
//! a couple of entities mapped the way an application would map them.

use futures::{Stream, stream};
use log::LevelFilter;
use std::{collections::VecDeque, env, time::Duration};
use tackle::{
    AsValue, BindPlan, CancellationToken, ColumnMetadata, CommandKind, Entity, Error,
    ExecutionToken, Executor, LockKind, ObjectName, Parameter, QueryResult, Result, RowLabeled,
    RowNames, RowView, RowsAffected, Value,
};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// What a scripted run replays, one item per cursor poll.
pub enum ScriptItem {
    Row(RowLabeled),
    Affected(RowsAffected),
    Boundary,
    Fail(String),
}

impl ScriptItem {
    fn into_result(self) -> Result<QueryResult> {
        match self {
            ScriptItem::Row(row) => Ok(QueryResult::Row(row)),
            ScriptItem::Affected(affected) => Ok(QueryResult::Affected(affected)),
            ScriptItem::Boundary => Ok(QueryResult::SetBoundary),
            ScriptItem::Fail(message) => Err(Error::Backend(anyhow::anyhow!(message))),
        }
    }
}

pub type Script = Vec<ScriptItem>;

pub fn rows(labels: &[&str], data: Vec<Vec<Value>>) -> Script {
    let labels: RowNames = labels.iter().map(|s| s.to_string()).collect();
    data.into_iter()
        .map(|values| ScriptItem::Row(RowLabeled::new(labels.clone(), values.into_boxed_slice())))
        .collect()
}

pub fn affected(rows_affected: u64, last_affected_id: Option<i64>) -> Script {
    vec![ScriptItem::Affected(RowsAffected {
        rows_affected,
        last_affected_id,
    })]
}

/// Everything worth asserting about a statement that reached the executor.
#[derive(Debug, Clone)]
pub struct RecordedCommand {
    pub operation: String,
    pub sql: String,
    pub parameters: Vec<Parameter>,
    pub kind: CommandKind,
    pub lock: LockKind,
    pub timeout: Option<Duration>,
}

/// Executor replaying queued scripts in order while recording every token it
/// receives.
#[derive(Default)]
pub struct ScriptedExecutor {
    pub commands: Vec<RecordedCommand>,
    replies: VecDeque<Script>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(mut self, script: Script) -> Self {
        self.replies.push_back(script);
        self
    }

    pub fn push(&mut self, script: Script) {
        self.replies.push_back(script);
    }

    pub fn last_command(&self) -> &RecordedCommand {
        self.commands.last().expect("no command was executed")
    }
}

impl Executor for ScriptedExecutor {
    fn run(
        &mut self,
        token: &ExecutionToken,
        _cancel: &CancellationToken,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.commands.push(RecordedCommand {
            operation: token.operation.to_string(),
            sql: token.sql.clone(),
            parameters: token.parameters.clone(),
            kind: token.kind,
            lock: token.lock,
            timeout: token.timeout,
        });
        let script = self.replies.pop_front().unwrap_or_default();
        stream::iter(script.into_iter().map(ScriptItem::into_result))
    }
}

fn value_at(values: &[Value], index: usize) -> Result<Value> {
    values.get(index).cloned().ok_or_else(|| {
        Error::Mapping(format!("positional value {index} is missing"))
    })
}

/// Identity-keyed entity used across the suite.
#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub employee_key: i32,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
}

impl Entity for Employee {
    fn object_name() -> ObjectName {
        ObjectName::parse("hr.Employee")
    }

    fn columns() -> Vec<ColumnMetadata> {
        vec![
            ColumnMetadata::new("EmployeeKey", Value::Int32(None))
                .key()
                .identity(),
            ColumnMetadata::new("FirstName", Value::Varchar(None)).not_null(),
            ColumnMetadata::new("LastName", Value::Varchar(None)).not_null(),
            ColumnMetadata::new("Title", Value::Varchar(None)),
        ]
    }

    fn to_row(&self) -> Vec<(String, Value)> {
        vec![
            ("employee_key".into(), self.employee_key.as_value()),
            ("first_name".into(), self.first_name.clone().as_value()),
            ("last_name".into(), self.last_name.clone().as_value()),
            ("title".into(), self.title.clone().as_value()),
        ]
    }

    fn key(&self) -> Vec<Value> {
        vec![self.employee_key.as_value()]
    }

    fn from_values(values: &[Value]) -> Result<Self> {
        Ok(Self {
            employee_key: i32::try_from_value(value_at(values, 0)?)?,
            first_name: String::try_from_value(value_at(values, 1)?)?,
            last_name: String::try_from_value(value_at(values, 2)?)?,
            title: Option::<String>::try_from_value(value_at(values, 3)?)?,
        })
    }

    fn from_row(view: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            employee_key: view.require("EmployeeKey")?,
            first_name: view.require("FirstName")?,
            last_name: view.require("LastName")?,
            title: view.require("Title")?,
        })
    }

    fn constructor() -> Option<BindPlan<Self>> {
        Some(BindPlan {
            columns: vec![
                "EmployeeKey".into(),
                "FirstName".into(),
                "LastName".into(),
                "Title".into(),
            ],
            build: Self::from_values,
        })
    }
}

pub fn ada() -> Employee {
    Employee {
        employee_key: 1,
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        title: Some("Countess".into()),
    }
}

pub fn grace() -> Employee {
    Employee {
        employee_key: 2,
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        title: None,
    }
}

pub fn employee_row(employee: &Employee) -> Vec<Value> {
    vec![
        employee.employee_key.as_value(),
        employee.first_name.clone().as_value(),
        employee.last_name.clone().as_value(),
        employee.title.clone().as_value(),
    ]
}

pub const EMPLOYEE_LABELS: [&str; 4] = ["EmployeeKey", "FirstName", "LastName", "Title"];

/// Natural-key entity, the upsert fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    pub name: String,
    pub value: String,
}

impl Entity for Setting {
    fn object_name() -> ObjectName {
        ObjectName::parse("Setting")
    }

    fn columns() -> Vec<ColumnMetadata> {
        vec![
            ColumnMetadata::new("Name", Value::Varchar(None)).key(),
            ColumnMetadata::new("Value", Value::Varchar(None)).not_null(),
        ]
    }

    fn to_row(&self) -> Vec<(String, Value)> {
        vec![
            ("name".into(), self.name.clone().as_value()),
            ("value".into(), self.value.clone().as_value()),
        ]
    }

    fn key(&self) -> Vec<Value> {
        vec![self.name.clone().as_value()]
    }

    fn from_values(values: &[Value]) -> Result<Self> {
        Ok(Self {
            name: String::try_from_value(value_at(values, 0)?)?,
            value: String::try_from_value(value_at(values, 1)?)?,
        })
    }

    fn from_row(view: &RowView<'_>) -> Result<Self> {
        Ok(Self {
            name: view.require("Name")?,
            value: view.require("Value")?,
        })
    }
}
