//! Core of the tackle database access toolkit: fluent command builders
//! rendering dialect-specific parameterized SQL, a uniform executor
//! abstraction, and typed materialization of result rows.

mod appender;
mod audit;
mod cache;
mod command;
mod data_source;
mod dialect;
mod entity;
mod error;
mod events;
mod executor;
mod filter;
mod materializer;
mod metadata;
mod metadata_cache;
mod object_name;
mod options;
mod plan_cache;
mod row;
mod sql_builder;
mod table;
mod token;
mod util;
mod value;

pub use appender::*;
pub use audit::*;
pub use cache::*;
pub use command::*;
pub use data_source::*;
pub use dialect::*;
pub use entity::*;
pub use error::*;
pub use events::*;
pub use executor::*;
pub use filter::*;
pub use materializer::*;
pub use metadata::*;
pub use metadata_cache::*;
pub use object_name::*;
pub use options::*;
pub use plan_cache::*;
pub use row::*;
pub use sql_builder::*;
pub use table::*;
pub use token::*;
pub use util::*;
pub use value::*;
