mod as_value;
mod connection;
mod driver;
mod error;
mod model;
mod model_instance;
mod pool;
mod predicate;
mod query;
mod record;
mod schema;
mod sql_writer;
mod statement;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use model::*;
pub use model_instance::*;
pub use pool::*;
pub use predicate::*;
pub use query::*;
pub use record::*;
pub use schema::*;
pub use sql_writer::*;
pub use statement::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
