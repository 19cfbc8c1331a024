mod batches;
mod pool;
mod reads;
mod saves;

use crate::{
    batches::{atomic_batches, independent_batches},
    pool::{concurrent_saves, shared_connection},
    reads::{projections, reads, removals},
    saves::saves,
};
use keel::{Driver, Model, Options, Pool, Schema};
use log::LevelFilter;
use serde_json::json;
use std::env;

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

/// Name of the collection the suite works on. Drivers must provide it with the
/// columns `id` (integer identity), `kind`, `name` (unique) and `age`.
pub const ANIMALS: &str = "animals";

pub fn animals_schema() -> Schema {
    Schema::new()
        .identity("id")
        .field("kind")
        .field("name")
        .field_with_default("age", 0)
}

pub(crate) async fn animals<D: Driver>(pool: &Pool<D>) -> Model<D> {
    let animals = Model::define(pool, ANIMALS, animals_schema());
    animals
        .remove(json!({}), Options::new())
        .await
        .expect("Failed to clear the animals collection");
    animals
}

pub async fn execute_tests<D: Driver>(pool: Pool<D>) {
    saves(&pool).await;
    independent_batches(&pool).await;
    atomic_batches(&pool).await;
    reads(&pool).await;
    projections(&pool).await;
    removals(&pool).await;
    shared_connection(&pool).await;
    concurrent_saves(&pool).await;
    let status = pool.status();
    assert_eq!(status.in_use, 0, "Every connection must be back in the pool");
    assert!(status.size <= status.max_connections);
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        let result = { $($code)+ };
        log::set_max_level(level);
        result
    }};
}
