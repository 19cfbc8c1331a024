use crate::animals;
use keel::{Driver, Options, Pool, PoolConnection};
use serde_json::json;
use std::time::Duration;

pub async fn shared_connection<D: Driver>(pool: &Pool<D>) {
    let animals = animals(pool).await;

    let (bugs, daffy) = pool
        .with_connection(async |connection: &mut PoolConnection<D>| {
            let bugs = animals
                .save(
                    json!({ "kind": "rabbit", "name": "bugs bunny" }),
                    Options::new().using(connection),
                )
                .await?;
            let daffy = animals
                .save(
                    json!({ "kind": "duck", "name": "daffy" }),
                    Options::new().using(connection),
                )
                .await?;
            Ok((bugs, daffy))
        })
        .await
        .expect("Failed to save on a shared connection");
    assert_eq!(bugs.try_get::<i64>("age").unwrap(), 0);
    assert_eq!(daffy.try_get::<i64>("age").unwrap(), 0);
    assert_eq!(pool.status().in_use, 0);

    // The task failure is returned and the connection released all the same
    let result = pool
        .with_connection(async |connection: &mut PoolConnection<D>| {
            animals
                .save(
                    json!({ "kind": "duck", "name": "daffy" }),
                    Options::new().using(connection),
                )
                .await
        })
        .await;
    assert!(result.is_err());
    assert_eq!(pool.status().in_use, 0);

    let found = pool
        .with_connection(async |connection: &mut PoolConnection<D>| {
            animals
                .all(
                    json!({ "$or": [{ "kind": "rabbit" }, { "kind": "duck" }] }),
                    Options::new().using(connection),
                )
                .await
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 2);

    let daffy_again = pool
        .with_connection(async |connection: &mut PoolConnection<D>| {
            animals
                .at(json!({ "name": "daffy" }), Options::new().using(connection))
                .await
        })
        .await
        .expect("Failed to read on a shared connection")
        .expect("Daffy must be found");
    assert_eq!(daffy_again, daffy);
    assert_eq!(pool.status().in_use, 0);
}

pub async fn concurrent_saves<D: Driver>(pool: &Pool<D>) {
    let animals = animals(pool).await;
    let total = pool.config().max_connections * 3;
    let tasks: Vec<_> = (0..total)
        .map(|i| {
            let animals = animals.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis((i % 3) as u64)).await;
                animals
                    .save(
                        json!({ "kind": "ant", "name": format!("ant {i}") }),
                        Options::new(),
                    )
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await
            .expect("The task panicked")
            .expect("Failed to save concurrently");
    }
    let status = pool.status();
    assert!(status.size <= pool.config().max_connections);
    assert_eq!(status.in_use, 0);
    let ants = animals
        .all(json!({ "kind": "ant" }), Options::new())
        .await
        .expect("Failed to read the ants");
    assert_eq!(ants.len(), total);
}
