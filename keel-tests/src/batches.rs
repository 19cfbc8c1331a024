use crate::{animals, silent_logs};
use keel::{Driver, ErrorKind, Options, Pool};
use serde_json::json;

pub async fn independent_batches<D: Driver>(pool: &Pool<D>) {
    let animals = animals(pool).await;

    let lions = animals
        .save_many(
            [
                json!({ "kind": "lion", "name": "Simba", "age": 3 }),
                json!({ "kind": "lion", "name": "Nala", "age": 3 }),
                json!({ "kind": "lion", "name": "Mufasa" }),
            ],
            Options::new(),
        )
        .await
        .expect("Failed to save the lions");
    assert_eq!(lions.len(), 3);
    assert_eq!(lions.failures(), 0);
    let lions = lions.into_instances().unwrap();
    let names: Vec<_> = lions
        .iter()
        .map(|v| v.try_get::<String>("name").unwrap())
        .collect();
    assert_eq!(names, ["Simba", "Nala", "Mufasa"]);
    assert_eq!(lions[2].try_get::<i64>("age").unwrap(), 0);

    // Each record stands on its own
    let batch = silent_logs! {
        animals
            .save_many(
                [
                    json!({ "kind": "hyena", "name": "Shenzi" }),
                    json!({ "kind": "lion", "name": "Simba" }),
                    json!({ "kind": "hyena", "name": "Banzai" }),
                ],
                Options::new(),
            )
            .await
            .expect("A non atomic batch reports failures per record")
    };
    assert_eq!(batch.len(), 3);
    assert_eq!(batch.failures(), 1);
    let results = batch.results();
    assert!(results[0].is_ok());
    assert_eq!(
        ErrorKind::of(results[1].as_ref().unwrap_err()),
        Some(ErrorKind::Storage)
    );
    assert!(results[2].is_ok());
    assert!(batch.into_instances().is_err());
    let hyenas = animals
        .all(json!({ "kind": "hyena" }), Options::new())
        .await
        .expect("Failed to read the hyenas");
    assert_eq!(hyenas.len(), 2);

    // Empty batch
    let empty = animals
        .save_many(Vec::<serde_json::Value>::new(), Options::new())
        .await
        .expect("An empty batch succeeds");
    assert!(empty.is_empty());
}

pub async fn atomic_batches<D: Driver>(pool: &Pool<D>) {
    let animals = animals(pool).await;

    let fish = animals
        .save_many(
            [
                json!({ "kind": "fish", "name": "Nemo" }),
                json!({ "kind": "fish", "name": "Dory" }),
                json!({ "kind": "fish", "name": "Marlin", "age": 8 }),
            ],
            Options::new().multiple(true),
        )
        .await
        .expect("Failed to save the fish")
        .into_instances()
        .expect("Every fish must be saved");
    let names: Vec<_> = fish
        .iter()
        .map(|v| v.try_get::<String>("name").unwrap())
        .collect();
    assert_eq!(names, ["Nemo", "Dory", "Marlin"]);
    assert!(fish.iter().all(|v| v.try_get::<i64>("id").is_ok()));

    // One failure rolls back the whole batch
    let error = silent_logs! {
        animals
            .save_many(
                [
                    json!({ "kind": "fish", "name": "Gill" }),
                    json!({ "kind": "fish", "name": "Bloat" }),
                    json!({ "kind": "fish", "name": "Nemo" }),
                ],
                Options::new().multiple(true),
            )
            .await
            .expect_err("The duplicate Nemo must abort the batch")
    };
    assert_eq!(ErrorKind::of(&error), Some(ErrorKind::TransactionAborted));
    let stored = animals
        .all(json!({ "kind": "fish" }), Options::new())
        .await
        .expect("Failed to read the fish");
    assert_eq!(stored.len(), 3);
    assert!(
        animals
            .at(json!({ "name": "Gill" }), Options::new())
            .await
            .unwrap()
            .is_none()
    );

    // The connection used by the aborted batch is still usable
    let squirt = animals
        .save(json!({ "kind": "turtle", "name": "Squirt" }), Options::new())
        .await
        .expect("Failed to save after an aborted batch");
    assert_eq!(squirt.try_get::<String>("kind").unwrap(), "turtle");
    assert_eq!(pool.status().in_use, 0);

    // Atomic batch on a caller-held connection
    let mut connection = pool.acquire().await.expect("Could not acquire a connection");
    animals
        .save_many(
            [
                json!({ "kind": "shark", "name": "Bruce" }),
                json!({ "kind": "shark", "name": "Anchor" }),
            ],
            Options::new().multiple(true).using(&mut connection),
        )
        .await
        .expect("Failed to save the sharks")
        .into_instances()
        .unwrap();
    let sharks = animals
        .all(json!({ "kind": "shark" }), Options::new().using(&mut connection))
        .await
        .unwrap();
    assert_eq!(sharks.len(), 2);
    connection.release();
}
