use crate::{animals, silent_logs};
use keel::{Driver, ErrorKind, Options, Pool, Record, Value};
use serde_json::json;

pub async fn saves<D: Driver>(pool: &Pool<D>) {
    let animals = animals(pool).await;

    // Defaults
    let bugs = animals
        .save(json!({ "kind": "rabbit", "name": "bugs bunny" }), Options::new())
        .await
        .expect("Failed to save bugs bunny");
    assert_eq!(bugs.model(), "animals");
    assert_eq!(bugs.try_get::<i64>("age").unwrap(), 0);
    assert_eq!(bugs.try_get::<String>("kind").unwrap(), "rabbit");
    assert_eq!(bugs.try_get::<String>("name").unwrap(), "bugs bunny");
    let bugs_id = bugs
        .try_get::<i64>("id")
        .expect("The identity must be assigned by the backend");
    let names: Vec<_> = bugs.fields().map(|(k, _)| k).collect();
    assert_eq!(names, ["id", "kind", "name", "age"]);

    // Explicit values win over defaults
    let winnie = animals
        .save(
            Record::new()
                .with("kind", "bear")
                .with("name", "Winnie")
                .with("age", 95),
            Options::new(),
        )
        .await
        .expect("Failed to save Winnie");
    assert_eq!(winnie.try_get::<i32>("age").unwrap(), 95);
    assert_ne!(winnie.try_get::<i64>("id").unwrap(), bugs_id);

    // Explicit NULL
    let nameless = animals
        .save(json!({ "kind": "ant", "name": null }), Options::new())
        .await
        .expect("Failed to save a nameless ant");
    assert!(nameless.get("name").unwrap().is_null());
    assert_eq!(nameless.try_get::<Option<String>>("name").unwrap(), None);

    // The instance matches what is stored
    let stored = animals
        .at(json!({ "name": "Winnie" }), Options::new())
        .await
        .expect("Failed to read Winnie")
        .expect("Winnie was not stored");
    assert_eq!(stored, winnie);
    assert_eq!(
        stored.to_json(),
        json!({
            "id": winnie.try_get::<i64>("id").unwrap(),
            "kind": "bear",
            "name": "Winnie",
            "age": 95,
        })
    );

    // A NULL identity is assigned by the backend
    let piglet = animals
        .save(
            json!({ "id": null, "kind": "pig", "name": "Piglet" }),
            Options::new(),
        )
        .await
        .expect("Failed to save Piglet");
    let piglet_id = piglet
        .try_get::<i64>("id")
        .expect("The identity must be assigned by the backend");
    assert!(![bugs_id, winnie.try_get::<i64>("id").unwrap()].contains(&piglet_id));
    let stored = animals
        .at(json!({ "name": "Piglet" }), Options::new())
        .await
        .expect("Failed to read Piglet")
        .expect("Piglet was not stored");
    assert_eq!(stored, piglet);

    // Storage failures
    silent_logs! {
        let error = animals
            .save(json!({ "kind": "rabbit", "name": "bugs bunny" }), Options::new())
            .await
            .expect_err("A duplicate name must be rejected");
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::Storage));
        let error = animals
            .save(json!({ "kind": "bird", "wings": 2 }), Options::new())
            .await
            .expect_err("An unknown field must be rejected");
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::Storage));
    }
    assert!(
        animals
            .save(json!(["not", "a", "record"]), Options::new())
            .await
            .is_err()
    );
    let count = animals
        .all(json!({}), Options::new())
        .await
        .expect("Failed to read the animals")
        .len();
    assert_eq!(count, 4);
    assert_eq!(
        animals
            .at(json!({ "name": "bugs bunny" }), Options::new())
            .await
            .unwrap()
            .and_then(|v| v.get("age").cloned()),
        Some(Value::Int64(Some(0)))
    );
}
