use crate::{animals, silent_logs};
use keel::{Driver, ErrorKind, ModelInstance, Options, Pool, Predicate};
use serde_json::json;

fn names(instances: &[ModelInstance]) -> Vec<String> {
    let mut result: Vec<_> = instances
        .iter()
        .map(|v| v.try_get::<String>("name").unwrap())
        .collect();
    result.sort();
    result
}

pub async fn reads<D: Driver>(pool: &Pool<D>) {
    let animals = animals(pool).await;
    animals
        .save_many(
            [
                json!({ "kind": "bear", "name": "Winnie", "age": 95 }),
                json!({ "kind": "bear", "name": "Baloo", "age": 7 }),
                json!({ "kind": "lion", "name": "Simba", "age": 7 }),
                json!({ "kind": "tiger", "name": "Shere Khan", "age": 7 }),
                json!({ "kind": "tiger", "name": "Tigger" }),
            ],
            Options::new().multiple(true),
        )
        .await
        .expect("Failed to save the animals");

    // at
    let winnie = animals
        .at(json!({ "name": "Winnie" }), Options::new())
        .await
        .expect("Failed to read Winnie")
        .expect("Winnie must be found");
    assert_eq!(winnie.try_get::<String>("kind").unwrap(), "bear");
    assert_eq!(winnie.try_get::<i64>("age").unwrap(), 95);
    assert!(
        animals
            .at(json!({ "name": "Piglet" }), Options::new())
            .await
            .expect("A missing row is not an error")
            .is_none()
    );
    let bear = animals
        .at(json!({ "kind": "bear" }), Options::new())
        .await
        .unwrap()
        .expect("Some bear must be found");
    assert!(["Winnie", "Baloo"].contains(&bear.try_get::<String>("name").unwrap().as_str()));

    // all
    assert_eq!(
        animals.all(json!({}), Options::new()).await.unwrap().len(),
        5
    );
    let big_cats = animals
        .all(
            json!({ "$or": [{ "kind": "lion" }, { "kind": "tiger" }] }),
            Options::new(),
        )
        .await
        .expect("Failed to read the big cats");
    assert_eq!(names(&big_cats), ["Shere Khan", "Simba", "Tigger"]);
    let seven = animals
        .all(
            json!({ "$or": [{ "kind": "lion" }, { "kind": "tiger" }], "age": 7 }),
            Options::new(),
        )
        .await
        .unwrap();
    assert_eq!(names(&seven), ["Shere Khan", "Simba"]);
    let mixed = animals
        .all(
            json!({ "$or": [{ "kind": "bear", "age": 7 }, { "name": "Tigger" }] }),
            Options::new(),
        )
        .await
        .unwrap();
    assert_eq!(names(&mixed), ["Baloo", "Tigger"]);
    let typed = animals
        .all(
            Predicate::and([Predicate::eq("kind", "tiger"), Predicate::eq("age", 0)]),
            Options::new(),
        )
        .await
        .unwrap();
    assert_eq!(names(&typed), ["Tigger"]);
    assert!(
        animals
            .all(json!({ "kind": "unicorn" }), Options::new())
            .await
            .unwrap()
            .is_empty()
    );

    // Invalid predicates never reach the backend
    silent_logs! {
        for predicate in [
            json!({ "$not": [{ "kind": "bear" }] }),
            json!({ "$or": [] }),
            json!({ "kind": ["bear", "lion"] }),
        ] {
            let error = animals
                .all(&predicate, Options::new())
                .await
                .expect_err("The predicate must be rejected");
            assert_eq!(ErrorKind::of(&error), Some(ErrorKind::InvalidPredicate));
        }
        let error = animals
            .at(json!({ "$or": { "kind": "bear" } }), Options::new())
            .await
            .expect_err("The predicate must be rejected");
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::InvalidPredicate));
    }
}

pub async fn projections<D: Driver>(pool: &Pool<D>) {
    let animals = animals(pool).await;
    animals
        .save_many(
            [
                json!({ "kind": "lion", "name": "Simba", "age": 3 }),
                json!({ "kind": "lion", "name": "Nala", "age": 3 }),
                json!({ "kind": "warthog", "name": "Pumbaa", "age": 9 }),
            ],
            Options::new(),
        )
        .await
        .expect("Failed to save the animals");

    let lions = animals
        .all(
            json!({ "kind": "lion" }),
            Options::new().attributes(["name", "age"]),
        )
        .await
        .expect("Failed to read the lions");
    assert_eq!(lions.len(), 2);
    for lion in &lions {
        let fields: Vec<_> = lion.fields().map(|(k, _)| k).collect();
        assert_eq!(fields, ["name", "age"]);
        assert!(!lion.contains("kind"));
        assert!(lion.try_get::<String>("kind").is_err());
        assert_eq!(lion.try_get::<i64>("age").unwrap(), 3);
    }
    let pumbaa = animals
        .at(
            json!({ "name": "Pumbaa" }),
            Options::new().attributes(["kind"]),
        )
        .await
        .unwrap()
        .expect("Pumbaa must be found");
    assert_eq!(pumbaa.to_json(), json!({ "kind": "warthog" }));

    silent_logs! {
        let error = animals
            .all(json!({}), Options::new().attributes(["wings"]))
            .await
            .expect_err("An unknown attribute must be rejected");
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::Storage));
        let error = animals
            .all(json!({}), Options::new().attributes(Vec::<String>::new()))
            .await
            .expect_err("An empty projection must be rejected");
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::InvalidPredicate));
    }
}

pub async fn removals<D: Driver>(pool: &Pool<D>) {
    let animals = animals(pool).await;
    animals
        .save_many(
            [
                json!({ "kind": "hyena", "name": "Shenzi" }),
                json!({ "kind": "lion", "name": "Scar" }),
                json!({ "kind": "hyena", "name": "Banzai" }),
                json!({ "kind": "hyena", "name": "Ed" }),
            ],
            Options::new().multiple(true),
        )
        .await
        .expect("Failed to save the animals");

    let removed = animals
        .remove(json!({ "kind": "hyena" }), Options::new())
        .await
        .expect("Failed to remove the hyenas");
    assert_eq!(removed.rows_affected, 3);
    assert!(
        animals
            .all(json!({ "kind": "hyena" }), Options::new())
            .await
            .unwrap()
            .is_empty()
    );
    let removed = animals
        .remove(json!({ "kind": "hyena" }), Options::new())
        .await
        .unwrap();
    assert_eq!(removed.rows_affected, 0);

    silent_logs! {
        let error = animals
            .remove(json!({ "$or": [] }), Options::new())
            .await
            .expect_err("The predicate must be rejected");
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::InvalidPredicate));
    }
    assert_eq!(animals.all(json!({}), Options::new()).await.unwrap().len(), 1);

    let removed = animals
        .remove(json!({}), Options::new())
        .await
        .expect("Failed to remove everything");
    assert_eq!(removed.rows_affected, 1);
}
