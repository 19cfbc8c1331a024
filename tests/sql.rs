#[cfg(test)]
mod tests {
    use indoc::indoc;
    use keel::{Predicate, Query, Select, Statement, TableRef, Value};
    use serde_json::json;

    #[test]
    fn rendered_query() {
        let translation = Predicate::parse(&json!({
            "$or": [{ "kind": "lion" }, { "kind": "tiger", "name": null }],
            "age": 7,
        }))
        .unwrap()
        .translate();
        let query = Query::new(
            Statement::Select(Select {
                table: TableRef::new("animals"),
                columns: Some(vec!["name".into()]),
                restriction: translation.restriction,
                limit: None,
            }),
            translation.params,
        );
        assert_eq!(
            query.to_string(),
            indoc! {r#"
                SELECT "name"
                FROM "animals"
                WHERE ("kind" = ?1 OR "kind" = ?2 AND "name" IS NULL) AND "age" = ?3;
            "#}
            .trim()
        );
        assert_eq!(
            query.params,
            [
                Value::from("lion"),
                Value::from("tiger"),
                Value::Int64(Some(7)),
            ]
        );
    }
}
