#[cfg(test)]
mod tests {
    use indoc::indoc;
    use keel_core::{
        Delete, GenericSqlWriter, Insert, Predicate, Query, Restriction, Select, SqlWriter,
        Statement, TableRef,
    };
    use serde_json::json;

    const WRITER: GenericSqlWriter = GenericSqlWriter::new();

    fn select(predicate: serde_json::Value, columns: Option<&[&str]>, limit: Option<u32>) -> String {
        let translation = Predicate::parse(&predicate).unwrap().translate();
        let mut out = String::new();
        WRITER.write_select(
            &mut out,
            &Select {
                table: TableRef::new("animals"),
                columns: columns.map(|v| v.iter().map(|v| v.to_string()).collect()),
                restriction: translation.restriction,
                limit,
            },
        );
        out
    }

    #[test]
    fn sql_select() {
        assert_eq!(
            select(json!({}), None, None),
            indoc! {r#"
                SELECT *
                FROM "animals"
                WHERE TRUE;
            "#}
            .trim()
        );
        assert_eq!(
            select(json!({ "name": "Winnie" }), Some(&["name", "age"]), Some(1)),
            indoc! {r#"
                SELECT "name", "age"
                FROM "animals"
                WHERE "name" = ?1
                LIMIT 1;
            "#}
            .trim()
        );
    }

    #[test]
    fn sql_select_precedence() {
        assert_eq!(
            select(
                json!({ "$or": [{ "kind": "lion" }, { "kind": "tiger" }], "age": 7 }),
                None,
                None
            ),
            indoc! {r#"
                SELECT *
                FROM "animals"
                WHERE ("kind" = ?1 OR "kind" = ?2) AND "age" = ?3;
            "#}
            .trim()
        );
        assert_eq!(
            select(
                json!({ "$or": [{ "kind": "lion" }, { "age": 3, "kind": "shark" }] }),
                None,
                None
            ),
            indoc! {r#"
                SELECT *
                FROM "animals"
                WHERE "kind" = ?1 OR "age" = ?2 AND "kind" = ?3;
            "#}
            .trim()
        );
        assert_eq!(
            select(json!({ "name": null }), None, None),
            indoc! {r#"
                SELECT *
                FROM "animals"
                WHERE "name" IS NULL;
            "#}
            .trim()
        );
    }

    #[test]
    fn sql_insert() {
        let mut out = String::new();
        WRITER.write_insert(
            &mut out,
            &Insert {
                table: TableRef::new("animals"),
                columns: vec!["kind".into(), "name".into(), "age".into()],
            },
        );
        assert_eq!(
            out,
            r#"INSERT INTO "animals" ("kind", "name", "age") VALUES (?1, ?2, ?3);"#
        );
        let mut out = String::new();
        WRITER.write_insert(
            &mut out,
            &Insert {
                table: TableRef::new("animals"),
                columns: vec![],
            },
        );
        assert_eq!(out, r#"INSERT INTO "animals" DEFAULT VALUES;"#);
    }

    #[test]
    fn sql_delete() {
        let statement = Statement::Delete(Delete {
            table: TableRef::new("animals"),
            restriction: Restriction::Never,
        });
        assert_eq!(
            statement.to_string(),
            indoc! {r#"
                DELETE FROM "animals"
                WHERE FALSE;
            "#}
            .trim()
        );
        assert!(statement.is_write());
    }

    #[test]
    fn sql_quoted_identifiers() {
        let mut out = String::new();
        WRITER.write_identifier_quoted(&mut out, r#"odd "name""#);
        assert_eq!(out, r#""odd ""name""""#);
    }

    #[test]
    fn query_display_truncated() {
        let columns: Vec<String> = (0..200).map(|i| format!("column_{i}")).collect();
        let query = Query::new(
            Statement::Insert(Insert {
                table: TableRef::new("wide"),
                columns,
            }),
            vec![],
        );
        let displayed = query.to_string();
        assert!(displayed.len() <= 500);
        assert!(displayed.ends_with("..."));
        assert!(displayed.starts_with(r#"INSERT INTO "wide""#));
    }
}
