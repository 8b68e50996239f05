//! Executor behaviour against the in-memory recording driver.
//!
//! These tests drive full query specs through an [`Executor`] and check
//! what reached the driver: SQL text, bind order, execution counts and
//! transaction boundaries.

use crudkit_common::{Dialect, Entity, ErrorCode, Record, Value};
use crudkit_exec::driver::TransactionEvent;
use crudkit_exec::{Executor, MemoryConnection, Outcome};
use crudkit_query::{BindData, Carrier, QuerySpec};
use crudkit_test::utils::{init_tracing, record_errors, record_sql, user_schema, User};

fn setup(dialect: Dialect) -> (Executor<MemoryConnection>, MemoryConnection) {
    init_tracing();
    let conn = MemoryConnection::new();
    (Executor::new(conn.clone(), dialect), conn)
}

fn users() -> QuerySpec {
    QuerySpec::new(user_schema()).unwrap()
}

fn param_names(conn: &MemoryConnection, idx: usize) -> Vec<String> {
    conn.executions()[idx]
        .params
        .iter()
        .map(|p| p.name.clone())
        .collect()
}

// =============================================================================
// Rendering through the executor
// =============================================================================

#[test]
fn test_insert_binds_in_column_order_without_key() {
    let (mut exec, conn) = setup(Dialect::MySql);
    let record = Record::new()
        .with("id", 99)
        .with("email", "ada@example.com")
        .with("name", "Ada")
        .with("age", 36);

    let outcome = exec
        .execute(&users().insert_object(&record).unwrap().return_insert_id(true))
        .unwrap();

    assert_eq!(outcome.insert_id(), Some(&Value::Integer(1)));
    assert_eq!(
        conn.prepared_sql(),
        vec!["INSERT INTO user (email,name,age) VALUES (:email,:name,:age)"]
    );
    assert_eq!(param_names(&conn, 0), vec!["email", "name", "age"]);
}

#[test]
fn test_insert_with_explicit_key() {
    let (mut exec, conn) = setup(Dialect::MySql);
    let record = Record::new().with("id", 99).with("name", "Ada");

    exec.execute(&users().insert_object_with_key(&record).unwrap())
        .unwrap();

    assert_eq!(
        conn.prepared_sql(),
        vec!["INSERT INTO user (id,name) VALUES (:id,:name)"]
    );
    assert_eq!(conn.executions()[0].param("id"), Some(&Value::Integer(99)));
}

#[test]
fn test_update_against_reference() {
    let (mut exec, conn) = setup(Dialect::MySql);
    let before = Record::new().with("id", 5).with("name", "Ada").with("age", 36);

    let unchanged = before.clone().with("age", "36");
    assert!(users()
        .update_object_against(&unchanged, &before)
        .unwrap()
        .is_none());

    let renamed = before.clone().with("name", "Ada L.");
    let spec = users()
        .update_object_against(&renamed, &before)
        .unwrap()
        .unwrap()
        .return_affected_count(true);
    let outcome = exec.execute(&spec).unwrap();

    assert_eq!(outcome.affected(), Some(1));
    assert_eq!(
        conn.prepared_sql(),
        vec!["UPDATE user SET name=:name WHERE id=:id"]
    );
    assert_eq!(param_names(&conn, 0), vec!["name", "id"]);
}

#[test]
fn test_missing_filter_and_data() {
    let (mut exec, conn) = setup(Dialect::MySql);

    exec.execute(&users().select("*").return_multiple_rows(true))
        .unwrap();
    assert_eq!(conn.prepared_sql(), vec!["SELECT * FROM user"]);

    let update = users().update("name", None);
    let err = exec.execute(&update).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidSpec);

    let err = exec.execute(&users().delete()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidSpec);
    assert_eq!(conn.prepare_count(), 1);
}

#[test]
fn test_primary_key_default_filter() {
    let (mut exec, conn) = setup(Dialect::MySql);

    exec.execute(&users().select("name,email").with_data(Value::from("7")))
        .unwrap();
    exec.execute(&users().delete().with_data(Value::from(7)))
        .unwrap();
    exec.execute(
        &users()
            .update("name", None)
            .with_data(Record::new().with("id", 7).with("name", "x")),
    )
    .unwrap();

    assert_eq!(
        conn.prepared_sql(),
        vec![
            "SELECT name,email FROM user WHERE id=:id",
            "DELETE FROM user WHERE id=:id",
            "UPDATE user SET name=:name WHERE id=:id",
        ]
    );
    assert_eq!(param_names(&conn, 0), vec!["id"]);
    assert_eq!(param_names(&conn, 1), vec!["id"]);
    assert_eq!(conn.executions()[0].param("id"), Some(&Value::Integer(7)));
}

#[test]
fn test_limit_per_dialect() {
    for (dialect, rows, page) in [
        (Dialect::MySql, "LIMIT 10", "LIMIT 10,20"),
        (Dialect::Postgres, "LIMIT 10", "LIMIT 10 OFFSET 20"),
        (Dialect::Sqlite, "LIMIT 10", "LIMIT 10 OFFSET 20"),
    ] {
        let (mut exec, conn) = setup(dialect);
        exec.execute(&users().select("*").return_multiple_rows(true).limit(10))
            .unwrap();
        exec.execute(
            &users()
                .select("*")
                .return_multiple_rows(true)
                .limit_offset(10, 20),
        )
        .unwrap();

        let prepared = conn.prepared_sql();
        assert_eq!(prepared[0], format!("SELECT * FROM user {}", rows));
        assert_eq!(prepared[1], format!("SELECT * FROM user {}", page));
    }
}

#[test]
fn test_no_where_conflict() {
    let (mut exec, conn) = setup(Dialect::MySql);

    let spec = users()
        .delete()
        .no_where(true)
        .append_where("AND age > :age", "age");
    assert!(exec.execute(&spec).unwrap_err().is_spec_error());

    let cleared = users()
        .delete()
        .where_sql("age > 3")
        .no_where(true)
        .return_affected_count(true);
    assert_eq!(exec.execute(&cleared).unwrap().affected(), Some(1));
    assert_eq!(conn.prepared_sql(), vec!["DELETE FROM user"]);
}

#[test]
fn test_positional_values_pack_into_filter_fields() {
    let (mut exec, conn) = setup(Dialect::MySql);
    let spec = users()
        .select("name")
        .return_multiple_rows(true)
        .where_clause("age > :lo AND age < :hi", "lo,hi")
        .with_data(vec![Value::from(18), Value::from(65)]);

    exec.execute(&spec).unwrap();

    let execution = &conn.executions()[0];
    assert_eq!(conn.execution_count(), 1);
    assert_eq!(execution.param("lo"), Some(&Value::from("18")));
    assert_eq!(execution.param("hi"), Some(&Value::from("65")));
}

#[test]
fn test_duplicate_positional_names_rejected() {
    let (mut exec, conn) = setup(Dialect::MySql);
    let spec = users()
        .select("name")
        .where_sql("age > :age AND age < :age")
        .with_positional_data(vec![Value::from(1), Value::from(2)], "age,age");

    assert!(exec.execute(&spec).unwrap_err().is_spec_error());
    assert_eq!(conn.prepare_count(), 0);
}

// =============================================================================
// Statement cache
// =============================================================================

#[test]
fn test_identical_sql_prepared_once() {
    let (mut exec, conn) = setup(Dialect::MySql);
    let first = users().select("name").with_data(Value::from(1));
    let second = users().select(" name ").with_data(Value::from(2));

    exec.execute(&first).unwrap();
    exec.execute(&second).unwrap();

    assert_eq!(conn.prepare_count(), 1);
    let stats = exec.cache_stats().unwrap();
    assert_eq!(stats.inserts, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(exec.cached_statement_count(), 1);
}

#[test]
fn test_differing_fragments_cached_separately() {
    let (mut exec, conn) = setup(Dialect::MySql);
    exec.execute(&users().select("*").where_sql("age > 3")).unwrap();
    exec.execute(&users().select("*").where_sql("age>3")).unwrap();

    assert_eq!(conn.prepare_count(), 2);
    assert_eq!(exec.cached_statement_count(), 2);
}

// =============================================================================
// Batches
// =============================================================================

#[test]
fn test_batch_executes_in_input_order() {
    let (mut exec, conn) = setup(Dialect::MySql);
    let names = ["a", "b", "c"];
    let records: Vec<Record> = names
        .iter()
        .map(|n| Record::new().with("name", *n).with("age", 20))
        .collect();

    let outcome = exec
        .execute(&users().insert_objects(records).unwrap().return_insert_id(true))
        .unwrap();

    let results = outcome.into_batch();
    assert_eq!(results.len(), 3);
    assert_eq!(
        results,
        vec![
            Outcome::InsertId(Value::Integer(1)),
            Outcome::InsertId(Value::Integer(2)),
            Outcome::InsertId(Value::Integer(3)),
        ]
    );
    assert_eq!(conn.prepare_count(), 1);
    let bound: Vec<Value> = conn
        .executions()
        .iter()
        .filter_map(|e| e.param("name").cloned())
        .collect();
    assert_eq!(bound, names.map(Value::from).to_vec());
}

#[test]
fn test_heterogeneous_batch_rejected_before_execution() {
    let (mut exec, conn) = setup(Dialect::MySql);
    let mut items: Vec<Carrier> = ["a", "b", "c"]
        .iter()
        .map(|n| Record::new().with("name", *n).into())
        .collect();
    items.push(Value::from("d").into());

    let spec = users().insert("name").with_data(BindData::Batch(items));
    let err = exec.execute(&spec).unwrap_err();

    assert!(err.is_spec_error());
    assert_eq!(conn.prepare_count(), 0);
    assert_eq!(conn.execution_count(), 0);
}

#[test]
fn test_batch_update_by_key() {
    let (mut exec, conn) = setup(Dialect::MySql);
    let records = vec![
        Record::new().with("id", 1).with("name", "a"),
        Record::new().with("id", 2).with("name", "b"),
    ];

    let outcome = exec
        .execute(&users().update_objects(records).unwrap().return_affected_count(true))
        .unwrap();

    assert_eq!(
        outcome.into_batch(),
        vec![Outcome::Affected(1), Outcome::Affected(1)]
    );
    let ids: Vec<Value> = conn
        .executions()
        .iter()
        .filter_map(|e| e.param("id").cloned())
        .collect();
    assert_eq!(ids, vec![Value::Integer(1), Value::Integer(2)]);
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_compile_reset_recompile() {
    let mut spec = users()
        .select("name")
        .where_fields("age")
        .order_by("name")
        .limit(5)
        .with_data(Record::new().with("age", 30));
    let first = spec.compile(Dialect::MySql).unwrap();
    let again = spec.compile(Dialect::MySql).unwrap();
    assert_eq!(first, again);

    spec.reset();
    assert!(spec.compile(Dialect::MySql).is_err());

    let rebuilt = spec
        .select("name")
        .where_fields("age")
        .order_by("name")
        .limit(5)
        .with_data(Record::new().with("age", 30));
    assert_eq!(rebuilt.compile(Dialect::MySql).unwrap(), first);
}

// =============================================================================
// Transactions and observers
// =============================================================================

#[test]
fn test_transaction_counters() {
    let (mut exec, conn) = setup(Dialect::MySql);

    exec.execute(&users().delete().with_data(Value::from(1)))
        .unwrap();
    assert_eq!(exec.transaction_sql_count(), 0);

    exec.run_in_transaction(|exec| {
        exec.execute(&users().select("*").with_data(Value::from(1)))?;
        exec.execute(&users().delete().with_data(Value::from(1)))?;
        exec.execute(&users().insert_objects(vec![
            Record::new().with("name", "a"),
            Record::new().with("name", "b"),
        ])?)?;
        Ok(())
    })
    .unwrap();

    assert_eq!(exec.transaction_sql_count(), 3);
    assert_eq!(exec.transaction_cud_sql_count(), 2);
    assert_eq!(
        conn.transaction_events(),
        vec![TransactionEvent::Begin, TransactionEvent::Commit]
    );
}

#[test]
fn test_observers_see_sql_params_and_errors() {
    let (mut exec, conn) = setup(Dialect::MySql);
    let sql_log = record_sql(&mut exec);
    let error_log = record_errors(&mut exec);

    let user = User::new("Ada", 36);
    let insert = QuerySpec::for_entity::<User>()
        .unwrap()
        .insert_object(&user.to_record())
        .unwrap();
    exec.execute(&insert).unwrap();

    conn.fail_execute("DELETE FROM user WHERE id=:id", "database is locked");
    assert!(exec.execute(&users().delete().with_data(Value::from(1))).is_err());

    let sql_log = sql_log.lock();
    let messages: Vec<&str> = sql_log.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "INSERT INTO user (name,age) VALUES (:name,:age)",
            "name=Ada; age=36",
            "DELETE FROM user WHERE id=:id",
            "id=1",
            "execution failed: database is locked",
        ]
    );
    assert_ne!(sql_log[0].1, sql_log[2].1);
    assert_eq!(sql_log[2].1, sql_log[4].1);

    let error_log = error_log.lock();
    assert_eq!(error_log.len(), 1);
    assert_eq!(error_log[0], (ErrorCode::ExecutionFailed, sql_log[4].1.clone()));
}

#[test]
fn test_raw_sql_reuses_binding() {
    let (mut exec, conn) = setup(Dialect::Sqlite);
    let sql_log = record_sql(&mut exec);

    let outcome = exec
        .execute_raw(
            "  UPDATE user SET age = age + 1 WHERE age > :age  ",
            Record::new().with("age", "30"),
            "age",
            "age",
        )
        .unwrap();

    assert_eq!(outcome.affected(), Some(1));
    assert_eq!(exec.last_sql(), "UPDATE user SET age = age + 1 WHERE age > :age");
    assert_eq!(conn.executions()[0].param("age"), Some(&Value::Integer(30)));
    assert_eq!(
        sql_log.lock()[0].0,
        "UPDATE user SET age = age + 1 WHERE age > :age (manual)"
    );
}
