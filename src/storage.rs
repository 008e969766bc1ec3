//! Storage Module
//!
//! テーブルストア（リレーショナルデータベース）への読み書きを抽象化するモジュール。
//!
//! エクスポートは`TableSource`、インポートは`TableSink`のみに依存します。
//! `SqliteStore`は`rusqlite::Connection`を借用して両方を実装します。
//! トランザクションの管理は呼び出し側の責務です。

use crate::api::TableConflict;
use crate::error::XlsxLiteError;
use crate::names::quote_identifier;
use crate::types::{Cell, ColumnInfo, StoredValue};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;

/// テーブルの読み出し機能（エクスポート側）
pub trait TableSource {
    /// ユーザーテーブルの一覧を作成順に返す
    fn list_tables(&self) -> Result<Vec<String>, XlsxLiteError>;

    /// テーブルのカラム一覧を宣言順に返す
    ///
    /// テーブルが存在しない場合は空のリストを返します。
    fn columns_of(&self, table: &str) -> Result<Vec<ColumnInfo>, XlsxLiteError>;

    /// テーブルの全行を走査し、各行を`visitor`に渡す
    ///
    /// `visitor`がエラーを返した場合は走査を中断し、そのエラーを返します。
    fn scan(
        &self,
        table: &str,
        visitor: &mut dyn FnMut(&[StoredValue]) -> Result<(), XlsxLiteError>,
    ) -> Result<(), XlsxLiteError>;
}

/// テーブルの書き込み機能（インポート側）
pub trait TableSink {
    /// テーブルを作成する
    ///
    /// `columns`が空の場合は、主キーのみを持つテーブルを作成します。
    fn create_table(&mut self, table: &str, columns: &[String]) -> Result<(), XlsxLiteError>;

    /// 1行を挿入する
    fn insert_row(&mut self, table: &str, values: &[Cell]) -> Result<(), XlsxLiteError>;
}

/// SQLiteによるテーブルストア
///
/// # 使用例
///
/// ```rust,no_run
/// use rusqlite::Connection;
/// use xlsxlite::{SqliteStore, TableSource};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let conn = Connection::open("data.db")?;
/// let store = SqliteStore::new(&conn);
/// for table in store.list_tables()? {
///     println!("{}", table);
/// }
/// # Ok(())
/// # }
/// ```
pub struct SqliteStore<'c> {
    conn: &'c Connection,
    conflict: TableConflict,
    /// このストアで作成したテーブルのカラム
    created: HashMap<String, Vec<String>>,
}

impl<'c> SqliteStore<'c> {
    /// 接続を借用してストアを生成
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            conflict: TableConflict::default(),
            created: HashMap::new(),
        }
    }

    /// 既存テーブルとの衝突時の扱いを指定する
    pub fn with_conflict(mut self, conflict: TableConflict) -> Self {
        self.conflict = conflict;
        self
    }
}

impl TableSource for SqliteStore<'_> {
    fn list_tables(&self) -> Result<Vec<String>, XlsxLiteError> {
        let map_err = |e: rusqlite::Error| XlsxLiteError::storage("sqlite_master", "list tables", e);

        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND substr(name, 1, 7) <> 'sqlite_' \
                 ORDER BY rowid",
            )
            .map_err(map_err)?;
        let rows = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .map_err(map_err)?;

        let mut tables = Vec::new();
        for name in rows {
            tables.push(name.map_err(map_err)?);
        }
        Ok(tables)
    }

    fn columns_of(&self, table: &str) -> Result<Vec<ColumnInfo>, XlsxLiteError> {
        let map_err = |e: rusqlite::Error| XlsxLiteError::storage(table, "read columns", e);

        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(map_err)?;
        let rows = stmt
            .query_map(params![table], |r| {
                Ok(ColumnInfo {
                    name: r.get(0)?,
                    declared_type: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
                })
            })
            .map_err(map_err)?;

        let mut columns = Vec::new();
        for column in rows {
            columns.push(column.map_err(map_err)?);
        }
        Ok(columns)
    }

    fn scan(
        &self,
        table: &str,
        visitor: &mut dyn FnMut(&[StoredValue]) -> Result<(), XlsxLiteError>,
    ) -> Result<(), XlsxLiteError> {
        let map_err = |e: rusqlite::Error| XlsxLiteError::storage(table, "scan rows", e);

        let sql = format!("SELECT * FROM {}", quote_identifier(table));
        let mut stmt = self.conn.prepare(&sql).map_err(map_err)?;
        let width = stmt.column_count();
        let mut rows = stmt.query([]).map_err(map_err)?;

        let mut values = Vec::with_capacity(width);
        while let Some(row) = rows.next().map_err(map_err)? {
            values.clear();
            for i in 0..width {
                let value = match row.get_ref(i).map_err(map_err)? {
                    ValueRef::Null => StoredValue::Null,
                    ValueRef::Integer(n) => StoredValue::Integer(n),
                    ValueRef::Real(f) => StoredValue::Real(f),
                    ValueRef::Text(bytes) => {
                        StoredValue::Text(String::from_utf8_lossy(bytes).into_owned())
                    }
                    ValueRef::Blob(bytes) => StoredValue::Blob(bytes.to_vec()),
                };
                values.push(value);
            }
            visitor(&values)?;
        }
        Ok(())
    }
}

impl TableSink for SqliteStore<'_> {
    fn create_table(&mut self, table: &str, columns: &[String]) -> Result<(), XlsxLiteError> {
        let quoted_table = quote_identifier(table);

        if self.conflict == TableConflict::Replace {
            self.conn
                .execute(&format!("DROP TABLE IF EXISTS {}", quoted_table), [])
                .map_err(|e| XlsxLiteError::storage(table, "drop table", e))?;
        }

        let definition = if columns.is_empty() {
            "rowid INTEGER PRIMARY KEY".to_string()
        } else {
            columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let if_not_exists = match self.conflict {
            TableConflict::Append => "IF NOT EXISTS ",
            _ => "",
        };
        let sql = format!(
            "CREATE TABLE {}{} ({})",
            if_not_exists, quoted_table, definition
        );

        self.conn
            .execute(&sql, [])
            .map_err(|e| XlsxLiteError::storage(table, "create table", e))?;
        log::debug!("created table {} with {} column(s)", quoted_table, columns.len());

        self.created.insert(table.to_string(), columns.to_vec());
        Ok(())
    }

    fn insert_row(&mut self, table: &str, values: &[Cell]) -> Result<(), XlsxLiteError> {
        let placeholders = (1..=values.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = match self.created.get(table) {
            Some(columns) if columns.len() == values.len() => format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_identifier(table),
                columns
                    .iter()
                    .map(|c| quote_identifier(c))
                    .collect::<Vec<_>>()
                    .join(", "),
                placeholders
            ),
            _ => format!(
                "INSERT INTO {} VALUES ({})",
                quote_identifier(table),
                placeholders
            ),
        };

        let mut stmt = self
            .conn
            .prepare_cached(&sql)
            .map_err(|e| XlsxLiteError::storage(table, "insert row", e))?;
        stmt.execute(params_from_iter(values.iter().map(infer_value)))
            .map_err(|e| XlsxLiteError::storage(table, "insert row", e))?;
        Ok(())
    }
}

/// セル値を格納用の値に変換する（格納時の型推論）
///
/// - `Number`: `i64`として解釈できれば整数、有限の`f64`として解釈できれば実数、それ以外は文字列
/// - `Boolean`: 整数の0/1
/// - `Text`: 文字列
/// - `Null`: NULL
fn infer_value(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Boolean(b) => Value::Integer(i64::from(*b)),
        Cell::Text(s) => Value::Text(s.clone()),
        Cell::Number(raw) => {
            let trimmed = raw.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                Value::Integer(n)
            } else {
                match trimmed.parse::<f64>() {
                    Ok(f) if f.is_finite() => Value::Real(f),
                    _ => Value::Text(raw.clone()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE zeta (id INTEGER, name TEXT);
             CREATE TABLE alpha (v REAL, b BLOB);
             INSERT INTO zeta VALUES (1, 'one'), (2, NULL);
             INSERT INTO alpha VALUES (1.5, x'CAFE');",
        )
        .unwrap();
        conn
    }

    // テーブル一覧が作成順で返されることのテスト
    #[test]
    fn test_list_tables_creation_order() {
        let conn = setup();
        let store = SqliteStore::new(&conn);
        assert_eq!(store.list_tables().unwrap(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_columns_of() {
        let conn = setup();
        let store = SqliteStore::new(&conn);

        let columns = store.columns_of("zeta").unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[0].declared_type, "INTEGER");
        assert_eq!(columns[1].name, "name");

        assert!(store.columns_of("ghost").unwrap().is_empty());
    }

    #[test]
    fn test_scan_typed_values() {
        let conn = setup();
        let store = SqliteStore::new(&conn);

        let mut rows = Vec::new();
        store
            .scan("zeta", &mut |values| {
                rows.push(values.to_vec());
                Ok(())
            })
            .unwrap();
        assert_eq!(
            rows,
            vec![
                vec![StoredValue::Integer(1), StoredValue::Text("one".to_string())],
                vec![StoredValue::Integer(2), StoredValue::Null],
            ]
        );

        let mut alpha = Vec::new();
        store
            .scan("alpha", &mut |values| {
                alpha.push(values.to_vec());
                Ok(())
            })
            .unwrap();
        assert_eq!(
            alpha[0],
            vec![StoredValue::Real(1.5), StoredValue::Blob(vec![0xCA, 0xFE])]
        );
    }

    #[test]
    fn test_scan_unknown_table_is_storage_error() {
        let conn = setup();
        let store = SqliteStore::new(&conn);
        let result = store.scan("ghost", &mut |_| Ok(()));
        match result {
            Err(XlsxLiteError::Storage { table, operation, .. }) => {
                assert_eq!(table, "ghost");
                assert_eq!(operation, "scan rows");
            }
            other => panic!("Expected Storage error, got {:?}", other),
        }
    }

    // 格納時の型推論のテスト
    #[test]
    fn test_create_and_insert_with_inference() {
        let conn = Connection::open_in_memory().unwrap();
        let mut store = SqliteStore::new(&conn);
        let columns = vec!["a b".to_string(), "q\"uote".to_string(), "c".to_string(), "d".to_string()];
        store.create_table("my table", &columns).unwrap();
        store
            .insert_row(
                "my table",
                &[
                    Cell::Number("42".to_string()),
                    Cell::Number("3.25".to_string()),
                    Cell::Boolean(true),
                    Cell::Null,
                ],
            )
            .unwrap();
        store
            .insert_row(
                "my table",
                &[
                    Cell::Text("007".to_string()),
                    Cell::Number("n/a".to_string()),
                    Cell::Boolean(false),
                    Cell::Text("x".to_string()),
                ],
            )
            .unwrap();

        let types: Vec<(String, String, String, String)> = conn
            .prepare(
                "SELECT typeof(\"a b\"), typeof(\"q\"\"uote\"), typeof(c), typeof(d) \
                 FROM \"my table\" ORDER BY rowid",
            )
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(
            types[0],
            ("integer".to_string(), "real".to_string(), "integer".to_string(), "null".to_string())
        );
        assert_eq!(
            types[1],
            ("text".to_string(), "text".to_string(), "integer".to_string(), "text".to_string())
        );
    }

    #[test]
    fn test_create_table_without_columns() {
        let conn = Connection::open_in_memory().unwrap();
        let mut store = SqliteStore::new(&conn);
        store.create_table("Empty", &[]).unwrap();

        let columns = store.columns_of("Empty").unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].name, "rowid");
    }

    #[test]
    fn test_table_conflict_modes() {
        let conn = setup();
        let cols = vec!["id".to_string(), "name".to_string()];

        // Append: 既存テーブルをそのまま使う
        let mut store = SqliteStore::new(&conn);
        store.create_table("zeta", &cols).unwrap();
        store
            .insert_row("zeta", &[Cell::Number("3".to_string()), Cell::Null])
            .unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM zeta", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 3);

        // Fail: 既存テーブルがあればエラー
        let mut store = SqliteStore::new(&conn).with_conflict(TableConflict::Fail);
        assert!(matches!(
            store.create_table("zeta", &cols),
            Err(XlsxLiteError::Storage { .. })
        ));

        // Replace: 作り直す
        let mut store = SqliteStore::new(&conn).with_conflict(TableConflict::Replace);
        store.create_table("zeta", &cols).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM zeta", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
