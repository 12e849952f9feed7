//! End-to-end tests for the load pipeline.
//!
//! Each test writes a synthetic extractor output pair into a temp dir,
//! runs a full load, and inspects the resulting rows through a separate
//! connection.

use std::path::PathBuf;

use callmap::db::Database;
use callmap::error::LoadError;
use callmap::{run_load, LoadConfig, ANNOTATION_FILE_SUFFIX};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    config: LoadConfig,
}

impl Fixture {
    /// Write an input pair plus one fake jar, referenced as jar 1.
    fn new(input: &str, annotations: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let jar_path = dir.path().join("lib.jar");
        std::fs::write(&jar_path, b"fake jar bytes").unwrap();

        let input_file = dir.path().join("callgraph.txt");
        let input = format!("J#1 {}\n{}", jar_path.display(), input);
        std::fs::write(&input_file, input).unwrap();

        let annotation_file = dir
            .path()
            .join(format!("callgraph.txt{}", ANNOTATION_FILE_SUFFIX));
        std::fs::write(&annotation_file, annotations).unwrap();

        let config = LoadConfig {
            app_name: "myapp".to_string(),
            input_file: input_file.display().to_string(),
            db_path: dir.path().join("callmap.db").display().to_string(),
            ..Default::default()
        };
        Fixture { dir, config }
    }

    fn db_path(&self) -> PathBuf {
        self.dir.path().join("callmap.db")
    }

    fn open_db(&self) -> Database {
        Database::open(self.db_path(), &self.config.app_name).unwrap()
    }

    fn raw_conn(&self) -> rusqlite::Connection {
        rusqlite::Connection::open(self.db_path()).unwrap()
    }
}

const INPUT: &str = "\
C#com.a.Foo com.b.Baz
C#com.a.Foo com.b.Baz

C#com.a.Dup com.b.Dup
M#7 com.a.Foo.bar()V (INTERFACE)com.b.Baz.qux()I 42 1
M#8 com.a.Dup.run()V (VIRTUAL)com.b.Baz.qux()I 10 1
M#9 com.a.Foo.bar()V (VIRTUAL)com.a.Foo.bar()V 11 1
L#7 com.a.Foo.lambda$0()V java.util.stream.Stream.collect(Lc;)Lo;
L#8 com.a.Dup.lambda$1()V
X#future record kind, ignored
";

const ANNOTATIONS: &str = "\
A#com.a.Foo.bar()V @Transactional
A#com.a.Foo.bar()V @Deprecated

A#com.b.Baz.qux()I @Override
";

#[test]
fn end_to_end_load() {
    let fixture = Fixture::new(INPUT, ANNOTATIONS);
    let db = fixture.open_db();

    let stats = run_load(&db, &fixture.config, &mut []).unwrap();

    // Duplicate class reference lines dedup to one record per name.
    assert_eq!(stats.classes, 4);
    assert_eq!(stats.jars, 1);
    assert_eq!(stats.annotations, 3);
    assert_eq!(stats.method_calls, 2);
    assert_eq!(stats.lambda_infos, 2);
    assert_eq!(stats.recursive_dropped, 1);
    assert_eq!(stats.filtered, 0);

    let conn = fixture.raw_conn();

    // The reference method call decodes field for field.
    let (call_type, caller_line, caller_jar): (String, u32, u32) = conn
        .query_row(
            "SELECT call_type, caller_line_num, caller_jar_num FROM method_call_myapp WHERE call_id = 7",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(call_type, "INTERFACE");
    assert_eq!(caller_line, 42);
    assert_eq!(caller_jar, 1);

    // The recursive call id 9 was never written.
    let recursive: u32 = conn
        .query_row(
            "SELECT COUNT(*) FROM method_call_myapp WHERE call_id = 9",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(recursive, 0);

    // Dup is ambiguous across com.a and com.b, so its display name is the
    // full class name; Foo is unique, so it stays simple.
    let caller_display: String = conn
        .query_row(
            "SELECT caller_class_name FROM method_call_myapp WHERE call_id = 8",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(caller_display, "com.a.Dup");
    let foo_display: String = conn
        .query_row(
            "SELECT caller_class_name FROM method_call_myapp WHERE call_id = 7",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(foo_display, "Foo");

    // Three-field lambda record classifies its stream terminal.
    let (next_method, is_stream, is_terminal): (String, bool, bool) = conn
        .query_row(
            "SELECT next_method_name, next_is_stream, next_is_terminal \
             FROM lambda_method_info_myapp WHERE call_id = 7",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(next_method, "collect");
    assert!(is_stream);
    assert!(is_terminal);

    // Two-field lambda record stores NULLs, not false flags.
    let next_is_null: bool = conn
        .query_row(
            "SELECT next_is_stream IS NULL AND next_is_intermediate IS NULL \
             AND next_is_terminal IS NULL AND next_full_method IS NULL \
             FROM lambda_method_info_myapp WHERE call_id = 8",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(next_is_null);

    // Jar metadata records the real content hash and path.
    let jar_hash: String = conn
        .query_row(
            "SELECT jar_hash FROM jar_info_myapp WHERE jar_num = 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(jar_hash.len(), 64);

    // Both annotations of the same method landed as separate rows.
    let bar_annotations: u32 = conn
        .query_row(
            "SELECT COUNT(*) FROM method_annotation_myapp WHERE full_method = 'com.a.Foo.bar()V'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(bar_annotations, 2);
}

#[test]
fn rerun_truncates_and_reloads() {
    let fixture = Fixture::new(INPUT, ANNOTATIONS);
    let db = fixture.open_db();

    let first = run_load(&db, &fixture.config, &mut []).unwrap();
    let second = run_load(&db, &fixture.config, &mut []).unwrap();
    assert_eq!(first.classes, second.classes);
    assert_eq!(first.method_calls, second.method_calls);

    let conn = fixture.raw_conn();
    let calls: u64 = conn
        .query_row("SELECT COUNT(*) FROM method_call_myapp", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(calls, second.method_calls);
}

#[test]
fn package_filtering_drops_foreign_records() {
    let fixture = Fixture::new(INPUT, ANNOTATIONS);
    let mut config = fixture.config.clone();
    config.filter_packages = true;
    config.allowed_prefixes = vec!["com.a.".to_string()];
    let db = fixture.open_db();

    let stats = run_load(&db, &config, &mut []).unwrap();

    // Only com.a.* class names survive.
    assert_eq!(stats.classes, 2);
    // Every method call has a com.b.* callee, so all are filtered; the
    // recursive com.a call is still recognized as recursive first.
    assert_eq!(stats.method_calls, 0);
    assert_eq!(stats.filtered, 2);
    assert_eq!(stats.recursive_dropped, 1);
    // The com.b annotation is dropped.
    assert_eq!(stats.annotations, 2);
}

#[test]
fn missing_jar_file_aborts_the_run() {
    // A repeated jar ordinal is last-write-wins, so this remaps jar 1 to
    // a path that does not exist.
    let input = format!("{}J#1 /nonexistent/lib.jar\n", INPUT);
    let fixture = Fixture::new(&input, ANNOTATIONS);

    let db = fixture.open_db();
    let err = run_load(&db, &fixture.config, &mut []).unwrap_err();
    assert!(matches!(err, LoadError::MissingResource(_)));
}

#[test]
fn malformed_method_call_aborts_the_pass() {
    let fixture = Fixture::new("C#com.a.Foo com.b.Baz\nM#7 too few fields\n", ANNOTATIONS);

    let db = fixture.open_db();
    let err = run_load(&db, &fixture.config, &mut []).unwrap_err();
    assert!(matches!(err, LoadError::MalformedRecord { .. }));
}

#[test]
fn missing_annotation_sibling_aborts_the_run() {
    let fixture = Fixture::new(INPUT, ANNOTATIONS);
    std::fs::remove_file(
        fixture
            .dir
            .path()
            .join(format!("callgraph.txt{}", ANNOTATION_FILE_SUFFIX)),
    )
    .unwrap();

    let db = fixture.open_db();
    let err = run_load(&db, &fixture.config, &mut []).unwrap_err();
    assert!(matches!(err, LoadError::MissingResource(_)));
}
