//! Tests for Engine
//!
//! These tests verify:
//! - Lazy initialization and configuration merging
//! - Direct get/set with auto-increment keys
//! - Every action reachable through an address
//! - Read cache bound and invalidation
//! - The raise/return-`Failed` error policy and the error log
//! - Concurrent writers from independent engines

use std::fs;
use std::thread;

use linekv::config::{Config, Options};
use linekv::engine::Engine;
use linekv::protocol::{Reply, Window};
use linekv::{LineKvError, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine(databases: &[&str]) -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path(), databases.iter().copied()).unwrap();
    (temp_dir, engine)
}

fn setup_raising_engine(databases: &[&str]) -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let mut builder = Config::builder().path(temp_dir.path()).raise_errors(true);
    for name in databases {
        builder = builder.database(*name);
    }
    (temp_dir, Engine::new(builder.build()))
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_lazy_init_requires_path() {
    let engine = Engine::default();

    assert!(!engine.is_ready());
    let result = engine.count("default");
    assert!(matches!(result, Err(LineKvError::Config(_))));
    assert!(!engine.is_ready());
    assert_eq!(engine.errors().len(), 1);
}

#[test]
fn test_init_leaves_no_probe_file() {
    let (temp_dir, engine) = setup_temp_engine(&["default"]);
    assert!(engine.is_ready());

    let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".linekv_probe_"))
        .collect();
    assert!(leftovers.is_empty(), "Found {:?}", leftovers);
}

#[test]
fn test_init_rejects_non_directory() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("plain.txt");
    fs::write(&file_path, b"x").unwrap();

    let engine = Engine::new(Config::builder().path(&file_path).database("db").build());
    let err = engine.count("db").unwrap_err();

    assert!(matches!(err, LineKvError::Config(_)));
    assert!(err.to_string().contains("is not a directory"));
}

#[test]
fn test_init_happens_on_first_operation() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::new(Config::default());

    engine.configure(Options::new().path(temp_dir.path()).create(["db"]));
    assert!(!engine.is_ready());

    assert_eq!(engine.count("db").unwrap(), 0);
    assert!(engine.is_ready());
    assert!(temp_dir.path().join("db.dat").is_file());
}

#[test]
fn test_configure_merges_and_returns_config() {
    let engine = Engine::default();

    let config = engine.configure(Options::new().ext(".kv").gzip(true).create(["a", "b"]));
    assert_eq!(config.ext, ".kv");
    assert!(config.gzip);
    assert!(config.is_registered("a"));
    assert!(!config.raise_errors);

    let config = engine.configure(Options::new().create_also(["c"]));
    assert!(config.is_registered("a") && config.is_registered("c"));

    let config = engine.configure(Options::new().create(["z"]));
    assert!(!config.is_registered("a"));
    assert!(config.is_registered("z"));
}

#[test]
fn test_configure_from_pairs_ignores_unknown_names() {
    let options = Options::from_pairs([
        ("gzip", "true"),
        ("create", "one, two"),
        ("colour", "blue"),
    ])
    .unwrap();

    let engine = Engine::default();
    let config = engine.configure(options);

    assert!(config.gzip);
    assert!(config.is_registered("one") && config.is_registered("two"));
    assert!(Options::from_pairs([("errors", "maybe")]).is_err());
}

#[test]
fn test_path_is_frozen_after_init() {
    let (temp, engine) = setup_temp_engine(&["db"]);
    let other = TempDir::new().unwrap();

    let config = engine.configure(Options::new().path(other.path()));

    assert_eq!(config.path.as_deref(), Some(temp.path()));
    engine.insert("db", "x").unwrap();
    assert!(temp.path().join("db.dat").is_file());
    assert!(!other.path().join("db.dat").exists());
}

#[test]
fn test_unregistered_database() {
    let (_temp, engine) = setup_temp_engine(&["db"]);

    let result = engine.execute("other.1", Some(Value::from("x")));
    assert!(matches!(result, Err(LineKvError::DatabaseNotRegistered(ref n)) if n == "other"));
    assert!(engine.database_path("other").is_some());
    assert!(!engine.database_path("other").unwrap().exists());
}

// =============================================================================
// Get / Set Tests
// =============================================================================

#[test]
fn test_insert_then_get() {
    let (_temp, engine) = setup_temp_engine(&["default"]);

    assert_eq!(engine.set("default", "1", "test value").unwrap(), "1");
    assert_eq!(engine.get("default", "1").unwrap(), Value::from("test value"));
}

#[test]
fn test_set_through_address_echoes_key() {
    let (_temp, engine) = setup_temp_engine(&["default"]);

    let reply = engine.execute("default.name", Some(Value::from("ada"))).unwrap();
    assert_eq!(reply, Reply::Key("name".to_string()));

    let reply = engine.execute("default.name", None).unwrap();
    assert_eq!(reply, Reply::Value(Value::from("ada")));
}

#[test]
fn test_insert_is_exclusive() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    engine.set("default", "1", "original").unwrap();

    let result = engine.set("default", "1", "replacement");

    assert!(matches!(result, Err(LineKvError::KeyAlreadyExists(_))));
    assert_eq!(engine.get("default", "1").unwrap(), Value::from("original"));
    assert_eq!(engine.count("default").unwrap(), 1);
}

#[test]
fn test_auto_increment() {
    let (_temp, engine) = setup_temp_engine(&["default"]);

    for expected in ["1", "2", "3"] {
        let reply = engine.execute("default", Some(Value::from("v"))).unwrap();
        assert_eq!(reply, Reply::Key(expected.to_string()));
    }

    assert_eq!(engine.keys("default").unwrap(), vec!["1", "2", "3"]);
    assert_eq!(engine.execute("default:max", None).unwrap(), Reply::Number(3));
}

#[test]
fn test_auto_key_without_value_is_a_miss() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    engine.insert("default", "v").unwrap();

    let result = engine.execute("default", None);
    assert!(matches!(result, Err(LineKvError::KeyNotFound(ref k)) if k == "default.2"));
}

#[test]
fn test_get_missing_key() {
    let (_temp, engine) = setup_temp_engine(&["default"]);

    let err = engine.get("default", "404").unwrap_err();
    assert!(err.is_key_not_found());
    assert_eq!(engine.last_error(), Some(err.to_string()));
}

#[test]
fn test_structured_values() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    let value = Value::Map(vec![
        ("id".to_string(), Value::Int(1)),
        ("scores".to_string(), Value::List(vec![Value::Float(1.5), Value::Float(2.0)])),
    ]);

    let key = engine.insert("default", value.clone()).unwrap();
    assert_eq!(engine.get("default", &key).unwrap(), value);
}

#[test]
fn test_invalid_addresses_are_logged() {
    let (_temp, engine) = setup_temp_engine(&["default"]);

    assert!(matches!(engine.execute("default.a-b", None), Err(LineKvError::InvalidAddress(_))));
    assert!(matches!(engine.get("default", "a:b"), Err(LineKvError::InvalidAddress(_))));
    assert!(matches!(engine.count("de.fault"), Err(LineKvError::InvalidAddress(_))));
    assert!(matches!(engine.execute("default:nope", None), Err(LineKvError::UnknownAction(_))));
    assert_eq!(engine.errors().len(), 4);
}

// =============================================================================
// Action Tests
// =============================================================================

#[test]
fn test_count_key_keys_actions() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    engine.set("default", "a", 1).unwrap();
    engine.set("default", "b", 2).unwrap();

    assert_eq!(engine.execute("default:count", None).unwrap(), Reply::Number(2));
    assert_eq!(engine.execute("default.a:key", None).unwrap(), Reply::Bool(true));
    assert_eq!(engine.execute("default.z:key", None).unwrap(), Reply::Bool(false));
    assert_eq!(
        engine.execute("default:keys", None).unwrap(),
        Reply::Keys(vec!["a".to_string(), "b".to_string()])
    );
    assert!(engine.has_key("default", "b").unwrap());
}

#[test]
fn test_update_action() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    for i in 1..=3 {
        engine.insert("default", i).unwrap();
    }

    let reply = engine.execute("default.2:update", Some(Value::from("two"))).unwrap();

    assert_eq!(reply, Reply::Done);
    assert_eq!(engine.keys("default").unwrap(), vec!["1", "2", "3"]);
    assert_eq!(engine.get("default", "2").unwrap(), Value::from("two"));
    assert_eq!(engine.get("default", "3").unwrap(), Value::Int(3));
}

#[test]
fn test_update_without_value() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    engine.insert("default", 1).unwrap();

    let result = engine.execute("default.1:update", None);
    assert!(matches!(result, Err(LineKvError::UnsupportedType(_))));
}

#[test]
fn test_delete_action() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    for i in 1..=3 {
        engine.insert("default", i).unwrap();
    }

    assert_eq!(engine.execute("default.2:delete", None).unwrap(), Reply::Done);
    assert_eq!(engine.keys("default").unwrap(), vec!["1", "3"]);
}

#[test]
fn test_mutating_missing_key_leaves_file_identical() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    for i in 1..=3 {
        engine.insert("default", i).unwrap();
    }
    let path = engine.database_path("default").unwrap();
    let before = fs::read(&path).unwrap();

    assert!(matches!(engine.delete("default", "7"), Err(LineKvError::KeyNotFound(_))));
    assert!(matches!(engine.update("default", "7", 0), Err(LineKvError::KeyNotFound(_))));

    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn test_select_actions() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    for i in 1..=10 {
        engine.insert("default", i * 10).unwrap();
    }

    let window = Value::List(vec![Value::Int(3), Value::Int(2)]);
    let reply = engine.execute("default:select", Some(window)).unwrap();
    assert_eq!(
        reply,
        Reply::Records(vec![
            ("4".to_string(), Value::Int(40)),
            ("5".to_string(), Value::Int(50)),
        ])
    );

    let limit = Value::List(vec![Value::Int(2)]);
    match engine.execute("default:select", Some(limit)).unwrap() {
        Reply::Records(records) => assert_eq!(records.len(), 2),
        other => panic!("Expected records, got {:?}", other),
    }

    assert_eq!(engine.select("default", None).unwrap().len(), 10);
    assert_eq!(engine.select("default", Some(Window::new(8, 5))).unwrap().len(), 2);
}

#[test]
fn test_select_with_malformed_window_returns_nothing() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    for i in 1..=3 {
        engine.insert("default", i).unwrap();
    }

    for arg in [Value::Int(1), Value::List(vec![]), Value::from("all")] {
        assert_eq!(
            engine.execute("default:select", Some(arg)).unwrap(),
            Reply::Records(vec![])
        );
    }
    assert!(engine.errors().is_empty());

    match engine.execute("default:select", None).unwrap() {
        Reply::Records(records) => assert_eq!(records.len(), 3),
        other => panic!("Expected records, got {:?}", other),
    }
}

#[test]
fn test_drop_action_and_recreate() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    engine.insert("default", "v").unwrap();
    let path = engine.database_path("default").unwrap();

    assert_eq!(engine.execute("default:drop", None).unwrap(), Reply::Done);
    assert!(!path.exists());

    // Next access lazily recreates an empty database
    assert_eq!(engine.count("default").unwrap(), 0);
    assert!(path.exists());
}

#[test]
fn test_error_actions() {
    let (_temp, engine) = setup_temp_engine(&["default"]);

    assert_eq!(engine.execute("default:error", None).unwrap(), Reply::LastError(None));

    let _ = engine.get("default", "missing");
    let _ = engine.execute("nowhere:count", None);

    let errors = engine.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("default.missing"));
    assert!(errors[1].contains("nowhere"));

    // Readable without the database being registered
    assert_eq!(
        engine.execute("anything:error", None).unwrap(),
        Reply::LastError(Some(errors[1].clone()))
    );
    assert_eq!(engine.execute("anything:errors", None).unwrap(), Reply::Errors(errors));
}

// =============================================================================
// Cache Tests
// =============================================================================

#[test]
fn test_get_populates_cache() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    engine.set("default", "k", "v").unwrap();

    assert!(!engine.is_cached("default", "k"));
    engine.get("default", "k").unwrap();
    assert!(engine.is_cached("default", "k"));

    // Queries never touch the cache
    engine.select("default", None).unwrap();
    assert_eq!(engine.cached_len(), 1);
}

#[test]
fn test_cache_hit_skips_file() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    engine.set("default", "k", "cached").unwrap();
    engine.get("default", "k").unwrap();

    // Another writer rewrites the file behind our back
    let path = engine.database_path("default").unwrap();
    fs::write(&path, b"").unwrap();

    assert_eq!(engine.get("default", "k").unwrap(), Value::from("cached"));
}

#[test]
fn test_cache_bound() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    for i in 1..=31 {
        engine.insert("default", i).unwrap();
    }
    for i in 1..=31 {
        engine.get("default", &i.to_string()).unwrap();
    }

    assert_eq!(engine.cached_len(), 30);
    assert!(!engine.is_cached("default", "1"));
    assert!(engine.is_cached("default", "31"));
}

#[test]
fn test_update_and_delete_invalidate() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    engine.set("default", "a", "old").unwrap();
    engine.set("default", "b", "keep").unwrap();
    engine.get("default", "a").unwrap();
    engine.get("default", "b").unwrap();

    engine.update("default", "a", "new").unwrap();
    assert!(!engine.is_cached("default", "a"));
    assert_eq!(engine.get("default", "a").unwrap(), Value::from("new"));

    engine.delete("default", "a").unwrap();
    assert!(!engine.is_cached("default", "a"));
    assert!(engine.get("default", "a").unwrap_err().is_key_not_found());
    assert!(engine.is_cached("default", "b"));
}

#[test]
fn test_drop_clears_whole_cache() {
    let (_temp, engine) = setup_temp_engine(&["a", "b"]);
    engine.set("a", "1", "x").unwrap();
    engine.set("b", "1", "y").unwrap();
    engine.get("a", "1").unwrap();
    engine.get("b", "1").unwrap();
    assert_eq!(engine.cached_len(), 2);

    engine.drop_database("a").unwrap();

    assert_eq!(engine.cached_len(), 0);
    assert!(!engine.is_cached("b", "1"));
    assert_eq!(engine.get("b", "1").unwrap(), Value::from("y"));
}

// =============================================================================
// Error Policy Tests
// =============================================================================

#[test]
fn test_call_returns_failed_when_not_raising() {
    let (_temp, engine) = setup_temp_engine(&["default"]);

    let reply = engine.call("default.missing", None).unwrap();

    assert_eq!(reply, Reply::Failed);
    assert!(reply.is_failed());
    assert!(engine.last_error().unwrap().contains("does not exist"));
}

#[test]
fn test_call_raises_when_configured() {
    let (_temp, engine) = setup_raising_engine(&["default"]);

    let result = engine.call("default.missing", None);

    assert!(matches!(result, Err(LineKvError::KeyNotFound(_))));
    assert_eq!(engine.errors().len(), 1);
}

#[test]
fn test_raise_can_be_toggled() {
    let (_temp, engine) = setup_temp_engine(&["default"]);

    assert_eq!(engine.call("default:bogus", None).unwrap(), Reply::Failed);
    engine.configure(Options::new().errors(true));
    assert!(engine.call("default:bogus", None).is_err());
    assert_eq!(engine.errors().len(), 2);
}

#[test]
fn test_successful_call_passes_through() {
    let (_temp, engine) = setup_raising_engine(&["default"]);

    assert_eq!(
        engine.call("default", Some(Value::from("x"))).unwrap(),
        Reply::Key("1".to_string())
    );
}

// =============================================================================
// Gzip Tests
// =============================================================================

#[test]
fn test_engine_with_gzip() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(temp_dir.path())
        .database("zipped")
        .gzip(true)
        .build();
    let engine = Engine::new(config);

    for i in 1..=5 {
        engine.insert("zipped", format!("row {}", i)).unwrap();
    }
    engine.update("zipped", "3", "changed").unwrap();
    engine.delete("zipped", "1").unwrap();

    assert!(temp_dir.path().join("zipped.dat.gz").is_file());
    assert_eq!(engine.keys("zipped").unwrap(), vec!["2", "3", "4", "5"]);
    assert_eq!(engine.get("zipped", "3").unwrap(), Value::from("changed"));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_updates_from_independent_engines() {
    let temp_dir = TempDir::new().unwrap();
    let seed = Engine::open_path(temp_dir.path(), ["shared"]).unwrap();
    for t in 0..4 {
        seed.set("shared", &t.to_string(), 0).unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let path = temp_dir.path().to_path_buf();
            thread::spawn(move || {
                // Separate engines: no shared in-process state, only file locks
                let engine = Engine::open_path(&path, ["shared"]).unwrap();
                for round in 1..=15 {
                    engine.update("shared", &t.to_string(), round).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let check = Engine::open_path(temp_dir.path(), ["shared"]).unwrap();
    assert_eq!(check.keys("shared").unwrap(), vec!["0", "1", "2", "3"]);
    for t in 0..4 {
        assert_eq!(check.get("shared", &t.to_string()).unwrap(), Value::Int(15));
    }
}

#[test]
fn test_concurrent_auto_inserts_get_unique_keys() {
    let temp_dir = TempDir::new().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = temp_dir.path().to_path_buf();
            thread::spawn(move || {
                let engine = Engine::open_path(&path, ["log"]).unwrap();
                (0..10)
                    .map(|i| engine.insert("log", i).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut keys: Vec<i64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .map(|k| k.parse().unwrap())
        .collect();
    keys.sort_unstable();

    assert_eq!(keys, (1..=40).collect::<Vec<_>>());

    let check = Engine::open_path(temp_dir.path(), ["log"]).unwrap();
    assert_eq!(check.count("log").unwrap(), 40);
}

#[test]
fn test_engine_is_shareable_across_threads() {
    let (_temp, engine) = setup_temp_engine(&["default"]);
    let engine = std::sync::Arc::new(engine);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = std::sync::Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..5 {
                    engine.set("default", &format!("t{}_{}", t, i), i).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.count("default").unwrap(), 20);
}
