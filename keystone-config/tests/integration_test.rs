//! Integration tests for keystone-config

use keystone_config::*;
use keystone_core::container::TypeConstructor;
use keystone_core::{arg, Component, Container, Params};
use serde_json::Value;
use std::env;
use std::io::Write;
use std::sync::Arc;

#[derive(Debug)]
struct Db {
    dsn: String,
    pool: u32,
}

impl Component for Db {}

#[derive(Default)]
struct Mailer;
impl Component for Mailer {}

#[derive(Default)]
struct CartController;
impl Component for CartController {}

fn container() -> Container {
    let container = Container::new();
    container
        .declare(
            "app::Db",
            TypeConstructor::new(|args| {
                Ok(Db {
                    dsn: arg(args, 0)?,
                    pool: arg(args, 1).unwrap_or(1),
                })
            }),
        )
        .declare("app::Mailer", TypeConstructor::from_default::<Mailer>());
    container
}

const APP_TOML: &str = r#"
[logging]
level = "debug"
format = "compact"

[dispatcher]
controller_namespace = "shop::{module}"

[components]
mailer = "app::Mailer"

[components.db]
type = "app::Db"
params = ["mysql://localhost/shop", 8]
aliases = ["database"]

[components.report_db]
type = "app::Db"
shared = false
params = "sqlite::memory:"

[aliases]
storage = "db"
"#;

#[test]
fn test_apply_toml_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(APP_TOML.as_bytes()).unwrap();

    let manager = ConfigManager::new();
    manager.load_file(file.path()).unwrap();
    let config = manager.app_config().unwrap();

    let container = container();
    config.apply(&container).unwrap();

    assert!(container.has("db"));
    assert!(container.has("database"));
    assert!(container.has("storage"));

    let db = container.get_as::<Db>("database").unwrap();
    assert_eq!(db.dsn, "mysql://localhost/shop");
    assert_eq!(db.pool, 8);
    let same = container.get_as::<Db>("storage").unwrap();
    assert!(Arc::ptr_eq(&db, &same));

    // `shared = false` is honoured; a scalar `params` is one argument
    let a = container.get_as::<Db>("report_db").unwrap();
    let b = container.get_as::<Db>("report_db").unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a.dsn, "sqlite::memory:");
    assert_eq!(a.pool, 1);

    // bare type names register as shared
    let m1 = container.get("mailer").unwrap();
    let m2 = container.get("mailer").unwrap();
    assert!(Arc::ptr_eq(&m1, &m2));
}

#[test]
fn test_configured_dispatcher_namespace() {
    let manager = ConfigManager::new();
    manager.load_str(APP_TOML, FileFormat::Toml).unwrap();
    let config = manager.app_config().unwrap();

    let container = container();
    container.declare(
        "shop::Store::CartController",
        TypeConstructor::from_default::<CartController>(),
    );
    let dispatcher = config.dispatcher(&container);

    assert_eq!(dispatcher.config().controller_namespace, "shop::{module}");
    assert_eq!(
        dispatcher.config().controller_type("Store", "Cart"),
        "shop::Store::CartController"
    );

    // CartController exposes no actions
    let err = dispatcher
        .dispatch("store", "cart", "index", Params::new())
        .unwrap_err();
    assert!(matches!(err, keystone_core::Error::NotFoundAction(_)));
}

#[test]
fn test_logging_section() {
    let manager = ConfigManager::new();
    manager.load_str(APP_TOML, FileFormat::Toml).unwrap();
    let log = manager.app_config().unwrap().logging.log_config().unwrap();

    assert_eq!(log.level, keystone_core::logging::LogLevel::Debug);
    assert_eq!(log.format, keystone_core::logging::LogFormat::Compact);
}

#[test]
fn test_table_without_type_reuses_registration() {
    let container = container();
    container.set_shared("db", "app::Db").unwrap();

    let config: AppConfig = serde_json::from_value(serde_json::json!({
        "components": {"db": {"params": ["pg://replica"]}}
    }))
    .unwrap();
    config.apply(&container).unwrap();

    assert_eq!(container.get_as::<Db>("db").unwrap().dsn, "pg://replica");
}

#[test]
fn test_table_without_type_and_no_registration() {
    let config: AppConfig = serde_json::from_value(serde_json::json!({
        "components": {"cache": {"params": []}}
    }))
    .unwrap();

    let err = config.apply(&container()).unwrap_err();
    assert!(matches!(err, ConfigError::Component(ref e) if e.is_definition_error()));
}

#[test]
fn test_invalid_config_is_rejected() {
    let manager = ConfigManager::new();
    manager
        .load_str(r#"{"components": {"db": "NotAPath"}}"#, FileFormat::Json)
        .unwrap();
    assert!(manager.app_config().unwrap_err().is_invalid());
}

#[test]
fn test_env_overrides_file() {
    unsafe {
        env::set_var("KSTEST_LOGGING__LEVEL", "warn");
    }

    let manager = ConfigManager::with_prefix("KSTEST");
    manager.load_str(APP_TOML, FileFormat::Toml).unwrap();
    manager.load_env().unwrap();

    assert_eq!(manager.get_string("logging.level").unwrap(), "warn");
    assert_eq!(manager.get_string("logging.format").unwrap(), "compact");

    unsafe {
        env::remove_var("KSTEST_LOGGING__LEVEL");
    }
}

#[test]
fn test_dotenv_file() {
    let mut file = tempfile::Builder::new().suffix(".env").tempfile().unwrap();
    writeln!(file, "KSDOTENV_COMPONENTS__MAILER=app::Mailer").unwrap();

    let manager = ConfigManager::with_prefix("KSDOTENV");
    manager.load_dotenv(Some(file.path())).unwrap();

    let config = manager.app_config().unwrap();
    assert_eq!(
        config.components["mailer"],
        ComponentEntry::Type("app::Mailer".into())
    );

    unsafe {
        env::remove_var("KSDOTENV_COMPONENTS__MAILER");
    }
}

#[test]
fn test_manager_as_component() {
    let container = container();
    let manager = ConfigManager::new();
    manager.set("name", "shop").unwrap();
    container
        .set_shared("config", keystone_core::Definition::instance(manager))
        .unwrap();

    let config = container.get_as::<ConfigManager>("config").unwrap();
    assert_eq!(config.get::<Value>("name").unwrap(), "shop");
}

#[test]
fn test_env_overrides_typed_field() {
    unsafe {
        env::set_var("KSTYPED_COMPONENTS__DB__SHARED", "false");
        env::set_var("KSTYPED_COMPONENTS__DB__PARAMS", "7");
    }

    let manager = ConfigManager::with_prefix("KSTYPED");
    manager
        .load_str(
            "[components.db]\ntype = \"app::Db\"\nshared = true\n",
            FileFormat::Toml,
        )
        .unwrap();
    manager.load_env().unwrap();

    let config = manager.app_config().unwrap();
    let ComponentEntry::Table(db) = &config.components["db"] else {
        panic!("db should be a table");
    };
    assert_eq!(db.shared, Some(false));
    assert_eq!(db.params, Value::from(7));

    unsafe {
        env::remove_var("KSTYPED_COMPONENTS__DB__SHARED");
        env::remove_var("KSTYPED_COMPONENTS__DB__PARAMS");
    }
}

#[test]
fn test_malformed_dotenv_file_is_rejected() {
    let mut file = tempfile::Builder::new().suffix(".env").tempfile().unwrap();
    writeln!(file, "KSMALFORMED_X=\"unterminated").unwrap();

    let manager = ConfigManager::with_prefix("KSMALFORMED");
    let err = manager.load_dotenv(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Load { .. }));
    assert!(!manager.has("x"));
}
