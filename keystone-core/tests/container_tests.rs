use keystone_core::container::TypeConstructor;
use keystone_core::{
    arg, Component, Container, ContainerAware, Definition, DefinitionSpec, Error, Lifetime,
    Reconstruct, WeakContainer,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
struct Db {
    dsn: String,
    user: String,
    password: String,
    pool: u32,
}

impl Component for Db {}

impl Db {
    fn from_args(args: &[Value]) -> keystone_core::Result<Self> {
        Ok(Self {
            dsn: arg(args, 0)?,
            user: arg(args, 1).unwrap_or_default(),
            password: arg(args, 2).unwrap_or_default(),
            pool: arg(args, 3).unwrap_or(1),
        })
    }
}

fn container() -> Container {
    let container = Container::new();
    container.declare("app::Db", TypeConstructor::new(Db::from_args));
    container
}

#[test]
fn test_shared_returns_same_instance() {
    let c = container();
    c.set_shared("db", DefinitionSpec::new().type_name("app::Db").args(vec![json!("mysql://")]))
        .unwrap();

    let first = c.get("db").unwrap();
    let second = c.get("db").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_transient_returns_distinct_instances() {
    let c = container();
    c.set_shared(
        "db",
        DefinitionSpec::new()
            .type_name("app::Db")
            .lifetime(Lifetime::Transient)
            .args(vec![json!("mysql://")]),
    )
    .unwrap();

    let first = c.get("db").unwrap();
    let second = c.get("db").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_set_forces_spec_transient() {
    let c = container();
    c.set(
        "db",
        DefinitionSpec::new()
            .type_name("app::Db")
            .lifetime(Lifetime::Shared)
            .args(vec![json!("mysql://")]),
    )
    .unwrap();

    let first = c.get("db").unwrap();
    let second = c.get("db").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_instance_is_shared_and_factory_is_transient() {
    let c = container();
    let built = Arc::new(AtomicUsize::new(0));

    c.set("config", Definition::instance(json!({"debug": true})))
        .unwrap();
    let counter = built.clone();
    c.set(
        "ticket",
        Definition::factory(move |_: &Container, _: &[Value]| {
            Ok(json!(counter.fetch_add(1, Ordering::SeqCst)))
        }),
    )
    .unwrap();

    let a = c.get("config").unwrap();
    let b = c.get("config").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    c.get("ticket").unwrap();
    c.get("ticket").unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_alias_resolves_and_caches_under_canonical() {
    let c = container();
    c.set_shared("db", DefinitionSpec::new().type_name("app::Db").args(vec![json!("pg://")]))
        .unwrap();
    c.set_alias("db", "database");

    let via_alias = c.get("database").unwrap();
    assert_eq!(c.instance_names(), vec!["db"]);

    let direct = c.get("db").unwrap();
    assert!(Arc::ptr_eq(&via_alias, &direct));
}

#[test]
fn test_alias_first_write_wins_unless_forced() {
    let c = container();
    c.set_aliases("db", ["database", "storage"], false);
    c.set_aliases("cache", ["database"], false);
    assert_eq!(c.alias_target("database").as_deref(), Some("db"));

    c.set_aliases("cache", ["database"], true);
    assert_eq!(c.alias_target("database").as_deref(), Some("cache"));
    assert_eq!(c.alias_target("storage").as_deref(), Some("db"));
}

#[test]
fn test_remove_with_alias_dependents() {
    let c = container();
    c.set_shared("db", DefinitionSpec::new().type_name("app::Db").args(vec![json!("pg://")]))
        .unwrap();
    c.set_alias("db", "database");
    c.get("db").unwrap();

    let err = c.remove("db").err().unwrap();
    assert!(matches!(err, Error::Dependency(_)));
    assert!(c.has("db"));

    assert!(c.remove_alias("database"));
    c.remove("db").unwrap();
    assert!(!c.has("db"));
    assert!(!c.is_cached("db"));
}

#[test]
fn test_has_ignores_cache_only_entries() {
    let c = container();
    c.set_shared("db", DefinitionSpec::new().type_name("app::Db").args(vec![json!("pg://")]))
        .unwrap();
    assert!(c.has("db"));

    c.set_alias("db", "database");
    assert!(c.has("database"));

    c.declare("app::Session", TypeConstructor::from_default::<Session>());
    c.get_shared("app::Session").unwrap();
    assert!(c.is_cached("app::Session"));
    assert!(!c.has("app::Session"));
}

#[test]
fn test_four_arguments_use_variadic_path() {
    let c = container();
    let args = vec![json!("mysql://"), json!("root"), json!("secret"), json!(8)];

    let instance = c.get_instance("app::Db", Some(&args), "db").unwrap();
    let db = instance.into_any().downcast::<Db>().unwrap();

    assert_eq!(
        *db,
        Db {
            dsn: "mysql://".into(),
            user: "root".into(),
            password: "secret".into(),
            pool: 8,
        }
    );
}

#[test]
fn test_fast_path_and_variadic_agree() {
    let c = Container::new();
    c.declare(
        "app::Db",
        TypeConstructor::new(Db::from_args).with_ternary(|dsn, user, password| {
            Db::from_args(&[dsn.clone(), user.clone(), password.clone()])
        }),
    );
    let args = vec![json!("mysql://"), json!("root"), json!("secret")];

    let fast = c.get_instance("app::Db", Some(&args), "db").unwrap();
    let slow = Db::from_args(&args).unwrap();
    assert_eq!(*fast.into_any().downcast::<Db>().unwrap(), slow);
}

#[test]
fn test_explicit_args_replace_stored_args() {
    let c = container();
    c.set("db", DefinitionSpec::new().type_name("app::Db").args(vec![json!("stored://")]))
        .unwrap();

    let db = c
        .get_with("db", Some(&[json!("explicit://")]))
        .unwrap()
        .into_any()
        .downcast::<Db>()
        .unwrap();
    assert_eq!(db.dsn, "explicit://");

    let db = c.get_as::<Db>("db").unwrap();
    assert_eq!(db.dsn, "stored://");
}

#[test]
fn test_unresolvable_type() {
    let c = container();
    c.set("mailer", "app::Mailer").unwrap();
    let err = c.get("mailer").err().unwrap();
    assert!(err.is_definition_error());
}

#[derive(Default)]
struct Session {
    container: Mutex<WeakContainer>,
    resets: AtomicUsize,
}

impl Component for Session {
    fn container_aware(&self) -> Option<&dyn ContainerAware> {
        Some(self)
    }

    fn reconstructible(&self) -> Option<&dyn Reconstruct> {
        Some(self)
    }
}

impl ContainerAware for Session {
    fn set_container(&self, container: &Container) {
        *self.container.lock() = container.downgrade();
    }
}

impl Reconstruct for Session {
    fn reconstruct(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_container_aware_injection() {
    let c = container();
    c.declare("app::Session", TypeConstructor::from_default::<Session>());
    c.set_shared("session", "app::Session").unwrap();

    let session = c.get_as::<Session>("session").unwrap();
    let injected = session.container.lock().upgrade().unwrap();
    assert!(injected.ptr_eq(&c));
}

#[test]
fn test_container_aware_pass_through_instance() {
    let c = container();
    c.set_shared("session", Definition::instance(Session::default()))
        .unwrap();

    let session = c.get_as::<Session>("session").unwrap();
    assert!(session.container.lock().upgrade().is_some());
}

#[test]
fn test_reconstruct_all_keeps_cache_slot() {
    let c = container();
    c.declare("app::Session", TypeConstructor::from_default::<Session>());
    c.set_shared("session", "app::Session").unwrap();
    c.set_shared("db", DefinitionSpec::new().type_name("app::Db").args(vec![json!("pg://")]))
        .unwrap();

    let before = c.get_as::<Session>("session").unwrap();
    c.get("db").unwrap();

    assert_eq!(c.reconstruct_all(), 1);

    let after = c.get_as::<Session>("session").unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.resets.load(Ordering::SeqCst), 1);
}

#[test]
fn test_factory_may_resolve_reentrantly() {
    let c = container();
    c.set_shared("db", DefinitionSpec::new().type_name("app::Db").args(vec![json!("pg://")]))
        .unwrap();
    c.set_shared(
        "dsn",
        Definition::factory(|container: &Container, _: &[Value]| {
            let db = container.get_as::<Db>("db")?;
            Ok(json!(db.dsn))
        }),
    )
    .unwrap();

    assert_eq!(*c.get_as::<Value>("dsn").unwrap(), json!("pg://"));
}
