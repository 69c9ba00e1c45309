//! Modules built from class chains: ancestor members are registered,
//! overrides win, and exposed order is ancestor-first.

use cmod_core::StoreLike;
use cmod_module::{ClassDef, ModuleOptions};
use cmod_store::Store;
use serde_json::{json, Value};

fn level(name: &'static str, field: &'static str, base: Option<&ClassDef>) -> ClassDef {
    let mut class = ClassDef::new(name);
    if let Some(base) = base {
        class = class.extends(base);
    }
    class
        .field(field, field)
        .setter(format!("{field}Setter"), move |state, value| {
            state.set(field, value);
            Ok(())
        })
        .getter(format!("{field}Getter"), move |ctx| Ok(ctx.state(field)))
        .action(format!("{field}Action"), move |_ctx, _payload| async move {
            Ok(json!(field))
        })
}

fn chain() -> ClassDef {
    let a = level("A", "a", None);
    let b = level("B", "b", Some(&a));
    level("C", "c", Some(&b))
}

#[test]
fn flattened_tables_are_ancestor_first() {
    let module = chain().build("");
    assert_eq!(module.state_fields().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert_eq!(
        module.mutator_names().collect::<Vec<_>>(),
        vec!["aSetter", "bSetter", "cSetter"]
    );
    assert_eq!(
        module.getter_names().collect::<Vec<_>>(),
        vec!["aGetter", "bGetter", "cGetter"]
    );
    assert_eq!(
        module.action_names().collect::<Vec<_>>(),
        vec!["aAction", "bAction", "cAction"]
    );
}

#[tokio::test]
async fn inherited_members_are_live() {
    let store = Store::new(chain().build("")).unwrap();
    assert_eq!(store.snapshot(), json!({"a": "a", "b": "b", "c": "c"}));

    store.commit("aSetter", json!("A!")).unwrap();
    assert_eq!(store.getter("aGetter").unwrap(), json!("A!"));
    assert_eq!(store.dispatch("bAction", Value::Null).await.unwrap(), json!("b"));
}

#[test]
fn override_wins_at_every_depth() {
    let a = level("A", "a", None);
    let b = ClassDef::new("B")
        .extends(&a)
        .field("a", "from b")
        .getter("aGetter", |ctx| Ok(json!(format!("b sees {}", ctx.state("a")))));
    let c = ClassDef::new("C").extends(&b).field("a", "from c");

    let store = Store::new(c.build("")).unwrap();
    assert_eq!(store.snapshot(), json!({"a": "from c"}));
    assert_eq!(store.getter("aGetter").unwrap(), json!("b sees \"from c\""));
}

#[test]
fn several_bases_last_declared_wins() {
    let left = ClassDef::new("Left").field("shared", "left").field("l", 1);
    let right = ClassDef::new("Right").field("shared", "right").field("r", 2);
    let mixed = ClassDef::new("Mixed").extends(&left).extends(&right);
    let names: Vec<_> = mixed.flatten().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["shared", "l", "r"]);

    let store = Store::new(mixed.build("")).unwrap();
    assert_eq!(store.snapshot()["shared"], json!("right"));
}

#[test]
fn inherited_module_as_child() {
    let child = chain().build("deep/child");
    let root = ClassDef::new("Root").build_with("", ModuleOptions::new().child(child));
    let store = Store::new(root).unwrap();
    store.commit("deep/child/cSetter", json!(3)).unwrap();
    assert_eq!(store.snapshot()["deep"]["child"]["c"], json!(3));
    assert_eq!(store.getter("deep/child/cGetter").unwrap(), json!(3));
}
