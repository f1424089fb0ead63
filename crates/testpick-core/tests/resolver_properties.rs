//! Selection properties of the change resolver over hand-built catalogs.

use testpick_core::{
    ChangeResolver, DeclaredUnit, SelectorError, TestSourceLayout, UnitCatalog, UnitId,
};

fn src(name: &str) -> String {
    format!("src/test/java/{}.java", name.replace('.', "/"))
}

fn selected(resolver: &ChangeResolver, paths: &[String], catalog: &UnitCatalog) -> Vec<String> {
    resolver
        .resolve(paths, catalog)
        .expect("resolve failed")
        .ids()
        .into_iter()
        .map(|id| id.to_string())
        .collect()
}

/// Base (abstract)
///   ├── Mid (abstract)
///   │     ├── LeafA
///   │     └── LeafB
///   ├── Sibling
///   │     └── SiblingChild
///   └── OtherMid (abstract, no children)
/// Lone
fn catalog() -> UnitCatalog {
    UnitCatalog::from_declared(vec![
        DeclaredUnit::new("t.Base", true, Some("java.lang.Object")),
        DeclaredUnit::new("t.Mid", true, Some("t.Base")),
        DeclaredUnit::new("t.LeafA", false, Some("t.Mid")),
        DeclaredUnit::new("t.LeafB", false, Some("t.Mid")),
        DeclaredUnit::new("t.Sibling", false, Some("t.Base")),
        DeclaredUnit::new("t.SiblingChild", false, Some("t.Sibling")),
        DeclaredUnit::new("t.OtherMid", true, Some("t.Base")),
        DeclaredUnit::new("t.Lone", false, Some("junit.framework.TestCase")),
    ])
}

#[test]
fn paths_outside_test_root_never_select() {
    let resolver = ChangeResolver::default();
    let paths = vec![
        "src/main/java/t/Base.java".to_string(),
        "docs/t/LeafA.java".to_string(),
        "src/test/java/t/LeafA.kt".to_string(),
        "src/test/resources/t/LeafA.java.txt".to_string(),
    ];
    assert!(selected(&resolver, &paths, &catalog()).is_empty());
}

#[test]
fn changed_abstract_root_selects_every_descendant_but_not_itself() {
    let resolver = ChangeResolver::default();
    let picked = selected(&resolver, &[src("t.Base")], &catalog());
    assert_eq!(
        picked,
        vec!["t.Mid", "t.LeafA", "t.LeafB", "t.Sibling", "t.SiblingChild", "t.OtherMid"]
    );
    assert!(!picked.contains(&"t.Base".to_string()));
}

#[test]
fn selection_matches_catalog_specializations() {
    let resolver = ChangeResolver::default();
    let catalog = catalog();
    let specializations: Vec<String> = catalog
        .specializations_of(&UnitId::new("t.Mid"))
        .unwrap()
        .iter()
        .map(|u| u.id.to_string())
        .collect();
    assert_eq!(selected(&resolver, &[src("t.Mid")], &catalog), specializations);
}

#[test]
fn changed_concrete_parent_selects_itself_first() {
    let resolver = ChangeResolver::default();
    let picked = selected(&resolver, &[src("t.Sibling")], &catalog());
    assert_eq!(picked, vec!["t.Sibling", "t.SiblingChild"]);
}

#[test]
fn abstract_unit_without_specializations_selects_nothing() {
    let resolver = ChangeResolver::default();
    assert!(selected(&resolver, &[src("t.OtherMid")], &catalog()).is_empty());
}

#[test]
fn overlapping_changes_do_not_duplicate() {
    let resolver = ChangeResolver::default();
    let paths = vec![src("t.LeafA"), src("t.LeafB"), src("t.Mid"), src("t.Base")];
    let picked = selected(&resolver, &paths, &catalog());
    assert_eq!(
        picked,
        vec!["t.LeafA", "t.LeafB", "t.Mid", "t.Sibling", "t.SiblingChild", "t.OtherMid"]
    );
}

#[test]
fn changed_siblings_each_appear_once() {
    let resolver = ChangeResolver::default();
    let paths = vec![src("t.LeafB"), src("t.LeafA")];
    assert_eq!(selected(&resolver, &paths, &catalog()), vec!["t.LeafB", "t.LeafA"]);
}

#[test]
fn resolution_is_idempotent() {
    let resolver = ChangeResolver::default();
    let catalog = catalog();
    let paths = vec![src("t.Lone"), src("t.Mid"), "pom.xml".to_string(), src("t.Sibling")];

    let first = resolver.resolve(&paths, &catalog).unwrap();
    let second = resolver.resolve(&paths, &catalog).unwrap();
    assert_eq!(first.ids(), second.ids());
    assert_eq!(
        first.canonical_names(),
        vec!["t.Lone", "t.LeafA", "t.LeafB", "t.Sibling", "t.SiblingChild"]
    );
}

#[test]
fn custom_layout_maps_other_roots() {
    let resolver = ChangeResolver::new(TestSourceLayout::new("tests/", "groovy"));
    let picked = selected(&resolver, &["tests/t/Lone.groovy".to_string()], &catalog());
    assert_eq!(picked, vec!["t.Lone"]);
}

#[test]
fn duplicate_definition_is_fatal() {
    let mut declared = vec![DeclaredUnit::new("t.Twice", false, None)];
    declared.push(DeclaredUnit::new("t.Twice", false, None));
    let catalog = UnitCatalog::from_declared(declared);

    let err = ChangeResolver::default()
        .resolve(&[src("t.Twice")], &catalog)
        .unwrap_err();
    assert!(matches!(err, SelectorError::InvariantViolation(_)));
}

#[test]
fn nested_units_use_canonical_names() {
    let catalog = UnitCatalog::from_declared(vec![
        DeclaredUnit::new("t.Outer", false, None),
        DeclaredUnit::new("t.Outer$InnerTest", false, Some("t.Outer")),
    ]);
    let set = ChangeResolver::default()
        .resolve(&[src("t.Outer")], &catalog)
        .unwrap();
    assert_eq!(set.canonical_names(), vec!["t.Outer", "t.Outer.InnerTest"]);
}

#[test]
fn changed_interface_selects_implementors_and_their_subclasses() {
    let catalog = UnitCatalog::from_declared(vec![
        DeclaredUnit::new("t.Contract", true, None),
        DeclaredUnit::new("t.ImplTest", false, None).implementing(&["t.Contract"]),
        DeclaredUnit::new("t.ImplChildTest", false, Some("t.ImplTest")),
        DeclaredUnit::new("t.Lone", false, None),
    ]);
    let picked = selected(&ChangeResolver::default(), &[src("t.Contract")], &catalog);
    assert_eq!(picked, vec!["t.ImplTest", "t.ImplChildTest"]);
}
