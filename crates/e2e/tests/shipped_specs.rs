//! The YAML specs shipped in tests/specs parse and select as expected

use std::path::Path;

use test_case::test_case;
use wikicheck_e2e::{Category, Scenario, TestSpec, TestStep};

fn shipped() -> Vec<TestSpec> {
    TestSpec::load_all(Path::new("tests/specs")).unwrap()
}

#[test]
fn all_shipped_specs_parse() {
    let specs = shipped();
    assert_eq!(specs.len(), 6);
    assert!(specs.iter().all(|s| !s.steps.is_empty()));
}

#[test_case("example-python-page", "Python")]
#[test_case("example-selenium-page", "Selenium")]
#[test_case("example-csharp-page", "C#")]
#[test_case("example-java-page", "Java")]
#[test_case("example-typescript-page", "TypeScript")]
fn example_pages_check_title(name: &str, keyword: &str) {
    let specs = shipped();
    let spec = specs.iter().find(|s| s.name == name).unwrap();

    assert!(Scenario::explicit(spec));
    assert_eq!(Scenario::category(spec), Category::Example);
    assert!(spec.steps.contains(&TestStep::AssertTitle { contains: keyword.to_string() }));
}

#[test]
fn article_heading_spec_runs_by_default() {
    let specs = shipped();
    let ui = TestSpec::filter_by_tag(&specs, "ui");
    assert_eq!(ui.len(), 1);
    assert!(!Scenario::explicit(ui[0]));
    assert!(matches!(ui[0].steps.last(), Some(TestStep::Screenshot { .. })));
}
