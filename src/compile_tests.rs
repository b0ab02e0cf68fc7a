//! Compiler tests: resolution, classification and structural rules.

#[cfg(test)]
mod tests {
    use crate::definition::{BindingValue, Definition};
    use crate::dom;
    use crate::scope::{ReplaceAttribute, Scope};
    use crate::validate::{BindError, ErrorCategory};
    use crate::{check_disjoint, compile};
    use markup5ever_rcdom::Handle;
    use tracing_test::traced_test;

    const PAGE: &str = r#"<div id="outside"><em>elsewhere</em></div><div id="app"><h1>Title</h1><section class="body"><p class="text">x</p></section><form><input class="done" type="checkbox"><input class="name" type="text"><textarea></textarea><progress></progress></form></div>"#;

    fn fixture() -> (Scope, Handle) {
        let scope = Scope::parse(PAGE).unwrap();
        let app = scope.query_selector("#app").unwrap().unwrap();
        (scope, app)
    }

    fn node(scope: &Scope, selector: &str) -> Handle {
        scope.query_selector(selector).unwrap().unwrap()
    }

    #[test]
    fn test_leaf_selector_resolves_to_element() {
        let (scope, app) = fixture();
        let definition = Definition::new()
            .bind("title", BindingValue::selector("h1").with_handler(|_, _| {}));

        let compiled = compile(&scope, &app, &definition).unwrap();
        let title = compiled.get("title").unwrap();

        assert!(dom::same_node(&title.node, &node(&scope, "h1")));
        assert_eq!(title.replace_attribute(), Some(ReplaceAttribute::TextContent));
        assert!(!title.has_definition());
        assert!(!title.is_bound_to_parent());
    }

    #[test]
    fn test_missing_selector_names_the_selector() {
        let (scope, app) = fixture();
        let definition = Definition::new().bind("a", "#missing");

        let err = compile(&scope, &app, &definition).unwrap_err();
        assert_eq!(
            err,
            BindError::ElementNotFound {
                key: "a".to_string(),
                selector: "#missing".to_string(),
            }
        );
        assert!(err.to_string().contains("#missing"));
        assert_eq!(err.category(), ErrorCategory::Resolution);
    }

    #[test]
    fn test_replace_attribute_per_element_kind() {
        let (scope, app) = fixture();
        let definition = Definition::new()
            .bind("done", ".done")
            .bind("name", ".name")
            .bind("notes", "textarea")
            .bind("progress", "progress")
            .bind("text", ".text");

        let compiled = compile(&scope, &app, &definition).unwrap();
        let strategy = |key: &str| compiled.get(key).unwrap().replace_attribute();

        assert_eq!(strategy("done"), Some(ReplaceAttribute::Checked));
        assert_eq!(strategy("name"), Some(ReplaceAttribute::Value));
        assert_eq!(strategy("notes"), Some(ReplaceAttribute::Value));
        assert_eq!(strategy("progress"), Some(ReplaceAttribute::Value));
        assert_eq!(strategy("text"), Some(ReplaceAttribute::TextContent));
    }

    #[test]
    fn test_sibling_overlap_is_rejected_without_touching_dom() {
        let (scope, app) = fixture();
        let before = dom::outer_html(&app);
        let definition = Definition::new().bind("section", "section").bind("text", ".text");

        let err = compile(&scope, &app, &definition).unwrap_err();
        assert_eq!(
            err,
            BindError::Overlap {
                key: "text".to_string(),
                adjacent: "section".to_string(),
            }
        );
        assert_eq!(dom::outer_html(&app), before);
    }

    #[test]
    fn test_two_keys_on_one_element_are_rejected() {
        let (scope, app) = fixture();
        let definition = Definition::new().bind("a", "h1").bind("b", "#app > h1");

        let err = compile(&scope, &app, &definition).unwrap_err();
        assert!(matches!(err, BindError::SharedElement { ref key, .. } if key == "a"));
    }

    #[test]
    fn test_parent_bound_nested_definition_recurses_on_same_node() {
        let (scope, app) = fixture();
        let definition = Definition::new()
            .bind(
                "self",
                BindingValue::selector("#app").nested(Definition::new().bind("heading", "h1")),
            )
            .bind("body", "section");

        let compiled = compile(&scope, &app, &definition).unwrap();
        let own = compiled.get("self").unwrap();
        assert!(own.is_bound_to_parent());
        assert!(own.has_definition());
        assert!(own.path.is_empty());
        assert!(own.template.is_none());

        let heading = own.nested().unwrap().get("heading").unwrap();
        let h1 = node(&scope, "h1");
        assert!(dom::same_node(&heading.node, &h1));
        assert_eq!(Some(heading.path.clone()), dom::path_from(&app, &h1));

        // The parent-bound key claims the container, never a sibling region.
        assert!(check_disjoint(compiled.bindings()).is_ok());
    }

    #[traced_test]
    #[test]
    fn test_parent_bound_leaf_without_handler_is_a_noop() {
        let (scope, app) = fixture();
        let definition = Definition::new().bind("self", BindingValue::node(&app));

        let compiled = compile(&scope, &app, &definition).unwrap();
        let own = compiled.get("self").unwrap();
        assert!(own.is_bound_to_parent());
        assert_eq!(own.replace_attribute(), None);
        assert!(logs_contain(
            "A change function was not defined on the key \"self\"."
        ));
    }

    #[traced_test]
    #[test]
    fn test_handler_on_parent_bound_leaf_is_silent() {
        let (scope, app) = fixture();
        let definition =
            Definition::new().bind("self", BindingValue::node(&app).with_handler(|_, _| {}));

        compile(&scope, &app, &definition).unwrap();
        assert!(!logs_contain("A change function was not defined"));
    }

    #[test]
    fn test_nested_keys_of_parent_bound_key_are_siblings() {
        let scope = Scope::parse(r#"<div id="app"><ul><li>x</li></ul></div>"#).unwrap();
        let app = scope.query_selector("#app").unwrap().unwrap();
        let before = dom::outer_html(&app);
        let definition = Definition::new().bind("list", "ul").bind(
            "meta",
            BindingValue::selector("#app").nested(Definition::new().bind("item", "li")),
        );

        let err = compile(&scope, &app, &definition).unwrap_err();
        assert_eq!(
            err,
            BindError::Overlap {
                key: "item".to_string(),
                adjacent: "list".to_string(),
            }
        );
        assert_eq!(dom::outer_html(&app), before);
    }

    #[test]
    fn test_nested_keys_of_parent_bound_key_may_not_share_elements() {
        let (scope, app) = fixture();
        let definition = Definition::new().bind("title", "h1").bind(
            "meta",
            BindingValue::selector("#app").nested(Definition::new().bind("heading", "h1")),
        );

        let err = compile(&scope, &app, &definition).unwrap_err();
        assert!(matches!(err, BindError::SharedElement { ref key, .. } if key == "title"));
    }

    #[test]
    fn test_node_outside_parent_is_rejected() {
        let (scope, app) = fixture();
        // Found through the parent's parent, but not inside `#app`.
        let definition = Definition::new().bind("other", "#outside em");

        let err = compile(&scope, &app, &definition).unwrap_err();
        assert_eq!(
            err,
            BindError::NotContained {
                key: "other".to_string()
            }
        );
    }

    #[test]
    fn test_non_element_node_is_a_type_error() {
        let (scope, app) = fixture();
        let h1 = node(&scope, "h1");
        let text = h1.children.borrow()[0].clone();
        let definition = Definition::new().bind("title", BindingValue::node(&text));

        let err = compile(&scope, &app, &definition).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Type);
        assert_eq!(err.key(), Some("title"));
    }

    #[test]
    fn test_nested_errors_surface_from_inner_level() {
        let (scope, app) = fixture();
        let definition = Definition::new().bind(
            "body",
            BindingValue::selector("section").nested(Definition::new().bind("missing", "h2")),
        );

        let err = compile(&scope, &app, &definition).unwrap_err();
        assert_eq!(err.key(), Some("missing"));
    }

    #[test]
    fn test_invalid_selector_syntax() {
        let (scope, app) = fixture();
        let definition = Definition::new().bind("bad", "h1 >");

        let err = compile(&scope, &app, &definition).unwrap_err();
        assert!(matches!(err, BindError::InvalidSelector { .. }));
    }

    #[test]
    fn test_compile_leaves_definition_reusable() {
        let (scope, app) = fixture();
        let definition = Definition::new().bind("title", "h1").bind("body", "section");

        let first = compile(&scope, &app, &definition).unwrap();
        let second = compile(&scope, &app, &definition).unwrap();
        for (a, b) in first.bindings().iter().zip(second.bindings()) {
            assert_eq!(a.key, b.key);
            assert!(dom::same_node(&a.node, &b.node));
            assert_eq!(a.path, b.path);
        }
    }

    #[test]
    fn test_template_is_a_detached_copy() {
        let (scope, app) = fixture();
        let definition = Definition::new().bind("body", "section");

        let compiled = compile(&scope, &app, &definition).unwrap();
        let body = compiled.get("body").unwrap();
        let template = body.template.as_ref().unwrap();
        assert!(!dom::same_node(template, &body.node));
        assert!(dom::parent_of(template).is_none());
        assert_eq!(dom::outer_html(template), dom::outer_html(&body.node));
    }
}
