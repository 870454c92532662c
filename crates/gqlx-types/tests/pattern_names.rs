use gqlx_types::ast::*;
use gqlx_types::Span;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn id(name: &str) -> Pattern {
    Pattern::Ident(Ident::new(name, Span::default()))
}

fn key(name: &str) -> PropKey {
    PropKey::Ident(Ident::new(name, Span::default()))
}

fn lit(raw: &str) -> Expr {
    Expr::new(
        ExprKind::Literal(Literal {
            value: LitValue::String(raw.trim_matches('"').to_string()),
            raw: raw.to_string(),
        }),
        Span::default(),
    )
}

// ── Bound names ──────────────────────────────────────────────────────────────

#[test]
fn identifier_binds_itself() {
    assert_eq!(id("foo").bound_names(), vec!["foo"]);
}

#[test]
fn assignment_pattern_binds_left_side_only() {
    let pattern = Pattern::Assign {
        target: Box::new(id("foo")),
        default: Box::new(lit("\"bar\"")),
    };
    assert_eq!(pattern.bound_names(), vec!["foo"]);
}

#[test]
fn array_pattern_binds_every_element() {
    let pattern = Pattern::Array(vec![Some(id("foo")), None, Some(id("bar"))], Span::default());
    assert_eq!(pattern.bound_names(), vec!["foo", "bar"]);
}

#[test]
fn rest_element_binds_its_argument() {
    let pattern = Pattern::Rest(Box::new(id("rest")));
    assert_eq!(pattern.bound_names(), vec!["rest"]);
}

#[test]
fn object_pattern_binds_shorthand_names() {
    let pattern = Pattern::Object(
        vec![
            PatternProp::Init {
                key: key("qux"),
                value: id("qux"),
                shorthand: true,
            },
            PatternProp::Init {
                key: key("abc"),
                value: id("abc"),
                shorthand: true,
            },
        ],
        Span::default(),
    );
    assert_eq!(pattern.bound_names(), vec!["qux", "abc"]);
}

#[test]
fn object_pattern_binds_renamed_target() {
    let pattern = Pattern::Object(
        vec![
            PatternProp::Init {
                key: key("qux"),
                value: id("foo"),
                shorthand: false,
            },
            PatternProp::Rest(id("others")),
        ],
        Span::default(),
    );
    assert_eq!(pattern.bound_names(), vec!["foo", "others"]);
}

#[test]
fn member_target_binds_nothing() {
    let pattern = Pattern::Member(Box::new(Expr::ident("obj", Span::default())));
    assert!(pattern.bound_names().is_empty());
}

#[test]
fn parameter_list_names_in_order() {
    let params = vec![
        id("a"),
        Pattern::Array(vec![Some(id("b"))], Span::default()),
        Pattern::Rest(Box::new(id("c"))),
    ];
    assert_eq!(bound_names(&params), vec!["a", "b", "c"]);
}
