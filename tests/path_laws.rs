//! Algebraic laws of path views over arbitrary states.

mod common;

use arbor::path::PathView;
use common::*;
use proptest::prelude::*;

fn doc_strategy() -> impl Strategy<Value = Doc> {
    (
        any::<i64>(),
        "[a-z]{0,8}",
        prop::collection::btree_set(0u32..20, 0..8),
        prop::option::of("[a-z]{0,6}"),
    )
        .prop_map(|(count, title, ids, draft)| Doc {
            count,
            title,
            mode: match draft {
                Some(text) => Mode::Editing(Draft { text }),
                None => Mode::Idle,
            },
            ..Doc::with_rows(ids)
        })
}

proptest! {
    #[test]
    fn field_read_after_write(doc in doc_strategy(), value in any::<i64>()) {
        let written = count().write(doc, value);
        prop_assert_eq!(count().read(&written), Some(value));
    }

    #[test]
    fn element_read_after_write_or_no_op(doc in doc_strategy(), id in 0u32..20, value in "[a-z]{1,6}") {
        let path = row_label(id);
        let resolved = path.read(&doc).is_some();
        let written = path.write(doc.clone(), value.clone());
        if resolved {
            prop_assert_eq!(path.read(&written), Some(value));
            prop_assert_eq!(written.rows.len(), doc.rows.len());
        } else {
            prop_assert_eq!(written, doc);
        }
    }

    #[test]
    fn case_read_after_write_or_no_op(doc in doc_strategy(), value in "[a-z]{1,6}") {
        let path = draft_text();
        let resolved = path.read(&doc).is_some();
        let written = path.write(doc.clone(), value.clone());
        if resolved {
            prop_assert_eq!(path.read(&written), Some(value));
        } else {
            prop_assert_eq!(written, doc);
        }
    }

    #[test]
    fn clear_value_makes_case_writes_resolve(doc in doc_strategy(), value in "[a-z]{1,6}") {
        let editing = editing().with_clear_value(Draft { text: String::new() });
        let path = mode().then(&editing).then(&text());
        let written = path.write(doc, value.clone());
        prop_assert_eq!(path.read(&written), Some(value));
    }

    #[test]
    fn composed_read_is_sequential_read(doc in doc_strategy()) {
        let outer = mode().then(&editing());
        let inner = text();
        let composed = outer.then(&inner);
        let expected = outer.read(&doc).and_then(|draft| inner.read(&draft));
        prop_assert_eq!(composed.read(&doc), expected);
    }

    #[test]
    fn composition_is_associative(doc in doc_strategy(), value in "[a-z]{1,6}") {
        let left = mode().then(&editing()).then(&text());
        let right = mode().then(&editing().then(&text()));
        prop_assert_eq!(left.key(), right.key());
        prop_assert_eq!(left.read(&doc), right.read(&doc));
        prop_assert_eq!(left.write(doc.clone(), value.clone()), right.write(doc, value));
    }

    #[test]
    fn identity_is_the_unit(doc in doc_strategy(), value in any::<i64>()) {
        let left = PathView::identity().then(&count());
        let right = count().then(&PathView::identity());
        let unit = count();
        prop_assert_eq!(left.key(), unit.key());
        prop_assert_eq!(right.key(), unit.key());
        prop_assert_eq!(left.read(&doc), count().read(&doc));
        prop_assert_eq!(right.write(doc.clone(), value), count().write(doc, value));
    }
}

#[test]
fn case_keys_ignore_payload() {
    let first = editing();
    let second = PathView::case(
        "Editing",
        |_: &Mode| Some(Draft { text: "other".into() }),
        Mode::Editing,
    );
    assert_eq!(first, second);
}
