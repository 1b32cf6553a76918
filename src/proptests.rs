use std::collections::BTreeMap;

use proptest::prelude::*;
use proptest_derive::Arbitrary;

use crate::{LlrbError, LlrbTree};

/// Actions to run against both the tree and the model. Keys are `u8` so
/// sequences collide often, exercising the duplicate, update and delete
/// paths rather than pure growth.
#[derive(Arbitrary, Debug, Clone)]
enum Action {
    Insert(u8, u64),
    Update(u8, u64),
    Delete(u8),
    Get(u8),
}

/// Test harness that executes actions on the tree and a `BTreeMap` model,
/// verifying every structural invariant after each mutation.
#[derive(Default)]
struct Test {
    tree: LlrbTree<u8, u64>,
    model: BTreeMap<u8, u64>,
}

impl Test {
    fn execute(&mut self, action: Action) {
        match action {
            Action::Insert(k, v) => {
                self.tree.reserve(1).unwrap();
                let fresh = self.tree.insert(k, v).unwrap();
                let model_fresh = if self.model.contains_key(&k) {
                    false
                } else {
                    self.model.insert(k, v);
                    true
                };
                assert_eq!(
                    fresh, model_fresh,
                    "insert mismatch: key={k}, tree_fresh={fresh}, model_fresh={model_fresh}"
                );
                self.tree.verify();
            }
            Action::Update(k, v) => {
                let result = self.tree.update(&k, v);
                match self.model.get_mut(&k) {
                    Some(slot) => {
                        let old = std::mem::replace(slot, v);
                        assert_eq!(result.unwrap(), old, "update returned wrong old value");
                    }
                    None => {
                        assert!(
                            matches!(result, Err(LlrbError::NotFound)),
                            "update of absent key {k} did not fail"
                        );
                    }
                }
                self.tree.verify();
            }
            Action::Delete(k) => {
                let removed = self.tree.delete(&k);
                let expected = self.model.remove(&k).map(|v| (k, v));
                assert_eq!(removed, expected, "delete mismatch: key={k}");
                self.tree.verify();
            }
            Action::Get(k) => {
                assert_eq!(
                    self.tree.get(&k),
                    self.model.get(&k),
                    "get mismatch: key={k}"
                );
            }
        }
        assert_eq!(
            self.tree.len(),
            self.model.len(),
            "length mismatch after action"
        );
        assert_eq!(self.tree.is_empty(), self.model.is_empty());
    }

    fn check_inorder(&self) {
        let got: Vec<(u8, u64)> = self.tree.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u8, u64)> = self.model.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(got, expected, "inorder traversal diverged from model");
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn proptest_vs_btreemap(actions in prop::collection::vec(any::<Action>(), 1..64)) {
        let mut test = Test::default();
        for action in actions {
            test.execute(action);
        }
        test.check_inorder();
    }

    #[test]
    fn proptest_range_equals_filtered_inorder(
        actions in prop::collection::vec(any::<Action>(), 1..64),
        a in any::<u8>(),
        b in any::<u8>(),
    ) {
        let mut test = Test::default();
        for action in actions {
            test.execute(action);
        }

        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        let expected: Vec<u8> = test
            .model
            .range(min..=max)
            .map(|(k, _)| *k)
            .collect();

        let got: Vec<u8> = test.tree.range_iter(&min, &max).copied().collect();
        prop_assert_eq!(&got, &expected);

        let mut buf = vec![0u8; test.tree.len()];
        let n = test.tree.range(&min, &max, &mut buf);
        prop_assert_eq!(&buf[..n], &expected[..]);
    }

    #[test]
    fn proptest_insert_delete_roundtrip(
        actions in prop::collection::vec(any::<Action>(), 1..48),
        k in any::<u8>(),
        v in any::<u64>(),
    ) {
        let mut test = Test::default();
        for action in actions {
            test.execute(action);
        }

        // Inserting then deleting a fresh key must restore the exact
        // key-value set.
        prop_assume!(!test.tree.contains_key(&k));
        let before: Vec<(u8, u64)> = test.tree.iter().map(|(key, val)| (*key, *val)).collect();

        test.tree.reserve(1).unwrap();
        prop_assert!(test.tree.insert(k, v).unwrap());
        test.tree.verify();
        prop_assert_eq!(test.tree.delete(&k), Some((k, v)));
        test.tree.verify();

        let after: Vec<(u8, u64)> = test.tree.iter().map(|(key, val)| (*key, *val)).collect();
        prop_assert_eq!(before, after);
    }
}
