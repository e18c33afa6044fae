use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gemini::db::Database;
use gemini::error::{Error, Result};
use gemini::relation::*;
use speculate2::speculate;

#[derive(Debug, Clone, PartialEq)]
struct User {
    id: i64,
    name: String,
}

impl Entity for User {
    const ENTITY_TYPE: &'static str = "user";

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Group {
    id: i64,
}

impl Entity for Group {
    const ENTITY_TYPE: &'static str = "group";

    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone)]
struct Person {
    id: i64,
}

impl Entity for Person {
    const ENTITY_TYPE: &'static str = "person";

    fn id(&self) -> i64 {
        self.id
    }
}

/// Store whose writes always fail.
struct FailingStore;

impl RelationStore for FailingStore {
    fn load(&self, _relation: &str) -> Result<Vec<Pair>> {
        Ok(Vec::new())
    }

    fn insert(&self, _relation: &str, _pairs: &[Pair]) -> Result<()> {
        Err(Error::Config("store unavailable".to_string()))
    }

    fn delete(&self, _relation: &str, _pairs: &[Pair]) -> Result<()> {
        Err(Error::Config("store unavailable".to_string()))
    }

    fn replace(&self, _relation: &str, _added: &[Pair], _removed: &[Pair]) -> Result<()> {
        Err(Error::Config("store unavailable".to_string()))
    }

    fn clear(&self, _relation: &str) -> Result<()> {
        Err(Error::Config("store unavailable".to_string()))
    }
}

fn pairs(range: std::ops::Range<i64>, right: i64) -> Vec<Pair> {
    range.map(|left| Pair::new(left, right)).collect()
}

speculate! {
    before {
        let relation = IdRelation::in_memory("user_groups");
    }

    describe "add" {
        it "makes the pair visible from both sides" {
            assert!(relation.add(1, 10).expect("add failed"));

            assert!(relation.contains(1, 10));
            assert!(relation.contains_left_value(1));
            assert!(relation.contains_right_value(10));
            assert_eq!(relation.right_ids(1), BTreeSet::from([10]));
            assert_eq!(relation.left_ids(10), BTreeSet::from([1]));
        }

        it "returns false for a pair already present" {
            relation.add(1, 10).expect("add failed");
            assert!(!relation.add(1, 10).expect("add failed"));
            assert_eq!(relation.size(), 1);
        }

        it "counts only new pairs in bulk adds" {
            relation.add(1, 10).expect("add failed");
            let added = relation
                .add_all([Pair::new(1, 10), Pair::new(1, 11), Pair::new(2, 10)])
                .expect("add_all failed");
            assert_eq!(added, 2);
            assert_eq!(relation.size(), 3);
        }
    }

    describe "remove" {
        it "removes a present pair" {
            relation.add(1, 10).expect("add failed");
            assert!(relation.remove(1, 10).expect("remove failed"));
            assert!(!relation.contains(1, 10));
            assert!(!relation.contains_left_value(1));
        }

        it "returns false for a missing pair" {
            assert!(!relation.remove(5, 5).expect("remove failed"));
        }

        it "removes all pairs of one left value" {
            relation
                .add_all([Pair::new(1, 10), Pair::new(1, 11), Pair::new(2, 10)])
                .expect("add_all failed");
            assert_eq!(relation.remove_left_value(1).expect("remove failed"), 2);
            assert_eq!(relation.pairs(), vec![Pair::new(2, 10)]);
        }

        it "removes all pairs of one right value" {
            relation
                .add_all([Pair::new(1, 10), Pair::new(1, 11), Pair::new(2, 10)])
                .expect("add_all failed");
            assert_eq!(relation.remove_right_value(10).expect("remove failed"), 2);
            assert_eq!(relation.pairs(), vec![Pair::new(1, 11)]);
        }
    }

    describe "queries" {
        it "returns empty sets for unknown ids" {
            assert!(relation.left_ids(99).is_empty());
            assert!(relation.right_ids(99).is_empty());
            assert_eq!(relation.left_count(99), 0);
        }

        it "reports cardinality per side" {
            relation
                .add_all([Pair::new(1, 10), Pair::new(2, 10), Pair::new(3, 10), Pair::new(1, 11)])
                .expect("add_all failed");
            assert_eq!(relation.left_count(10), 3);
            assert_eq!(relation.right_count(1), 2);
            assert_eq!(relation.size(), 4);
        }
    }

    describe "clear" {
        it "empties the relation" {
            relation.add(1, 10).expect("add failed");
            relation.clear().expect("clear failed");
            assert!(relation.is_empty());
        }
    }

    describe "replace_all" {
        it "swaps contents" {
            relation.add_all(pairs(0..5, 1)).expect("add_all failed");
            relation.replace_all(pairs(3..8, 1)).expect("replace failed");
            assert_eq!(relation.pairs(), pairs(3..8, 1));
        }

        it "accepts an empty replacement" {
            relation.add(1, 1).expect("add failed");
            relation.replace_all(Vec::<Pair>::new()).expect("replace failed");
            assert!(relation.is_empty());
        }

        it "never exposes an empty window to readers" {
            let relation = Arc::new(IdRelation::in_memory("window"));
            let old = pairs(0..100, 0);
            let new = pairs(0..150, 1);
            relation.replace_all(old.clone()).expect("replace failed");

            let done = AtomicBool::new(false);
            std::thread::scope(|scope| {
                let reader = scope.spawn(|| {
                    let mut observed = 0;
                    loop {
                        let size = relation.size();
                        assert!(size == 100 || size == 150, "observed size {}", size);
                        let snapshot = relation.snapshot();
                        assert!(snapshot.len() == 100 || snapshot.len() == 150);
                        observed += 1;
                        if done.load(Ordering::Acquire) {
                            break observed;
                        }
                    }
                });

                for round in 0..200 {
                    let next = if round % 2 == 0 { new.clone() } else { old.clone() };
                    relation.replace_all(next).expect("replace failed");
                }
                done.store(true, Ordering::Release);
                assert!(reader.join().expect("reader panicked") > 0);
            });
        }

        it "rejects negative ids without changing anything" {
            relation.add(1, 1).expect("add failed");
            let result = relation.replace_all([Pair::new(2, 2), Pair::new(-3, 2)]);
            assert!(matches!(result, Err(Error::InvalidId { .. })));
            assert_eq!(relation.pairs(), vec![Pair::new(1, 1)]);
        }
    }

    describe "store failures" {
        it "leave the in-memory relation unchanged" {
            let failing = IdRelation::new("failing", Arc::new(FailingStore));
            assert!(failing.add(1, 1).is_err());
            assert!(!failing.contains(1, 1));
            assert!(failing.replace_all([Pair::new(1, 1)]).is_err());
            assert!(failing.is_empty());
        }
    }

    describe "persistence" {
        it "survives reopening from the database" {
            let db = Database::open_memory().expect("Failed to create database");
            db.migrate().expect("Failed to migrate");
            let store: Arc<dyn RelationStore> = Arc::new(db.clone());

            let first = IdRelation::open("tags", Arc::clone(&store)).expect("open failed");
            first.add_all([Pair::new(1, 2), Pair::new(3, 4)]).expect("add_all failed");
            first.remove(1, 2).expect("remove failed");
            first.add(5, 6).expect("add failed");

            let second = IdRelation::open("tags", store).expect("open failed");
            assert_eq!(second.pairs(), vec![Pair::new(3, 4), Pair::new(5, 6)]);
        }

        it "writes only the difference on replace" {
            let db = Database::open_memory().expect("Failed to create database");
            db.migrate().expect("Failed to migrate");
            let store: Arc<dyn RelationStore> = Arc::new(db.clone());

            let tags = IdRelation::open("tags", Arc::clone(&store)).expect("open failed");
            tags.add_all(pairs(0..10, 1)).expect("add_all failed");
            tags.replace_all(pairs(5..15, 1)).expect("replace failed");

            assert_eq!(db.count_pairs("tags").expect("count failed"), 10);
            let reopened = IdRelation::open("tags", store).expect("open failed");
            assert_eq!(reopened.pairs(), pairs(5..15, 1));
        }

        it "reload picks up external changes" {
            let db = Database::open_memory().expect("Failed to create database");
            db.migrate().expect("Failed to migrate");
            let store: Arc<dyn RelationStore> = Arc::new(db.clone());

            let cached = IdRelation::open("tags", Arc::clone(&store)).expect("open failed");
            store.insert("tags", &[Pair::new(7, 7)]).expect("insert failed");
            assert!(!cached.contains(7, 7));

            cached.reload().expect("reload failed");
            assert!(cached.contains(7, 7));
        }
    }

    describe "entity relation" {
        it "adds and queries by entity" {
            let memberships: EntityRelation<User, Group> =
                EntityRelation::new(Arc::new(IdRelation::in_memory("memberships")));
            let alice = User { id: 1, name: "Alice".to_string() };
            let admins = Group { id: 10 };

            assert!(memberships.add_entities(&alice, &admins).expect("add failed"));
            assert!(memberships.contains_entities(&alice, &admins));
            assert_eq!(memberships.size(), 1);
        }

        it "cascades entity removal on the matching side" {
            let memberships: EntityRelation<User, Group> =
                EntityRelation::new(Arc::new(IdRelation::in_memory("memberships")));
            memberships
                .add_all([Pair::new(1, 10), Pair::new(1, 11), Pair::new(2, 10)])
                .expect("add_all failed");

            assert_eq!(memberships.remove_entity(&Group { id: 10 }).expect("remove failed"), 2);
            assert_eq!(memberships.pairs(), vec![Pair::new(1, 11)]);

            assert_eq!(
                memberships.remove_entity_by_type("user", 1).expect("remove failed"),
                1
            );
            assert!(memberships.is_empty());
        }

        it "ignores entities of unrelated types" {
            let memberships: EntityRelation<User, Group> =
                EntityRelation::new(Arc::new(IdRelation::in_memory("memberships")));
            memberships.add(1, 1).expect("add failed");
            assert_eq!(memberships.remove_entity(&Person { id: 1 }).expect("remove failed"), 0);
            assert_eq!(memberships.size(), 1);
        }

        it "removes both sides when they share a type" {
            let follows: EntityRelation<User, User> =
                EntityRelation::new(Arc::new(IdRelation::in_memory("follows")));
            follows
                .add_all([Pair::new(1, 2), Pair::new(2, 1), Pair::new(2, 3)])
                .expect("add_all failed");

            assert_eq!(
                follows.remove_entity(&User { id: 1, name: String::new() }).expect("remove failed"),
                2
            );
            assert_eq!(follows.pairs(), vec![Pair::new(2, 3)]);
        }

        it "materializes values through a lookup" {
            let memberships: EntityRelation<User, Group> =
                EntityRelation::new(Arc::new(IdRelation::in_memory("memberships")));
            memberships
                .add_all([Pair::new(1, 10), Pair::new(2, 10), Pair::new(3, 10)])
                .expect("add_all failed");

            let users: HashMap<i64, User> = [
                (1, User { id: 1, name: "Alice".to_string() }),
                (3, User { id: 3, name: "Carol".to_string() }),
            ]
            .into_iter()
            .collect();

            let names: Vec<String> = memberships
                .left_values(10, &users)
                .into_iter()
                .map(|u| u.name)
                .collect();
            assert_eq!(names, vec!["Alice", "Carol"]);

            let groups: HashMap<i64, Group> = [(10, Group { id: 10 })].into_iter().collect();
            assert_eq!(memberships.right_values(2, &groups), vec![Group { id: 10 }]);
        }
    }
}
