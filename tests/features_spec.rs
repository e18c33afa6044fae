use std::sync::atomic::{AtomicBool, Ordering};

use gemini::config::Properties;
use gemini::error::Error;
use gemini::features::{FeatureDefinition, FeatureManager};
use speculate2::speculate;

speculate! {
    before {
        let features = FeatureManager::new();
        features
            .add("monitor", "Health monitoring")
            .expect("Failed to add root")
            .add("cpu", "CPU sampling")
            .expect("Failed to add child")
            .add("memory", "Memory sampling")
            .expect("Failed to add child");
    }

    describe "on" {
        it "is true when the node and its ancestors are enabled" {
            assert!(features.on("monitor"));
            assert!(features.on("cpu"));
        }

        it "follows the parent without touching the child's own flag" {
            features.set("monitor", false);
            assert!(!features.on("cpu"));
            assert_eq!(features.is_enabled("cpu"), Some(true));
            assert!(features.node("cpu").expect("missing node").is_enabled());
            assert!(!features.node("cpu").expect("missing node").is_fully_enabled());
        }

        it "is false for keys that were never registered" {
            assert!(!features.on("does-not-exist"));
        }

        it "is case sensitive" {
            assert!(!features.on("CPU"));
        }
    }

    describe "registration" {
        it "rejects a duplicate root key" {
            let result = features.add("monitor", "again");
            assert!(matches!(result, Err(Error::DuplicateFeatureKey(_))));
        }

        it "rejects a duplicate key deeper in the tree" {
            let result = features
                .node("cpu")
                .expect("missing node")
                .add("memory", "again");
            assert!(matches!(result, Err(Error::DuplicateFeatureKey(_))));
            assert_eq!(features.len(), 3);
        }

        it "exposes the hierarchy through node handles" {
            let cpu = features.node("cpu").expect("missing node");
            assert_eq!(cpu.parent().expect("missing parent").key(), "monitor");
            assert_eq!(cpu.description(), "CPU sampling");

            let children: Vec<String> = features
                .node("monitor")
                .expect("missing node")
                .children()
                .iter()
                .map(|c| c.key())
                .collect();
            assert_eq!(children, vec!["cpu", "memory"]);
        }

        it "makes new nodes visible to on immediately" {
            features
                .node("cpu")
                .expect("missing node")
                .add_with_default("cpu-temp", "Temperature", false)
                .expect("Failed to add child");
            assert!(!features.on("cpu-temp"));
            features.set("cpu-temp", true);
            assert!(features.on("cpu-temp"));
        }
    }

    describe "configure" {
        it "resolves dotted keys by their last segment" {
            let props = Properties::parse("Feature.monitor.memory = false\n");
            assert_eq!(features.configure(&props), 1);
            assert!(!features.on("memory"));
            assert!(features.on("cpu"));
        }

        it "ignores a misspelled prefix" {
            let props = Properties::parse("Feature.monitr.cpu = false\n");
            assert_eq!(features.configure(&props), 1);
            assert!(!features.on("cpu"));
        }

        it "skips unknown keys and bad values" {
            let props = Properties::parse("Feature.ghost = true\nFeature.cpu = perhaps\nOther.cpu = false\n");
            assert_eq!(features.configure(&props), 0);
            assert!(features.on("cpu"));
        }
    }

    describe "views" {
        it "reports both flags in each status" {
            features.set("monitor", false);
            let statuses = features.statuses();
            let cpu = statuses.iter().find(|s| s.key == "cpu").expect("missing status");
            assert!(cpu.enabled);
            assert!(!cpu.effective);
            assert_eq!(cpu.parent.as_deref(), Some("monitor"));
        }

        it "nests children in the tree view" {
            let tree = features.tree();
            assert_eq!(tree.len(), 1);
            assert_eq!(tree[0].status.key, "monitor");
            assert_eq!(tree[0].children.len(), 2);
        }
    }

    describe "concurrency" {
        it "serves readers while flags change" {
            let done = AtomicBool::new(false);
            std::thread::scope(|scope| {
                let reader = scope.spawn(|| {
                    let mut reads = 0;
                    loop {
                        let map = features.status_map();
                        // One published map never shows a child on under an off parent.
                        if map.get("cpu") == Some(&true) {
                            assert_eq!(map.get("monitor"), Some(&true));
                        }
                        reads += 1;
                        if done.load(Ordering::Acquire) {
                            break reads;
                        }
                    }
                });

                for round in 0..500 {
                    features.set("monitor", round % 2 == 0);
                    features.toggle("cpu");
                }
                done.store(true, Ordering::Release);
                assert!(reader.join().expect("reader panicked") > 0);
            });
        }
    }

    describe "definitions" {
        it "builds a separate manager from JSON" {
            let definitions = FeatureDefinition::parse(
                r#"[{ "key": "search", "children": [{ "key": "search-suggest", "enabled": false }] }]"#,
            )
            .expect("Failed to parse");
            let declared = FeatureManager::from_definitions(&definitions).expect("Failed to build");
            assert!(declared.on("search"));
            assert!(!declared.on("search-suggest"));
            assert!(!features.on("search"));
        }
    }
}
