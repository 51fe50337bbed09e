use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use serde_json::{Value, json};

use fnflow::{Callable, Flow, Task};

// Acyclic by construction: task N may only reference tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, deps)| {
                    if i == 0 {
                        BTreeSet::new()
                    } else {
                        deps.into_iter().map(|d| d % i).collect()
                    }
                })
                .collect()
        })
    })
}

type CallLog = Arc<Mutex<Vec<(String, Vec<Value>)>>>;

/// Every task returns its own index, optionally failing.
fn build_flow(deps: &[BTreeSet<usize>], failing: &BTreeSet<usize>, log: &CallLog) -> Flow {
    let mut flow = Flow::new();
    for (i, task_deps) in deps.iter().enumerate() {
        let name = format!("task_{i}");
        let log = Arc::clone(log);
        let fails = failing.contains(&i);
        let body_name = name.clone();
        let body = Callable::sync(move |args| {
            if let Ok(mut guard) = log.lock() {
                guard.push((body_name.clone(), args));
            }
            if fails {
                Err(fnflow::TaskError::msg("planned failure"))
            } else {
                Ok(json!(i))
            }
        });
        let args: Vec<String> = task_deps.iter().map(|d| format!("task_{d}")).collect();
        flow = flow.task(name, Task::call(body).args(args));
    }
    flow
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("tokio runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_task_runs_once_after_its_arguments(deps in dag_strategy(10)) {
        let log: CallLog = Arc::default();
        let flow = build_flow(&deps, &BTreeSet::new(), &log);

        let outcome = runtime().block_on(flow.execute(json!({}))).unwrap();
        prop_assert!(outcome.is_ok());

        let calls = log.lock().unwrap().clone();
        prop_assert_eq!(calls.len(), deps.len());

        let mut position = HashMap::new();
        for (pos, (name, _)) in calls.iter().enumerate() {
            prop_assert!(position.insert(name.clone(), pos).is_none(), "{} ran twice", name);
        }
        for (i, task_deps) in deps.iter().enumerate() {
            let me = position[&format!("task_{i}")];
            for d in task_deps {
                let dep = format!("task_{d}");
                prop_assert!(position[&dep] < me);
            }
            let (_, args) = &calls[me];
            let expected: Vec<Value> = task_deps.iter().map(|d| json!(d)).collect();
            prop_assert_eq!(args, &expected);
            prop_assert_eq!(&outcome.results[format!("task_{i}")], &json!(i));
        }
    }

    #[test]
    fn dependents_of_failures_never_run(
        deps in dag_strategy(8),
        failing in proptest::collection::btree_set(0..8usize, 1..3),
    ) {
        let failing: BTreeSet<usize> = failing.into_iter().filter(|i| *i < deps.len()).collect();
        prop_assume!(!failing.is_empty());

        let log: CallLog = Arc::default();
        let flow = build_flow(&deps, &failing, &log);
        let outcome = runtime().block_on(flow.execute(json!({}))).unwrap();
        prop_assert!(outcome.error.is_some());

        let ran: BTreeSet<usize> = log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(name, _)| name.strip_prefix("task_")?.parse().ok())
            .collect();
        for i in 0..deps.len() {
            let key = format!("task_{i}");
            let recorded = outcome.results.get(&key).is_some();
            if failing.contains(&i) {
                prop_assert!(!recorded);
            }
            if recorded {
                prop_assert!(ran.contains(&i));
            }
            if deps[i].iter().any(|d| failing.contains(d)) {
                prop_assert!(!ran.contains(&i));
            }
        }
    }

    #[test]
    fn array_input_preserves_order(ids in proptest::collection::vec(0..1000i64, 0..12)) {
        let flow = Flow::new().task(
            "double",
            Task::call(Callable::new(|args: Vec<Value>| async move {
                let n = args[0].as_i64().unwrap_or_default();
                tokio::time::sleep(std::time::Duration::from_micros((n % 7) as u64 * 100)).await;
                Ok(json!(n * 2))
            }))
            .arg("n"),
        );
        let input = Value::Array(ids.iter().map(|n| json!({ "n": n })).collect());

        let outcome = runtime().block_on(flow.execute(input)).unwrap();
        prop_assert!(outcome.is_ok());

        let expected: Vec<Value> = ids.iter().map(|n| json!({ "n": n, "double": n * 2 })).collect();
        prop_assert_eq!(outcome.results, Value::Array(expected));
    }

    #[test]
    fn planning_is_memoized_per_key_set(deps in dag_strategy(8)) {
        let log: CallLog = Arc::default();
        let flow = build_flow(&deps, &BTreeSet::new(), &log);

        let first = flow.plan(&["b".to_string(), "a".to_string()]).unwrap();
        let second = flow.plan(&["a".to_string(), "b".to_string()]).unwrap();
        prop_assert!(Arc::ptr_eq(&first, &second));

        let names: Vec<&str> = first.task_names().collect();
        prop_assert_eq!(names.len(), deps.len());
    }
}
