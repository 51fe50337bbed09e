#![allow(dead_code)]

use serde_json::{Value, json};

use fnflow::{Flow, Task};
pub use fnflow_test_utils::library::*;
pub use fnflow_test_utils::recording::RecordingBackend;
pub use fnflow_test_utils::{init_tracing, object, with_timeout};

/// The genre/author/book lookups most tests start from, with the record
/// methods registered.
pub fn genre_lookup() -> Flow {
    with_methods(
        Flow::new()
            .task("getAuthor", Task::call(author_by_name()).arg("authorName"))
            .task("getGenre", Task::call(genre_by_name()).arg("genreName"))
            .task(
                "assertGenreExistence",
                Task::call(assert_existence("Genre")).arg("getGenre"),
            ),
    )
}

pub fn dan_brown_fiction() -> Value {
    json!({ "authorName": "Dan Brown", "genreName": "Fiction" })
}

/// Five authors of the Fantasy books, in book order.
pub fn fantasy_authors(key: &str) -> Value {
    Value::Array(
        [6, 6, 5, 5, 5]
            .iter()
            .map(|id| {
                let mut child = serde_json::Map::new();
                child.insert(key.to_string(), author(*id));
                Value::Object(child)
            })
            .collect(),
    )
}
