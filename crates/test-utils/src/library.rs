//! A small in-memory library of genres, authors, book series and books.
//!
//! Records are plain JSON objects tagged with a `"kind"` member so that the
//! shared method names (`getBooks` exists on both genres and authors) can
//! dispatch on the receiver.

use serde_json::{Value, json};

use fnflow::{Callable, Flow, Method, TaskError};

pub fn genres() -> Vec<Value> {
    vec![
        json!({ "kind": "Genre", "id": 1, "name": "Fantasy", "book_ids": [7, 8, 9, 10, 11] }),
        json!({ "kind": "Genre", "id": 2, "name": "Romance" }),
        json!({ "kind": "Genre", "id": 3, "name": "Fiction" }),
        json!({ "kind": "Genre", "id": 4, "name": "Sports" }),
        json!({ "kind": "Genre", "id": 5, "name": "???" }),
    ]
}

pub fn authors() -> Vec<Value> {
    [
        "Patricia Briggs",
        "Clive Cussler",
        "Tom Coughlin",
        "Dan Brown",
        "Robert Jordan",
        "Barbara Hambly",
    ]
    .iter()
    .enumerate()
    .map(|(i, name)| json!({ "kind": "Author", "id": i + 1, "name": name }))
    .collect()
}

pub fn book_series() -> Vec<Value> {
    vec![
        json!({ "kind": "BookSeries", "id": 1, "name": "Mercy Thompson", "authorId": 1 }),
        json!({ "kind": "BookSeries", "id": 2, "name": "The Wheel of Time", "authorId": 5 }),
        json!({ "kind": "BookSeries", "id": 3, "name": "Sun-Cross", "authorId": 6 }),
    ]
}

pub fn books() -> Vec<Value> {
    vec![
        book(1, "Frost Burned", 1, Some(1), 2),
        book(2, "Moon Called", 1, Some(1), 2),
        book(3, "River Marked", 1, Some(1), 2),
        book(4, "The Striker", 2, None, 3),
        book(5, "Earn the Right to Win", 3, None, 4),
        book(6, "Inferno", 4, None, 3),
        book(7, "The Rainbow Abyss", 6, Some(3), 1),
        book(8, "The Magicians of Night", 6, Some(3), 1),
        book(9, "The Eye of the World", 5, Some(2), 1),
        book(10, "The Gathering Storm", 5, Some(2), 1),
        book(11, "The Towers of Midnight", 5, Some(2), 1),
    ]
}

fn book(id: i64, title: &str, author: i64, series: Option<i64>, genre: i64) -> Value {
    let mut record = json!({
        "kind": "Book",
        "id": id,
        "title": title,
        "authorId": author,
        "genreId": genre,
    });
    if let Some(series) = series {
        record["bookSeriesId"] = json!(series);
    }
    record
}

pub fn genre(id: i64) -> Value {
    by_id(genres(), id)
}

pub fn author(id: i64) -> Value {
    by_id(authors(), id)
}

pub fn series(id: i64) -> Value {
    by_id(book_series(), id)
}

pub fn book_by_id(id: i64) -> Value {
    by_id(books(), id)
}

/// Books with the given ids, in the given order.
pub fn books_by_ids(ids: &[i64]) -> Value {
    Value::Array(ids.iter().map(|id| book_by_id(*id)).collect())
}

/// An id given either directly or as a record carrying an `id`.
pub fn id_of(value: &Value) -> Option<i64> {
    match value {
        Value::Object(record) => record.get("id").and_then(Value::as_i64),
        other => other.as_i64(),
    }
}

fn by_id(records: Vec<Value>, id: i64) -> Value {
    records
        .into_iter()
        .find(|r| r["id"].as_i64() == Some(id))
        .unwrap_or(Value::Null)
}

fn by_attribute(records: Vec<Value>, attribute: &str, value: &Value) -> Value {
    records
        .into_iter()
        .find(|r| r.get(attribute) == Some(value))
        .unwrap_or(Value::Null)
}

fn filter_books(pred: impl Fn(&Value) -> bool) -> Value {
    Value::Array(books().into_iter().filter(|b| pred(b)).collect())
}

fn first(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or(Value::Null)
}

pub fn genre_by_name() -> Callable {
    Callable::sync(|args| Ok(by_attribute(genres(), "name", &first(&args))))
}

pub fn genre_by_id() -> Callable {
    Callable::sync(|args| Ok(id_of(&first(&args)).map(genre).unwrap_or(Value::Null)))
}

pub fn author_by_name() -> Callable {
    Callable::sync(|args| Ok(by_attribute(authors(), "name", &first(&args))))
}

pub fn author_by_id() -> Callable {
    Callable::sync(|args| Ok(id_of(&first(&args)).map(author).unwrap_or(Value::Null)))
}

/// Asynchronous on purpose: yields before answering.
pub fn book_by_id_async() -> Callable {
    Callable::new(|args: Vec<Value>| async move {
        tokio::task::yield_now().await;
        Ok(id_of(&first(&args)).map(book_by_id).unwrap_or(Value::Null))
    })
}

pub fn books_by_author_id() -> Callable {
    Callable::sync(|args| {
        let author = id_of(&first(&args));
        Ok(filter_books(|b| b["authorId"].as_i64() == author))
    })
}

pub fn books_by_genre_id() -> Callable {
    Callable::sync(|args| {
        let genre = id_of(&first(&args));
        Ok(filter_books(|b| b["genreId"].as_i64() == genre))
    })
}

/// Fails for genre 5 with "this was a test".
pub fn books_by_genre_and_author() -> Callable {
    Callable::sync(|args| {
        let genre = id_of(&first(&args));
        let author = args.get(1).and_then(id_of);
        find_by_genre_and_author(genre, author)
    })
}

fn find_by_genre_and_author(genre: Option<i64>, author: Option<i64>) -> Result<Value, TaskError> {
    if genre == Some(5) {
        return Err(TaskError::msg("this was a test"));
    }
    Ok(filter_books(|b| {
        b["genreId"].as_i64() == genre && b["authorId"].as_i64() == author
    }))
}

/// Fails with "<kind> did not exist" when its argument is null.
pub fn assert_existence(kind: &'static str) -> Callable {
    Callable::sync(move |args| {
        if first(&args).is_null() {
            return Err(TaskError::msg(format!("{kind} did not exist")));
        }
        Ok(Value::Bool(true))
    })
}

/// Register the record methods on `flow`:
///
/// - `getBooks` on genres and authors
/// - `findBooksByAuthor` and `getGenre` on genres
/// - `getAuthor` and `getBookSeries` on books
pub fn with_methods(flow: Flow) -> Flow {
    flow.method("getBooks", Method::sync(get_books))
        .method(
            "findBooksByAuthor",
            Method::sync(|genre, args| {
                find_by_genre_and_author(id_of(&genre), args.first().and_then(id_of))
            }),
        )
        .method("getGenre", Method::sync(|genre, _| Ok(genre["id"].clone())))
        .method(
            "getAuthor",
            Method::sync(|book, _| Ok(book["authorId"].as_i64().map(author).unwrap_or(Value::Null))),
        )
        .method(
            "getBookSeries",
            Method::sync(|book, _| {
                Ok(book["bookSeriesId"].as_i64().map(series).unwrap_or(Value::Null))
            }),
        )
}

fn get_books(receiver: Value, _args: Vec<Value>) -> Result<Value, TaskError> {
    let id = receiver["id"].as_i64();
    match receiver["kind"].as_str() {
        Some("Genre") => Ok(filter_books(|b| b["genreId"].as_i64() == id)),
        Some("Author") => Ok(filter_books(|b| b["authorId"].as_i64() == id)),
        other => Err(TaskError::msg(format!(
            "getBooks is not defined for {}",
            other.unwrap_or("untyped values")
        ))),
    }
}
