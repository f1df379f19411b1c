//! Client-side completion of lookups the server cannot express.
//!
//! The server narrows a result set on one field; the remaining fields of a
//! compound key are checked here. Cost is linear in what the server returned.

/// First element satisfying `pred`, in the order the server returned them.
pub fn first_match<T, P>(items: Vec<T>, pred: P) -> Option<T>
where
    P: FnMut(&T) -> bool,
{
    items.into_iter().find(pred)
}

/// First element of a server-filtered set. Display names are treated as
/// unique, so the first match is authoritative.
pub fn first<T>(items: Vec<T>) -> Option<T> {
    items.into_iter().next()
}
