//! Response envelopes. Every success body is `{ "data": ... }`; keyset pages
//! add the cursor for the next page.

use pixora_core::types::DbId;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// One page of a newest-first listing.
///
/// `next_before` is the id to pass as `before` for the following page, or
/// `null` once a short page shows the listing is exhausted.
#[derive(Debug, Serialize)]
pub struct PageResponse<T: Serialize> {
    pub data: Vec<T>,
    pub next_before: Option<DbId>,
}

impl<T: Serialize> PageResponse<T> {
    pub fn new(data: Vec<T>, limit: i64, id_of: impl Fn(&T) -> DbId) -> Self {
        let full = usize::try_from(limit).is_ok_and(|limit| data.len() >= limit);
        let next_before = if full { data.last().map(&id_of) } else { None };
        Self { data, next_before }
    }
}
