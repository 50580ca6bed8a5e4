//! Cursor pagination helpers.

use std::future::Future;

use tracing::debug;

use crate::error::{Result, TaskMgmtError};
use crate::models::{Named, Page};

/// Largest page the task management API serves
pub const MAX_PAGE_SIZE: u32 = 200;

/// Walk every page and collect the entities.
///
/// `fetch` receives the cursor of the page to load (`None` for the first
/// one). A cursor that repeats is treated as the end of the listing so a
/// misbehaving server cannot loop us forever.
pub async fn collect_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut all = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = fetch(cursor.clone()).await?;
        let next = page.next_cursor().map(str::to_string);
        all.extend(page.entities);

        match next {
            Some(after) if cursor.as_deref() != Some(after.as_str()) => cursor = Some(after),
            _ => break,
        }
    }

    Ok(all)
}

/// Linear scan over every page for an entity with an exact name.
///
/// Stops at the first page containing a match. A miss after the last page
/// is [`TaskMgmtError::NotFound`], which callers may retry while the API
/// catches up.
pub async fn find_id_by_name<T, F, Fut>(entity: &str, name: &str, mut fetch: F) -> Result<String>
where
    T: Named,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(cursor.clone()).await?;
        pages += 1;

        if let Some(found) = page.entities.iter().find(|e| e.name() == name) {
            return Ok(found.id().to_string());
        }

        match page.next_cursor() {
            Some(after) if cursor.as_deref() != Some(after) => cursor = Some(after.to_string()),
            _ => break,
        }
    }

    debug!(entity, name, pages, "Name lookup exhausted all pages");
    Err(TaskMgmtError::name_not_found(entity, name))
}
