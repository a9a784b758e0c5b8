use futures::stream::{self, Stream};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("page {0} is unavailable")]
    Unavailable(usize),
}

/// Fake paginated download: yields the running total of bytes after each page,
/// failing at page `fail_at` when given.
pub fn download(
    pages: Vec<u64>,
    fail_at: Option<usize>,
    delay: Duration,
) -> impl Stream<Item = Result<u64, FetchError>> {
    stream::unfold((0usize, 0u64, false), move |(index, total, failed)| {
        let page = pages.get(index).copied();
        async move {
            let page = match page {
                Some(page) if !failed => page,
                _ => return None,
            };
            tokio::time::sleep(delay).await;
            if fail_at == Some(index) {
                return Some((Err(FetchError::Unavailable(index)), (index, total, true)));
            }
            let total = total + page;
            Some((Ok(total), (index + 1, total, false)))
        }
    })
}
