//! Query surfaces exposed by [`Pipeline`](crate::Pipeline).

mod history;

pub use history::HistoryApi;
