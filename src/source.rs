// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Server-side row sources.
//!
//! A [`RowSource`] produces one page of rows for the grid's current view state.
//! [`Grid::load_page`] asks it for the page the grid is on and commits the answer
//! as a replace-all transaction, so a failing source never disturbs what the grid
//! already holds.
use crate::{
    Changes, Grid, GridError, Row,
    model::{FilterModel, SortModel},
    transaction::ManagerBuilder,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What a row source is asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowRequest {
    pub page: usize,
    pub page_size: usize,
    pub sort_model: SortModel,
    pub filter_model: FilterModel,
}

/// One page of rows and the size of the whole result set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPage {
    pub data: Vec<Row>,
    pub total_rows: usize,
}

/// Fetches pages of rows from outside the grid.
///
/// Filtering, sorting and paging are the source's job; the grid stores the rows it
/// gets back as they are.
pub trait RowSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get_rows(&self, request: RowRequest) -> Result<RowPage, Self::Error>;
}

impl Grid {
    /// Loads the current page from `source` and replaces the grid's rows with it.
    ///
    /// The page is clamped against the reported `total_rows`, which stays available
    /// through [`Grid::total_rows`] until the next reset or load, or until a
    /// transaction adds or removes rows locally.
    ///
    /// # Errors
    ///
    /// [`GridError::RowSource`] if the source fails, or any error of the replace-all
    /// transaction (for example rows without identifiers). The grid is unchanged
    /// in either case.
    pub fn load_page<S: RowSource>(&self, source: &S) -> Result<Changes, GridError> {
        let (pagination, sort_model, filter_model) = self.view_snapshot();
        let request = RowRequest {
            page: pagination.current_page,
            page_size: pagination.page_size,
            sort_model,
            filter_model,
        };
        debug!(page = request.page, page_size = request.page_size, "requesting rows");

        let page = source.get_rows(request).map_err(|err| {
            warn!(error = %err, "row source failed");
            GridError::RowSource(Box::new(err))
        })?;

        ManagerBuilder::new(self)
            .queue_replace_all(page.data, None, Some(page.total_rows))?
            .execute()
    }
}
