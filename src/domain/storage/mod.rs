//! Storage domain - generic table/row collaborator used by the repositories

mod repository;
mod row;

pub use repository::Storage;
pub use row::{apply_patch, from_row, row_id, stamp_new_row, tables, to_row, Row, RowFilter};

#[cfg(test)]
pub use repository::mock;
