use thiserror::Error;

pub type MatResult<T> = Result<T, MatError>;

/// The single failure mode of the crate: a checked element lookup with an
/// index past its axis bound. Every other misuse is either rejected by the
/// type system (shape mismatch on `+`/`*`) or an `unsafe` contract on the
/// kernel primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatError {
    #[error("row index {row} out of range for matrix with {rows} rows")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("column index {col} out of range for matrix with {cols} columns")]
    ColOutOfRange { col: usize, cols: usize },
}
