//! Client side of the rule matrix: editable state, diff-batch commit, transport.

pub mod api;
pub mod commit;
pub mod error;
pub mod session;
pub mod state;

pub use api::{HttpMatrixApi, MatrixApi};
pub use commit::{CommitPlan, CommitReport};
pub use error::{ClientError, CommitError, MatrixError};
pub use session::GridSession;
pub use state::{CellKey, CellState, MatrixState, Selection};
