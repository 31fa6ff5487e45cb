//! Presentation surface: display state, view bounds and report output

pub mod formatting;
pub mod view;

pub use formatting::{CsvFormatter, JsonFormatter, LayoutReport, PositionRow, ReferenceRow, TextFormatter};
pub use view::{DisplayState, ViewBox};
