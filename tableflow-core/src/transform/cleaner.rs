//! Blank cell replacement.

use crate::table::{Scalar, TableValue};

/// Sentinel written in place of blank cells.
pub const NIL: &str = "NIL";

/// Replace every blank cell with [`NIL`].
///
/// Missing cells and whitespace-only text are blank. Everything else passes
/// through unchanged, including numeric zero and the text `"0"`.
pub fn clean(table: &TableValue) -> TableValue {
    table.map_cells(|_, cell| {
        if cell.is_blank() {
            Scalar::from(NIL)
        } else {
            cell.clone()
        }
    })
}
