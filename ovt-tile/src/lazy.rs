use std::cell::OnceCell;

use ovt_error::OvtResult;

/// `OnceCell::get_or_try_init` for a fallible initializer.
///
/// A failed initialization leaves the cell empty.
pub(crate) fn get_or_try_init<T>(
    cell: &OnceCell<T>,
    init: impl FnOnce() -> OvtResult<T>,
) -> OvtResult<&T> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = init()?;
    Ok(cell.get_or_init(|| value))
}
