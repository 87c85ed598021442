//! Client-side emulation of operators.
//!
//! The source is enumerated once through an [`EmulationCursor`] that checks
//! cancellation before every fetch. Cursors are closed explicitly once the
//! operator returns, whether it succeeded or not.

mod cursor;
mod operators;

pub use cursor::{CursorState, EmulationCursor};

use common_error::QueryResult;
use common_runtime::CancellationToken;
use quarry_core::Element;
use quarry_expr::QueryOutput;

use crate::normalizer::NormalizedInvocation;

/// Emulate an invocation by enumerating its source.
pub async fn emulate<T: Element>(
    invocation: NormalizedInvocation<T>,
    cancel: &CancellationToken,
) -> QueryResult<QueryOutput<T>> {
    if invocation.operator.takes_second_sequence() {
        return operators::set_operation(&invocation, cancel)
            .await
            .map(QueryOutput::Sequence);
    }

    let mut cursor = EmulationCursor::open(&invocation.source, cancel).await?;
    let result = operators::run(&mut cursor, &invocation, cancel).await;
    cursor.close();
    result
}
