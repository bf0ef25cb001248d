//! Stream adapter over a cursor.

use crate::cursor::Cursor;
use crate::error::DriverError;
use docdb_bson::Document;
use tokio_stream::Stream;

impl Cursor {
    /// Turns the cursor into a forward-only stream of documents.
    ///
    /// The stream ends at exhaustion or right after yielding the first
    /// error. Empty batches on a live handle are polled through, so a
    /// tailable cursor gives an endless stream. Dropping the stream at any
    /// point releases the handle.
    pub fn into_stream(self) -> impl Stream<Item = Result<Document, DriverError>> + Send {
        async_stream::stream! {
            let mut cursor = self;
            loop {
                match cursor.next().await {
                    Ok(Some(doc)) => yield Ok(doc),
                    Ok(None) if cursor.is_alive() => continue,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
            cursor.close();
        }
    }
}
