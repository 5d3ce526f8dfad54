use std::io::Write;

use crate::core::GenericResult;

use super::HttpResponse;

pub trait ResponseReader {
    type Result;

    fn read(self, response: HttpResponse) -> GenericResult<Self::Result>;
}

pub struct TextReplyReader {
}

impl TextReplyReader {
    pub fn new() -> TextReplyReader {
        TextReplyReader {}
    }
}

impl ResponseReader for TextReplyReader {
    type Result = String;

    fn read(self, response: HttpResponse) -> GenericResult<Self::Result> {
        Ok(response.text().map_err(|e| format!(
            "Failed to receive server response: {}", e))?)
    }
}

/// Streams response body into the writer, returning the number of bytes written.
pub struct StreamReplyReader<W> {
    writer: W,
}

impl<W: Write> StreamReplyReader<W> {
    pub fn new(writer: W) -> StreamReplyReader<W> {
        StreamReplyReader {writer}
    }
}

impl<W: Write> ResponseReader for StreamReplyReader<W> {
    type Result = u64;

    fn read(mut self, mut response: HttpResponse) -> GenericResult<Self::Result> {
        let size = response.copy_to(&mut self.writer).map_err(|e| format!(
            "Failed to receive server response: {}", e))?;
        self.writer.flush()?;
        Ok(size)
    }
}
