/*
 * concat.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Telaio, a raw-socket HTTP/1.1 client library.
 *
 * Telaio is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Telaio is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Telaio.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Sequential concatenation of streams: reads the current source until it
//! reports 0, then advances to the next; reports 0 only once all are
//! exhausted. A single read continues across source boundaries.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use crate::message::BodyStream;

/// Concatenates an ordered sequence of streams. With `dispose_on_completion`,
/// an exhausted source is dropped as soon as it reports 0 rather than at
/// overall disposal; the decompressor relies on this when it re-assembles a
/// sniffed body prefix with the remaining network stream. Dropping the
/// decorator drops every remaining source exactly once.
pub struct ConcatReader {
    sources: VecDeque<BodyStream>,
    /// Exhausted sources kept alive until overall disposal when
    /// `dispose_on_completion` is off.
    #[allow(dead_code)]
    finished: Vec<BodyStream>,
    dispose_on_completion: bool,
}

impl ConcatReader {
    /// An empty sequence immediately reports end-of-stream.
    pub fn new(sources: Vec<BodyStream>) -> Self {
        Self {
            sources: sources.into(),
            finished: Vec::new(),
            dispose_on_completion: false,
        }
    }

    pub fn dispose_on_completion(mut self, dispose: bool) -> Self {
        self.dispose_on_completion = dispose;
        self
    }
}

impl AsyncRead for ConcatReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        let start = buf.filled().len();
        while buf.remaining() > 0 {
            let Some(current) = me.sources.front_mut() else {
                break;
            };
            let before = buf.filled().len();
            match Pin::new(current).poll_read(cx, buf) {
                Poll::Ready(Ok(())) => {
                    if buf.filled().len() == before {
                        // Current source exhausted; advance, disposing it now
                        // when configured to.
                        if let Some(done) = me.sources.pop_front() {
                            if !me.dispose_on_completion {
                                me.finished.push(done);
                            }
                        }
                    }
                }
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => {
                    if buf.filled().len() > start {
                        return Poll::Ready(Ok(()));
                    }
                    return Poll::Pending;
                }
            }
        }
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;

    /// Source whose Drop is observable, for disposal-timing assertions.
    struct DropFlag {
        data: Cursor<Vec<u8>>,
        dropped: Arc<AtomicBool>,
    }

    impl DropFlag {
        fn new(data: &[u8]) -> (Self, Arc<AtomicBool>) {
            let dropped = Arc::new(AtomicBool::new(false));
            (
                Self {
                    data: Cursor::new(data.to_vec()),
                    dropped: dropped.clone(),
                },
                dropped,
            )
        }
    }

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    impl AsyncRead for DropFlag {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.data).poll_read(cx, buf)
        }
    }

    #[tokio::test]
    async fn sources_in_order_single_large_read() {
        let r = ConcatReader::new(vec![
            Box::new(Cursor::new(b"aa".to_vec())),
            Box::new(Cursor::new(b"bbb".to_vec())),
            Box::new(Cursor::new(b"c".to_vec())),
        ]);
        let mut r = r;
        let mut out = [0u8; 32];
        let n = r.read(&mut out).await.unwrap();
        assert_eq!(&out[..n], b"aabbbc");
        assert_eq!(r.read(&mut out).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_sequence_reports_end_immediately() {
        let mut r = ConcatReader::new(Vec::new());
        let mut out = [0u8; 8];
        assert_eq!(r.read(&mut out).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dispose_on_completion_drops_source_on_the_read_after_exhaustion() {
        let (a, a_dropped) = DropFlag::new(b"xx");
        let (b, b_dropped) = DropFlag::new(b"yy");
        let mut r =
            ConcatReader::new(vec![Box::new(a), Box::new(b)]).dispose_on_completion(true);
        let mut out = [0u8; 2];
        // First read returns all of source a; a has not yet reported 0, so it
        // is not disposed yet.
        assert_eq!(r.read(&mut out).await.unwrap(), 2);
        assert_eq!(&out, b"xx");
        assert!(!a_dropped.load(Ordering::SeqCst));
        // Next read observes a's 0 and advances into b, disposing a.
        assert_eq!(r.read(&mut out).await.unwrap(), 2);
        assert_eq!(&out, b"yy");
        assert!(a_dropped.load(Ordering::SeqCst));
        assert!(!b_dropped.load(Ordering::SeqCst));
        assert_eq!(r.read(&mut out).await.unwrap(), 0);
        assert!(b_dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn without_dispose_sources_live_until_decorator_drops() {
        let (a, a_dropped) = DropFlag::new(b"xx");
        let mut r = ConcatReader::new(vec![Box::new(a)]);
        let mut out = Vec::new();
        r.read_to_end(&mut out).await.unwrap();
        assert!(!a_dropped.load(Ordering::SeqCst));
        drop(r);
        assert!(a_dropped.load(Ordering::SeqCst));
    }
}
