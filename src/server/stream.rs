//! Simulated streaming
//!
//! The backend only returns complete answers. Streaming responses replay an
//! answer word by word with a fixed pause between pieces.

use futures::{Stream, StreamExt, stream};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause between chunks for the OpenAI and Anthropic dialects
pub const CHAT_CHUNK_DELAY: Duration = Duration::from_millis(20);
/// Pause between chunks for the Google dialect
pub const GEMINI_CHUNK_DELAY: Duration = Duration::from_millis(30);

/// Split an answer on single spaces; every piece but the last keeps its
/// trailing space so the pieces concatenate back to the answer
pub fn split_into_chunks(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let words: Vec<&str> = text.split(' ').collect();
    let last = words.len() - 1;
    words
        .into_iter()
        .enumerate()
        .map(|(i, word)| {
            if i < last {
                format!("{word} ")
            } else {
                word.to_string()
            }
        })
        .collect()
}

/// Emit `chunks` with `delay` between them until exhausted or cancelled
pub fn paced_chunks(
    chunks: Vec<String>,
    delay: Duration,
    cancel: CancellationToken,
) -> impl Stream<Item = String> + Send + 'static {
    stream::iter(chunks.into_iter().enumerate())
        .then(move |(i, chunk)| async move {
            if i > 0 {
                tokio::time::sleep(delay).await;
            }
            chunk
        })
        .take_until(cancel.cancelled_owned())
}

/// Closing frames of a simulated stream; yields nothing when `cancel` fired
/// before the preceding chunks ran out
pub fn closing_frames<T>(
    frames: Vec<T>,
    cancel: CancellationToken,
) -> impl Stream<Item = T> + Send + 'static
where
    T: Send + 'static,
{
    stream::once(async move {
        if cancel.is_cancelled() {
            Vec::new()
        } else {
            frames
        }
    })
    .flat_map(stream::iter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_keeps_trailing_spaces() {
        assert_eq!(
            split_into_chunks("Hello brave new world"),
            vec!["Hello ", "brave ", "new ", "world"]
        );
    }

    #[test]
    fn test_split_round_trips_irregular_spacing() {
        let text = "a  b\nc ";
        assert_eq!(split_into_chunks(text).concat(), text);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_into_chunks("").is_empty());
        assert_eq!(split_into_chunks("single"), vec!["single"]);
    }

    #[tokio::test]
    async fn test_paced_chunks_emit_all() {
        let chunks = split_into_chunks("one two three");
        let collected: Vec<String> =
            paced_chunks(chunks, Duration::from_millis(1), CancellationToken::new())
                .collect()
                .await;
        assert_eq!(collected.concat(), "one two three");
    }

    #[tokio::test]
    async fn test_paced_chunks_stop_on_cancel() {
        let token = CancellationToken::new();
        let chunks = split_into_chunks(&"word ".repeat(50));
        let mut stream = Box::pin(paced_chunks(chunks, Duration::from_millis(20), token.clone()));

        assert!(stream.next().await.is_some());
        token.cancel();
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_closing_frames_follow_finished_chunks() {
        let token = CancellationToken::new();
        let chunks = split_into_chunks("one two");
        let collected: Vec<String> =
            paced_chunks(chunks, Duration::from_millis(1), token.clone())
                .chain(closing_frames(vec!["[DONE]".to_string()], token))
                .collect()
                .await;
        assert_eq!(collected, vec!["one ", "two", "[DONE]"]);
    }

    #[tokio::test]
    async fn test_closing_frames_dropped_after_cancel() {
        let token = CancellationToken::new();
        let chunks = split_into_chunks(&"word ".repeat(50));
        let mut stream = Box::pin(
            paced_chunks(chunks, Duration::from_millis(20), token.clone())
                .chain(closing_frames(vec!["[DONE]".to_string()], token.clone())),
        );

        assert_eq!(stream.next().await.as_deref(), Some("word "));
        token.cancel();
        assert_eq!(stream.next().await, None);
    }
}
