//! Phrase sources for the foreground listen loop.
//!
//! Speech capture and recognition are outside this crate; the supervisor only
//! needs something that yields recognized text. The default source reads
//! lines from stdin, which is also what an external speech-to-text front end
//! pipes into.

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

#[async_trait::async_trait]
pub trait PhraseSource: Send {
    /// The next recognized phrase, or `None` once the source is exhausted.
    async fn next_phrase(&mut self) -> Option<String>;
}

pub struct StdinPhraseSource {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinPhraseSource {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinPhraseSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PhraseSource for StdinPhraseSource {
    async fn next_phrase(&mut self) -> Option<String> {
        self.lines.next_line().await.ok().flatten()
    }
}

/// Source used when the listen loop is disabled; never yields.
pub struct SilentPhraseSource;

#[async_trait::async_trait]
impl PhraseSource for SilentPhraseSource {
    async fn next_phrase(&mut self) -> Option<String> {
        std::future::pending().await
    }
}

/// Channel-fed source, used by embedders and tests to inject phrases.
pub struct ChannelPhraseSource {
    receiver: mpsc::Receiver<String>,
}

impl ChannelPhraseSource {
    pub fn new(receiver: mpsc::Receiver<String>) -> Self {
        Self { receiver }
    }
}

#[async_trait::async_trait]
impl PhraseSource for ChannelPhraseSource {
    async fn next_phrase(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_source_yields_then_closes() {
        let (tx, rx) = mpsc::channel(2);
        let mut source = ChannelPhraseSource::new(rx);

        tx.send("hello".to_string()).await.expect("send");
        drop(tx);

        assert_eq!(source.next_phrase().await.as_deref(), Some("hello"));
        assert_eq!(source.next_phrase().await, None);
    }

    #[tokio::test]
    async fn silent_source_never_yields() {
        let mut source = SilentPhraseSource;
        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            source.next_phrase(),
        )
        .await;
        assert!(outcome.is_err());
    }
}
