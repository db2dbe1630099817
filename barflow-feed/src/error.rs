use barflow_core::{EventError, QueueError};
use thiserror::Error;

/// All errors generated while ingesting the trade feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed connection failed: {0}")]
    Connection(String),

    #[error("malformed feed message: {0}")]
    MalformedMessage(String),

    #[error("trade event violates invariants: {0}")]
    Invariant(#[from] EventError),

    #[error("publish to trade queue failed after {attempts} attempts: {source}")]
    Publish { attempts: u32, source: QueueError },
}

impl FeedError {
    /// Determine if an error requires the feed connection to re-establish.
    ///
    /// Malformed or invariant-violating messages are dropped in place;
    /// connection and publish failures tear the connection down so the
    /// reconnect loop can recover.
    pub fn is_terminal(&self) -> bool {
        match self {
            FeedError::Connection(_) | FeedError::Publish { .. } => true,
            FeedError::MalformedMessage(_) | FeedError::Invariant(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_error_is_terminal() {
        struct TestCase {
            input: FeedError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: connection failures force reconnect
                input: FeedError::Connection("handshake refused".to_string()),
                expected: true,
            },
            TestCase {
                // TC1: exhausted publish retries force reconnect
                input: FeedError::Publish {
                    attempts: 5,
                    source: QueueError::Publish("queue receiver dropped".to_string()),
                },
                expected: true,
            },
            TestCase {
                // TC2: malformed frames are dropped in place
                input: FeedError::MalformedMessage("missing field `p`".to_string()),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_terminal();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
