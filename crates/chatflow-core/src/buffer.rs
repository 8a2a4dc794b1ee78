//! Bounded-reveal buffering for streamed text fragments.
//!
//! [`StreamBuffer`] holds raw fragments exactly as received and tracks the
//! text already revealed. The pacer dequeues one merged, size-capped piece
//! per tick; everything else stays queued. Invariant: the revealed text
//! followed by the queued fragments, in order, always reconstructs the
//! exact text pushed so far, irrespective of pacing.

use crate::config::PacerConfig;
use std::collections::VecDeque;

/// FIFO fragment queue plus display accumulator for one stream.
#[derive(Debug, Default)]
pub struct StreamBuffer {
    queue: VecDeque<String>,
    revealed: String,
    done: bool,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw fragment. Never blocks, never drops.
    pub fn push(&mut self, fragment: impl Into<String>) {
        let fragment = fragment.into();
        if !fragment.is_empty() {
            self.queue.push_back(fragment);
        }
    }

    /// Marks the source as complete. Queued fragments still drain.
    pub fn finish(&mut self) {
        self.done = true;
    }

    /// True once the source signaled completion.
    pub fn is_finished(&self) -> bool {
        self.done
    }

    /// True when the source completed and every fragment was revealed.
    /// The pacer's tick keeps running until this holds.
    pub fn is_drained(&self) -> bool {
        self.done && self.queue.is_empty()
    }

    /// Text revealed so far; raw, not sanitized.
    pub fn revealed(&self) -> &str {
        &self.revealed
    }

    /// Dequeues the next reveal unit, or `None` if the queue is empty.
    ///
    /// Merges queued fragments while the unit is shorter than
    /// `max_chars_per_tick` or `min_merge_chars`, then cuts at
    /// `max_chars_per_tick` characters (on a char boundary) and requeues
    /// the remainder at the front. The returned piece is already appended
    /// to the revealed accumulator.
    pub fn next_piece(&mut self, config: &PacerConfig) -> Option<String> {
        let mut chunk = self.queue.pop_front()?;
        // A zero budget would requeue the whole chunk and stall the drain.
        let max_chars = config.max_chars_per_tick.max(1);

        loop {
            let len = chunk.chars().count();
            if len >= max_chars && len >= config.min_merge_chars {
                break;
            }
            match self.queue.pop_front() {
                Some(next) => chunk.push_str(&next),
                None => break,
            }
        }

        if let Some((cut, _)) = chunk.char_indices().nth(max_chars) {
            let rest = chunk.split_off(cut);
            self.queue.push_front(rest);
        }

        self.revealed.push_str(&chunk);
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: usize, min_merge: usize) -> PacerConfig {
        PacerConfig {
            tick_interval_ms: 1,
            max_chars_per_tick: max,
            min_merge_chars: min_merge,
        }
    }

    /// Drains the buffer and checks the reconstruction invariant.
    fn drain(buffer: &mut StreamBuffer, cfg: &PacerConfig) -> Vec<String> {
        let mut pieces = Vec::new();
        while let Some(piece) = buffer.next_piece(cfg) {
            pieces.push(piece);
        }
        pieces
    }

    #[test]
    fn test_reconstructs_exact_input() {
        let cfg = config(5, 2);
        let mut buffer = StreamBuffer::new();
        for fragment in ["<p>Hel", "lo <scr", "ipt>bad</scri", "pt> world</p>"] {
            buffer.push(fragment);
        }
        buffer.finish();

        let pieces = drain(&mut buffer, &cfg);
        let joined: String = pieces.concat();
        assert_eq!(joined, "<p>Hello <script>bad</script> world</p>");
        assert_eq!(buffer.revealed(), joined);
        assert!(buffer.is_drained());
    }

    #[test]
    fn test_piece_size_is_capped() {
        let cfg = config(5, 2);
        let mut buffer = StreamBuffer::new();
        buffer.push("abcdefghij");

        assert_eq!(buffer.next_piece(&cfg).unwrap(), "abcde");
        assert_eq!(buffer.next_piece(&cfg).unwrap(), "fghij");
        assert_eq!(buffer.next_piece(&cfg), None);
    }

    #[test]
    fn test_tiny_fragments_merge() {
        let cfg = config(60, 16);
        let mut buffer = StreamBuffer::new();
        // Char-by-char arrival, as live sources deliver.
        for ch in "hello world".chars() {
            buffer.push(ch.to_string());
        }

        let piece = buffer.next_piece(&cfg).unwrap();
        assert_eq!(piece, "hello world");
    }

    #[test]
    fn test_remainder_requeued_in_order() {
        let cfg = config(4, 1);
        let mut buffer = StreamBuffer::new();
        buffer.push("abcdef");
        buffer.push("gh");

        assert_eq!(buffer.next_piece(&cfg).unwrap(), "abcd");
        // Remainder "ef" sits ahead of "gh".
        assert_eq!(buffer.next_piece(&cfg).unwrap(), "efgh");
    }

    #[test]
    fn test_multibyte_cut_respects_char_boundary() {
        let cfg = config(2, 1);
        let mut buffer = StreamBuffer::new();
        buffer.push("héllo");

        assert_eq!(buffer.next_piece(&cfg).unwrap(), "hé");
        assert_eq!(buffer.next_piece(&cfg).unwrap(), "ll");
        assert_eq!(buffer.next_piece(&cfg).unwrap(), "o");
        assert_eq!(buffer.revealed(), "héllo");
    }

    #[test]
    fn test_zero_char_budget_still_drains() {
        let cfg = config(0, 0);
        let mut buffer = StreamBuffer::new();
        buffer.push("ab");
        buffer.finish();

        assert_eq!(buffer.next_piece(&cfg).unwrap(), "a");
        assert_eq!(buffer.next_piece(&cfg).unwrap(), "b");
        assert_eq!(buffer.next_piece(&cfg), None);
        assert!(buffer.is_drained());
    }

    #[test]
    fn test_empty_fragments_ignored() {
        let mut buffer = StreamBuffer::new();
        buffer.push("");
        buffer.finish();
        assert!(buffer.is_drained());
    }

    #[test]
    fn test_finish_before_drain() {
        let cfg = config(5, 1);
        let mut buffer = StreamBuffer::new();
        buffer.push("late fragment");
        buffer.finish();

        // Completion was signaled, but the queue must still drain.
        assert!(!buffer.is_drained());
        while buffer.next_piece(&cfg).is_some() {}
        assert!(buffer.is_drained());
    }
}
