//! Burst (multi-packet) sequence tracking.
//!
//! A download reply arrives as a burst of packets whose 3-bit sequence
//! numbers run `1, 2, ..., 6, 1, 2, ...` with the final packet carrying
//! the terminal value [`SEQNO_END`]. Sequence number 0 never appears on
//! the wire; it marks a burst with no packets read yet.

use super::{next_seqno, SEQNO_END};

/// No packets read yet.
const SEQNO_UNINITIALIZED: u8 = 0;

/// Internal sentinel for an out-of-sequence burst. Never on the wire:
/// only 3 bits exist there.
const SEQNO_INVALID: u8 = 8;

/// Tracks the next expected sequence number across a burst.
///
/// Value semantics: [`Burst::advance`] returns the successor state, which
/// is invalid if the observed packet was out of sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Burst(u8);

impl Burst {
    /// Create a burst with no packets read.
    pub fn new() -> Self {
        Self(SEQNO_UNINITIALIZED)
    }

    /// Returns true if no packets have been read.
    pub fn is_empty(self) -> bool {
        self.0 == SEQNO_UNINITIALIZED
    }

    /// Returns true if the terminal packet has been received.
    pub fn has_ended(self) -> bool {
        self.0 == SEQNO_END
    }

    /// Returns false if an out-of-sequence packet was observed.
    pub fn is_valid(self) -> bool {
        self.0 != SEQNO_INVALID
    }

    /// Update the burst with an observed sequence number.
    ///
    /// A fresh burst expects sequence number 1. The terminal value is
    /// accepted at any point before the burst has ended; anything else
    /// must match the expected ring position. Packets after the terminal
    /// one, and any mismatch, produce an invalid state.
    pub fn advance(self, seqno: u8) -> Self {
        if self.0 == SEQNO_END {
            return Self(SEQNO_INVALID);
        }
        if seqno == SEQNO_END {
            return Self(SEQNO_END);
        }

        let expected = if self.0 == SEQNO_UNINITIALIZED {
            1
        } else {
            self.0
        };
        if seqno == expected {
            Self(next_seqno(seqno))
        } else {
            Self(SEQNO_INVALID)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed a whole sequence, returning the final state.
    fn run(seqnos: &[u8]) -> Burst {
        seqnos.iter().fold(Burst::new(), |b, &s| b.advance(s))
    }

    #[test]
    fn test_fresh_burst() {
        let burst = Burst::new();
        assert!(burst.is_empty());
        assert!(burst.is_valid());
        assert!(!burst.has_ended());
    }

    #[test]
    fn test_full_ring_with_wrap() {
        let burst = run(&[1, 2, 3, 4, 5, 6, 1, 2, 3, 4, 5, 6, 7]);
        assert!(burst.is_valid());
        assert!(burst.has_ended());
    }

    #[test]
    fn test_terminal_only() {
        let burst = Burst::new().advance(SEQNO_END);
        assert!(burst.is_valid());
        assert!(burst.has_ended());
    }

    #[test]
    fn test_out_of_sequence() {
        let burst = run(&[1, 3]);
        assert!(!burst.is_valid());
    }

    #[test]
    fn test_zero_never_accepted() {
        assert!(!Burst::new().advance(0).is_valid());
        assert!(!run(&[1, 0]).is_valid());
    }

    #[test]
    fn test_packet_after_terminal() {
        let burst = run(&[1, 7, 1]);
        assert!(!burst.is_valid());
        let burst = run(&[1, 7, 7]);
        assert!(!burst.is_valid());
    }

    #[test]
    fn test_every_inner_substitution_invalidates() {
        let good = [1, 2, 3, 4, 5, 6, 1, 2, 3, 4, 5, 6, 7];
        for i in 0..good.len() - 1 {
            for wrong in 0..=7u8 {
                if wrong == good[i] || wrong == SEQNO_END {
                    continue;
                }
                let mut seq = good;
                seq[i] = wrong;
                assert!(
                    !run(&seq[..=i]).is_valid(),
                    "position {i} accepted wrong seqno {wrong}"
                );
            }
        }
    }
}
