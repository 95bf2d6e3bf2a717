use parking_lot::Mutex;

/// Result of appending a line to a [`PacketBuffer`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Append {
    /// The line was added to the pending packet.
    Buffered,

    /// The line would have pushed the pending packet past the maximum packet length, and was handed back to the
    /// caller untouched.
    ///
    /// The caller is expected to send the line on its own and then flush the buffer.
    Overflow(String),
}

#[derive(Default)]
struct Pending {
    lines: Vec<String>,
    len: usize,
}

/// Accumulates encoded lines into a single packet bounded by a maximum length.
///
/// The bound applies to the summed length of the buffered lines. Lines are drained in the order they were appended,
/// and joined with `\n` when the packet is built.
pub(crate) struct PacketBuffer {
    max_packet_len: usize,
    pending: Mutex<Pending>,
}

impl PacketBuffer {
    /// Creates a new, empty `PacketBuffer`.
    pub fn new(max_packet_len: usize) -> Self {
        Self { max_packet_len, pending: Mutex::new(Pending::default()) }
    }

    /// Appends a line to the pending packet.
    ///
    /// If the line fits, it is buffered. Otherwise, the pending packet is left as-is and the line is returned in
    /// [`Append::Overflow`].
    pub fn append(&self, line: String) -> Append {
        let mut pending = self.pending.lock();

        let projected = pending.len + line.len();
        if projected > self.max_packet_len {
            return Append::Overflow(line);
        }

        pending.lines.push(line);
        pending.len = projected;
        Append::Buffered
    }

    /// Drains the pending packet.
    ///
    /// The buffer is emptied while holding the lock, and the lines are joined after it is released, so that appends
    /// racing with a drain land in the next packet instead of waiting on it. Returns `None` if nothing was buffered.
    pub fn drain(&self) -> Option<String> {
        let lines = {
            let mut pending = self.pending.lock();
            if pending.lines.is_empty() {
                return None;
            }

            std::mem::take(&mut *pending).lines
        };

        Some(lines.join("\n"))
    }

    /// Returns the number of bytes currently buffered, not counting separators.
    pub fn len(&self) -> usize {
        self.pending.lock().len
    }

    /// Returns the number of lines currently buffered.
    pub fn line_count(&self) -> usize {
        self.pending.lock().lines.len()
    }

    /// Returns `true` if nothing is buffered.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().lines.is_empty()
    }

    #[cfg(test)]
    fn summed_line_len(&self) -> usize {
        self.pending.lock().lines.iter().map(String::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, thread};

    use proptest::{collection::vec as arb_vec, prelude::*};

    use super::{Append, PacketBuffer};

    #[test]
    fn drains_in_append_order() {
        let buffer = PacketBuffer::new(1400);
        for line in ["a:1|c", "b:2|g", "c:3|ms"] {
            assert_eq!(buffer.append(line.to_string()), Append::Buffered);
        }

        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.drain().as_deref(), Some("a:1|c\nb:2|g\nc:3|ms"));
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn empty_drain_yields_nothing() {
        let buffer = PacketBuffer::new(1400);
        assert_eq!(buffer.drain(), None);

        buffer.append("a:1|c".to_string());
        assert!(buffer.drain().is_some());
        assert_eq!(buffer.drain(), None);
    }

    #[test]
    fn exact_fit_is_buffered() {
        let buffer = PacketBuffer::new(10);
        assert_eq!(buffer.append("a:1|c".to_string()), Append::Buffered);
        assert_eq!(buffer.append("b:2|c".to_string()), Append::Buffered);
        assert_eq!(buffer.len(), 10);
    }

    #[test]
    fn overflow_hands_line_back() {
        let buffer = PacketBuffer::new(20);
        let filler = "x".repeat(19);
        assert_eq!(buffer.append(filler.clone()), Append::Buffered);

        assert_eq!(buffer.append("y:1|c".to_string()), Append::Overflow("y:1|c".to_string()));

        // The pending packet is untouched by the overflow.
        assert_eq!(buffer.len(), 19);
        assert_eq!(buffer.line_count(), 1);
        assert_eq!(buffer.drain(), Some(filler));
    }

    #[test]
    fn oversized_line_on_empty_buffer_overflows() {
        let buffer = PacketBuffer::new(8);
        let line = "much.too.long:1|c".to_string();
        assert_eq!(buffer.append(line.clone()), Append::Overflow(line));
        assert!(buffer.is_empty());
    }

    #[test]
    fn concurrent_appends_are_not_lost_or_duplicated() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 500;

        let buffer = Arc::new(PacketBuffer::new(usize::MAX));
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        buffer.append(format!("t{t}.m{i}:1|c"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let packet = buffer.drain().unwrap();
        let lines: Vec<&str> = packet.split('\n').collect();
        let unique: HashSet<&str> = lines.iter().copied().collect();
        assert_eq!(lines.len(), THREADS * PER_THREAD);
        assert_eq!(unique.len(), THREADS * PER_THREAD);

        // Each thread's own lines keep their relative order.
        for t in 0..THREADS {
            let prefix = format!("t{t}.");
            let own: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with(&prefix)).collect();
            let expected: Vec<String> = (0..PER_THREAD).map(|i| format!("t{t}.m{i}:1|c")).collect();
            assert_eq!(own, expected);
        }
    }

    proptest! {
        #[test]
        fn length_tracks_retained_lines(
            max_packet_len in 1usize..512,
            lines in arb_vec("[a-z]{1,12}:[0-9]{1,6}\\|(c|g|ms|s)", 1..64),
        ) {
            let buffer = PacketBuffer::new(max_packet_len);
            let mut retained = Vec::new();

            for line in lines {
                if buffer.append(line.clone()) == Append::Buffered {
                    retained.push(line);
                }

                prop_assert_eq!(buffer.len(), buffer.summed_line_len());
                prop_assert!(buffer.len() <= max_packet_len);
            }

            let expected = if retained.is_empty() { None } else { Some(retained.join("\n")) };
            prop_assert_eq!(buffer.drain(), expected);
        }
    }
}
