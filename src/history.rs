//! Bounded history ring. Read-only to the rest of the core except through
//! [`History::add`].

use std::collections::VecDeque;

pub const MAX_HISTORY: usize = 1000;

pub struct History {
    entries: VecDeque<String>,
    total_count: usize,
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(MAX_HISTORY),
            total_count: 0,
        }
    }

    /// Appends `line`, unless it is an exact repeat of the most recent
    /// entry (adjacent duplicates are not recorded).
    pub fn add(&mut self, line: &str) {
        if self.entries.back().map(|s| s.as_str()) == Some(line) {
            return;
        }
        if self.entries.len() == MAX_HISTORY {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
        self.total_count += 1;
    }

    /// Renders every entry as bash does: `%5d  <command>`, numbered from
    /// `total_count - shown_count + 1` so the numbering stays stable as
    /// old entries fall off the front of the ring.
    pub fn render(&self) -> String {
        let shown = self.entries.len();
        let start = self.total_count.saturating_sub(shown) + 1;
        let mut out = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            out.push_str(&format!("{:5}  {}\n", start + i, entry));
        }
        out
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_duplicates_are_not_recorded() {
        let mut h = History::new();
        h.add("ls");
        h.add("ls");
        h.add("pwd");
        assert_eq!(h.entries.len(), 2);
    }

    #[test]
    fn non_adjacent_duplicates_are_recorded() {
        let mut h = History::new();
        h.add("ls");
        h.add("pwd");
        h.add("ls");
        assert_eq!(h.entries.len(), 3);
    }

    #[test]
    fn bounded_ring_drops_oldest() {
        let mut h = History::new();
        for i in 0..MAX_HISTORY + 10 {
            h.add(&format!("cmd{i}"));
        }
        assert_eq!(h.entries.len(), MAX_HISTORY);
        assert_eq!(h.entries.front().unwrap(), "cmd10");
    }

    #[test]
    fn numbering_matches_bash_convention() {
        let mut h = History::new();
        h.add("first");
        h.add("second");
        let rendered = h.render();
        assert_eq!(rendered, "    1  first\n    2  second\n");
    }
}
