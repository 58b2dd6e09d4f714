use nmrkit_types::{ChangeKind, ChangelogLine};

/// Counts per release and change category
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangelogStats {
    pub versions: usize,
    pub new: usize,
    pub bug: usize,
    pub improve: usize,
}

impl ChangelogStats {
    pub fn from_lines(lines: &[ChangelogLine]) -> Self {
        let mut stats = Self::default();

        for line in lines {
            match line {
                ChangelogLine::Version(_) => stats.versions += 1,
                ChangelogLine::Entry(entry) => match entry.kind {
                    ChangeKind::New => stats.new += 1,
                    ChangeKind::Bug => stats.bug += 1,
                    ChangeKind::Improve => stats.improve += 1,
                },
            }
        }

        stats
    }

    pub fn total_entries(&self) -> usize {
        self.new + self.bug + self.improve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChangelogParser;

    #[test]
    fn test_counts() {
        let lines = ChangelogParser::parse_str(
            "1700000000 0 3.1.0\nBUG\tcrash\tFixed\nIMPROVE\tspeed\tFaster\n\n1600000000 0 3.0.0\nNEW\ta\tb\n",
        )
        .unwrap();
        let stats = ChangelogStats::from_lines(&lines);
        assert_eq!(
            stats,
            ChangelogStats {
                versions: 2,
                new: 1,
                bug: 1,
                improve: 1
            }
        );
        assert_eq!(stats.total_entries(), 3);
    }
}
