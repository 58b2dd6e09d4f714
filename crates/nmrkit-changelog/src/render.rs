use nmrkit_types::{ChangelogLine, LogEntry, VersionHeader};

/// Title used for the front matter and top-level heading
pub const DEFAULT_TITLE: &str = "Change Log";

/// Renders parsed changelog lines as site-ready Markdown
#[derive(Clone, Debug)]
pub struct MarkdownRenderer {
    title: String,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

impl MarkdownRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Render a full document: front matter, heading, then one block per line in input order
    pub fn render(&self, lines: &[ChangelogLine]) -> String {
        let mut out = self.front_matter();
        for line in lines {
            match line {
                ChangelogLine::Version(header) => out.push_str(&Self::render_version(header)),
                ChangelogLine::Entry(entry) => out.push_str(&Self::render_entry(entry)),
            }
        }
        out
    }

    /// Front matter block followed by the top-level heading
    pub fn front_matter(&self) -> String {
        format!(
            "---\ntitle: {title}\nonpage_menu: false\n---\n\n# {title}\n",
            title = self.title
        )
    }

    pub fn render_version(header: &VersionHeader) -> String {
        format!(
            "\n### Version {} Released {}\n\n",
            header.version,
            header.release_date()
        )
    }

    pub fn render_entry(entry: &LogEntry) -> String {
        let style = entry.kind.badge();
        format!(
            "* <span style=\"background-color:{};color:{};padding:1px 4px;border-radius:3px\">{}</span> {}\n",
            style.background,
            style.foreground,
            entry.badge_text(),
            entry.description
        )
    }
}
