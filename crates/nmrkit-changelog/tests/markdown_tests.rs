use nmrkit_changelog::{
    ChangelogError, ChangelogLine, ChangelogParser, MarkdownRenderer, render_markdown,
};

const FRONT_MATTER: &str = "---\ntitle: Change Log\nonpage_menu: false\n---\n\n# Change Log\n";

#[test]
fn blank_input_renders_front_matter_only() {
    let renderer = MarkdownRenderer::default();
    for input in ["", "\n", "\n\n   \n\t\n", "\r\n\r\n"] {
        let out = render_markdown(input, &renderer).unwrap();
        assert_eq!(out, FRONT_MATTER, "input {:?}", input);
    }
}

#[test]
fn end_to_end_release() {
    let input = "1700000000 0 3.1.0\nBUG\tcrash\tFixed crash on startup\nIMPROVE\tspeed\tFaster load time\n";
    let out = render_markdown(input, &MarkdownRenderer::default()).unwrap();

    let expected = format!(
        "{FRONT_MATTER}\n### Version 3.1.0 Released 14 Nov 2023\n\n\
         * <span style=\"background-color:red;color:white;padding:1px 4px;border-radius:3px\">BUG  CRASH</span> Fixed crash on startup\n\
         * <span style=\"background-color:yellow;color:black;padding:1px 4px;border-radius:3px\">IMPROVE  SPEED</span> Faster load time\n"
    );
    assert_eq!(out, expected);
}

#[test]
fn descriptions_keep_input_order() {
    let input = "\
1609459200 0 2.0.1
NEW\tfoo\tAdded foo support
BUG\tbar\tFixed bar

1600000000 0 2.0.0
IMPROVE\tbaz\tBaz is faster
NEW\tqux\tQux arrives
";
    let lines = ChangelogParser::parse_str(input).unwrap();
    let descriptions: Vec<&str> = lines
        .iter()
        .filter_map(|line| match line {
            ChangelogLine::Entry(entry) => Some(entry.description.as_str()),
            ChangelogLine::Version(_) => None,
        })
        .collect();
    assert_eq!(
        descriptions,
        ["Added foo support", "Fixed bar", "Baz is faster", "Qux arrives"]
    );

    // Rendered bullets appear in the same order, versions are not re-sorted
    let out = MarkdownRenderer::default().render(&lines);
    let positions: Vec<usize> = [
        "Version 2.0.1",
        "Added foo support",
        "Fixed bar",
        "Version 2.0.0",
        "Baz is faster",
        "Qux arrives",
    ]
    .iter()
    .map(|needle| out.find(needle).unwrap())
    .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn unknown_category_is_fatal() {
    let input = "1609459200 0 2.0.1\nNEW\ta\tb\nCHANGE\tc\td\nBUG\te\tf\n";
    let err = render_markdown(input, &MarkdownRenderer::default()).unwrap_err();
    assert!(matches!(err, ChangelogError::UnknownKind { line: 3, .. }));
    assert!(err.to_string().contains("CHANGE"));
}

#[test]
fn reads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logall.txt");
    std::fs::write(&path, "1609459200 0 2.0.1\nNEW\tfoo\tAdded foo support\n").unwrap();

    let lines = ChangelogParser::parse_file(&path).unwrap();
    let out = MarkdownRenderer::default().render(&lines);
    assert!(out.contains("### Version 2.0.1 Released 01 Jan 2021"));
    assert!(out.contains("NEW  FOO</span> Added foo support"));
}
