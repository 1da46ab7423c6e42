use renderer::{CompileError, RenderNode, RenderTree, ThemeRegistry, compile, to_text};

fn build(source: &str) -> RenderTree {
    compile(source, &ThemeRegistry::builtin()).expect("compile failed")
}

fn run(source: &str) -> String {
    to_text(&build(source))
}

fn compile_err(source: &str) -> CompileError {
    compile(source, &ThemeRegistry::builtin()).expect_err("expected a compile error")
}

fn page_children(tree: &RenderTree, index: usize) -> &[RenderNode] {
    let RenderNode::Page { children } = &tree.pages[index] else {
        panic!("expected a page node");
    };
    children
}

#[test]
fn empty_input_compiles_to_an_empty_document() {
    let tree = build("");
    assert!(tree.pages.is_empty());
    assert_eq!(to_text(&tree), "");
}

#[test]
fn compiling_twice_yields_identical_trees() {
    let source = "# Skills\n\n~ Rust SQL\n\nSummary:\na short bio\n/Summary";
    assert_eq!(build(source), build(source));
}

#[test]
fn heading_section_captures_following_entry() {
    let source = "## Experience\n\nEntry: company=ACME role=Engineer dates=2020-Present\nDid good work.\nEntry-end";
    let tree = build(source);
    let children = page_children(&tree, 0);
    assert_eq!(children.len(), 1);
    let RenderNode::Section { title, children } = &children[0] else {
        panic!("expected section");
    };
    assert_eq!(title, "Experience");
    assert!(matches!(children[0], RenderNode::Entry { .. }));
}

#[test]
fn sections_nest_by_heading_level() {
    let source = "# Work\n\n## Early\n\nearly words\n\n## Late\n\nlate words\n\n# Education\n\nschool";
    let tree = build(source);
    let children = page_children(&tree, 0);
    assert_eq!(children.len(), 2);
    let RenderNode::Section { title, children } = &children[0] else {
        panic!("expected section");
    };
    assert_eq!(title, "Work");
    assert_eq!(children.len(), 2);
    assert!(matches!(
        &children[0],
        RenderNode::Section { title, .. } if title == "Early"
    ));
    assert!(matches!(
        &children[1],
        RenderNode::Section { title, .. } if title == "Late"
    ));
}

#[test]
fn tag_line_renders_two_tags_in_order() {
    let out = run("~ TypeScript React");
    assert_eq!(out.trim_end(), "[TypeScript] [React]");
}

#[test]
fn mismatched_closing_tag_reports_the_closer_line() {
    let err = compile_err("Entry: company=A role=B dates=C\n/Section");
    assert!(err.message.contains("mismatched closing tag '/Section'"));
    assert_eq!(err.line, Some(2));
}

#[test]
fn unterminated_component_fails() {
    let err = compile_err("Summary:\nnever closed");
    assert!(err.message.contains("unterminated Summary"));
    assert_eq!(err.line, Some(1));
}

#[test]
fn balanced_document_with_known_components_compiles() {
    let source = concat!(
        "Header: name=\"Sam Doe\" subtitle=Engineer contact=\"sam@example.com, +1 555 0100\"\n",
        "\n",
        "# Experience\n",
        "\n",
        "Entry: company=ACME role=Engineer dates=2020-Present location=Remote\n",
        "Shipped the thing.\n",
        "/Entry\n",
        "\n",
        "# Skills\n",
        "\n",
        "~ Rust TypeScript SQL\n",
    );
    let out = run(source);
    assert!(out.contains("Sam Doe"));
    assert!(out.contains("sam@example.com | +1 555 0100"));
    assert!(out.contains("Engineer, ACME (2020-Present)"));
    assert!(out.contains("[Rust] [TypeScript] [SQL]"));
}

#[test]
fn unknown_theme_is_a_hard_error() {
    let err = compile_err("+++\ntheme: neon\n+++\n\nhello");
    assert!(err.message.contains("unknown theme 'neon'"));
    assert_eq!(err.line, Some(2));
}

#[test]
fn theme_controls_section_casing() {
    let out = run("+++\ntheme: slate\n+++\n\n# Skills\n\n~ Rust");
    assert!(out.contains("SKILLS"));
    assert!(out.contains("⟨Rust⟩"));
}

#[test]
fn explicit_theme_overrides_the_config_block() {
    let themes = ThemeRegistry::builtin();
    let mono = themes.get("mono").expect("mono theme");
    let tree = renderer::compile_with_theme("+++\ntheme: slate\n+++\n\n~ Rust", mono, 0)
        .expect("compile failed");
    assert!(to_text(&tree).contains("#Rust"));
}

#[test]
fn missing_required_attribute_is_an_error() {
    let err = compile_err("Entry: company=ACME role=Dev\nbody\n/Entry");
    assert!(err.message.contains("missing required attribute 'dates' for Entry"));
    assert_eq!(err.line, Some(1));
}

#[test]
fn unknown_attribute_is_an_error() {
    let err = compile_err("Header: name=Sam color=red");
    assert!(err.message.contains("unknown attribute 'color' for Header"));
}

#[test]
fn languages_parse_name_level_lines() {
    let source = "Languages:\nEnglish = Native\nGerman = B2\n/Languages";
    let tree = build(source);
    let RenderNode::Languages { items } = &page_children(&tree, 0)[0] else {
        panic!("expected languages");
    };
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].language, "English");
    assert_eq!(items[0].level, "Native");
    assert_eq!(items[1].language, "German");
    assert_eq!(items[1].level, "B2");
}

#[test]
fn malformed_language_line_is_an_error() {
    let err = compile_err("Languages:\nEnglish = Native\njust words\n/Languages");
    assert!(err.message.contains("malformed language entry 'just words'"));
    assert_eq!(err.line, Some(3));
}

#[test]
fn tags_container_merges_tag_lines() {
    let source = "Tags:\n~ Rust SQL\n\n~ React\n/Tags";
    let tree = build(source);
    let RenderNode::Tags { tags } = &page_children(&tree, 0)[0] else {
        panic!("expected tags");
    };
    assert_eq!(tags.len(), 3);
}

#[test]
fn tags_container_rejects_prose() {
    let err = compile_err("Tags:\n~ Rust\n\nsome prose\n/Tags");
    assert!(err.message.contains("Tags may contain only tag lines"));
    assert_eq!(err.line, Some(4));
}

#[test]
fn watermark_and_divider_render() {
    let out = run("Watermark: text=CONFIDENTIAL\n\n---");
    assert!(out.contains("~ CONFIDENTIAL ~"));
    assert!(out.contains(&"-".repeat(40)));
}

#[test]
fn watermark_without_text_uses_the_default() {
    let out = run("Watermark:");
    assert!(out.contains("~ draft ~"));
}

#[test]
fn columns_render_both_sides() {
    let source = "Columns: count=2\nColumn:\nleft side\n/Column\nColumn:\nright side\n/Column\n/Columns";
    let out = run(source);
    assert!(out.contains("left side"));
    assert!(out.contains("right side"));
    assert!(out.contains(&"-".repeat(20)));
}

#[test]
fn pages_are_separated_in_output() {
    let source = "Page:\nfirst page\n/Page\n\nPage:\nsecond page\n/Page";
    let out = run(source);
    assert!(out.contains("first page"));
    assert!(out.contains("second page"));
    assert!(out.contains(&"-".repeat(40)));
}

#[test]
fn entry_children_are_indented() {
    let out = run("Entry: company=ACME role=Dev dates=2020\nDid good work.\n/Entry");
    assert!(out.contains("\n  Did good work."), "got: {out:?}");
}
