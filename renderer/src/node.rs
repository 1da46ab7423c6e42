use crate::theme::Theme;

/// The rendered document: a resolved theme plus one node per page.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    pub theme: Theme,
    pub pages: Vec<RenderNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LanguageItem {
    pub language: String,
    pub level: String,
}

/// The closed set of renderable nodes. Adding a component kind without a
/// lowering rule and an emitter arm fails to build.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Page {
        children: Vec<RenderNode>,
    },
    Columns {
        columns: Vec<RenderNode>,
    },
    Column {
        children: Vec<RenderNode>,
    },
    Header {
        name: String,
        subtitle: Option<String>,
        contacts: Vec<String>,
    },
    Section {
        title: String,
        children: Vec<RenderNode>,
    },
    Entry {
        company: String,
        role: String,
        dates: String,
        location: Option<String>,
        children: Vec<RenderNode>,
    },
    Summary {
        children: Vec<RenderNode>,
    },
    Tags {
        tags: Vec<RenderNode>,
    },
    Tag {
        text: String,
    },
    Languages {
        items: Vec<LanguageItem>,
    },
    Paragraph {
        text: String,
    },
    Divider,
    Watermark {
        text: Option<String>,
    },
}
