//! Article cleanup for legacy browsers.
//!
//! The fetched page is parsed once. Each element of the content region is
//! checked against a table of `{selector, action}` rules, the first match
//! decides the edit, and the edited tree is serialized with html5ever.

use ego_tree::{NodeId, Tree};
use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector, StrTendril};
use thiserror::Error;

/// Selector of the article body.
pub const CONTENT_SELECTOR: &str = "div#mw-content-text";

/// Selector of the page title shown above the article.
pub const TITLE_SELECTOR: &str = "span.mw-page-title-main";

/// Heading ids whose whole section is dropped.
pub const REMOVED_SECTIONS: &[&str] = &[
    "External_links",
    "References",
    "Notes",
    "Further_reading",
    "Bibliography",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Drop the element and everything inside it.
    Remove,
    /// Drop the tag, keep its children.
    Unwrap,
    /// Replace with two line breaks, the bold heading text and a rule.
    RewriteHeading,
}

/// Rule table, in priority order.
pub const RULES: &[(&str, Action)] = &[
    ("table.infobox", Action::Remove),
    ("figure", Action::Remove),
    ("div.shortdescription", Action::Remove),
    ("table.ambox", Action::Remove),
    ("style", Action::Remove),
    ("script", Action::Remove),
    ("span.mw-editsection", Action::Remove),
    ("div#catlinks", Action::Remove),
    ("div.reflist", Action::Remove),
    ("div.sistersitebox", Action::Remove),
    ("div.thumb", Action::Remove),
    ("div.navbox", Action::Remove),
    ("div.navbox-styles", Action::Remove),
    ("div.printfooter", Action::Remove),
    ("div.refbegin", Action::Remove),
    ("link", Action::Remove),
    ("noscript", Action::Remove),
    ("img", Action::Remove),
    ("sup", Action::Remove),
    ("i", Action::Unwrap),
    ("h2", Action::RewriteHeading),
];

/// Markup a rewritten heading is built from.
const HEADING_TEMPLATE: &str = "<div><br><b></b><hr></div>";

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("invalid selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },
}

struct Rule {
    selector: Selector,
    action: Action,
}

/// A pending change to the parsed tree.
enum Edit {
    Remove,
    Unwrap,
    Heading(String),
}

/// Result of cleaning one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedPage {
    /// Title from the page itself, if it carried one.
    pub title: Option<String>,
    /// Serialized content region, if the page had one.
    pub content: Option<String>,
}

/// Compiled cleanup rules. Build once and share.
pub struct CleanupPipeline {
    rules: Vec<Rule>,
    content: Selector,
    title: Selector,
    heading_container: Selector,
    section_heading: Selector,
    any_heading: Selector,
}

fn compile(selector: &str) -> Result<Selector, CleanupError> {
    Selector::parse(selector).map_err(|e| CleanupError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

impl CleanupPipeline {
    pub fn standard() -> Result<Self, CleanupError> {
        let rules = RULES
            .iter()
            .map(|(selector, action)| {
                Ok(Rule {
                    selector: compile(selector)?,
                    action: *action,
                })
            })
            .collect::<Result<Vec<_>, CleanupError>>()?;

        Ok(Self {
            rules,
            content: compile(CONTENT_SELECTOR)?,
            title: compile(TITLE_SELECTOR)?,
            heading_container: compile("div.mw-heading")?,
            section_heading: compile("h2[id], h3[id]")?,
            any_heading: compile("h1, h2, h3, h4, h5, h6")?,
        })
    }

    /// Parse `html` and clean its content region.
    pub fn clean(&self, html: &str) -> CleanedPage {
        let mut document = Html::parse_document(html);

        let title = document
            .select(&self.title)
            .next()
            .map(|el| el.text().collect::<String>());

        let Some((root, edits)) = document
            .select(&self.content)
            .next()
            .map(|root| (root.id(), self.plan(root)))
        else {
            return CleanedPage {
                title,
                content: None,
            };
        };

        apply(&mut document.tree, edits);

        let content = document
            .tree
            .get(root)
            .and_then(ElementRef::wrap)
            .map(|root| root.html());

        CleanedPage { title, content }
    }

    fn action_for(&self, element: ElementRef<'_>) -> Option<Action> {
        self.rules
            .iter()
            .find(|rule| rule.selector.matches(&element))
            .map(|rule| rule.action)
    }

    /// Collect the edits for everything under `root`, in document order.
    fn plan(&self, root: ElementRef<'_>) -> Vec<(NodeId, Edit)> {
        let mut edits = Vec::new();

        for node in root.descendants() {
            if node.value().is_comment() {
                edits.push((node.id(), Edit::Remove));
                continue;
            }
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };

            if let Some(level) = self.removed_section_level(element) {
                edits.push((element.id(), Edit::Remove));
                let mut sibling = element.next_sibling();
                while let Some(next) = sibling {
                    let ends_section = ElementRef::wrap(next)
                        .and_then(|el| self.heading_level(el))
                        .is_some_and(|next_level| next_level <= level);
                    if ends_section {
                        break;
                    }
                    edits.push((next.id(), Edit::Remove));
                    sibling = next.next_sibling();
                }
            }

            match self.action_for(element) {
                Some(Action::Remove) => edits.push((element.id(), Edit::Remove)),
                Some(Action::Unwrap) => edits.push((element.id(), Edit::Unwrap)),
                Some(Action::RewriteHeading) => {
                    edits.push((element.id(), Edit::Heading(self.visible_text(element))))
                }
                None => {}
            }
        }

        edits
    }

    /// Level of a section heading container (`div.mw-heading`) or a bare heading.
    fn heading_level(&self, element: ElementRef<'_>) -> Option<u8> {
        let heading = if self.heading_container.matches(&element) {
            element.select(&self.any_heading).next()?
        } else if self.any_heading.matches(&element) {
            element
        } else {
            return None;
        };
        heading.value().name()[1..].parse().ok()
    }

    /// If `element` is the heading container of a section to drop, its level.
    fn removed_section_level(&self, element: ElementRef<'_>) -> Option<u8> {
        if !self.heading_container.matches(&element) {
            return None;
        }
        let heading = element.select(&self.section_heading).find(|heading| {
            heading
                .value()
                .id()
                .is_some_and(|id| REMOVED_SECTIONS.contains(&id))
        })?;
        heading.value().name()[1..].parse().ok()
    }

    /// Text of `element`, leaving out anything a `Remove` rule would drop.
    fn visible_text(&self, element: ElementRef<'_>) -> String {
        let mut text = String::new();
        self.collect_text(element, &mut text);
        text.trim().to_string()
    }

    fn collect_text(&self, element: ElementRef<'_>, text: &mut String) {
        for child in element.children() {
            match child.value() {
                Node::Text(t) => text.push_str(t),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        if self.action_for(child) != Some(Action::Remove) {
                            self.collect_text(child, text);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Element values a rewritten heading is assembled from.
struct HeadingParts {
    div: Node,
    br: Node,
    b: Node,
    hr: Node,
}

impl HeadingParts {
    fn parse() -> Option<Self> {
        let template = Html::parse_fragment(HEADING_TEMPLATE);
        let element = |name: &str| {
            template
                .tree
                .root()
                .descendants()
                .find(|node| node.value().as_element().is_some_and(|el| el.name() == name))
                .map(|node| node.value().clone())
        };

        Some(Self {
            div: element("div")?,
            br: element("br")?,
            b: element("b")?,
            hr: element("hr")?,
        })
    }
}

fn apply(tree: &mut Tree<Node>, edits: Vec<(NodeId, Edit)>) {
    let mut parts = None;

    for (id, edit) in edits {
        // Nodes already cut loose by an earlier removal need no further work.
        if tree.get(id).map_or(true, |node| node.parent().is_none()) {
            continue;
        }
        match edit {
            Edit::Remove => {
                if let Some(mut node) = tree.get_mut(id) {
                    node.detach();
                }
            }
            Edit::Unwrap => unwrap_node(tree, id),
            Edit::Heading(text) => {
                if parts.is_none() {
                    parts = HeadingParts::parse();
                }
                if let Some(parts) = &parts {
                    rewrite_heading(tree, id, &text, parts);
                }
            }
        }
    }
}

fn unwrap_node(tree: &mut Tree<Node>, id: NodeId) {
    let children: Vec<NodeId> = match tree.get(id) {
        Some(node) => node.children().map(|child| child.id()).collect(),
        None => return,
    };
    if let Some(mut node) = tree.get_mut(id) {
        for child in children {
            node.insert_id_before(child);
        }
        node.detach();
    }
}

/// Replace a heading with two line breaks, its bold text and a rule.
fn rewrite_heading(tree: &mut Tree<Node>, id: NodeId, text: &str, parts: &HeadingParts) {
    let Some(mut heading) = tree.get_mut(id) else {
        return;
    };
    let mut div = heading.insert_before(parts.div.clone());
    div.append(parts.br.clone());
    div.append(parts.br.clone());
    div.append(parts.b.clone()).append(Node::Text(Text {
        text: StrTendril::from_slice(text),
    }));
    div.append(parts.hr.clone());
    heading.detach();
}
