//! Reduction of one message subtree to Markdown.
//!
//! The original substitution pipeline rewrote a cloned DOM in stages (math,
//! noise, code, lists, headings) and then flattened it to text. Here the same
//! rules run as a single pure tree-to-string walk over the parsed subtree:
//! each node type contributes its formatting directly to an output buffer, so
//! there is no order-of-replacement hazard and nothing to clone.

use chatmark_core::{normalize_markdown, strip_line_indent, Role};
use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};

const NOISE_TAGS: &[&str] = &["button", "mat-progress-bar"];
const NOISE_CLASSES: &[&str] = &["katex-html", "sr-only", "code-block-decoration", "hide-wrapper"];

/// Reduces one message container to a Markdown string. Empty output means
/// "no renderable content" and the message should be skipped.
pub trait MessageConverter: Send + Sync {
    fn to_markdown(&self, node: Option<ElementRef<'_>>, role: Role) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DomMessageConverter;

impl DomMessageConverter {
    /// Convert a detached HTML fragment; the fragment root counts as the
    /// message container.
    pub fn convert_fragment(&self, html: &str, role: Role) -> String {
        let fragment = Html::parse_fragment(html);
        self.to_markdown(Some(fragment.root_element()), role)
    }
}

impl MessageConverter for DomMessageConverter {
    fn to_markdown(&self, node: Option<ElementRef<'_>>, role: Role) -> String {
        let Some(root) = node else {
            return String::new();
        };
        let mut writer = MarkdownWriter::new();
        for child in root.children() {
            render_node(child, RenderCtx::block(), &mut writer);
        }
        let text = writer.finish();
        let text = if role == Role::User {
            // User bubbles render with per-line indentation artifacts.
            strip_line_indent(&text)
        } else {
            text
        };
        normalize_markdown(&text)
    }
}

/// Rendering context threaded through the walk.
///
/// `flatten` is set inside list items and headings, where the original
/// pipeline reduced content to plain text. `strong_markers` tracks whether
/// `**` emphasis survives at this depth (it does in prose, not inside list
/// items or headings). `display_math` marks a `katex-display` ancestry so a
/// bare TeX annotation knows which math form to emit.
#[derive(Debug, Clone, Copy)]
struct RenderCtx {
    flatten: bool,
    strong_markers: bool,
    display_math: bool,
}

impl RenderCtx {
    fn block() -> Self {
        Self {
            flatten: false,
            strong_markers: true,
            display_math: false,
        }
    }

    fn flat(strong_markers: bool) -> Self {
        Self {
            flatten: true,
            strong_markers,
            display_math: false,
        }
    }
}

fn render_node(node: NodeRef<'_, Node>, ctx: RenderCtx, w: &mut MarkdownWriter) {
    match node.value() {
        Node::Text(text) => w.text(text),
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                render_element(element, ctx, w);
            }
        }
        _ => {
            for child in node.children() {
                render_node(child, ctx, w);
            }
        }
    }
}

fn render_element(element: ElementRef<'_>, ctx: RenderCtx, w: &mut MarkdownWriter) {
    if is_noise(element) {
        return;
    }

    // Math fragments carry their LaTeX source out of band; an empty payload
    // degrades to generic text extraction.
    if let Some(latex) = element.value().attr("data-math").filter(|l| !l.is_empty()) {
        if has_class(element, "math-block") {
            w.block_math(latex);
            return;
        }
        if has_class(element, "math-inline") {
            w.inline_math(latex);
            return;
        }
    }

    let tag = element.value().name().to_ascii_lowercase();

    if tag == "annotation" && element.value().attr("encoding") == Some("application/x-tex") {
        let latex = raw_text(element);
        let latex = latex.trim();
        if !latex.is_empty() {
            if ctx.display_math {
                w.block_math(latex);
            } else {
                w.inline_math(latex);
            }
            return;
        }
    }

    if has_class(element, "katex-display")
        || has_class(element, "katex")
        || tag == "math"
        || tag == "semantics"
    {
        let display = ctx.display_math || has_class(element, "katex-display");
        if let Some(latex) = find_tex_annotation(element) {
            if display {
                w.block_math(&latex);
            } else {
                w.inline_math(&latex);
            }
            return;
        }
        let ctx = RenderCtx {
            display_math: display,
            ..ctx
        };
        render_children(element, ctx, w);
        return;
    }

    match tag.as_str() {
        "pre" | "code-block" => render_code_block(element, w),
        "ol" => render_list(element, true, ctx, w),
        "ul" => render_list(element, false, ctx, w),
        "h1" | "h2" | "h3" => {
            if ctx.flatten {
                w.break_line();
                render_children(element, RenderCtx::flat(false), w);
                w.break_line();
            } else {
                // All heading levels normalize to level three.
                w.raw("\n### ");
                render_children(element, RenderCtx::flat(false), w);
                w.raw("\n");
            }
        }
        "strong" | "b" => {
            let text = flatten_to_string(element, RenderCtx::flat(false));
            let text = text.trim();
            if text.is_empty() {
                return;
            }
            if ctx.strong_markers {
                w.raw(&format!("**{text}**"));
            } else {
                w.text(text);
            }
        }
        "p" => {
            w.break_line();
            render_children(
                element,
                RenderCtx {
                    flatten: true,
                    ..ctx
                },
                w,
            );
            w.break_line();
        }
        "br" => w.break_line(),
        "div" | "section" | "article" | "header" | "footer" | "nav" | "figure" | "figcaption"
        | "table" | "tr" | "blockquote" => {
            w.break_line();
            render_children(element, ctx, w);
            w.break_line();
        }
        "script" | "style" | "noscript" | "template" | "iframe" => {}
        _ => render_children(element, ctx, w),
    }
}

fn render_children(element: ElementRef<'_>, ctx: RenderCtx, w: &mut MarkdownWriter) {
    for child in element.children() {
        render_node(child, ctx, w);
    }
}

fn render_code_block(element: ElementRef<'_>, w: &mut MarkdownWriter) {
    // The language label, when present, is the first span outside the code
    // text (Gemini's decoration wrappers are already gone as noise).
    let lang = find_first_descendant(element, &["span"])
        .map(|el| raw_text(el).trim().to_string())
        .unwrap_or_default();
    let code = match find_first_descendant(element, &["code", "pre"]) {
        Some(code_el) => raw_text(code_el),
        None => raw_text(element),
    };
    w.fenced(&lang, code.trim());
}

fn render_list(element: ElementRef<'_>, ordered: bool, ctx: RenderCtx, w: &mut MarkdownWriter) {
    if ctx.flatten {
        // A sublist inside a list item collapses into the parent item's
        // flattened text: one line per item, no markers. Preserved limitation
        // of the exporter, not recursive Markdown nesting.
        for li in direct_items(element) {
            w.break_line();
            render_children(li, ctx, w);
            w.break_line();
        }
        return;
    }

    w.raw("\n");
    let mut index = 0usize;
    for li in direct_items(element) {
        index += 1;
        let content = flatten_to_string(li, RenderCtx::flat(false));
        let content = content.trim();
        if ordered {
            // Always renumber from 1, whatever the source markers said.
            w.raw(&format!("{index}. {content}\n"));
        } else {
            w.raw(&format!("- {content}\n"));
        }
    }
    w.raw("\n");
}

fn direct_items<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name().eq_ignore_ascii_case("li"))
}

fn flatten_to_string(element: ElementRef<'_>, ctx: RenderCtx) -> String {
    let mut w = MarkdownWriter::new();
    render_children(element, ctx, &mut w);
    w.finish()
}

fn is_noise(element: ElementRef<'_>) -> bool {
    let tag = element.value().name();
    NOISE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
        || element
            .value()
            .classes()
            .any(|c| NOISE_CLASSES.contains(&c))
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// First non-noise descendant with one of the given tags, depth first.
fn find_first_descendant<'a>(element: ElementRef<'a>, tags: &[&str]) -> Option<ElementRef<'a>> {
    for child in element.children() {
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        if is_noise(child_el) {
            continue;
        }
        let name = child_el.value().name();
        if tags.iter().any(|t| t.eq_ignore_ascii_case(name)) {
            return Some(child_el);
        }
        if let Some(found) = find_first_descendant(child_el, tags) {
            return Some(found);
        }
    }
    None
}

fn find_tex_annotation(element: ElementRef<'_>) -> Option<String> {
    let annotation = find_annotation(element)?;
    let latex = raw_text(annotation);
    let latex = latex.trim();
    (!latex.is_empty()).then(|| latex.to_string())
}

fn find_annotation<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    for child in element.children() {
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        if child_el.value().name().eq_ignore_ascii_case("annotation")
            && child_el.value().attr("encoding") == Some("application/x-tex")
        {
            return Some(child_el);
        }
        if let Some(found) = find_annotation(child_el) {
            return Some(found);
        }
    }
    None
}

/// Verbatim text of a subtree, noise excluded, whitespace preserved. Used
/// where source formatting matters (code, LaTeX payloads, labels).
fn raw_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_raw_text(element, &mut out);
    out
}

fn collect_raw_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_noise(child_el) {
                        collect_raw_text(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Output buffer with inline-whitespace collapsing.
///
/// `text` collapses whitespace runs the way rendered text reads; `raw`
/// preserves every character, which is how literal Markdown tokens (fences,
/// math delimiters, list markers) make it through untouched.
struct MarkdownWriter {
    buf: String,
    last: Option<char>,
}

impl MarkdownWriter {
    fn new() -> Self {
        Self {
            buf: String::new(),
            last: None,
        }
    }

    fn finish(self) -> String {
        self.buf
    }

    fn text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if matches!(self.last, Some(' ') | Some('\n') | None) {
                    continue;
                }
                self.push(' ');
            } else {
                self.push(ch);
            }
        }
    }

    fn raw(&mut self, s: &str) {
        for ch in s.chars() {
            self.push(ch);
        }
    }

    fn break_line(&mut self) {
        if !self.buf.is_empty() && self.last != Some('\n') {
            self.push('\n');
        }
    }

    fn block_math(&mut self, latex: &str) {
        self.raw("\n$$\n");
        self.raw(latex);
        self.raw("\n$$\n");
    }

    fn inline_math(&mut self, latex: &str) {
        self.raw("$");
        self.raw(latex);
        self.raw("$");
    }

    fn fenced(&mut self, lang: &str, code: &str) {
        self.raw("\n```");
        self.raw(lang);
        self.raw("\n");
        self.raw(code);
        self.raw("\n```\n");
    }

    fn push(&mut self, ch: char) {
        self.buf.push(ch);
        self.last = Some(ch);
    }
}
