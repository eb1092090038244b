//! In-memory DOM used by tests.
//!
//! Supports the selector subset the agent actually uses: comma-separated
//! compound simple selectors (`tag`, `#id`, `.class`, `[attr]`,
//! `[attr='v']`, `[attr*='v']`, `[attr^='v']`). No combinators — scoped
//! queries go through `ElementHandle::query` on the parent instead.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{DomError, ElementHandle, ElementRef, PageHandle};

type ClickHook = Box<dyn Fn() + Send + Sync>;

struct NodeInner {
    tag: String,
    attrs: Mutex<Vec<(String, String)>>,
    own_text: Mutex<String>,
    value: Mutex<String>,
    checked: AtomicBool,
    displayed: AtomicBool,
    children: Mutex<Vec<FakeNode>>,
    files: Mutex<Vec<PathBuf>>,
    click_count: AtomicUsize,
    on_click: Mutex<Option<ClickHook>>,
}

/// A node in the fake tree. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct FakeNode(Arc<NodeInner>);

impl FakeNode {
    pub fn new(tag: &str) -> Self {
        FakeNode(Arc::new(NodeInner {
            tag: tag.to_lowercase(),
            attrs: Mutex::new(Vec::new()),
            own_text: Mutex::new(String::new()),
            value: Mutex::new(String::new()),
            checked: AtomicBool::new(false),
            displayed: AtomicBool::new(true),
            children: Mutex::new(Vec::new()),
            files: Mutex::new(Vec::new()),
            click_count: AtomicUsize::new(0),
            on_click: Mutex::new(None),
        }))
    }

    // Builder-style sugar for test fixtures.

    pub fn attr(self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn text(self, text: &str) -> Self {
        *self.0.own_text.lock().unwrap() = text.to_string();
        self
    }

    pub fn child(self, node: FakeNode) -> Self {
        self.add_child(&node);
        self
    }

    pub fn value(self, value: &str) -> Self {
        self.set_value(value);
        self
    }

    // Mutators shared with click hooks.

    pub fn set_attr(&self, name: &str, value: &str) {
        let mut attrs = self.0.attrs.lock().unwrap();
        if let Some(slot) = attrs.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value.to_string();
        } else {
            attrs.push((name.to_string(), value.to_string()));
        }
    }

    pub fn set_text(&self, text: &str) {
        *self.0.own_text.lock().unwrap() = text.to_string();
    }

    pub fn set_value(&self, value: &str) {
        *self.0.value.lock().unwrap() = value.to_string();
    }

    pub fn set_checked(&self, checked: bool) {
        self.0.checked.store(checked, Ordering::SeqCst);
    }

    pub fn set_displayed(&self, displayed: bool) {
        self.0.displayed.store(displayed, Ordering::SeqCst);
    }

    pub fn add_child(&self, node: &FakeNode) {
        self.0.children.lock().unwrap().push(node.clone());
    }

    pub fn remove_child(&self, node: &FakeNode) {
        self.0
            .children
            .lock()
            .unwrap()
            .retain(|c| !Arc::ptr_eq(&c.0, &node.0));
    }

    pub fn clear_children(&self) {
        self.0.children.lock().unwrap().clear();
    }

    /// Runs `hook` on every click, before the default input behavior.
    pub fn on_click(self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        *self.0.on_click.lock().unwrap() = Some(Box::new(hook));
        self
    }

    // Synchronous accessors for assertions.

    pub fn value_now(&self) -> String {
        self.0.value.lock().unwrap().clone()
    }

    pub fn checked_now(&self) -> bool {
        self.0.checked.load(Ordering::SeqCst)
    }

    pub fn files_now(&self) -> Vec<PathBuf> {
        self.0.files.lock().unwrap().clone()
    }

    pub fn click_count(&self) -> usize {
        self.0.click_count.load(Ordering::SeqCst)
    }

    pub fn attr_now(&self, name: &str) -> Option<String> {
        self.0
            .attrs
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn input_type(&self) -> Option<String> {
        self.attr_now("type").map(|t| t.to_lowercase())
    }

    fn collect_text(&self, out: &mut String) {
        let own = self.0.own_text.lock().unwrap();
        if !own.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&own);
        }
        drop(own);
        for child in self.0.children.lock().unwrap().iter() {
            child.collect_text(out);
        }
    }

    fn matching_descendants(&self, selectors: &[SimpleSelector], out: &mut Vec<FakeNode>) {
        for child in self.0.children.lock().unwrap().iter() {
            if selectors.iter().any(|s| s.matches(child)) {
                out.push(child.clone());
            }
            child.matching_descendants(selectors, out);
        }
    }

    fn query_nodes(&self, selector: &str) -> Vec<FakeNode> {
        let selectors = parse_selector_list(selector);
        let mut out = Vec::new();
        self.matching_descendants(&selectors, &mut out);
        out
    }
}

#[async_trait]
impl ElementHandle for FakeNode {
    async fn tag_name(&self) -> Result<String, DomError> {
        Ok(self.0.tag.clone())
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, DomError> {
        Ok(self.attr_now(name))
    }

    async fn text(&self) -> Result<String, DomError> {
        let mut out = String::new();
        self.collect_text(&mut out);
        Ok(out.trim().to_string())
    }

    async fn value(&self) -> Result<String, DomError> {
        Ok(self.value_now())
    }

    async fn is_displayed(&self) -> Result<bool, DomError> {
        Ok(self.0.displayed.load(Ordering::SeqCst))
    }

    async fn is_checked(&self) -> Result<bool, DomError> {
        Ok(self.checked_now())
    }

    async fn click(&self) -> Result<(), DomError> {
        self.0.click_count.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.0.on_click.lock().unwrap().as_ref() {
            hook();
        }
        if self.0.tag == "input" {
            match self.input_type().as_deref() {
                Some("checkbox") => {
                    let prev = self.0.checked.load(Ordering::SeqCst);
                    self.0.checked.store(!prev, Ordering::SeqCst);
                }
                Some("radio") => self.0.checked.store(true, Ordering::SeqCst),
                _ => {}
            }
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), DomError> {
        self.0.value.lock().unwrap().clear();
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), DomError> {
        self.0.value.lock().unwrap().push_str(text);
        Ok(())
    }

    async fn select_by_label(&self, label: &str) -> Result<(), DomError> {
        let options = self.query_nodes("option");
        let mut found = false;
        for option in &options {
            let mut text = String::new();
            option.collect_text(&mut text);
            if text.trim() == label {
                option.set_checked(true);
                self.set_value(text.trim());
                found = true;
            } else {
                option.set_checked(false);
            }
        }
        if found {
            Ok(())
        } else {
            Err(DomError::Interaction(format!("no option labelled '{label}'")))
        }
    }

    async fn set_files(&self, paths: &[PathBuf]) -> Result<(), DomError> {
        *self.0.files.lock().unwrap() = paths.to_vec();
        Ok(())
    }

    async fn query(&self, selector: &str) -> Result<Vec<ElementRef>, DomError> {
        Ok(self
            .query_nodes(selector)
            .into_iter()
            .map(|n| Arc::new(n) as ElementRef)
            .collect())
    }
}

/// A fake page: one root node plus polling waits.
#[derive(Clone)]
pub struct FakePage {
    root: FakeNode,
}

impl FakePage {
    pub fn new(root: FakeNode) -> Self {
        Self { root }
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn query(&self, selector: &str) -> Result<Vec<ElementRef>, DomError> {
        ElementHandle::query(&self.root, selector).await
    }

    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<ElementRef>, DomError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(found) = self.query_first(selector).await? {
                return Ok(Some(found));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

// ── Selector matching ────────────────────────────────────────────────────

enum AttrOp {
    Exists,
    Equals,
    Contains,
    StartsWith,
}

struct AttrTest {
    name: String,
    op: AttrOp,
    value: String,
}

struct SimpleSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl SimpleSelector {
    fn matches(&self, node: &FakeNode) -> bool {
        if let Some(tag) = &self.tag {
            if node.0.tag != *tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attr_now("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = node.attr_now("class").unwrap_or_default();
            let present: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }
        for test in &self.attrs {
            let actual = node.attr_now(&test.name);
            let ok = match (&test.op, actual) {
                (AttrOp::Exists, actual) => actual.is_some(),
                (AttrOp::Equals, Some(v)) => v == test.value,
                (AttrOp::Contains, Some(v)) => v.contains(&test.value),
                (AttrOp::StartsWith, Some(v)) => v.starts_with(&test.value),
                _ => false,
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

fn parse_selector_list(input: &str) -> Vec<SimpleSelector> {
    input.split(',').map(|s| parse_simple(s.trim())).collect()
}

fn parse_simple(input: &str) -> SimpleSelector {
    let mut sel = SimpleSelector {
        tag: None,
        id: None,
        classes: Vec::new(),
        attrs: Vec::new(),
    };
    let mut chars = input.chars().peekable();
    let mut tag = String::new();
    while let Some(&c) = chars.peek() {
        if c == '#' || c == '.' || c == '[' {
            break;
        }
        tag.push(c);
        chars.next();
    }
    if !tag.is_empty() && tag != "*" {
        sel.tag = Some(tag.to_lowercase());
    }
    while let Some(c) = chars.next() {
        match c {
            '#' => {
                let mut id = String::new();
                while let Some(&n) = chars.peek() {
                    if n == '.' || n == '[' {
                        break;
                    }
                    id.push(n);
                    chars.next();
                }
                sel.id = Some(id);
            }
            '.' => {
                let mut class = String::new();
                while let Some(&n) = chars.peek() {
                    if n == '.' || n == '[' || n == '#' {
                        break;
                    }
                    class.push(n);
                    chars.next();
                }
                sel.classes.push(class);
            }
            '[' => {
                let mut body = String::new();
                for n in chars.by_ref() {
                    if n == ']' {
                        break;
                    }
                    body.push(n);
                }
                sel.attrs.push(parse_attr_test(&body));
            }
            _ => {}
        }
    }
    sel
}

fn parse_attr_test(body: &str) -> AttrTest {
    let (name, op, raw) = if let Some(idx) = body.find("*=") {
        (&body[..idx], AttrOp::Contains, &body[idx + 2..])
    } else if let Some(idx) = body.find("^=") {
        (&body[..idx], AttrOp::StartsWith, &body[idx + 2..])
    } else if let Some(idx) = body.find('=') {
        (&body[..idx], AttrOp::Equals, &body[idx + 1..])
    } else {
        (body, AttrOp::Exists, "")
    };
    AttrTest {
        name: name.trim().to_string(),
        op,
        value: raw.trim().trim_matches(|c| c == '\'' || c == '"').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_by_tag_and_attr() {
        let root = FakeNode::new("div")
            .child(FakeNode::new("input").attr("type", "radio"))
            .child(FakeNode::new("input").attr("type", "text"));
        let page = FakePage::new(root);

        let radios = page.query("input[type='radio']").await.unwrap();
        assert_eq!(radios.len(), 1);
        let inputs = page.query("input").await.unwrap();
        assert_eq!(inputs.len(), 2);
    }

    #[tokio::test]
    async fn test_query_by_class_and_id() {
        let root = FakeNode::new("div")
            .child(FakeNode::new("span").attr("class", "hint muted"))
            .child(FakeNode::new("button").attr("id", "go"));
        let page = FakePage::new(root);

        assert_eq!(page.query(".hint").await.unwrap().len(), 1);
        assert_eq!(page.query("#go").await.unwrap().len(), 1);
        assert_eq!(page.query("button, span").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_checkbox_click_toggles() {
        let checkbox = FakeNode::new("input").attr("type", "checkbox");
        ElementHandle::click(&checkbox).await.unwrap();
        assert!(checkbox.checked_now());
        ElementHandle::click(&checkbox).await.unwrap();
        assert!(!checkbox.checked_now());
    }

    #[tokio::test]
    async fn test_select_by_label_sets_value() {
        let select = FakeNode::new("select")
            .child(FakeNode::new("option").text("Pick one"))
            .child(FakeNode::new("option").text("Germany"));
        select.select_by_label("Germany").await.unwrap();
        assert_eq!(select.value_now(), "Germany");
    }

    #[tokio::test]
    async fn test_wait_for_times_out_as_none() {
        let page = FakePage::new(FakeNode::new("div"));
        let found = page
            .wait_for("input", Duration::from_millis(30))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_attr_contains_operator() {
        let root =
            FakeNode::new("div").child(FakeNode::new("input").attr("id", "upload-resume-urn:42"));
        let page = FakePage::new(root);
        assert_eq!(page.query("[id*='resume']").await.unwrap().len(), 1);
    }
}
