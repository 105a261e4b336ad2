//! Tests for the markdown content store over a real directory tree.

use std::fs;
use std::path::PathBuf;

use garge_web::content::ContentStore;

/// A throwaway content directory, removed on drop.
struct ContentDir {
    root: PathBuf,
}

impl ContentDir {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("garge-content-{name}-{}", std::process::id()));
        fs::create_dir_all(root.join("pages")).expect("create temp content dir");
        Self { root }
    }

    fn write_page(&self, slug: &str, raw: &str) {
        fs::write(self.root.join("pages").join(format!("{slug}.md")), raw)
            .expect("write page file");
    }
}

impl Drop for ContentDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

#[test]
fn loads_pages_with_frontmatter_and_renders_markdown() {
    let dir = ContentDir::new("load");
    dir.write_page(
        "privacy",
        "---\ntitle: Privacy Policy\nupdated_at: 2026-06-15\n---\n\n## What we store\n\nVery little.\n",
    );
    dir.write_page("notes", "---\ntitle: Notes\n---\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");

    let store = ContentStore::load(&dir.root).expect("store should load");

    let privacy = store.get_page("privacy").expect("privacy page loaded");
    assert_eq!(privacy.meta.title, "Privacy Policy");
    assert!(privacy.content_html.contains("<h2"));

    let notes = store.get_page("notes").expect("notes page loaded");
    assert!(notes.content_html.contains("<table>"), "GFM tables render");

    assert!(store.get_page("missing").is_none());
}

#[test]
fn malformed_pages_are_skipped_not_fatal() {
    let dir = ContentDir::new("skip");
    dir.write_page("good", "---\ntitle: Good\n---\n\nbody\n");
    dir.write_page("bad", "no frontmatter at all\n");

    let store = ContentStore::load(&dir.root).expect("store should still load");
    assert!(store.get_page("good").is_some());
    assert!(store.get_page("bad").is_none());
}

#[test]
fn missing_directory_loads_empty() {
    let root = std::env::temp_dir().join("garge-content-absent");
    let store = ContentStore::load(&root).expect("absent dir is not an error");
    assert_eq!(store.get_all_pages().count(), 0);
}
