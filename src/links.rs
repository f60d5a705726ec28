//! Links from error groups to their tracker tasks.

use std::collections::HashMap;

use tracing::warn;
use url::Url;

use crate::config::configured_host;
use crate::context::ServiceContext;
use crate::error::StoreError;
use crate::ports::TaskId;
use crate::workflow::TASK_LINK_KEY;

/// A rendered link to a tracker task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayLink {
    /// Absolute task URL, `<host>/T<id>`.
    pub href: String,
    /// Link text, `T<id>`.
    pub label: String,
}

impl DisplayLink {
    /// Renders the link as an HTML anchor.
    #[must_use]
    pub fn to_html(&self) -> String {
        format!("<a href=\"{}\">{}</a>", escape_html(&self.href), escape_html(&self.label))
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Task ids for the groups of one page, plus the tracker hosts looked up
/// while rendering it. Lives for a single render pass.
#[derive(Debug, Default)]
pub struct Prefetched {
    task_ids: HashMap<String, TaskId>,
    hosts: HashMap<String, Option<Url>>,
}

impl Prefetched {
    /// The task linked to `group_id`, if one was found.
    #[must_use]
    pub fn task_id(&self, group_id: &str) -> Option<&TaskId> {
        self.task_ids.get(group_id)
    }

    /// Number of linked groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.task_ids.len()
    }

    /// Whether none of the groups is linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.task_ids.is_empty()
    }
}

/// Renders task links for displayed groups.
pub struct LinkRenderer<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> LinkRenderer<'a> {
    /// Creates a renderer over the given context.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Reads the task links of all `group_ids` in one store call.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn prefetch(&self, group_ids: &[&str]) -> Result<Prefetched, StoreError> {
        let task_ids = self
            .ctx
            .store
            .get_group_values(group_ids, TASK_LINK_KEY)?
            .into_iter()
            .filter(|(_, id)| !id.trim().is_empty())
            .map(|(group, id)| (group, TaskId::new(id)))
            .collect();
        Ok(Prefetched { task_ids, hosts: HashMap::new() })
    }

    /// The link for `group_id`, or `None` when the group has no task or
    /// the project's tracker host is gone.
    pub fn render(
        &self,
        project: &str,
        group_id: &str,
        prefetched: &mut Prefetched,
    ) -> Option<DisplayLink> {
        let task_id = prefetched.task_ids.get(group_id)?.clone();
        let host = self.host_for(project, prefetched)?;
        let href = host.join(&format!("T{task_id}")).ok()?;
        Some(DisplayLink { href: href.to_string(), label: format!("T{task_id}") })
    }

    fn host_for(&self, project: &str, prefetched: &mut Prefetched) -> Option<Url> {
        if let Some(cached) = prefetched.hosts.get(project) {
            return cached.clone();
        }
        let host = configured_host(self.ctx.store.as_ref(), project).unwrap_or_else(|e| {
            warn!(project, error = %e, "cannot read tracker host");
            None
        });
        prefetched.hosts.insert(project.to_string(), host.clone());
        host
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::adapters::replaying::tracker::ReplayingConnector;
    use crate::cassette::Cassette;
    use crate::ports::ConfigStore;

    #[derive(Default)]
    struct Reads {
        options: AtomicUsize,
        single: AtomicUsize,
        bulk: AtomicUsize,
    }

    /// Counts store reads on top of a `MemoryStore`.
    struct CountingStore {
        inner: MemoryStore,
        reads: Arc<Reads>,
    }

    impl ConfigStore for CountingStore {
        fn get_option(&self, project: &str, key: &str) -> Result<Option<String>, StoreError> {
            self.reads.options.fetch_add(1, Ordering::SeqCst);
            self.inner.get_option(project, key)
        }
        fn set_option(&self, project: &str, key: &str, value: Option<&str>) -> Result<(), StoreError> {
            self.inner.set_option(project, key, value)
        }
        fn get_group_value(&self, group: &str, key: &str) -> Result<Option<String>, StoreError> {
            self.reads.single.fetch_add(1, Ordering::SeqCst);
            self.inner.get_group_value(group, key)
        }
        fn set_group_value(&self, group: &str, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.set_group_value(group, key, value)
        }
        fn get_group_values(
            &self,
            groups: &[&str],
            key: &str,
        ) -> Result<HashMap<String, String>, StoreError> {
            self.reads.bulk.fetch_add(1, Ordering::SeqCst);
            self.inner.get_group_values(groups, key)
        }
    }

    fn context_with(store: MemoryStore) -> ServiceContext {
        let empty = Cassette { name: "t".into(), recorded_at: chrono::Utc::now(), interactions: vec![] };
        ServiceContext::new(Box::new(store), Box::new(ReplayingConnector::from_cassette(&empty)))
    }

    fn linked_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.set_option("p1", "phabricator:host", Some("http://t/")).unwrap();
        store.set_group_value("g1", TASK_LINK_KEY, "99").unwrap();
        store.set_group_value("g2", TASK_LINK_KEY, "100").unwrap();
        store
    }

    #[test]
    fn renders_link_to_task() {
        let ctx = context_with(linked_store());
        let renderer = LinkRenderer::new(&ctx);
        let mut prefetched = renderer.prefetch(&["g1", "g3"]).unwrap();
        assert_eq!(prefetched.len(), 1);

        let link = renderer.render("p1", "g1", &mut prefetched).unwrap();
        assert_eq!(link.href, "http://t/T99");
        assert_eq!(link.label, "T99");
        assert_eq!(link.to_html(), "<a href=\"http://t/T99\">T99</a>");
    }

    #[test]
    fn unlinked_group_renders_nothing() {
        let ctx = context_with(linked_store());
        let renderer = LinkRenderer::new(&ctx);
        let mut prefetched = renderer.prefetch(&["g3"]).unwrap();
        assert!(prefetched.is_empty());
        assert_eq!(renderer.render("p1", "g3", &mut prefetched), None);
    }

    #[test]
    fn cleared_host_renders_nothing() {
        let store = linked_store();
        store.set_option("p1", "phabricator:host", None).unwrap();
        let ctx = context_with(store);
        let renderer = LinkRenderer::new(&ctx);
        let mut prefetched = renderer.prefetch(&["g1"]).unwrap();
        assert_eq!(prefetched.task_id("g1"), Some(&TaskId::new("99")));
        assert_eq!(renderer.render("p1", "g1", &mut prefetched), None);
    }

    #[test]
    fn host_path_is_replaced_like_a_relative_link() {
        let store = linked_store();
        store.set_option("p1", "phabricator:host", Some("https://phab.example.com/maniphest")).unwrap();
        let ctx = context_with(store);
        let renderer = LinkRenderer::new(&ctx);
        let mut prefetched = renderer.prefetch(&["g1"]).unwrap();
        let link = renderer.render("p1", "g1", &mut prefetched).unwrap();
        assert_eq!(link.href, "https://phab.example.com/T99");
    }

    #[test]
    fn one_pass_reads_links_and_host_once() {
        let reads = Arc::new(Reads::default());
        let store = CountingStore { inner: linked_store(), reads: Arc::clone(&reads) };
        let empty = Cassette { name: "t".into(), recorded_at: chrono::Utc::now(), interactions: vec![] };
        let ctx = ServiceContext::new(
            Box::new(store),
            Box::new(ReplayingConnector::from_cassette(&empty)),
        );
        let renderer = LinkRenderer::new(&ctx);

        let mut prefetched = renderer.prefetch(&["g1", "g2", "g3"]).unwrap();
        let rendered: Vec<_> = ["g1", "g2", "g3"]
            .iter()
            .filter_map(|g| renderer.render("p1", g, &mut prefetched))
            .collect();

        assert_eq!(rendered.len(), 2);
        assert_eq!(reads.bulk.load(Ordering::SeqCst), 1);
        assert_eq!(reads.single.load(Ordering::SeqCst), 0);
        assert_eq!(reads.options.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn html_is_escaped() {
        let link = DisplayLink { href: "http://t/T1?a=1&b=\"2\"".into(), label: "T<1>".into() };
        assert_eq!(
            link.to_html(),
            "<a href=\"http://t/T1?a=1&amp;b=&quot;2&quot;\">T&lt;1&gt;</a>"
        );
    }
}
