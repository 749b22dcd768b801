#![allow(dead_code)]

use chrono::NaiveDateTime;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use wp1_core::model::timestamp::{parse_wiki_ts, parse_wp10_ts};
use wp1_core::wiki::{
    ApiError, ApiResult, CategoryMember, CategoryReader, PageTarget, RedirectSource, WikiApi,
    WikiError, WikiResult,
};
use wp1_core::{NamespaceDirectory, ProgressSink};

pub fn wiki_ts(value: &str) -> NaiveDateTime {
    parse_wiki_ts(value).unwrap()
}

pub fn wp10_ts(value: &str) -> NaiveDateTime {
    parse_wp10_ts(value).unwrap()
}

pub fn namespaces() -> NamespaceDirectory {
    NamespaceDirectory::from_entries([
        ("", 0),
        ("Talk", 1),
        ("User", 2),
        ("Wikipedia", 4),
        ("Category", 14),
    ])
}

/// In-memory category listing and redirect table.
#[derive(Default)]
pub struct FakeWiki {
    categories: BTreeMap<String, Vec<CategoryMember>>,
    redirects: BTreeMap<(i64, String), PageTarget>,
    pub fail_redirects: bool,
}

impl FakeWiki {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&mut self, category: &str, namespace: i64, title: &str, timestamp: &str) {
        self.categories
            .entry(category.to_string())
            .or_default()
            .push(CategoryMember {
                namespace,
                title: title.to_string(),
                timestamp: wiki_ts(timestamp),
            });
    }

    pub fn remove_member(&mut self, category: &str, title: &str) {
        if let Some(members) = self.categories.get_mut(category) {
            members.retain(|member| member.title != title);
        }
    }

    /// Registers `<Rating>_<project>_articles` under the project's tracking
    /// category for `tag` (`by_quality`, `by_importance`, `by_priority`).
    pub fn add_rating_category(&mut self, project: &str, tag: &str, rating_category: &str) {
        self.add_member(
            &format!("{project}_articles_{tag}"),
            14,
            rating_category,
            "2015-01-01T00:00:00Z",
        );
    }

    /// Tags talk page `title` with `rating_category`.
    pub fn tag_talk_page(&mut self, rating_category: &str, title: &str, timestamp: &str) {
        self.add_member(rating_category, 1, title, timestamp);
    }

    pub fn add_redirect(&mut self, namespace: i64, title: &str, target: PageTarget) {
        self.redirects.insert((namespace, title.to_string()), target);
    }
}

impl CategoryReader for FakeWiki {
    fn list_members(
        &self,
        category: &str,
        namespace: Option<i64>,
    ) -> WikiResult<Vec<CategoryMember>> {
        Ok(self
            .categories
            .get(category)
            .into_iter()
            .flatten()
            .filter(|member| namespace.map_or(true, |ns| member.namespace == ns))
            .cloned()
            .collect())
    }
}

impl RedirectSource for FakeWiki {
    fn redirect_target(&self, namespace: i64, title: &str) -> WikiResult<Option<PageTarget>> {
        if self.fail_redirects {
            return Err(WikiError::InvalidData("replica offline".to_string()));
        }
        Ok(self.redirects.get(&(namespace, title.to_string())).cloned())
    }
}

/// Live API double with scripted failures.
#[derive(Default)]
pub struct FakeApi {
    pub moves: BTreeMap<String, Vec<PageTarget>>,
    pub redirects: BTreeMap<String, PageTarget>,
    /// Transient failures returned before the first successful call.
    pub transient_failures: Cell<u32>,
    pub permanent_failure: bool,
    pub calls: RefCell<Vec<String>>,
}

impl FakeApi {
    fn fail_first(&self, operation: &str, title: &str) -> ApiResult<()> {
        self.calls.borrow_mut().push(format!("{operation}:{title}"));
        if self.permanent_failure {
            return Err(ApiError::Permanent("bad request".to_string()));
        }
        let remaining = self.transient_failures.get();
        if remaining > 0 {
            self.transient_failures.set(remaining - 1);
            return Err(ApiError::Transient("timeout".to_string()));
        }
        Ok(())
    }
}

impl WikiApi for FakeApi {
    fn page_moves(&self, title_with_ns: &str) -> ApiResult<Vec<PageTarget>> {
        self.fail_first("page_moves", title_with_ns)?;
        Ok(self.moves.get(title_with_ns).cloned().unwrap_or_default())
    }

    fn redirect_target(&self, title_with_ns: &str) -> ApiResult<Option<PageTarget>> {
        self.fail_first("redirect_target", title_with_ns)?;
        Ok(self.redirects.get(title_with_ns).cloned())
    }
}

pub fn target(namespace: i64, title: &str, timestamp: &str) -> PageTarget {
    PageTarget {
        namespace,
        title: title.to_string(),
        timestamp: wiki_ts(timestamp),
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    pub started: RefCell<Vec<(String, u64)>>,
    pub increments: Cell<u64>,
}

impl ProgressSink for RecordingProgress {
    fn start(&self, key: &str, work: u64) {
        self.started.borrow_mut().push((key.to_string(), work));
    }

    fn increment(&self, _key: &str) {
        self.increments.set(self.increments.get() + 1);
    }
}
