//! Logging setup shared by the workspace's tests.

use std::{
    collections::BTreeMap,
    fmt::{self, Debug},
    sync::{Arc, RwLock},
};
use tracing::{field::Field, span};
use tracing_subscriber::{
    field::{RecordFields, Visit, VisitOutput},
    fmt::{
        format::{PrettyVisitor, Writer},
        FormatFields, FormattedFields,
    },
};

lazy_static::lazy_static! {
    // WebIDs are long; tests register short nicknames so log fields stay readable
    static ref GLOBAL_REWRITER: LogRewriter = LogRewriter::new();
}

/// Installs a test-writer subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything, but
/// every call forgets previously registered nicknames.
pub fn init_logging() {
    GLOBAL_REWRITER.clear_nicknames();
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .pretty()
        .fmt_fields(&*GLOBAL_REWRITER)
        .try_init();
}

/// Shows `nickname` instead of `web_id` in log fields.
pub fn add_nickname<S: ToString, N: AsRef<str>>(web_id: S, nickname: N) {
    GLOBAL_REWRITER.add_nickname(web_id, nickname);
}

#[derive(Debug, Clone)]
pub struct LogRewriter {
    // Longest first, so a WebID is replaced before any prefix of it
    nicknames: Arc<RwLock<BTreeMap<std::cmp::Reverse<(usize, String)>, String>>>,
}

impl LogRewriter {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            nicknames: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub fn rewrite(&self, value: &str) -> String {
        let Ok(nicknames) = self.nicknames.read() else {
            return value.to_string();
        };
        let mut rewritten = value.to_string();
        for (std::cmp::Reverse((_, web_id)), nickname) in nicknames.iter() {
            rewritten = rewritten.replace(web_id.as_str(), nickname);
        }
        rewritten
    }

    pub fn add_nickname<S: ToString, N: AsRef<str>>(&self, web_id: S, nickname: N) {
        let web_id = web_id.to_string();
        if let Ok(mut nicknames) = self.nicknames.write() {
            nicknames.insert(
                std::cmp::Reverse((web_id.len(), web_id)),
                nickname.as_ref().to_string(),
            );
        }
    }

    pub fn clear_nicknames(&self) {
        if let Ok(mut nicknames) = self.nicknames.write() {
            nicknames.clear();
        }
    }
}

impl<'writer> FormatFields<'writer> for &'_ LogRewriter {
    fn format_fields<R: RecordFields>(&self, writer: Writer<'writer>, fields: R) -> fmt::Result {
        let mut visitor = RewritingVisitor {
            inner: PrettyVisitor::new(writer, true),
            rewriter: self,
        };
        fields.record(&mut visitor);
        visitor.inner.finish()
    }

    fn add_fields(
        &self,
        current: &'writer mut FormattedFields<Self>,
        fields: &span::Record<'_>,
    ) -> fmt::Result {
        let empty = current.is_empty();
        let mut visitor = RewritingVisitor {
            inner: PrettyVisitor::new(current.as_writer(), empty),
            rewriter: self,
        };
        fields.record(&mut visitor);
        visitor.inner.finish()
    }
}

struct RewritingVisitor<'a, V> {
    inner: V,
    rewriter: &'a LogRewriter,
}

impl<V: Visit> Visit for RewritingVisitor<'_, V> {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        let original = format!("{value:?}");
        let rewritten = self.rewriter.rewrite(&original);
        if rewritten != original {
            self.inner.record_debug(field, &format_args!("{rewritten}"));
        } else {
            self.inner.record_debug(field, value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.inner.record_str(field, &self.rewriter.rewrite(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.inner.record_u64(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.inner.record_i64(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.inner.record_bool(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_debug(field, &format_args!("{value}"));
    }
}
