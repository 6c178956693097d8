use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    error::Error as StdError,
    fmt,
    sync::Arc,
};

/// A live error attached to a logging call.
///
/// The backtrace is captured when the error is wrapped (subject to
/// `RUST_BACKTRACE`/`RUST_LIB_BACKTRACE`). Equality is identity.
#[derive(Clone)]
pub struct Throwable {
    inner: Arc<Inner>,
}

struct Inner {
    name: &'static str,
    error: Box<dyn StdError + Send + Sync>,
    backtrace: Backtrace,
}

impl Throwable {
    pub fn new<E: StdError + Send + Sync + 'static>(error: E) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: std::any::type_name::<E>(),
                error: Box::new(error),
                backtrace: Backtrace::capture(),
            }),
        }
    }

    /// Concrete type name of the wrapped error
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.error.as_ref()
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.inner.backtrace
    }
}

impl PartialEq for Throwable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Throwable {}

impl fmt::Debug for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throwable")
            .field("name", &self.inner.name)
            .field("error", &self.inner.error)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.inner.name, self.inner.error)
    }
}

/// Encodable description of a [`Throwable`] and its chain of causes.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct ThrowableProxy {
    /// Concrete type name of the error
    pub name: String,
    pub message: String,
    pub stack_trace: Vec<String>,
    /// Errors reached through `Error::source`, nearest first
    pub causes: Vec<ThrowableCause>,
}

/// One link of a [`ThrowableProxy`] cause chain.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct ThrowableCause {
    pub message: String,
}

impl ThrowableProxy {
    /// Causes past this many are dropped when building a proxy and
    /// rejected when decoding one
    pub const MAX_CAUSE_DEPTH: usize = 64;

    pub fn new(throwable: &Throwable) -> Self {
        let mut causes = Vec::new();
        let mut source = throwable.error().source();
        while let Some(s) = source {
            if causes.len() == Self::MAX_CAUSE_DEPTH {
                break;
            }
            causes.push(ThrowableCause {
                message: s.to_string(),
            });
            source = s.source();
        }
        Self {
            name: throwable.name().to_owned(),
            message: throwable.error().to_string(),
            stack_trace: stack_frames(throwable.backtrace()),
            causes,
        }
    }
}

impl From<&Throwable> for ThrowableProxy {
    fn from(t: &Throwable) -> Self {
        ThrowableProxy::new(t)
    }
}

/// Renders the extended stack trace.
impl fmt::Display for ThrowableProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)?;
        if !self.stack_trace.is_empty() {
            write!(
                f,
                "\n{}",
                self.stack_trace.iter().map(|l| format!("\t{l}")).join("\n")
            )?;
        }
        for cause in self.causes.iter() {
            write!(f, "\nCaused by: {}", cause.message)?;
        }
        Ok(())
    }
}

fn stack_frames(bt: &Backtrace) -> Vec<String> {
    if bt.status() != BacktraceStatus::Captured {
        return Vec::new();
    }
    bt.to_string()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}
