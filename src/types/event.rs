use crate::types::{
    ContextMap, ContextStack, Level, Location, Marker, Message, Throwable, ThrowableProxy,
    TimeMillis,
};
use internment::Intern;
use std::sync::Arc;

/// Read access to the attributes of a logging call.
pub trait LogRecord {
    fn logger_name(&self) -> Option<&str>;
    fn marker(&self) -> Option<&Marker>;
    /// Name of the logging wrapper that made the call
    fn logger_fqcn(&self) -> Option<&str>;
    fn level(&self) -> Level;
    fn message(&self) -> &Arc<dyn Message>;
    fn thrown(&self) -> Option<&Throwable>;
    fn thrown_proxy(&self) -> Option<&ThrowableProxy>;
    fn context_map(&self) -> Option<&ContextMap>;
    fn context_stack(&self) -> Option<&ContextStack>;
    fn thread_name(&self) -> Option<&str>;
    fn source(&self) -> Option<&Location>;
    fn time_millis(&self) -> TimeMillis;
    fn is_end_of_batch(&self) -> bool;
    fn is_include_location(&self) -> bool;
}

/// An immutable log record.
///
/// Produced by [`crate::RingBufferLogEvent::create_memento`], it stays valid
/// after the slot it was taken from is reused. The error proxy is built
/// when the record is taken.
#[derive(Clone, Debug)]
pub struct LogEvent {
    pub(crate) logger_name: Option<Intern<String>>,
    pub(crate) marker: Option<Marker>,
    pub(crate) logger_fqcn: Option<Intern<String>>,
    pub(crate) level: Level,
    pub(crate) message: Arc<dyn Message>,
    pub(crate) thrown: Option<Throwable>,
    pub(crate) thrown_proxy: Option<ThrowableProxy>,
    pub(crate) context_map: Option<Arc<ContextMap>>,
    pub(crate) context_stack: Option<Arc<ContextStack>>,
    pub(crate) thread_name: Option<Intern<String>>,
    pub(crate) source: Option<Location>,
    pub(crate) time_millis: TimeMillis,
    pub(crate) end_of_batch: bool,
    pub(crate) include_location: bool,
}

impl LogRecord for LogEvent {
    fn logger_name(&self) -> Option<&str> {
        self.logger_name.as_ref().map(|n| n.as_str())
    }

    fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    fn logger_fqcn(&self) -> Option<&str> {
        self.logger_fqcn.as_ref().map(|n| n.as_str())
    }

    fn level(&self) -> Level {
        self.level
    }

    fn message(&self) -> &Arc<dyn Message> {
        &self.message
    }

    fn thrown(&self) -> Option<&Throwable> {
        self.thrown.as_ref()
    }

    fn thrown_proxy(&self) -> Option<&ThrowableProxy> {
        self.thrown_proxy.as_ref()
    }

    fn context_map(&self) -> Option<&ContextMap> {
        self.context_map.as_deref()
    }

    fn context_stack(&self) -> Option<&ContextStack> {
        self.context_stack.as_deref()
    }

    fn thread_name(&self) -> Option<&str> {
        self.thread_name.as_ref().map(|n| n.as_str())
    }

    fn source(&self) -> Option<&Location> {
        self.source.as_ref()
    }

    fn time_millis(&self) -> TimeMillis {
        self.time_millis
    }

    fn is_end_of_batch(&self) -> bool {
        self.end_of_batch
    }

    fn is_include_location(&self) -> bool {
        self.include_location
    }
}
