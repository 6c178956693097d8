use crate::{
    config::{Config, ThrownProxyConstruction},
    types::{
        empty_message, ContextMap, ContextStack, Level, LogEvent, LogRecord, Location, Marker,
        Message, Property, Throwable, ThrowableProxy, TimeMillis,
    },
};
use internment::Intern;
use std::{
    fmt,
    sync::{Arc, OnceLock},
};

/// Back reference from a slot to the logger that published it.
pub trait AsyncLoggerRef: Send + Sync {
    /// Called on the consumer thread to render the event.
    fn actual_async_log(&self, event: &RingBufferLogEvent);
}

/// Everything a logging call supplies to [`RingBufferLogEvent::set_values`].
///
/// The default value is a call with every attribute absent.
#[derive(Clone, Default)]
pub struct EventValues {
    pub async_logger: Option<Arc<dyn AsyncLoggerRef>>,
    pub logger_name: Option<Intern<String>>,
    pub marker: Option<Marker>,
    pub logger_fqcn: Option<Intern<String>>,
    pub level: Option<Level>,
    pub message: Option<Arc<dyn Message>>,
    pub thrown: Option<Throwable>,
    pub context_map: Option<Arc<ContextMap>>,
    pub context_stack: Option<Arc<ContextStack>>,
    pub thread_name: Option<Intern<String>>,
    pub source: Option<Location>,
    /// Clock value supplied by the caller, used unless the message carries its own timestamp
    pub time_millis: TimeMillis,
}

/// A reusable, mutable log event carried by a ring buffer slot.
///
/// One producer populates it with [`RingBufferLogEvent::set_values`], one consumer
/// reads it after the ring buffer publishes it. The slot does no synchronization
/// of its own.
#[derive(Default)]
pub struct RingBufferLogEvent {
    async_logger: Option<Arc<dyn AsyncLoggerRef>>,
    logger_name: Option<Intern<String>>,
    marker: Option<Marker>,
    logger_fqcn: Option<Intern<String>>,
    level: Option<Level>,
    message: Option<Arc<dyn Message>>,
    thrown: Option<Throwable>,
    thrown_proxy: OnceLock<ThrowableProxy>,
    context_map: Option<Arc<ContextMap>>,
    context_stack: Option<Arc<ContextStack>>,
    thread_name: Option<Intern<String>>,
    source: Option<Location>,
    time_millis: TimeMillis,
    end_of_batch: bool,
    include_location: bool,
    proxy_construction: ThrownProxyConstruction,
}

impl RingBufferLogEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(cfg: &Config) -> Self {
        Self {
            proxy_construction: cfg.thrown_proxy,
            ..Default::default()
        }
    }

    /// Overwrite every attribute of the slot.
    pub fn set_values(&mut self, values: EventValues) {
        let EventValues {
            async_logger,
            logger_name,
            marker,
            logger_fqcn,
            level,
            message,
            thrown,
            context_map,
            context_stack,
            thread_name,
            source,
            time_millis,
        } = values;
        self.async_logger = async_logger;
        self.logger_name = logger_name;
        self.marker = marker;
        self.logger_fqcn = logger_fqcn;
        self.level = level;
        self.message = message;
        self.thrown = thrown;
        self.thrown_proxy.take();
        self.context_map = context_map;
        self.context_stack = context_stack;
        self.thread_name = thread_name;
        self.source = source;
        self.time_millis = time_millis;
        self.end_of_batch = false;

        if self.proxy_construction == ThrownProxyConstruction::Eager {
            self.materialize_thrown_proxy();
        }
    }

    /// Release every reference held by the slot.
    pub fn clear(&mut self) {
        self.set_values(EventValues::default());
        self.include_location = false;
    }

    /// Hand the slot to the logger that published it.
    pub fn execute(&mut self, end_of_batch: bool) {
        self.end_of_batch = end_of_batch;
        if let Some(logger) = self.async_logger.clone() {
            logger.actual_async_log(self);
        }
    }

    pub fn set_end_of_batch(&mut self, end_of_batch: bool) {
        self.end_of_batch = end_of_batch;
    }

    pub fn set_include_location(&mut self, include_location: bool) {
        self.include_location = include_location;
    }

    pub fn async_logger(&self) -> Option<&Arc<dyn AsyncLoggerRef>> {
        self.async_logger.as_ref()
    }

    /// The clock value supplied at population, regardless of the message.
    pub fn time_millis_supplied(&self) -> TimeMillis {
        self.time_millis
    }

    /// Merge configured properties into the context map.
    ///
    /// Keys already present in the map are kept. Values flagged for lookup
    /// are resolved with `lookup`. The previous map is never mutated in place.
    pub fn merge_properties_into_context_map<F>(&mut self, properties: &[Property], lookup: F)
    where
        F: Fn(&str) -> String,
    {
        if properties.is_empty() {
            return;
        }
        let mut map = self
            .context_map
            .as_deref()
            .cloned()
            .unwrap_or_default();
        for prop in properties.iter() {
            if map.contains_key(&prop.name) {
                continue;
            }
            let value = if prop.value_needs_lookup {
                lookup(&prop.value)
            } else {
                prop.value.clone()
            };
            map.insert(prop.name.clone(), value);
        }
        self.context_map = Some(Arc::new(map));
    }

    /// Produce an immutable copy of the current state.
    pub fn create_memento(&self) -> LogEvent {
        LogEvent {
            logger_name: self.logger_name,
            marker: self.marker,
            logger_fqcn: self.logger_fqcn,
            level: self.level(),
            message: self.message().clone(),
            thrown: self.thrown.clone(),
            thrown_proxy: self.thrown_proxy().cloned(),
            context_map: self.context_map.clone(),
            context_stack: self.context_stack.clone(),
            thread_name: self.thread_name,
            source: self.source.clone(),
            time_millis: self.time_millis(),
            end_of_batch: self.end_of_batch,
            include_location: self.include_location,
        }
    }

    /// The attributes as populated, without defaulting.
    pub(crate) fn values(&self) -> EventValues {
        EventValues {
            async_logger: self.async_logger.clone(),
            logger_name: self.logger_name,
            marker: self.marker,
            logger_fqcn: self.logger_fqcn,
            level: self.level,
            message: self.message.clone(),
            thrown: self.thrown.clone(),
            context_map: self.context_map.clone(),
            context_stack: self.context_stack.clone(),
            thread_name: self.thread_name,
            source: self.source.clone(),
            time_millis: self.time_millis,
        }
    }

    pub(crate) fn materialize_thrown_proxy(&self) -> Option<&ThrowableProxy> {
        let thrown = self.thrown.as_ref()?;
        Some(self.thrown_proxy.get_or_init(|| ThrowableProxy::new(thrown)))
    }

    /// Used by the codec to rebuild a slot from its portable form.
    pub(crate) fn from_decoded(values: EventValues, thrown_proxy: Option<ThrowableProxy>) -> Self {
        let mut evt = Self::new();
        evt.set_values(values);
        if let Some(proxy) = thrown_proxy {
            let _ = evt.thrown_proxy.set(proxy);
        }
        evt
    }
}

impl LogRecord for RingBufferLogEvent {
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
        self.level.unwrap_or(Level::Off)
    }

    fn message(&self) -> &Arc<dyn Message> {
        self.message.as_ref().unwrap_or_else(|| empty_message())
    }

    fn thrown(&self) -> Option<&Throwable> {
        self.thrown.as_ref()
    }

    fn thrown_proxy(&self) -> Option<&ThrowableProxy> {
        // A decoded slot has a proxy but no live error
        self.thrown_proxy
            .get()
            .or_else(|| self.materialize_thrown_proxy())
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
        self.message()
            .as_timestamped()
            .map(|m| m.timestamp())
            .unwrap_or(self.time_millis)
    }

    fn is_end_of_batch(&self) -> bool {
        self.end_of_batch
    }

    fn is_include_location(&self) -> bool {
        self.include_location
    }
}

impl fmt::Debug for RingBufferLogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBufferLogEvent")
            .field("logger_name", &self.logger_name)
            .field("marker", &self.marker)
            .field("logger_fqcn", &self.logger_fqcn)
            .field("level", &self.level)
            .field("message", &self.message)
            .field("thrown", &self.thrown)
            .field("thrown_proxy", &self.thrown_proxy.get())
            .field("context_map", &self.context_map)
            .field("context_stack", &self.context_stack)
            .field("thread_name", &self.thread_name)
            .field("source", &self.source)
            .field("time_millis", &self.time_millis)
            .field("end_of_batch", &self.end_of_batch)
            .finish_non_exhaustive()
    }
}
