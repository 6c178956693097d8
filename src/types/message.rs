use crate::{
    error::Error,
    types::{Throwable, TimeMillis},
};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt,
    sync::{Arc, OnceLock},
};

/// The payload of a logging call.
pub trait Message: fmt::Debug + Send + Sync {
    fn formatted_message(&self) -> Cow<'_, str>;

    fn format(&self) -> Option<&str> {
        None
    }

    fn parameters(&self) -> Option<&[Parameter]> {
        None
    }

    fn throwable(&self) -> Option<&Throwable> {
        None
    }

    /// Returns the embedded-timestamp capability, if this payload carries
    /// the authoritative event time.
    fn as_timestamped(&self) -> Option<&dyn TimestampedMessage> {
        None
    }

    /// Returns the encodable form of this payload.
    fn to_portable(&self) -> Result<PortableMessage, Error> {
        Err(Error::UnencodableMessage(std::any::type_name::<Self>()))
    }
}

pub trait TimestampedMessage: Message {
    fn timestamp(&self) -> TimeMillis;
}

impl PartialEq for dyn Message {
    fn eq(&self, other: &Self) -> bool {
        self.formatted_message() == other.formatted_message()
            && self.format() == other.format()
            && self.parameters() == other.parameters()
            && self.as_timestamped().map(|m| m.timestamp())
                == other.as_timestamped().map(|m| m.timestamp())
    }
}

/// The shared empty payload returned in place of an absent message.
pub fn empty_message() -> &'static Arc<dyn Message> {
    static EMPTY: OnceLock<Arc<dyn Message>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::new(SimpleMessage::new("")))
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Parameter {
    Null,
    Bool(bool),
    SignedInteger(i64),
    UnsignedInteger(u64),
    Float(OrderedFloat<f64>),
    String(String),
    /// Debug rendering of a value with no portable representation
    Opaque(String),
}

impl Parameter {
    pub fn opaque<T: fmt::Debug + ?Sized>(v: &T) -> Self {
        Parameter::Opaque(format!("{v:?}"))
    }

    pub fn is_encodable(&self) -> bool {
        !matches!(self, Parameter::Opaque(_))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Null => f.write_str("null"),
            Parameter::Bool(v) => write!(f, "{v}"),
            Parameter::SignedInteger(v) => write!(f, "{v}"),
            Parameter::UnsignedInteger(v) => write!(f, "{v}"),
            Parameter::Float(v) => write!(f, "{v}"),
            Parameter::String(v) | Parameter::Opaque(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Parameter {
    fn from(v: bool) -> Self {
        Parameter::Bool(v)
    }
}

impl From<i32> for Parameter {
    fn from(v: i32) -> Self {
        Parameter::SignedInteger(v.into())
    }
}

impl From<i64> for Parameter {
    fn from(v: i64) -> Self {
        Parameter::SignedInteger(v)
    }
}

impl From<u32> for Parameter {
    fn from(v: u32) -> Self {
        Parameter::UnsignedInteger(v.into())
    }
}

impl From<u64> for Parameter {
    fn from(v: u64) -> Self {
        Parameter::UnsignedInteger(v)
    }
}

impl From<f64> for Parameter {
    fn from(v: f64) -> Self {
        Parameter::Float(OrderedFloat(v))
    }
}

impl From<String> for Parameter {
    fn from(v: String) -> Self {
        Parameter::String(v)
    }
}

impl From<&str> for Parameter {
    fn from(v: &str) -> Self {
        Parameter::String(v.to_owned())
    }
}

impl<T: Into<Parameter>> From<Option<T>> for Parameter {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Parameter::Null)
    }
}

/// Encodable form of the built-in payloads.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PortableMessage {
    Simple(String),
    Parameterized {
        format: String,
        parameters: Vec<Parameter>,
    },
    TimestampedSimple(String, TimeMillis),
}

impl PortableMessage {
    pub fn into_message(self) -> Arc<dyn Message> {
        match self {
            PortableMessage::Simple(text) => Arc::new(SimpleMessage::new(text)),
            PortableMessage::Parameterized { format, parameters } => {
                Arc::new(ParameterizedMessage::new(format, parameters))
            }
            PortableMessage::TimestampedSimple(text, timestamp) => {
                Arc::new(TimestampedSimpleMessage::new(text, timestamp))
            }
        }
    }
}

/// A payload that is just a string.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SimpleMessage {
    text: String,
}

impl SimpleMessage {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }
}

impl Message for SimpleMessage {
    fn formatted_message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.text)
    }

    fn format(&self) -> Option<&str> {
        Some(&self.text)
    }

    fn to_portable(&self) -> Result<PortableMessage, Error> {
        Ok(PortableMessage::Simple(self.text.clone()))
    }
}

/// A string payload that carries its own event time.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TimestampedSimpleMessage {
    text: String,
    timestamp: TimeMillis,
}

impl TimestampedSimpleMessage {
    pub fn new<S: Into<String>>(text: S, timestamp: TimeMillis) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }
}

impl Message for TimestampedSimpleMessage {
    fn formatted_message(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.text)
    }

    fn format(&self) -> Option<&str> {
        Some(&self.text)
    }

    fn as_timestamped(&self) -> Option<&dyn TimestampedMessage> {
        Some(self)
    }

    fn to_portable(&self) -> Result<PortableMessage, Error> {
        Ok(PortableMessage::TimestampedSimple(
            self.text.clone(),
            self.timestamp,
        ))
    }
}

impl TimestampedMessage for TimestampedSimpleMessage {
    fn timestamp(&self) -> TimeMillis {
        self.timestamp
    }
}

/// A payload with `{}` placeholders substituted by its parameters.
///
/// The formatted text is rendered on first use and cached.
#[derive(Clone, Debug)]
pub struct ParameterizedMessage {
    format: String,
    parameters: Vec<Parameter>,
    throwable: Option<Throwable>,
    formatted: OnceLock<String>,
}

impl ParameterizedMessage {
    pub const PLACEHOLDER: &'static str = "{}";
    const ESCAPE: char = '\\';

    pub fn new<S: Into<String>>(format: S, parameters: Vec<Parameter>) -> Self {
        Self {
            format: format.into(),
            parameters,
            throwable: None,
            formatted: OnceLock::new(),
        }
    }

    /// Attach the error that accompanied the logging call. It is not part of
    /// the portable form.
    pub fn with_throwable(mut self, throwable: Throwable) -> Self {
        self.throwable = Some(throwable);
        self
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(self.format.len());
        let mut params = self.parameters.iter();
        let mut chars = self.format.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                Self::ESCAPE if chars.peek() == Some(&'{') => {
                    // Escaped placeholder, emit it literally
                    chars.next();
                    out.push('{');
                }
                '{' if chars.peek() == Some(&'}') => {
                    chars.next();
                    match params.next() {
                        Some(p) => out.push_str(&p.to_string()),
                        None => out.push_str(Self::PLACEHOLDER),
                    }
                }
                c => out.push(c),
            }
        }
        out
    }
}

impl Message for ParameterizedMessage {
    fn formatted_message(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.formatted.get_or_init(|| self.render()))
    }

    fn format(&self) -> Option<&str> {
        Some(&self.format)
    }

    fn parameters(&self) -> Option<&[Parameter]> {
        Some(&self.parameters)
    }

    fn throwable(&self) -> Option<&Throwable> {
        self.throwable.as_ref()
    }

    fn to_portable(&self) -> Result<PortableMessage, Error> {
        if let Some((idx, p)) = self
            .parameters
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_encodable())
        {
            return Err(Error::unencodable_parameter(idx, format!("{p:?}")));
        }
        Ok(PortableMessage::Parameterized {
            format: self.format.clone(),
            parameters: self.parameters.clone(),
        })
    }
}
