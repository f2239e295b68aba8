use std::collections::HashMap;
use std::fmt::Display;

/// Argument types that can be rendered by [`Observable::trace`](super::Observable::trace).
///
/// An implementation lists its fields into a [`TraceFields`] table.
/// Positional arguments use 1-indexed keys (`"1"`, `"2"`, …) and keyword
/// arguments use their names; both live in the same table, so a format
/// string may mix them.
///
/// Tuples of up to six [`Display`] values are listed positionally.
///
/// # Format syntax
///
/// - `%(key)s` is replaced by the field named `key` (`%(key)d` and
///   `%(key)r` are accepted as synonyms);
/// - `%%` is a literal `%`;
/// - a placeholder naming an absent field is left as written.
pub trait TraceArgs {
    fn trace_fields(&self, fields: &mut TraceFields);
}

/// Rendered fields of one trace invocation.
#[derive(Debug, Default, Clone)]
pub struct TraceFields {
    values: HashMap<String, String>,
}

impl TraceFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field.
    pub fn push(&mut self, key: impl Into<String>, value: impl Display) {
        self.values.insert(key.into(), value.to_string());
    }

    /// Adds a field under the 1-indexed positional key `index`.
    pub fn push_positional(&mut self, index: usize, value: impl Display) {
        self.push(index.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Renders `fmt`, substituting `%(key)s` placeholders.
    pub fn render(&self, fmt: &str) -> String {
        let mut out = String::with_capacity(fmt.len());
        let mut rest = fmt;

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];

            if let Some(after) = rest.strip_prefix('%') {
                out.push('%');
                rest = after;
                continue;
            }

            if let Some((key, conversion, after)) = placeholder(rest) {
                match self.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("%(");
                        out.push_str(key);
                        out.push(')');
                        out.push(conversion);
                    }
                }
                rest = after;
                continue;
            }

            out.push('%');
        }

        out.push_str(rest);
        out
    }
}

/// Splits `(key)c...` into the key, the conversion char and the remainder.
fn placeholder(input: &str) -> Option<(&str, char, &str)> {
    let body = input.strip_prefix('(')?;
    let end = body.find(')')?;
    let key = &body[..end];

    let mut tail = body[end + 1..].chars();
    let conversion = tail.next().filter(|c| matches!(c, 's' | 'd' | 'r'))?;

    Some((key, conversion, tail.as_str()))
}

impl TraceArgs for () {
    fn trace_fields(&self, _fields: &mut TraceFields) {}
}

macro_rules! positional_trace_args {
    ($($index:tt => $name:ident),+) => {
        impl<$($name: Display),+> TraceArgs for ($($name,)+) {
            fn trace_fields(&self, fields: &mut TraceFields) {
                $(fields.push_positional($index + 1, &self.$index);)+
            }
        }
    };
}

positional_trace_args!(0 => A);
positional_trace_args!(0 => A, 1 => B);
positional_trace_args!(0 => A, 1 => B, 2 => C);
positional_trace_args!(0 => A, 1 => B, 2 => C, 3 => D);
positional_trace_args!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
positional_trace_args!(0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
