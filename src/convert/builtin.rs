//! Built-in conversion edges
//!
//! Covers the platform raw kinds (string/number parsing), the derived time
//! kinds (duration, timestamp), and the contextual converters that populate
//! parameters from ambient event state instead of caller input.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::convert::{ConversionContext, Converter, ConverterRegistry};
use crate::error::{EngineResult, UserError};
use crate::value_objects::{TypeTag, Value};

/// Register the built-in converter set.
///
/// Registration order matters: widening matches and search ties resolve to
/// the earliest compatible edge.
pub fn register_builtins(registry: &mut ConverterRegistry) {
    registry.register(Arc::new(StringToInteger));
    registry.register(Arc::new(StringToNumber));
    registry.register(Arc::new(StringToBoolean));
    registry.register(Arc::new(IntegerToNumber));
    registry.register(Arc::new(StringToDuration));
    registry.register(Arc::new(DurationToTimestamp));
    registry.register(Arc::new(InvokerContext));
    registry.register(Arc::new(ChannelContext));
    registry.register(Arc::new(ScopeContext));
    registry.register(Arc::new(LocaleContext));
}

fn unexpected(converter: &str, value: &Value) -> crate::error::EngineError {
    anyhow::anyhow!("{converter} received a {:?} value", value.tag()).into()
}

/// `String -> Integer` with a user-facing parse failure.
pub struct StringToInteger;

#[async_trait]
impl Converter for StringToInteger {
    fn input_type(&self) -> TypeTag {
        TypeTag::String
    }

    fn output_type(&self) -> TypeTag {
        TypeTag::Integer
    }

    async fn convert(&self, _ctx: &ConversionContext<'_>, input: Value) -> EngineResult<Value> {
        let Value::String(raw) = input else {
            return Err(unexpected("StringToInteger", &input));
        };
        raw.trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| {
                UserError::localized(
                    "error.invalid_integer",
                    format!("'{raw}' is not a whole number"),
                )
                .into()
            })
    }
}

/// `String -> Number` with a user-facing parse failure.
pub struct StringToNumber;

#[async_trait]
impl Converter for StringToNumber {
    fn input_type(&self) -> TypeTag {
        TypeTag::String
    }

    fn output_type(&self) -> TypeTag {
        TypeTag::Number
    }

    async fn convert(&self, _ctx: &ConversionContext<'_>, input: Value) -> EngineResult<Value> {
        let Value::String(raw) = input else {
            return Err(unexpected("StringToNumber", &input));
        };
        raw.trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| {
                UserError::localized("error.invalid_number", format!("'{raw}' is not a number"))
                    .into()
            })
    }
}

/// `String -> Boolean` accepting the common textual flag forms.
pub struct StringToBoolean;

#[async_trait]
impl Converter for StringToBoolean {
    fn input_type(&self) -> TypeTag {
        TypeTag::String
    }

    fn output_type(&self) -> TypeTag {
        TypeTag::Boolean
    }

    async fn convert(&self, _ctx: &ConversionContext<'_>, input: Value) -> EngineResult<Value> {
        let Value::String(raw) = input else {
            return Err(unexpected("StringToBoolean", &input));
        };
        match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Boolean(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Boolean(false)),
            _ => Err(UserError::localized(
                "error.invalid_boolean",
                format!("'{raw}' is not a yes/no value"),
            )
            .into()),
        }
    }
}

/// Widening `Integer -> Number`.
pub struct IntegerToNumber;

#[async_trait]
impl Converter for IntegerToNumber {
    fn input_type(&self) -> TypeTag {
        TypeTag::Integer
    }

    fn output_type(&self) -> TypeTag {
        TypeTag::Number
    }

    async fn convert(&self, _ctx: &ConversionContext<'_>, input: Value) -> EngineResult<Value> {
        let Value::Integer(i) = input else {
            return Err(unexpected("IntegerToNumber", &input));
        };
        Ok(Value::Number(i as f64))
    }
}

/// `String -> Duration` over natural-language spans.
///
/// Accepts forms like `"30m"`, `"1h 20m"`, `"in 30 minutes"`,
/// `"2 days and 4 hours"`.
pub struct StringToDuration;

#[async_trait]
impl Converter for StringToDuration {
    fn input_type(&self) -> TypeTag {
        TypeTag::String
    }

    fn output_type(&self) -> TypeTag {
        TypeTag::Duration
    }

    async fn convert(&self, _ctx: &ConversionContext<'_>, input: Value) -> EngineResult<Value> {
        let Value::String(raw) = input else {
            return Err(unexpected("StringToDuration", &input));
        };
        parse_duration(&raw).map(Value::Duration).ok_or_else(|| {
            UserError::localized(
                "error.invalid_duration",
                format!("'{raw}' is not a time span (try '30m' or 'in 2 hours')"),
            )
            .into()
        })
    }
}

/// `Duration -> Timestamp` anchored at the current instant.
pub struct DurationToTimestamp;

#[async_trait]
impl Converter for DurationToTimestamp {
    fn input_type(&self) -> TypeTag {
        TypeTag::Duration
    }

    fn output_type(&self) -> TypeTag {
        TypeTag::Timestamp
    }

    async fn convert(&self, _ctx: &ConversionContext<'_>, input: Value) -> EngineResult<Value> {
        let Value::Duration(span) = input else {
            return Err(unexpected("DurationToTimestamp", &input));
        };
        Ok(Value::Timestamp(Utc::now() + span))
    }
}

/// Contextual `None -> User`: the invoking user.
pub struct InvokerContext;

#[async_trait]
impl Converter for InvokerContext {
    fn input_type(&self) -> TypeTag {
        TypeTag::None
    }

    fn output_type(&self) -> TypeTag {
        TypeTag::User
    }

    fn can_convert_from(&self) -> bool {
        false
    }

    async fn convert(&self, ctx: &ConversionContext<'_>, _input: Value) -> EngineResult<Value> {
        Ok(Value::User(ctx.event()?.invoker()))
    }
}

/// Contextual `None -> Channel`: the originating channel.
pub struct ChannelContext;

#[async_trait]
impl Converter for ChannelContext {
    fn input_type(&self) -> TypeTag {
        TypeTag::None
    }

    fn output_type(&self) -> TypeTag {
        TypeTag::Channel
    }

    fn can_convert_from(&self) -> bool {
        false
    }

    async fn convert(&self, ctx: &ConversionContext<'_>, _input: Value) -> EngineResult<Value> {
        Ok(Value::Channel(ctx.event()?.channel()))
    }
}

/// Contextual `None -> Scope`: the originating scope.
///
/// Raises a user error outside any scope, since the command is declared to
/// need one.
pub struct ScopeContext;

#[async_trait]
impl Converter for ScopeContext {
    fn input_type(&self) -> TypeTag {
        TypeTag::None
    }

    fn output_type(&self) -> TypeTag {
        TypeTag::Scope
    }

    fn can_convert_from(&self) -> bool {
        false
    }

    async fn convert(&self, ctx: &ConversionContext<'_>, _input: Value) -> EngineResult<Value> {
        match ctx.event()?.scope() {
            Some(scope) => Ok(Value::Scope(scope)),
            None => Err(UserError::localized(
                "error.scope_required",
                "This command is only available inside a server",
            )
            .into()),
        }
    }
}

/// Contextual `None -> Locale`: the caller's locale.
pub struct LocaleContext;

#[async_trait]
impl Converter for LocaleContext {
    fn input_type(&self) -> TypeTag {
        TypeTag::None
    }

    fn output_type(&self) -> TypeTag {
        TypeTag::Locale
    }

    fn can_convert_from(&self) -> bool {
        false
    }

    async fn convert(&self, ctx: &ConversionContext<'_>, _input: Value) -> EngineResult<Value> {
        Ok(Value::Locale(ctx.event()?.locale().to_string()))
    }
}

/// Parse a natural-language time span.
///
/// Grammar: optional `in`/`for` prefix, then one or more `<amount> <unit>`
/// components separated by spaces, commas, or `and`. Units may be glued to
/// the amount (`90s`, `1h20m`).
fn parse_duration(input: &str) -> Option<Duration> {
    let lowered = input.trim().to_lowercase();
    let mut s = lowered.as_str();
    for prefix in ["in ", "for "] {
        if let Some(stripped) = s.strip_prefix(prefix) {
            s = stripped.trim_start();
            break;
        }
    }

    let bytes = s.as_bytes();
    let mut total = Duration::zero();
    let mut components = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b',') {
            i += 1;
        }
        if s[i..].starts_with("and ") {
            i += 4;
            continue;
        }
        if i >= bytes.len() {
            break;
        }

        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == digits_start {
            return None;
        }
        let amount: i64 = s[digits_start..i].parse().ok()?;

        while i < bytes.len() && bytes[i] == b' ' {
            i += 1;
        }
        let unit_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let component = match &s[unit_start..i] {
            "s" | "sec" | "secs" | "second" | "seconds" => Duration::try_seconds(amount),
            "m" | "min" | "mins" | "minute" | "minutes" => Duration::try_minutes(amount),
            "h" | "hr" | "hrs" | "hour" | "hours" => Duration::try_hours(amount),
            "d" | "day" | "days" => Duration::try_days(amount),
            "w" | "week" | "weeks" => Duration::try_weeks(amount),
            _ => return None,
        }?;
        total = total.checked_add(&component)?;
        components += 1;
    }

    (components > 0).then_some(total)
}
