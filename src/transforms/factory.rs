//! Factory contract: from a raw entry to a typed transform.

use crate::config::schema::TransformEntry;
use crate::transforms::context::TransformBuilderContext;
use crate::transforms::error::TransformError;
use crate::transforms::transform::Transform;

/// Recognizes, validates and builds one family of transform entries.
pub trait TransformFactory: Send + Sync {
    /// Whether the entry's kind key belongs to this factory.
    fn can_handle(&self, entry: &TransformEntry) -> bool;

    /// Type-check the entry's parameters and construct the transform.
    fn validate(&self, entry: &TransformEntry) -> Result<Transform, TransformError>;

    /// Build `entry` into `ctx`. Returns false when the entry is not ours;
    /// errors are recorded on the context, never returned.
    fn build(&self, ctx: &mut TransformBuilderContext, entry: &TransformEntry) -> bool {
        if !self.can_handle(entry) {
            return false;
        }
        match self.validate(entry) {
            Ok(transform) => {
                ctx.push(transform);
            }
            Err(error) => ctx.report(error),
        }
        true
    }
}

/// Fail unless the entry has exactly `count` keys.
pub(crate) fn expect_parameters(
    kind: &'static str,
    entry: &TransformEntry,
    count: usize,
    expected: &'static str,
) -> Result<(), TransformError> {
    if entry.len() == count {
        Ok(())
    } else {
        Err(TransformError::UnexpectedParameters {
            kind,
            expected,
            keys: entry.describe_keys(),
        })
    }
}

/// Parse a `true`/`false` flag.
pub(crate) fn parse_flag(kind: &'static str, value: &str) -> Result<bool, TransformError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(TransformError::InvalidValue {
            kind,
            parameter: kind,
            value: value.to_string(),
            reason: "expected 'true' or 'false'".to_string(),
        })
    }
}
