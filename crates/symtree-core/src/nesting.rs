//! Unbounded frame nesting.
//!
//! Frame trees nest one level per sampled frame and crash backtraces are
//! linear `subFrames` chains, so depth is bounded only by the sampler.
//! Recursive walks over frames go through [`with_stack`], which moves onto a
//! freshly allocated stack segment whenever the current one runs low.
//! Flattening walks an explicit work list instead.
//!
//! The derived `Clone`, `PartialEq` and drop glue of [`Frame`] still recurse
//! once per level on the caller's stack, which holds comfortably for
//! thousands of levels but not for arbitrarily hostile input.

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

use crate::types::Frame;

/// Remaining stack below which a new segment is allocated.
const RED_ZONE: usize = 64 * 1024;
/// Size of each additional stack segment.
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Run `f`, growing the stack first if fewer than [`RED_ZONE`] bytes remain.
pub(crate) fn with_stack<R>(f: impl FnOnce() -> R) -> R
{
    stacker::maybe_grow(RED_ZONE, STACK_SEGMENT, f)
}

/// Decode JSON without serde_json's nesting limit.
///
/// Trailing non-whitespace input is still rejected.
pub(crate) fn from_slice<T>(data: &[u8]) -> serde_json::Result<T>
where
    T: DeserializeOwned,
{
    let mut deserializer = serde_json::Deserializer::from_slice(data);
    deserializer.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(value)
}

/// `serialize_with` hook for `Frame::children`.
pub(crate) fn serialize_children<S>(children: &Option<Vec<Frame>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    with_stack(|| children.serialize(serializer))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_rejects_trailing_input()
    {
        assert!(from_slice::<Frame>(br#"{"address":1}"#).is_ok());
        assert!(from_slice::<Frame>(br#"{"address":1} x"#).is_err());
    }

    #[test]
    fn test_decodes_past_default_depth_limit()
    {
        let depth = 300;
        let json = format!("{}{}", r#"[{"address":1,"subFrames":"#.repeat(depth), "[]".to_string() + &"}]".repeat(depth));
        let frames: Vec<Frame> = from_slice(json.as_bytes()).unwrap();
        assert_eq!(frames[0].flattened_frames().len(), depth - 1);
    }
}
