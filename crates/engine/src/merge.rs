//! Deep override-merge of opaque JSON property blobs.

use serde::Deserialize;
use serde_json::{Map, Value as Json};

use crate::error::{Error, Result};

type JsonMap = Map<String, Json>;

/// Merge `patch` into `base`: patch values win on every overlapping key, nested objects
/// are merged recursively, and keys only present on one side are kept.
///
/// Either side may be absent (or JSON `null`), which reads as an empty object; when both
/// are absent the result stays absent. A present value that is not an object fails with
/// [`Error::Decode`].
pub fn merge_raw_properties(base: Option<&Json>, patch: Option<&Json>) -> Result<Option<Json>> {
    if base.is_none() && patch.is_none() {
        return Ok(None);
    }
    let mut merged = decode_map(base, "base properties")?;
    let patch = decode_map(patch, "patch properties")?;
    deep_merge(&mut merged, patch);
    let out = serde_json::to_value(merged).map_err(|e| Error::encode("merged properties", e))?;
    Ok(Some(out))
}

fn decode_map(v: Option<&Json>, what: &str) -> Result<JsonMap> {
    match v {
        None | Some(Json::Null) => Ok(JsonMap::new()),
        Some(v) => JsonMap::deserialize(v).map_err(|e| Error::decode(what, e)),
    }
}

/// Recursive override merge of `src` into `dst`. Arrays and scalars are replaced wholesale.
pub fn deep_merge(dst: &mut JsonMap, src: JsonMap) {
    for (k, sv) in src {
        if let Json::Object(sm) = sv {
            if let Some(Json::Object(dm)) = dst.get_mut(&k) {
                deep_merge(dm, sm);
                continue;
            }
            dst.insert(k, Json::Object(sm));
        } else {
            dst.insert(k, sv);
        }
    }
}
