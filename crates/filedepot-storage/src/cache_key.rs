//! Deterministic cache-artifact naming.
//!
//! A derived artifact is named `{prefix}_{params}_{sys_name}` where `prefix`
//! is the first three characters of the transform code (counted in Unicode
//! codepoints, so multi-byte codes truncate correctly), `params` is the
//! transform's parameter list joined with `_` in its canonical string form,
//! and `sys_name` is the source file's system name. The format is part of
//! the on-disk layout and must not change for existing stored data.
//!
//! Two transform codes sharing a 3-character prefix collide when called with
//! identical parameter lists. That weakness is structural and kept for
//! compatibility; registered transforms must use distinct prefixes.

use std::fmt;

/// One scalar cache-key parameter, rendered canonically: booleans as `1`/`0`,
/// numbers in decimal.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheParam {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl fmt::Display for CacheParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheParam::Bool(true) => write!(f, "1"),
            CacheParam::Bool(false) => write!(f, "0"),
            CacheParam::Int(v) => write!(f, "{}", v),
            CacheParam::UInt(v) => write!(f, "{}", v),
            CacheParam::Float(v) => write!(f, "{}", v),
            CacheParam::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for CacheParam {
    fn from(v: bool) -> Self {
        CacheParam::Bool(v)
    }
}

impl From<u8> for CacheParam {
    fn from(v: u8) -> Self {
        CacheParam::UInt(v.into())
    }
}

impl From<u32> for CacheParam {
    fn from(v: u32) -> Self {
        CacheParam::UInt(v.into())
    }
}

impl From<u64> for CacheParam {
    fn from(v: u64) -> Self {
        CacheParam::UInt(v)
    }
}

impl From<i32> for CacheParam {
    fn from(v: i32) -> Self {
        CacheParam::Int(v.into())
    }
}

impl From<i64> for CacheParam {
    fn from(v: i64) -> Self {
        CacheParam::Int(v)
    }
}

impl From<f64> for CacheParam {
    fn from(v: f64) -> Self {
        CacheParam::Float(v)
    }
}

impl From<&str> for CacheParam {
    fn from(v: &str) -> Self {
        CacheParam::Str(v.to_string())
    }
}

impl From<String> for CacheParam {
    fn from(v: String) -> Self {
        CacheParam::Str(v)
    }
}

/// Key of one derived artifact: transform code, ordered parameters, source
/// system name.
///
/// Parameter order is significant and part of the key; every caller of a
/// given transform must assemble parameters in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheKey {
    transform_code: String,
    params: Vec<CacheParam>,
    source_name: String,
}

impl CacheKey {
    pub fn new(
        transform_code: impl Into<String>,
        params: Vec<CacheParam>,
        source_name: impl Into<String>,
    ) -> Self {
        CacheKey {
            transform_code: transform_code.into(),
            params,
            source_name: source_name.into(),
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// The deterministic artifact filename for this key.
    pub fn file_name(&self) -> String {
        let prefix: String = self.transform_code.chars().take(3).collect();
        let joined = self
            .params
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join("_");
        format!("{}_{}_{}", prefix, joined, self.source_name)
    }
}
