//! Variant resolution.
//!
//! Filters a [`Catalog`] down to the variants that satisfy a request:
//!
//! 1. `variant.version == version`
//! 2. `variant.os == platform.os`
//! 3. `variant.arch == platform.arch`
//! 4. every requested tag is present on the variant with an equal value
//!    (superset match; unrequested variant tags are ignored)
//!
//! Under [`ResolvePolicy::FirstMatch`] the first survivor in catalog order
//! wins. [`ResolvePolicy::RejectAmbiguous`] fails instead when more than one
//! variant survives.

use crate::catalog::{Catalog, Tags, Variant};
use crate::error::{NatriumError, Result};
use crate::platform::Platform;

/// How to settle a request matched by several variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolvePolicy {
    /// Select the first match in catalog registration order
    #[default]
    FirstMatch,
    /// Fail with `NatriumError::AmbiguousVariant`
    RejectAmbiguous,
}

/// Resolve a variant for the host platform from the builtin catalog.
///
/// # Errors
///
/// Returns `NatriumError::UnsupportedPlatform` if the host OS or architecture
/// is unknown, `NatriumError::NoMatchingVariant` if no variant passes all
/// filters.
pub fn resolve(version: &str, required_tags: &Tags) -> Result<&'static Variant> {
    let platform = Platform::current()?;
    resolve_for(
        &Catalog::builtin(),
        platform,
        version,
        required_tags,
        ResolvePolicy::FirstMatch,
    )
}

/// Resolve a variant from `catalog` for an explicit platform.
///
/// Pure: the same inputs always select the same variant.
///
/// # Errors
///
/// Returns `NatriumError::NoMatchingVariant` if nothing matches, or
/// `NatriumError::AmbiguousVariant` under `ResolvePolicy::RejectAmbiguous`
/// when several variants match.
pub fn resolve_for(
    catalog: &Catalog,
    platform: Platform,
    version: &str,
    required_tags: &Tags,
    policy: ResolvePolicy,
) -> Result<&'static Variant> {
    let mut matches = catalog.iter().filter(|v| {
        v.version == version
            && v.os == platform.os
            && v.arch == platform.arch
            && v.matches_tags(required_tags)
    });

    let Some(selected) = matches.next() else {
        return Err(NatriumError::NoMatchingVariant {
            version: version.to_string(),
            platform: platform.to_string(),
            tags: required_tags.clone(),
        });
    };

    let rest: Vec<&'static Variant> = matches.collect();
    if !rest.is_empty() {
        match policy {
            ResolvePolicy::FirstMatch => {
                tracing::warn!(
                    "{} variants match version {} on {}, selecting {} by catalog order",
                    rest.len() + 1,
                    version,
                    platform,
                    selected.resource_id
                );
            }
            ResolvePolicy::RejectAmbiguous => {
                let candidates = std::iter::once(selected)
                    .chain(rest)
                    .map(|v| v.resource_id.to_string())
                    .collect();
                return Err(NatriumError::AmbiguousVariant {
                    version: version.to_string(),
                    candidates,
                });
            }
        }
    }

    tracing::debug!(
        "Resolved version {} on {} with tags {:?} to {}",
        version,
        platform,
        required_tags,
        selected.resource_id
    );
    Ok(selected)
}
