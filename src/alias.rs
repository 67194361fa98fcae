//! Alias substitution and host confirmation for references found in stylesheets.

use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::task::JoinSet;

use crate::host::HostContext;

/// What an alias entry matches against.
#[derive(Debug, Clone)]
pub enum AliasPattern {
  /// Matches the reference itself or any reference below it (`find/...`).
  Exact(String),
  /// Matches wherever the expression matches.
  Regex(Regex),
}

/// One entry of the host's alias table.
#[derive(Debug, Clone)]
pub struct Alias {
  /// Pattern selecting references.
  pub find: AliasPattern,
  /// Replacement for the matched portion; `$n` groups expand for regex patterns.
  pub replacement: String,
}

impl Alias {
  /// Alias matching a literal prefix.
  pub fn exact(find: impl Into<String>, replacement: impl Into<String>) -> Self {
    Self {
      find: AliasPattern::Exact(find.into()),
      replacement: replacement.into(),
    }
  }

  /// Alias matching a regular expression.
  pub fn regex(find: Regex, replacement: impl Into<String>) -> Self {
    Self {
      find: AliasPattern::Regex(find),
      replacement: replacement.into(),
    }
  }

  /// Whether this alias applies to the reference.
  pub fn matches(&self, importee: &str) -> bool {
    match &self.find {
      AliasPattern::Regex(regex) => regex.is_match(importee),
      AliasPattern::Exact(pattern) => scope_matches(pattern, importee),
    }
  }

  /// Substitute the first matched portion of the reference.
  pub fn apply(&self, importee: &str) -> String {
    match &self.find {
      AliasPattern::Regex(regex) => regex.replace(importee, self.replacement.as_str()).into_owned(),
      AliasPattern::Exact(pattern) => importee.replacen(pattern.as_str(), &self.replacement, 1),
    }
  }
}

fn scope_matches(rule: &str, candidate: &str) -> bool {
  if candidate == rule {
    return true;
  }

  candidate
    .strip_prefix(rule)
    .is_some_and(|suffix| suffix.starts_with('/'))
}

/// Rewrite a reference with the first matching alias, if any.
pub fn apply_aliases(aliases: &[Alias], importee: &str) -> String {
  aliases
    .iter()
    .find(|alias| alias.matches(importee))
    .map(|alias| alias.apply(importee))
    .unwrap_or_else(|| importee.to_string())
}

/// Resolve a batch of raw references concurrently.
///
/// Each reference is alias-substituted and then offered to the host resolver; when the host
/// cannot resolve it the substituted string is kept. Output order matches input order.
pub async fn resolve_references(
  host: &Arc<dyn HostContext>,
  aliases: &[Alias],
  references: &[String],
  importer: &str,
) -> Result<Vec<String>> {
  let mut tasks = JoinSet::new();
  for (index, reference) in references.iter().enumerate() {
    let updated = apply_aliases(aliases, reference);
    let host = Arc::clone(host);
    let importer = importer.to_string();
    tasks.spawn(async move {
      let resolved = host.resolve(&updated, &importer).await;
      (index, resolved.unwrap_or(updated))
    });
  }

  let mut resolved: Vec<Option<String>> = vec![None; references.len()];
  while let Some(joined) = tasks.join_next().await {
    let (index, id) = joined.context("reference resolution task failed")?;
    resolved[index] = Some(id);
  }

  Ok(resolved.into_iter().flatten().collect())
}
