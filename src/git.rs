use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::model::{FilterDirection, FilterKind, GitFilter, GitSource};

pub const DEFAULT_BRANCH: &str = "main";

/// Extracts `(owner, repo)` from a GitHub repository URL.
pub fn parse_github_url(url: &str) -> Result<(String, String)> {
    let pattern = Regex::new(
        r"^(?:https?://)?(?:www\.)?github\.com[/:](?P<owner>[A-Za-z0-9_.-]+)/(?P<repo>[A-Za-z0-9_.-]+?)(?:\.git)?/?$",
    )
    .context("failed to compile GitHub URL regex")?;

    let captures = pattern
        .captures(url.trim())
        .with_context(|| format!("unparseable GitHub repository URL: {url}"))?;

    let owner = captures
        .name("owner")
        .map(|m| m.as_str().to_string())
        .context("missing owner capture")?;
    let repo = captures
        .name("repo")
        .map(|m| m.as_str().to_string())
        .context("missing repo capture")?;

    Ok((owner, repo))
}

/// Parses `<include|exclude>:<directory|file_extension>:v1,v2`.
pub fn parse_filter_spec(spec: &str) -> Result<GitFilter> {
    let mut parts = spec.splitn(3, ':');
    let direction_raw = parts.next().unwrap_or_default().trim();
    let kind_raw = parts.next().unwrap_or_default().trim();
    let values_raw = parts
        .next()
        .with_context(|| format!("git filter `{spec}` is missing its values"))?;

    let direction = match direction_raw.to_ascii_lowercase().as_str() {
        "include" => FilterDirection::Include,
        "exclude" => FilterDirection::Exclude,
        other => bail!("invalid git filter direction `{other}` in `{spec}`"),
    };
    let kind = match kind_raw.to_ascii_lowercase().as_str() {
        "directory" | "dir" => FilterKind::Directory,
        "file_extension" | "ext" => FilterKind::FileExtension,
        other => bail!("invalid git filter kind `{other}` in `{spec}`"),
    };

    let values = values_raw
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect::<Vec<String>>();
    if values.is_empty() {
        bail!("git filter `{spec}` has no values");
    }

    Ok(GitFilter::new(direction, kind, values))
}

pub fn git_source_from_args(
    url: &str,
    branch: Option<&str>,
    filter_specs: &[String],
) -> Result<GitSource> {
    let (user, repo) = parse_github_url(url)?;
    let filters = filter_specs
        .iter()
        .map(|spec| parse_filter_spec(spec))
        .collect::<Result<Vec<GitFilter>>>()?;

    Ok(GitSource {
        user,
        repo,
        branch: branch.unwrap_or(DEFAULT_BRANCH).to_string(),
        filters,
    })
}
