use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Internal crates each layer may depend on (normal and build deps; dev deps
/// are free).
const LAYERS: &[(&str, &[&str])] = &[
    ("steamsesh-domain", &[]),
    ("steamsesh-ports", &["steamsesh-domain"]),
    ("steamsesh-app", &["steamsesh-domain", "steamsesh-ports"]),
    ("steamsesh-adapters", &["steamsesh-domain", "steamsesh-ports"]),
    (
        "steamsesh-host",
        &[
            "steamsesh-domain",
            "steamsesh-ports",
            "steamsesh-app",
            "steamsesh-adapters",
        ],
    ),
];

#[derive(Debug, Deserialize)]
struct Metadata {
    packages: Vec<Package>,
}

#[derive(Debug, Deserialize)]
struct Package {
    name: String,
    manifest_path: PathBuf,
    dependencies: Vec<Dependency>,
}

#[derive(Debug, Deserialize)]
struct Dependency {
    name: String,
    kind: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("arch-check") => arch_check(),
        Some(cmd) => anyhow::bail!("Unknown xtask command: {cmd}"),
        None => anyhow::bail!("Usage: cargo xtask <command>\n\nCommands:\n  arch-check"),
    }
}

fn arch_check() -> anyhow::Result<()> {
    let output = std::process::Command::new("cargo")
        .args(["metadata", "--format-version", "1", "--no-deps"])
        .output()
        .context("running cargo metadata")?;

    if !output.status.success() {
        anyhow::bail!("cargo metadata failed")
    }

    let metadata: Metadata =
        serde_json::from_slice(&output.stdout).context("parsing cargo metadata")?;
    let layers: BTreeMap<&str, &[&str]> = LAYERS.iter().copied().collect();

    let mut violations = Vec::new();
    for package in &metadata.packages {
        let Some(allowed) = layers.get(package.name.as_str()) else {
            continue;
        };
        violations.extend(manifest_violations(package, allowed, &layers));

        let src = package
            .manifest_path
            .parent()
            .map(|dir| dir.join("src"))
            .context("manifest path has no parent")?;
        violations.extend(source_violations(&package.name, &src, allowed)?);
    }

    if violations.is_empty() {
        println!("arch-check: OK ({} crates)", layers.len());
        return Ok(());
    }
    for violation in &violations {
        eprintln!("arch-check: {violation}");
    }
    anyhow::bail!("{} layer violation(s)", violations.len())
}

fn manifest_violations(
    package: &Package,
    allowed: &[&str],
    layers: &BTreeMap<&str, &[&str]>,
) -> Vec<String> {
    package
        .dependencies
        .iter()
        .filter(|dep| dep.kind.as_deref() != Some("dev"))
        .filter(|dep| layers.contains_key(dep.name.as_str()))
        .filter(|dep| !allowed.contains(&dep.name.as_str()))
        .map(|dep| format!("{} must not depend on {}", package.name, dep.name))
        .collect()
}

/// Catch internal crate paths used from non-test code, even when the manifest
/// only pulls the crate in as a dev dependency.
fn source_violations(
    package: &str,
    src: &Path,
    allowed: &[&str],
) -> anyhow::Result<Vec<String>> {
    let pattern = regex_lite::Regex::new(r"\bsteamsesh_(domain|ports|app|adapters|host)\b")
        .context("compiling crate path pattern")?;
    let own = package.replace('-', "_");

    let mut violations = Vec::new();
    for file in rust_files(src)? {
        if file.file_name().is_some_and(|name| name == "tests.rs") {
            continue;
        }
        let text = std::fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?;
        let body = match text.find("#[cfg(test)]\nmod tests {") {
            Some(end) => &text[..end],
            None => text.as_str(),
        };
        for found in pattern.find_iter(body) {
            let crate_path = found.as_str();
            if crate_path == own {
                continue;
            }
            let dep = crate_path.replace('_', "-");
            if !allowed.contains(&dep.as_str()) {
                violations.push(format!("{} uses {} in {}", package, dep, file.display()));
            }
        }
    }
    violations.dedup();
    Ok(violations)
}

fn rust_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(rust_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
