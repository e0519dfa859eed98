//! Shared JSON fixtures for integration tests, listed in `fixtures/manifest.json`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    animations: HashMap<String, FixtureEntry>,
    timelines: HashMap<String, FixtureEntry>,
}

/// A fixture document plus optional expected samples.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureEntry {
    Path(String),
    Detailed {
        spec: String,
        #[serde(default)]
        expected: Option<String>,
    },
}

impl FixtureEntry {
    fn spec(&self) -> &str {
        match self {
            FixtureEntry::Path(path) => path,
            FixtureEntry::Detailed { spec, .. } => spec,
        }
    }

    fn expected(&self) -> Option<&str> {
        match self {
            FixtureEntry::Path(_) => None,
            FixtureEntry::Detailed { expected, .. } => expected.as_deref(),
        }
    }
}

/// One expected host value at a timestamp (milliseconds since the first tick).
#[derive(Clone, Debug, Deserialize)]
pub struct ExpectedSample {
    pub time: f64,
    pub target: String,
    pub property: String,
    pub value: f64,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a>(map: &'a HashMap<String, FixtureEntry>, kind: &str, name: &str) -> Result<&'a FixtureEntry> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

fn expected_for(entry: &FixtureEntry) -> Result<Vec<ExpectedSample>> {
    match entry.expected() {
        Some(rel) => load_json(rel),
        None => Ok(Vec::new()),
    }
}

pub mod animations {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.animations.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.animations, "animation", name)?;
        read_to_string(entry.spec())
    }

    pub fn expected(name: &str) -> Result<Vec<ExpectedSample>> {
        expected_for(lookup(&MANIFEST.animations, "animation", name)?)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let entry = lookup(&MANIFEST.animations, "animation", name)?;
        Ok(resolve_path(entry.spec()))
    }
}

pub mod timelines {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.timelines.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.timelines, "timeline", name)?;
        read_to_string(entry.spec())
    }

    pub fn expected(name: &str) -> Result<Vec<ExpectedSample>> {
        expected_for(lookup(&MANIFEST.timelines, "timeline", name)?)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let entry = lookup(&MANIFEST.timelines, "timeline", name)?;
        Ok(resolve_path(entry.spec()))
    }
}
