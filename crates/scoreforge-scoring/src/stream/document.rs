//! Declarative constraint documents.
//!
//! A document names streams and refers to them from constraints, so the same
//! definitions can live in TOML or YAML files:
//!
//! ```toml
//! package = "cloud"
//!
//! [streams.processes]
//! op = "for_each"
//! class = 1
//!
//! [streams.unassigned]
//! op = "filter"
//! source = "processes"
//! predicate = { is_none = { field = { base = { param = 0 }, field = 0 } } }
//!
//! [[constraints]]
//! name = "Unassigned process"
//! stream = "unassigned"
//! impact = "penalty"
//! weight = "0hard/1soft"
//! ```
//!
//! Named streams may refer to each other in any order, but not in a cycle.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use scoreforge_core::{Expr, ImpactType, ParseableScore, Score};
use serde::{Deserialize, Serialize};

use super::{Constraint, ConstraintBuilder, StreamDef, StreamOp};
use crate::collector::Collector;
use crate::error::{BuildError, BuildResult};
use crate::joiner::Joiner;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDocument {
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub streams: IndexMap<String, StreamSpec>,
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
}

/// A named stream; `source`, `left`, `right` and `other` name other streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StreamSpec {
    ForEach {
        class: usize,
    },
    Filter {
        source: String,
        predicate: Expr,
    },
    Join {
        left: String,
        right: String,
        #[serde(default)]
        joiner: Joiner,
        #[serde(default)]
        allow_self: bool,
    },
    IfExists {
        source: String,
        other: String,
        #[serde(default)]
        joiner: Joiner,
        #[serde(default)]
        allow_self: bool,
    },
    IfNotExists {
        source: String,
        other: String,
        #[serde(default)]
        joiner: Joiner,
        #[serde(default)]
        allow_self: bool,
    },
    GroupBy {
        source: String,
        #[serde(default)]
        keys: Vec<Expr>,
        #[serde(default)]
        collectors: Vec<Collector>,
    },
    Map {
        source: String,
        mappings: Vec<Expr>,
    },
    FlattenLast {
        source: String,
    },
}

impl StreamSpec {
    fn sources(&self) -> Vec<&str> {
        match self {
            StreamSpec::ForEach { .. } => Vec::new(),
            StreamSpec::Filter { source, .. }
            | StreamSpec::GroupBy { source, .. }
            | StreamSpec::Map { source, .. }
            | StreamSpec::FlattenLast { source } => vec![source],
            StreamSpec::Join { left, right, .. } => vec![left, right],
            StreamSpec::IfExists { source, other, .. }
            | StreamSpec::IfNotExists { source, other, .. } => vec![source, other],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchWeightSpec {
    Int(Expr),
    Long(Expr),
    Decimal(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub name: String,
    /// Overrides the document package.
    #[serde(default)]
    pub package: Option<String>,
    pub stream: String,
    pub impact: ImpactType,
    /// Constraint weight in the score's textual form, e.g. `"1hard/0soft"`.
    pub weight: String,
    #[serde(default)]
    pub match_weight: Option<MatchWeightSpec>,
}

impl ConstraintDocument {
    pub fn from_toml_str(input: &str) -> BuildResult<Self> {
        Ok(scoreforge_config::parse_toml(input)?)
    }

    pub fn from_yaml_str(input: &str) -> BuildResult<Self> {
        Ok(scoreforge_config::parse_yaml(input)?)
    }

    /// Loads a `.toml`, `.yaml` or `.yml` file.
    pub fn load(path: impl AsRef<Path>) -> BuildResult<Self> {
        Ok(scoreforge_config::load_file(path)?)
    }
}

/// Resolves every named stream and constraint in `document`.
pub fn compile_document<Sc>(document: &ConstraintDocument) -> BuildResult<Vec<Constraint<Sc>>>
where
    Sc: Score + ParseableScore,
{
    let mut resolver = Resolver {
        document,
        package: Arc::from(document.package.as_str()),
        resolved: HashMap::new(),
        visiting: Vec::new(),
    };
    for name in document.streams.keys() {
        resolver.resolve(name)?;
    }

    let mut names = HashSet::new();
    let mut constraints = Vec::with_capacity(document.constraints.len());
    for spec in &document.constraints {
        let package = spec.package.clone().unwrap_or_else(|| document.package.clone());
        if !names.insert((package.clone(), spec.name.clone())) {
            return Err(BuildError::DuplicateConstraint(spec.name.clone()));
        }
        let stream = resolver.resolve(&spec.stream)?;
        let weight = Sc::parse(&spec.weight).map_err(|e| BuildError::InvalidWeight {
            constraint: spec.name.clone(),
            weight: spec.weight.clone(),
            message: e.to_string(),
        })?;
        let mut builder =
            ConstraintBuilder::new(stream, resolver.package.clone(), spec.impact, weight);
        builder = match &spec.match_weight {
            None => builder,
            Some(MatchWeightSpec::Int(e)) => builder.with_match_weight(e.clone()),
            Some(MatchWeightSpec::Long(e)) => builder.with_long_match_weight(e.clone()),
            Some(MatchWeightSpec::Decimal(e)) => builder.with_decimal_match_weight(e.clone()),
        };
        constraints.push(builder.as_constraint_in(package, spec.name.clone()));
    }
    Ok(constraints)
}

struct Resolver<'a> {
    document: &'a ConstraintDocument,
    package: Arc<str>,
    resolved: HashMap<String, Arc<StreamDef>>,
    visiting: Vec<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &str) -> BuildResult<Arc<StreamDef>> {
        if let Some(def) = self.resolved.get(name) {
            return Ok(def.clone());
        }
        if let Some(start) = self.visiting.iter().position(|n| n == name) {
            let mut path = self.visiting[start..].to_vec();
            path.push(name.to_string());
            return Err(BuildError::CyclicStream { path });
        }
        let spec = self
            .document
            .streams
            .get(name)
            .ok_or_else(|| BuildError::UnknownStream(name.to_string()))?;

        self.visiting.push(name.to_string());
        let mut parents = Vec::new();
        for source in spec.sources() {
            parents.push(self.resolve(source)?);
        }
        self.visiting.pop();

        let def = build_def(spec, parents)?;
        self.resolved.insert(name.to_string(), def.clone());
        Ok(def)
    }
}

fn build_def(spec: &StreamSpec, parents: Vec<Arc<StreamDef>>) -> BuildResult<Arc<StreamDef>> {
    let mut parents = parents.into_iter();
    let mut next = || {
        parents
            .next()
            .ok_or_else(|| BuildError::InvalidStream("missing source stream".into()))
    };

    let def = match spec {
        StreamSpec::ForEach { class } => StreamDef::new(StreamOp::ForEach { class: *class }, 1),
        StreamSpec::Filter { predicate, .. } => {
            let parent = next()?;
            let arity = parent.arity();
            StreamDef::new(
                StreamOp::Filter {
                    parent,
                    predicate: predicate.clone(),
                },
                arity,
            )
        }
        StreamSpec::Join {
            joiner, allow_self, ..
        } => {
            let left = next()?;
            let right = next()?;
            let arity = left.arity() + right.arity();
            StreamDef::new(
                StreamOp::Join {
                    left,
                    right,
                    joiner: joiner.clone(),
                    allow_self: *allow_self,
                },
                arity,
            )
        }
        StreamSpec::IfExists {
            joiner, allow_self, ..
        }
        | StreamSpec::IfNotExists {
            joiner, allow_self, ..
        } => {
            let parent = next()?;
            let other = next()?;
            let arity = parent.arity();
            StreamDef::new(
                StreamOp::Exists {
                    parent,
                    other,
                    joiner: joiner.clone(),
                    should_exist: matches!(spec, StreamSpec::IfExists { .. }),
                    allow_self: *allow_self,
                },
                arity,
            )
        }
        StreamSpec::GroupBy {
            keys, collectors, ..
        } => StreamDef::new(
            StreamOp::GroupBy {
                parent: next()?,
                keys: keys.clone(),
                collectors: collectors.clone(),
            },
            keys.len() + collectors.len(),
        ),
        StreamSpec::Map { mappings, .. } => StreamDef::new(
            StreamOp::Map {
                parent: next()?,
                mappings: mappings.clone(),
            },
            mappings.len(),
        ),
        StreamSpec::FlattenLast { .. } => {
            let parent = next()?;
            let arity = parent.arity();
            StreamDef::new(StreamOp::FlattenLast { parent }, arity)
        }
    };
    Ok(def)
}
