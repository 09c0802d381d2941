// Typed entry points for building streams.
//
// `Stream<N>` carries its arity in the type so joins and scoring can only be
// applied where they make sense. Group-by and map choose the output arity
// from the number of keys, collectors or mappings given.

use std::fmt;
use std::sync::Arc;

use scoreforge_core::{Expr, ImpactType, Score};

use super::{ConstraintBuilder, StreamDef, StreamOp};
use crate::collector::Collector;
use crate::joiner::Joiner;

/// Entry point of the stream API.
///
/// ```
/// use scoreforge_core::{Expr, HardSoftScore};
/// use scoreforge_scoring::stream::ConstraintFactory;
///
/// const PROCESS: usize = 1;
///
/// let factory = ConstraintFactory::new("cloud");
/// let unassigned = factory
///     .for_each(PROCESS)
///     .filter(Expr::is_none(Expr::field(0, 0)))
///     .penalize(HardSoftScore::ONE_SOFT)
///     .as_constraint("Unassigned process");
/// assert_eq!(unassigned.constraint_ref().full_name(), "cloud/Unassigned process");
/// ```
#[derive(Debug, Clone)]
pub struct ConstraintFactory {
    package: Arc<str>,
}

impl ConstraintFactory {
    pub fn new(package: impl Into<Arc<str>>) -> Self {
        Self {
            package: package.into(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Every fact of `class`.
    pub fn for_each(&self, class: usize) -> UniStream {
        Stream::from_def(
            StreamDef::new(StreamOp::ForEach { class }, 1),
            self.package.clone(),
        )
    }
}

/// A stream of tuples of arity `N`.
#[derive(Clone)]
pub struct Stream<const N: usize> {
    def: Arc<StreamDef>,
    package: Arc<str>,
}

pub type UniStream = Stream<1>;
pub type BiStream = Stream<2>;
pub type TriStream = Stream<3>;
pub type QuadStream = Stream<4>;

impl<const N: usize> fmt::Debug for Stream<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("arity", &N)
            .field("op", &self.def.op_name())
            .finish()
    }
}

impl<const N: usize> Stream<N> {
    fn from_def(def: Arc<StreamDef>, package: Arc<str>) -> Self {
        Self { def, package }
    }

    fn derive<const M: usize>(&self, op: StreamOp) -> Stream<M> {
        Stream::from_def(StreamDef::new(op, M), self.package.clone())
    }

    pub fn def(&self) -> &Arc<StreamDef> {
        &self.def
    }

    /// Keeps the tuples for which `predicate` evaluates to `true`.
    pub fn filter(&self, predicate: Expr) -> Stream<N> {
        self.derive(StreamOp::Filter {
            parent: self.def.clone(),
            predicate,
        })
    }

    fn exists(&self, other: &UniStream, joiner: Joiner, should_exist: bool, allow_self: bool) -> Stream<N> {
        self.derive(StreamOp::Exists {
            parent: self.def.clone(),
            other: other.def.clone(),
            joiner,
            should_exist,
            allow_self,
        })
    }

    /// Passes tuples that have at least one fact of `class` matching `joiner`.
    ///
    /// When this stream is `for_each(class)` itself, a fact never matches
    /// itself.
    pub fn if_exists(&self, class: usize, joiner: Joiner) -> Stream<N> {
        let other = self.for_each(class);
        self.exists(&other, joiner, true, false)
    }

    pub fn if_not_exists(&self, class: usize, joiner: Joiner) -> Stream<N> {
        let other = self.for_each(class);
        self.exists(&other, joiner, false, false)
    }

    /// Like [`Stream::if_exists`], but a fact may match itself.
    pub fn if_exists_including_self(&self, class: usize, joiner: Joiner) -> Stream<N> {
        let other = self.for_each(class);
        self.exists(&other, joiner, true, true)
    }

    /// Existence check against an arbitrary (for example filtered) stream.
    pub fn if_exists_in(&self, other: &UniStream, joiner: Joiner) -> Stream<N> {
        self.exists(other, joiner, true, false)
    }

    pub fn if_not_exists_in(&self, other: &UniStream, joiner: Joiner) -> Stream<N> {
        self.exists(other, joiner, false, false)
    }

    fn for_each(&self, class: usize) -> UniStream {
        Stream::from_def(
            StreamDef::new(StreamOp::ForEach { class }, 1),
            self.package.clone(),
        )
    }

    fn group<const M: usize>(&self, keys: Vec<Expr>, collectors: Vec<Collector>) -> Stream<M> {
        self.derive(StreamOp::GroupBy {
            parent: self.def.clone(),
            keys,
            collectors,
        })
    }

    /// Distinct values of `key`.
    pub fn group_by_key(&self, key: Expr) -> UniStream {
        self.group(vec![key], Vec::new())
    }

    /// `(key, collected)` per distinct key.
    pub fn group_by(&self, key: Expr, collector: Collector) -> BiStream {
        self.group(vec![key], vec![collector])
    }

    pub fn group_by_with(&self, key: Expr, first: Collector, second: Collector) -> TriStream {
        self.group(vec![key], vec![first, second])
    }

    /// Composite key, one output element per key.
    pub fn group_by_keys<const K: usize>(&self, keys: [Expr; K]) -> Stream<K> {
        self.group(keys.into(), Vec::new())
    }

    /// One group over the whole stream.
    pub fn group_by_collector(&self, collector: Collector) -> UniStream {
        self.group(Vec::new(), vec![collector])
    }

    pub fn group_by_collectors<const C: usize>(&self, collectors: [Collector; C]) -> Stream<C> {
        self.group(Vec::new(), collectors.into())
    }

    /// Replaces every tuple with the given mappings evaluated over it.
    pub fn map<const M: usize>(&self, mappings: [Expr; M]) -> Stream<M> {
        self.derive(StreamOp::Map {
            parent: self.def.clone(),
            mappings: mappings.into(),
        })
    }

    /// Expands the last element, which must be a list, into one tuple per
    /// list item.
    pub fn flatten_last(&self) -> Stream<N> {
        self.derive(StreamOp::FlattenLast {
            parent: self.def.clone(),
        })
    }

    pub fn penalize<Sc: Score>(&self, weight: Sc) -> ConstraintBuilder<Sc> {
        self.score(ImpactType::Penalty, weight)
    }

    pub fn reward<Sc: Score>(&self, weight: Sc) -> ConstraintBuilder<Sc> {
        self.score(ImpactType::Reward, weight)
    }

    /// Positive match weights reward, negative ones penalize.
    pub fn impact<Sc: Score>(&self, weight: Sc) -> ConstraintBuilder<Sc> {
        self.score(ImpactType::Mixed, weight)
    }

    fn score<Sc: Score>(&self, impact_type: ImpactType, weight: Sc) -> ConstraintBuilder<Sc> {
        ConstraintBuilder::new(self.def.clone(), self.package.clone(), impact_type, weight)
    }
}

impl Stream<1> {
    /// Pairs every tuple with every tuple of `other` accepted by `joiner`.
    ///
    /// Joining a stream with itself never pairs a fact with itself; use
    /// [`Stream::join_including_self`] for that.
    pub fn join(&self, other: &UniStream, joiner: Joiner) -> BiStream {
        self.join_with(other, joiner, false)
    }

    pub fn join_including_self(&self, other: &UniStream, joiner: Joiner) -> BiStream {
        self.join_with(other, joiner, true)
    }

    /// Joins against every fact of `class`.
    pub fn join_class(&self, class: usize, joiner: Joiner) -> BiStream {
        let other = self.for_each(class);
        self.join(&other, joiner)
    }
}

impl Stream<2> {
    pub fn join(&self, other: &UniStream, joiner: Joiner) -> TriStream {
        self.join_with(other, joiner, false)
    }

    pub fn join_class(&self, class: usize, joiner: Joiner) -> TriStream {
        let other = self.for_each(class);
        self.join(&other, joiner)
    }
}

impl Stream<3> {
    pub fn join(&self, other: &UniStream, joiner: Joiner) -> QuadStream {
        self.join_with(other, joiner, false)
    }

    pub fn join_class(&self, class: usize, joiner: Joiner) -> QuadStream {
        let other = self.for_each(class);
        self.join(&other, joiner)
    }
}

impl<const N: usize> Stream<N> {
    fn join_with<const M: usize>(&self, other: &UniStream, joiner: Joiner, allow_self: bool) -> Stream<M> {
        self.derive(StreamOp::Join {
            left: self.def.clone(),
            right: other.def.clone(),
            joiner,
            allow_self,
        })
    }
}

