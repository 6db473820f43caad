//! Batched element machinery shared by the group constraints.
//!
//! A batched constraint evaluates many independent geometric groups (many
//! springs, many planarity stars, many rigid clusters) in one pass. Each
//! group is an [`Element`]: a contiguous sub-range of the constraint's
//! particle-index list with its own influence weight. [`ElementBatch`] owns
//! the index list, the elements, and the per-index [`Delta`] buffer, and
//! knows how to hand each element a disjoint slice of that buffer - which is
//! what makes within-constraint parallelism safe without locks.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use relax_core::parallel::for_each_task;
use relax_core::{DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

/// Element count below which batched evaluation stays sequential.
const MIN_PARALLEL_ELEMENTS: usize = 64;

/// One particle's correction from one `calculate` pass.
///
/// `weight == 0` marks an invalid contribution (degenerate group, fixed
/// pair, undefined direction); it is skipped at apply time and never reaches
/// the accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Delta {
    /// Position correction.
    pub correction: Vector3<f64>,
    /// Blend weight; zero means "do not apply".
    pub weight: f64,
}

impl Delta {
    /// No contribution.
    pub const ZERO: Self = Self {
        correction: Vector3::new(0.0, 0.0, 0.0),
        weight: 0.0,
    };

    /// Create a contribution.
    #[must_use]
    pub const fn new(correction: Vector3<f64>, weight: f64) -> Self {
        Self { correction, weight }
    }

    /// Whether this delta should be applied.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weight > 0.0
    }
}

impl Default for Delta {
    fn default() -> Self {
        Self::ZERO
    }
}

/// A contiguous sub-range of a batched constraint's index list,
/// representing one independent geometric group.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Element {
    first: usize,
    count: usize,
    weight: Weight,
}

impl Element {
    /// Create an element covering `indices[first..first + count]`.
    #[must_use]
    pub const fn new(first: usize, count: usize, weight: Weight) -> Self {
        Self {
            first,
            count,
            weight,
        }
    }

    /// Start of the covered range.
    #[must_use]
    pub const fn first(&self) -> usize {
        self.first
    }

    /// Number of particle indices in this element.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Influence weight of this element's corrections.
    #[must_use]
    pub const fn weight(&self) -> Weight {
        self.weight
    }

    /// The covered range of the owning index list.
    #[must_use]
    pub const fn range(&self) -> std::ops::Range<usize> {
        self.first..self.first + self.count
    }
}

/// Index list, elements, and delta buffer of one batched constraint.
#[derive(Debug)]
pub struct ElementBatch {
    indices: Vec<usize>,
    elements: Vec<Element>,
    deltas: Vec<Delta>,
    parallel: bool,
}

impl ElementBatch {
    /// Create a batch over an explicit index list and element layout.
    ///
    /// Elements must be ordered by `first` and non-overlapping so each can
    /// be handed a disjoint slice of the delta buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidElements`] for unordered, overlapping,
    /// or out-of-range elements.
    pub fn new(indices: Vec<usize>, elements: Vec<Element>) -> Result<Self, ConfigError> {
        let mut cursor = 0usize;
        for element in &elements {
            if element.first < cursor {
                return Err(ConfigError::invalid_elements(format!(
                    "element starting at {} overlaps or precedes the previous element (ends at {})",
                    element.first, cursor
                )));
            }
            let end = element.first + element.count;
            if end > indices.len() {
                return Err(ConfigError::invalid_elements(format!(
                    "element [{}..{end}) exceeds index list of length {}",
                    element.first,
                    indices.len()
                )));
            }
            cursor = end;
        }

        let deltas = vec![Delta::ZERO; indices.len()];
        Ok(Self {
            indices,
            elements,
            deltas,
            parallel: false,
        })
    }

    /// Build a batch from independent groups, one element per group, all
    /// sharing one weight. The layout this produces is always valid.
    #[must_use]
    pub fn from_groups<I, G>(groups: I, weight: Weight) -> Self
    where
        I: IntoIterator<Item = G>,
        G: AsRef<[usize]>,
    {
        let mut indices = Vec::new();
        let mut elements = Vec::new();
        for group in groups {
            let group = group.as_ref();
            elements.push(Element::new(indices.len(), group.len(), weight));
            indices.extend_from_slice(group);
        }
        let deltas = vec![Delta::ZERO; indices.len()];
        Self {
            indices,
            elements,
            deltas,
            parallel: false,
        }
    }

    /// Validate every index against the owning store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IndexOutOfBounds`] for the first index outside
    /// the store.
    pub fn validate(&self, system: &ParticleSystem) -> Result<(), ConfigError> {
        system.check_indices(&self.indices)
    }

    /// The concatenated particle-index list.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// The element layout.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// The last computed deltas, parallel to [`Self::indices`].
    #[must_use]
    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    /// Whether elements are evaluated on the worker pool.
    #[must_use]
    pub const fn parallel(&self) -> bool {
        self.parallel
    }

    /// Toggle within-constraint parallel evaluation.
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    /// Evaluate `f` once per element, writing each element's disjoint delta
    /// slice. The whole buffer is zeroed first, so an `f` that returns
    /// without writing leaves its group at "no contribution".
    ///
    /// `f` receives `(element_ordinal, element, index_slice, delta_slice)`
    /// and must not touch anything outside its slice - which the borrow
    /// split enforces. Elements run on the worker pool when parallel
    /// evaluation is enabled and the batch is large enough.
    pub fn calculate_each<F>(&mut self, f: F)
    where
        F: Fn(usize, &Element, &[usize], &mut [Delta]) + Send + Sync,
    {
        self.deltas.fill(Delta::ZERO);

        let indices = &self.indices;
        let elements = &self.elements;
        let mut rest: &mut [Delta] = &mut self.deltas;
        let mut offset = 0usize;

        let mut tasks: Vec<(usize, &Element, &[usize], &mut [Delta])> =
            Vec::with_capacity(elements.len());
        for (ordinal, element) in elements.iter().enumerate() {
            let tail = std::mem::take(&mut rest);
            let (_gap, tail) = tail.split_at_mut(element.first - offset);
            let (slice, tail) = tail.split_at_mut(element.count);
            rest = tail;
            offset = element.first + element.count;
            tasks.push((ordinal, element, &indices[element.range()], slice));
        }

        for_each_task(
            tasks,
            self.parallel,
            MIN_PARALLEL_ELEMENTS,
            |(ordinal, element, index_slice, delta_slice)| {
                f(ordinal, element, index_slice, delta_slice);
            },
        );
    }

    /// Push every valid delta into the accumulator.
    pub fn apply(&self, accumulator: &mut DeltaAccumulator) {
        for (&index, delta) in self.indices.iter().zip(&self.deltas) {
            if delta.is_valid() {
                accumulator.add(index, delta.correction, delta.weight);
            }
        }
    }

    /// Summed magnitude of the valid deltas from the last calculate pass.
    #[must_use]
    pub fn energy(&self) -> Energy {
        let linear = self
            .deltas
            .iter()
            .filter(|d| d.is_valid())
            .map(|d| d.correction.norm())
            .sum();
        Energy::new(linear, 0.0)
    }
}
