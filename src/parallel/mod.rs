//! Patch-parallel processing engine.
//!
//! A [`ParallelProcessor`] owns a destination factory and a per-patch
//! function. Each [`process`](ParallelProcessor::process) call builds the
//! destination once, splits it into one disjoint mutable part per planned
//! patch, and runs the per-patch function on every part, either fanned out
//! with rayon or sequentially with a single full-region patch.
//!
//! Destinations decide how they are split through [`PatchDestination`]:
//! images hand out row stripes, [`Partials`] hands out private accumulators
//! that the caller merges after all patches complete.

pub mod options;
pub mod plan;

pub use options::{ParallelOptions, ParallelTrigger};
pub use plan::PatchPlanner;

use crate::image::buffer::DynViewMut;
use crate::image::{Image, ImageSize, Region};
use crate::trace::trace_span;
use crate::util::{PatchVisionError, PatchVisionResult};
use std::marker::PhantomData;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A destination that can be split into disjoint per-patch parts.
pub trait PatchDestination: Send {
    /// Mutable part handed to one per-patch invocation.
    type Patch<'a>: Send
    where
        Self: 'a;

    /// Splits `self` into one part per patch, in patch order.
    fn split_patches<'a>(&'a mut self, patches: &[Region]) -> PatchVisionResult<Vec<Self::Patch<'a>>>;
}

/// Images are split into full-width row stripes.
///
/// The part for a patch covers exactly the patch rows; its row 0 is image row
/// `patch.y`.
impl PatchDestination for Image {
    type Patch<'a> = DynViewMut<'a>;

    fn split_patches<'a>(&'a mut self, patches: &[Region]) -> PatchVisionResult<Vec<DynViewMut<'a>>> {
        let width = self.width();
        let mut next_y = 0;
        let mut heights = Vec::with_capacity(patches.len());
        for patch in patches {
            if patch.x != 0 || patch.width != width || patch.y != next_y {
                return Err(PatchVisionError::InvalidPatchLayout {
                    reason: "image patches must be consecutive full-width stripes",
                });
            }
            heights.push(patch.height);
            next_y += patch.height;
        }
        self.view_mut().split_rows(&heights)
    }
}

/// Private per-patch accumulators cloned from a seed value.
///
/// Used for reductions (histograms, moments) where every patch writes into
/// the same logical output: each patch gets its own copy and the caller
/// merges [`into_parts`](Partials::into_parts) afterwards.
#[derive(Clone, Debug)]
pub struct Partials<T> {
    seed: T,
    parts: Vec<T>,
}

impl<T: Clone + Send> Partials<T> {
    pub fn new(seed: T) -> Self {
        Self {
            seed,
            parts: Vec::new(),
        }
    }

    /// Accumulators of the last split, in patch order.
    pub fn parts(&self) -> &[T] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<T> {
        self.parts
    }
}

impl<T: Clone + Send> PatchDestination for Partials<T> {
    type Patch<'a> = &'a mut T where Self: 'a;

    fn split_patches<'a>(&'a mut self, patches: &[Region]) -> PatchVisionResult<Vec<&'a mut T>> {
        self.parts = vec![self.seed.clone(); patches.len()];
        Ok(self.parts.iter_mut().collect())
    }
}

/// Runs a per-patch function over a destination built once per call.
///
/// `S` is the (shared, read-only) source, `D` the destination. The factory
/// `C` is invoked exactly once per [`process`](Self::process) call; the
/// per-patch function `P` receives the source, its destination part and the
/// patch region in target coordinates.
///
/// The processor does not manage halos: per-patch functions that read a
/// neighborhood must clamp their source reads themselves.
pub struct ParallelProcessor<S: ?Sized, D, C, P> {
    size: ImageSize,
    create: C,
    process: P,
    options: ParallelOptions,
    planner: PatchPlanner,
    _marker: PhantomData<fn(&S) -> D>,
}

impl<S, D, C, P> ParallelProcessor<S, D, C, P>
where
    S: Sync + ?Sized,
    D: PatchDestination + 'static,
    C: Fn() -> PatchVisionResult<D>,
    P: for<'a> Fn(&S, D::Patch<'a>, Region) -> PatchVisionResult<()> + Sync,
{
    /// Creates a processor for a target region of `size` with default options.
    pub fn new(size: ImageSize, create: C, process: P) -> Self {
        Self {
            size,
            create,
            process,
            options: ParallelOptions::default(),
            planner: PatchPlanner::new(1),
            _marker: PhantomData,
        }
    }

    pub fn with_options(mut self, options: ParallelOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the minimum stripe height used when planning patches.
    pub fn with_min_patch_height(mut self, min_patch_height: usize) -> Self {
        self.planner = PatchPlanner::with_cores(self.planner.cores(), min_patch_height);
        self
    }

    /// Replaces the patch planner (core count and minimum stripe height).
    pub fn with_planner(mut self, planner: PatchPlanner) -> Self {
        self.planner = planner;
        self
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn options(&self) -> &ParallelOptions {
        &self.options
    }

    /// Patches a call would use under the current options.
    pub fn patches(&self) -> Vec<Region> {
        if self.size.is_empty() {
            Vec::new()
        } else if self.options.should_process_parallel(self.size) {
            self.planner.plan(self.size)
        } else {
            vec![Region::from_size(self.size)]
        }
    }

    /// Builds the destination and runs the per-patch function over it.
    ///
    /// Errors from the factory or from any patch are returned; when several
    /// parallel patches fail, one of their errors is reported.
    pub fn process(&self, src: &S) -> PatchVisionResult<D> {
        let mut dst = (self.create)()?;
        let patches = self.patches();
        if patches.is_empty() {
            return Ok(dst);
        }
        let parallel = patches.len() > 1;
        let _span = trace_span!(
            "parallel_process",
            width = self.size.width,
            height = self.size.height,
            patches = patches.len(),
            parallel = parallel
        )
        .entered();

        {
            let parts = dst.split_patches(&patches)?;
            if parts.len() != patches.len() {
                return Err(PatchVisionError::InvalidPatchLayout {
                    reason: "destination produced a different number of parts",
                });
            }
            self.run(src, parts, patches, parallel)?;
        }
        Ok(dst)
    }

    #[cfg(feature = "rayon")]
    fn run<'a>(
        &self,
        src: &S,
        parts: Vec<D::Patch<'a>>,
        patches: Vec<Region>,
        parallel: bool,
    ) -> PatchVisionResult<()> {
        let process = &self.process;
        if parallel {
            parts
                .into_par_iter()
                .zip(patches.into_par_iter())
                .try_for_each(|(part, patch)| process(src, part, patch))
        } else {
            run_in_order(process, src, parts, patches)
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn run<'a>(
        &self,
        src: &S,
        parts: Vec<D::Patch<'a>>,
        patches: Vec<Region>,
        _parallel: bool,
    ) -> PatchVisionResult<()> {
        run_in_order(&self.process, src, parts, patches)
    }
}

fn run_in_order<S, T, F>(
    process: &F,
    src: &S,
    parts: Vec<T>,
    patches: Vec<Region>,
) -> PatchVisionResult<()>
where
    S: ?Sized,
    F: Fn(&S, T, Region) -> PatchVisionResult<()>,
{
    for (part, patch) in parts.into_iter().zip(patches) {
        process(src, part, patch)?;
    }
    Ok(())
}
