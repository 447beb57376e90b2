//! Conversion graph, cheapest-path search and path execution.
//!
//! Nodes are color/depth descriptors; edges are either casts (relabel the
//! buffer, no copy) or conversions (allocate a new buffer and run an
//! elementary function over it patch by patch). The default graph is built
//! once per process and shared through [`ConversionGraph::global`].

use crate::color::convert::{self, ConvertFn};
use crate::color::info::{ColorInfo, ColorType, Comparison};
use crate::color::spaces::{Bgr, Bgra, Color2, Color3, Color4, ColorSpace, Complex, Gray, Hsv};
use crate::image::buffer::DynViewMut;
use crate::image::{Depth, Image, Region};
use crate::parallel::{ParallelOptions, ParallelProcessor};
use crate::trace::{trace_event, trace_span};
use crate::util::{PatchVisionError, PatchVisionResult};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::sync::OnceLock;

/// Cost class of an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Reinterprets the buffer under another descriptor.
    Cast,
    /// Materializes a new buffer.
    Convert,
}

impl EdgeKind {
    pub fn cost(self) -> u32 {
        match self {
            EdgeKind::Cast => 1,
            EdgeKind::Convert => 2,
        }
    }
}

/// Directed edge of the conversion graph.
#[derive(Clone, Copy)]
pub struct ConversionEdge {
    source: &'static ColorInfo,
    destination: &'static ColorInfo,
    kind: EdgeKind,
    convert: Option<ConvertFn>,
    force_sequential: bool,
}

impl ConversionEdge {
    /// Zero-copy edge between two castable descriptors.
    pub fn cast(
        source: &'static ColorInfo,
        destination: &'static ColorInfo,
    ) -> PatchVisionResult<Self> {
        if !source.equals(destination, Comparison::Castable) {
            return Err(PatchVisionError::ColorMismatch {
                expected: destination.to_string(),
                got: source.to_string(),
            });
        }
        Ok(Self {
            source,
            destination,
            kind: EdgeKind::Cast,
            convert: None,
            force_sequential: false,
        })
    }

    /// Data-converting edge running `convert` over every patch.
    pub fn convert(
        source: &'static ColorInfo,
        destination: &'static ColorInfo,
        convert: ConvertFn,
    ) -> Self {
        Self {
            source,
            destination,
            kind: EdgeKind::Convert,
            convert: Some(convert),
            force_sequential: false,
        }
    }

    /// Runs the conversion on a single patch regardless of the image size.
    pub fn with_force_sequential(mut self, force_sequential: bool) -> Self {
        self.force_sequential = force_sequential;
        self
    }

    pub fn source(&self) -> &'static ColorInfo {
        self.source
    }

    pub fn destination(&self) -> &'static ColorInfo {
        self.destination
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    pub fn cost(&self) -> u32 {
        self.kind.cost()
    }

    pub fn force_sequential(&self) -> bool {
        self.force_sequential
    }

    /// Applies the edge to an image described by the edge source.
    pub fn apply(&self, image: Image) -> PatchVisionResult<Image> {
        if !image.info().equals(self.source, Comparison::Castable) {
            return Err(PatchVisionError::ColorMismatch {
                expected: self.source.to_string(),
                got: image.info().to_string(),
            });
        }
        let convert = match (self.kind, self.convert) {
            (EdgeKind::Convert, Some(convert)) => convert,
            _ => return image.cast(self.destination),
        };

        let options = if self.force_sequential {
            ParallelOptions::sequential()
        } else {
            ParallelOptions::default()
        };
        let (info, width, height) = (self.destination, image.width(), image.height());
        let processor = ParallelProcessor::new(
            image.size(),
            || Image::new(info, width, height),
            |src: &Image, dst: DynViewMut<'_>, region: Region| convert(src.view().roi(region)?, dst),
        )
        .with_options(options);
        processor.process(&image)
    }
}

impl fmt::Debug for ConversionEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionEdge")
            .field("source", &self.source.to_string())
            .field("destination", &self.destination.to_string())
            .field("kind", &self.kind)
            .field("force_sequential", &self.force_sequential)
            .finish()
    }
}

/// Ordered chain of edges from a source to a destination descriptor.
///
/// An empty path means the source already matches the destination (equal or
/// castable) and only a relabel is needed.
#[derive(Clone, Debug)]
pub struct ConversionPath {
    source: &'static ColorInfo,
    destination: &'static ColorInfo,
    edges: Vec<ConversionEdge>,
}

impl ConversionPath {
    pub fn source(&self) -> &'static ColorInfo {
        self.source
    }

    pub fn destination(&self) -> &'static ColorInfo {
        self.destination
    }

    pub fn edges(&self) -> &[ConversionEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Sum of edge costs.
    pub fn cost(&self) -> u32 {
        self.edges.iter().map(ConversionEdge::cost).sum()
    }

    /// True if executing the path never copies pixel data.
    pub fn is_cast_only(&self) -> bool {
        self.edges.iter().all(|edge| edge.kind == EdgeKind::Cast)
    }

    pub fn copies_data(&self) -> bool {
        !self.is_cast_only()
    }

    /// Runs every edge in order, feeding each output into the next edge.
    ///
    /// Cast-only paths return the input allocation under the destination
    /// descriptor.
    pub fn execute(&self, image: Image) -> PatchVisionResult<Image> {
        if !image.info().equals(self.source, Comparison::Castable) {
            return Err(PatchVisionError::ColorMismatch {
                expected: self.source.to_string(),
                got: image.info().to_string(),
            });
        }
        let _span = trace_span!("convert_path", edges = self.edges.len()).entered();
        let mut image = image;
        for edge in &self.edges {
            image = edge.apply(image)?;
        }
        image.cast(self.destination)
    }
}

/// Search state: a node plus the named color the data currently represents.
type State = (usize, Option<ColorType>);

/// Directed graph of registered conversions.
#[derive(Clone, Debug, Default)]
pub struct ConversionGraph {
    nodes: Vec<&'static ColorInfo>,
    index: HashMap<ColorInfo, usize>,
    edges: Vec<ConversionEdge>,
    outgoing: Vec<Vec<usize>>,
}

impl ConversionGraph {
    pub fn builder() -> ConversionGraphBuilder {
        ConversionGraphBuilder::default()
    }

    /// The default graph, built on first use.
    pub fn global() -> PatchVisionResult<&'static ConversionGraph> {
        static GRAPH: OnceLock<PatchVisionResult<ConversionGraph>> = OnceLock::new();
        GRAPH
            .get_or_init(Self::with_default_conversions)
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Builds a graph with the built-in color spaces and conversions.
    pub fn with_default_conversions() -> PatchVisionResult<ConversionGraph> {
        let mut builder = Self::builder();
        builder
            .add_color::<Gray>()?
            .add_color::<Bgr>()?
            .add_color::<Bgra>()?
            .add_color::<Hsv>()?
            .add_color::<Complex>()?
            .add_color::<Color2>()?
            .add_color::<Color3>()?
            .add_color::<Color4>()?;

        for depth in Depth::ALL {
            builder.add_conversion::<Bgra, Bgr>(depth, convert::bgra_to_bgr, true)?;
            builder.add_conversion::<Gray, Bgr>(depth, convert::gray_to_bgr, true)?;
        }
        builder.add_conversion::<Bgr, Bgra>(Depth::U8, convert::bgr_to_bgra, false)?;
        builder.add_conversion::<Bgr, Hsv>(Depth::U8, convert::bgr_to_hsv, false)?;
        builder.add_conversion::<Hsv, Bgr>(Depth::U8, convert::hsv_to_bgr, false)?;
        builder.add_conversion::<Bgr, Gray>(Depth::U8, convert::bgr_to_gray, false)?;
        builder.add_conversion::<Gray, Complex>(Depth::F32, convert::gray_to_complex, true)?;
        builder.add_conversion::<Gray, Complex>(Depth::F64, convert::gray_to_complex, true)?;
        builder.build()
    }

    pub fn nodes(&self) -> &[&'static ColorInfo] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ConversionEdge] {
        &self.edges
    }

    pub fn contains(&self, info: &ColorInfo) -> bool {
        self.index.contains_key(info)
    }

    /// Finds the cheapest path from `source` to any of `candidates`.
    ///
    /// Returns an empty path if `source` equals or casts to a candidate, and
    /// `None` if no candidate is reachable. Among candidates of equal cost the
    /// earliest one wins. A path never relabels data of one named color as
    /// another named color through a generic intermediate.
    pub fn find_cheapest_path(
        &self,
        source: &'static ColorInfo,
        candidates: &[&'static ColorInfo],
    ) -> Option<ConversionPath> {
        if let Some(&destination) = candidates
            .iter()
            .find(|c| source.equals(c, Comparison::Default))
            .or_else(|| candidates.iter().find(|c| source.equals(c, Comparison::Castable)))
        {
            return Some(ConversionPath {
                source,
                destination,
                edges: Vec::new(),
            });
        }

        let start = *self.index.get(source)?;
        let start_state: State = (start, (!source.is_generic()).then(|| source.color()));
        let (dist, prev) = self.shortest_paths(start_state);

        let mut best: Option<(u32, State)> = None;
        for candidate in candidates {
            let Some(&node) = self.index.get(*candidate) else {
                continue;
            };
            let reached = dist
                .iter()
                .filter(|((n, _), _)| *n == node)
                .min_by_key(|((_, meaning), (cost, seq))| (*cost, *seq, meaning.is_some()))
                .map(|(state, (cost, _))| (*cost, *state));
            if let Some((cost, state)) = reached {
                if best.map_or(true, |(best_cost, _)| cost < best_cost) {
                    best = Some((cost, state));
                }
            }
        }

        let (cost, mut state) = best?;
        let mut edges = Vec::new();
        while let Some(&(previous, edge)) = prev.get(&state) {
            edges.push(self.edges[edge]);
            state = previous;
        }
        edges.reverse();
        let destination = edges.last().map(|e| e.destination)?;
        trace_event!(
            "conversion_path_found",
            from = source.to_string().as_str(),
            to = destination.to_string().as_str(),
            edges = edges.len(),
            cost = cost
        );
        Some(ConversionPath {
            source,
            destination,
            edges,
        })
    }

    /// Dijkstra over `(node, meaning)` states; ties resolve by discovery order.
    #[allow(clippy::type_complexity)]
    fn shortest_paths(
        &self,
        start: State,
    ) -> (HashMap<State, (u32, u64)>, HashMap<State, (State, usize)>) {
        let mut dist: HashMap<State, (u32, u64)> = HashMap::new();
        let mut prev: HashMap<State, (State, usize)> = HashMap::new();
        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;
        let mut states = vec![start];

        dist.insert(start, (0, seq));
        heap.push(Reverse((0u32, seq, 0usize)));

        while let Some(Reverse((cost, _, state_idx))) = heap.pop() {
            let state = states[state_idx];
            if dist.get(&state).is_some_and(|&(best, _)| cost > best) {
                continue;
            }
            let (node, meaning) = state;
            for &edge_idx in &self.outgoing[node] {
                let edge = &self.edges[edge_idx];
                let Some(next_meaning) = transition(edge, meaning) else {
                    continue;
                };
                let next: State = (self.index[edge.destination], next_meaning);
                let next_cost = cost + edge.cost();
                if dist.get(&next).is_some_and(|&(best, _)| best <= next_cost) {
                    continue;
                }
                seq += 1;
                dist.insert(next, (next_cost, seq));
                prev.insert(next, (state, edge_idx));
                states.push(next);
                heap.push(Reverse((next_cost, seq, states.len() - 1)));
            }
        }
        (dist, prev)
    }
}

/// Meaning of the data after following `edge`, or `None` if the edge is not
/// allowed from the current meaning.
fn transition(edge: &ConversionEdge, meaning: Option<ColorType>) -> Option<Option<ColorType>> {
    let destination = edge.destination;
    if destination.is_generic() {
        return Some(meaning);
    }
    match edge.kind {
        EdgeKind::Convert => Some(Some(destination.color())),
        EdgeKind::Cast => match meaning {
            Some(color) if color != destination.color() => None,
            _ => Some(Some(destination.color())),
        },
    }
}

/// Collects color spaces and conversions, then derives cast edges.
#[derive(Debug, Default)]
pub struct ConversionGraphBuilder {
    graph: ConversionGraph,
}

impl ConversionGraphBuilder {
    /// Registers `C` at every depth, with depth conversions between all of them.
    pub fn add_color<C: ColorSpace>(&mut self) -> PatchVisionResult<&mut Self> {
        let infos = Depth::ALL
            .iter()
            .map(|&depth| ColorInfo::get::<C>(depth))
            .collect::<PatchVisionResult<Vec<_>>>()?;
        for &info in &infos {
            self.node(info);
        }
        for &from in &infos {
            for &to in &infos {
                if from.depth() != to.depth() {
                    self.edge(ConversionEdge::convert(
                        from,
                        to,
                        convert::depth_converter(from.depth(), to.depth()),
                    ));
                }
            }
        }
        Ok(self)
    }

    /// Registers a conversion from `S` to `D` at one depth.
    pub fn add_conversion<S: ColorSpace, D: ColorSpace>(
        &mut self,
        depth: Depth,
        convert: ConvertFn,
        force_sequential: bool,
    ) -> PatchVisionResult<&mut Self> {
        let source = ColorInfo::get::<S>(depth)?;
        let destination = ColorInfo::get::<D>(depth)?;
        self.add_edge(ConversionEdge::convert(source, destination, convert).with_force_sequential(force_sequential));
        Ok(self)
    }

    /// Registers an arbitrary edge, adding its endpoints as nodes.
    pub fn add_edge(&mut self, edge: ConversionEdge) -> &mut Self {
        self.node(edge.source);
        self.node(edge.destination);
        self.edge(edge);
        self
    }

    /// Adds cast edges between every castable pair of distinct nodes.
    pub fn build(mut self) -> PatchVisionResult<ConversionGraph> {
        let nodes = self.graph.nodes.clone();
        for &from in &nodes {
            for &to in &nodes {
                if !from.equals(to, Comparison::Default) && from.equals(to, Comparison::Castable) {
                    self.edge(ConversionEdge::cast(from, to)?);
                }
            }
        }
        Ok(self.graph)
    }

    fn node(&mut self, info: &'static ColorInfo) -> usize {
        let graph = &mut self.graph;
        *graph.index.entry(*info).or_insert_with(|| {
            graph.nodes.push(info);
            graph.outgoing.push(Vec::new());
            graph.nodes.len() - 1
        })
    }

    fn edge(&mut self, edge: ConversionEdge) {
        let from = self.node(edge.source);
        self.graph.edges.push(edge);
        let idx = self.graph.edges.len() - 1;
        self.graph.outgoing[from].push(idx);
    }
}

/// Finds the cheapest path in the default graph.
pub fn find_cheapest_path(
    source: &'static ColorInfo,
    candidates: &[&'static ColorInfo],
) -> PatchVisionResult<Option<ConversionPath>> {
    Ok(ConversionGraph::global()?.find_cheapest_path(source, candidates))
}

impl Image {
    /// Converts to `info` along the cheapest path of the default graph.
    pub fn convert_to(self, info: &'static ColorInfo) -> PatchVisionResult<Image> {
        self.convert_to_any(&[info])
    }

    /// Converts to whichever of `candidates` is cheapest to reach.
    pub fn convert_to_any(self, candidates: &[&'static ColorInfo]) -> PatchVisionResult<Image> {
        let path = find_cheapest_path(self.info(), candidates)?.ok_or_else(|| {
            PatchVisionError::NoConversionPath {
                from: self.info().to_string(),
                to: candidates
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(" | "),
            }
        })?;
        path.execute(self)
    }
}
