use glam::{DVec2, dvec2};

const LEAF_CAPACITY: usize = 12;
const MAX_DEPTH: usize = 10;

/// Square cell a node was sorted into when the tree was built.
#[derive(Clone, Copy, Debug)]
pub(super) struct Cell {
    pub(super) center: DVec2,
    pub(super) half_extent: f64,
}

impl Cell {
    fn enclosing(points: &[DVec2]) -> Option<Self> {
        let extent = Extent::of(points.iter().copied())?;
        let span = (extent.max - extent.min).max_element().max(1.0);
        Some(Self {
            center: (extent.min + extent.max) * 0.5,
            half_extent: span * 0.5 + 1.0,
        })
    }

    pub(super) fn contains(self, point: DVec2) -> bool {
        let offset = (point - self.center).abs();
        offset.x <= self.half_extent && offset.y <= self.half_extent
    }

    pub(super) fn side_length(self) -> f64 {
        self.half_extent * 2.0
    }

    fn quadrant(self, point: DVec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sign = dvec2(
            if quadrant & 1 == 0 { -1.0 } else { 1.0 },
            if quadrant & 2 == 0 { -1.0 } else { 1.0 },
        );
        Self {
            center: self.center + sign * quarter,
            half_extent: quarter,
        }
    }
}

/// Axis-aligned box around the current centers below a tree node. Unlike
/// [`Cell`] it follows the points when they move, see [`QuadNode::refit`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Extent {
    pub(super) min: DVec2,
    pub(super) max: DVec2,
}

impl Extent {
    fn of(points: impl IntoIterator<Item = DVec2>) -> Option<Self> {
        let mut min = DVec2::INFINITY;
        let mut max = DVec2::NEG_INFINITY;
        for point in points {
            min = min.min(point);
            max = max.max(point);
        }
        (min.is_finite() && max.is_finite()).then_some(Self { min, max })
    }

    fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Squared gap between two boxes, zero when they touch or overlap.
    pub(super) fn gap_sq(self, other: Self) -> f64 {
        let gap = (other.min - self.max).max(self.min - other.max);
        gap.max(DVec2::ZERO).length_squared()
    }
}

/// Region quadtree over node centers.
///
/// `mass` counts the nodes below a cell and doubles as the charge weight,
/// since every node carries the same charge. `max_radius` is the largest
/// circle below the cell, which bounds how close two cells can get before
/// any of their circles may touch.
pub(super) struct QuadNode {
    pub(super) cell: Cell,
    pub(super) extent: Extent,
    pub(super) center_of_mass: DVec2,
    pub(super) mass: f64,
    pub(super) max_radius: f64,
    pub(super) indices: Vec<usize>,
    pub(super) children: Vec<QuadNode>,
}

impl QuadNode {
    /// Returns `None` when there are no points or any point is non-finite.
    pub(super) fn build(positions: &[DVec2], radii: &[f64]) -> Option<Self> {
        let cell = Cell::enclosing(positions)?;
        let indices = (0..positions.len()).collect();
        Some(Self::build_node(cell, indices, positions, radii, 0))
    }

    fn build_node(
        cell: Cell,
        indices: Vec<usize>,
        positions: &[DVec2],
        radii: &[f64],
        depth: usize,
    ) -> Self {
        let mut node = Self {
            cell,
            extent: Extent {
                min: cell.center,
                max: cell.center,
            },
            center_of_mass: cell.center,
            mass: 0.0,
            max_radius: 0.0,
            indices,
            children: Vec::new(),
        };

        if depth < MAX_DEPTH && node.indices.len() > LEAF_CAPACITY {
            let mut buckets: [Vec<usize>; 4] = Default::default();
            for &index in &node.indices {
                buckets[cell.quadrant(positions[index])].push(index);
            }
            // coincident points never separate; keep them in one leaf
            if buckets.iter().filter(|bucket| !bucket.is_empty()).count() > 1 {
                node.indices.clear();
                node.children = buckets
                    .into_iter()
                    .enumerate()
                    .filter(|(_, bucket)| !bucket.is_empty())
                    .map(|(quadrant, bucket)| {
                        Self::build_node(cell.child(quadrant), bucket, positions, radii, depth + 1)
                    })
                    .collect();
            }
        }

        node.refit(positions, radii);
        node
    }

    /// Recomputes extents, centers of mass and radii from moved positions
    /// while keeping the tree shape. Pruning stays exact because extents
    /// follow the points out of their original cells.
    pub(super) fn refit(&mut self, positions: &[DVec2], radii: &[f64]) {
        if self.is_leaf() {
            let points = self.indices.iter().map(|&index| positions[index]);
            if let Some(extent) = Extent::of(points) {
                self.extent = extent;
            }
            self.mass = self.indices.len() as f64;
            self.center_of_mass = if self.indices.is_empty() {
                self.cell.center
            } else {
                self.indices.iter().map(|&index| positions[index]).sum::<DVec2>() / self.mass
            };
            self.max_radius = self
                .indices
                .iter()
                .map(|&index| radii[index])
                .fold(0.0, f64::max);
            return;
        }

        let mut weighted = DVec2::ZERO;
        let mut extent: Option<Extent> = None;
        self.mass = 0.0;
        self.max_radius = 0.0;
        for child in &mut self.children {
            child.refit(positions, radii);
            weighted += child.center_of_mass * child.mass;
            self.mass += child.mass;
            self.max_radius = self.max_radius.max(child.max_radius);
            extent = Some(extent.map_or(child.extent, |extent| extent.union(child.extent)));
        }
        if let Some(extent) = extent {
            self.extent = extent;
        }
        if self.mass > 0.0 {
            self.center_of_mass = weighted / self.mass;
        }
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Every index pair whose circles, grown by `padding`, might touch.
    /// Cell pairs are skipped when their extents sit further apart than
    /// their largest radii plus `padding`.
    pub(super) fn candidate_pairs(&self, padding: f64, pairs: &mut Vec<(usize, usize)>) {
        pairs.clear();
        collect_pairs(self, self, true, padding, pairs);
    }
}

fn collect_pairs(
    a: &QuadNode,
    b: &QuadNode,
    same: bool,
    padding: f64,
    pairs: &mut Vec<(usize, usize)>,
) {
    let reach = a.max_radius + b.max_radius + padding;
    if !same && a.extent.gap_sq(b.extent) > reach * reach {
        return;
    }

    match (a.is_leaf(), b.is_leaf()) {
        (true, true) if same => {
            for (offset, &from) in a.indices.iter().enumerate() {
                pairs.extend(a.indices[offset + 1..].iter().map(|&to| (from, to)));
            }
        }
        (true, true) => {
            for &from in &a.indices {
                pairs.extend(b.indices.iter().map(|&to| (from, to)));
            }
        }
        _ if same => {
            for (offset, first) in a.children.iter().enumerate() {
                collect_pairs(first, first, true, padding, pairs);
                for second in &a.children[offset + 1..] {
                    collect_pairs(first, second, false, padding, pairs);
                }
            }
        }
        (false, true) => {
            for child in &a.children {
                collect_pairs(child, b, false, padding, pairs);
            }
        }
        (true, false) => {
            for child in &b.children {
                collect_pairs(a, child, false, padding, pairs);
            }
        }
        (false, false) if a.cell.half_extent >= b.cell.half_extent => {
            for child in &a.children {
                collect_pairs(child, b, false, padding, pairs);
            }
        }
        (false, false) => {
            for child in &b.children {
                collect_pairs(a, child, false, padding, pairs);
            }
        }
    }
}
