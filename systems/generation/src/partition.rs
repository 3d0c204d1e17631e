//! Binary space partitioning of the level bounds.

use delve_core::CellRect;
use rand::Rng;
use tracing::debug;

/// Aspect ratio above which the long axis is always the one split.
const SPLIT_ASPECT_BIAS: f32 = 1.25;

/// Index of a region inside a [`RegionTree`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(usize);

impl RegionId {
    /// Position of the region in the arena.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }
}

/// Rectangle produced by the partitioner.
///
/// A region either has two children or none. Only regions without children
/// carry a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Region {
    rect: CellRect,
    children: Option<(RegionId, RegionId)>,
    sealed: bool,
    room: Option<CellRect>,
}

impl Region {
    fn new(rect: CellRect) -> Self {
        Self {
            rect,
            children: None,
            sealed: false,
            room: None,
        }
    }

    /// Area covered by the region.
    #[must_use]
    pub const fn rect(&self) -> CellRect {
        self.rect
    }

    /// First child produced by the split, if the region was split.
    #[must_use]
    pub fn left(&self) -> Option<RegionId> {
        self.children.map(|(left, _)| left)
    }

    /// Second child produced by the split, if the region was split.
    #[must_use]
    pub fn right(&self) -> Option<RegionId> {
        self.children.map(|(_, right)| right)
    }

    /// Both children, if the region was split.
    #[must_use]
    pub const fn children(&self) -> Option<(RegionId, RegionId)> {
        self.children
    }

    /// Reports whether the region has no children.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.children.is_none()
    }

    /// Reports whether a split attempt found no valid offset. Sealed regions
    /// are never split again.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Room carved inside the region.
    #[must_use]
    pub const fn room(&self) -> Option<CellRect> {
        self.room
    }
}

/// Arena of regions rooted at the level bounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionTree {
    regions: Vec<Region>,
}

impl RegionTree {
    /// Creates a tree holding a single region covering `bounds`.
    #[must_use]
    pub fn new(bounds: CellRect) -> Self {
        Self {
            regions: vec![Region::new(bounds)],
        }
    }

    /// Identifier of the region covering the level bounds.
    #[must_use]
    pub const fn root(&self) -> RegionId {
        RegionId(0)
    }

    /// Looks up a region.
    #[must_use]
    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.0)
    }

    /// Number of regions in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Always false; the root region exists from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Iterates every region with its identifier in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (RegionId, &Region)> + '_ {
        self.regions
            .iter()
            .enumerate()
            .map(|(index, region)| (RegionId(index), region))
    }

    /// Terminal regions in depth-first, left-first order.
    #[must_use]
    pub fn terminals(&self) -> Vec<RegionId> {
        let mut terminals = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            match self.regions[id.0].children {
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => terminals.push(id),
            }
        }
        terminals
    }

    /// Split regions in depth-first pre-order.
    #[must_use]
    pub fn split_regions(&self) -> Vec<RegionId> {
        let mut split = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if let Some((left, right)) = self.regions[id.0].children {
                split.push(id);
                stack.push(right);
                stack.push(left);
            }
        }
        split
    }

    /// Room that represents the subtree rooted at `id` when connecting it to
    /// a sibling. Descends preferring the first child and falls back to the
    /// second when the first subtree holds no room.
    #[must_use]
    pub fn representative_room(&self, id: RegionId) -> Option<CellRect> {
        let region = self.regions.get(id.0)?;
        if let Some(room) = region.room {
            return Some(room);
        }
        let (left, right) = region.children?;
        self.representative_room(left)
            .or_else(|| self.representative_room(right))
    }

    /// Runs one partition iteration.
    ///
    /// Every terminal, unsealed region at least twice `min_leaf_size` wide or
    /// tall gets one split attempt. Children created during the iteration are
    /// not visited until the next one. Returns the number of successful
    /// splits.
    pub fn split_iteration<R>(&mut self, min_leaf_size: i32, rng: &mut R) -> usize
    where
        R: Rng + ?Sized,
    {
        let candidates: Vec<RegionId> = self
            .iter()
            .filter(|(_, region)| {
                region.is_terminal()
                    && !region.sealed
                    && (region.rect.width() >= 2 * min_leaf_size
                        || region.rect.height() >= 2 * min_leaf_size)
            })
            .map(|(id, _)| id)
            .collect();

        let mut splits = 0;
        for id in candidates {
            if self.try_split(id, min_leaf_size, rng) {
                splits += 1;
            }
        }
        splits
    }

    pub(crate) fn set_room(&mut self, id: RegionId, room: CellRect) {
        if let Some(region) = self.regions.get_mut(id.0) {
            region.room = Some(room);
        }
    }

    fn try_split<R>(&mut self, id: RegionId, min_leaf_size: i32, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        let rect = self.regions[id.0].rect;
        let horizontal = split_horizontally(rect, rng);
        let extent = if horizontal {
            rect.height()
        } else {
            rect.width()
        };

        if extent - min_leaf_size <= min_leaf_size {
            self.regions[id.0].sealed = true;
            debug!(region = id.0, ?rect, "region sealed without a valid split offset");
            return false;
        }

        let offset = rng.gen_range(min_leaf_size..extent - min_leaf_size);
        let (first, second) = if horizontal {
            (
                CellRect::new(rect.x(), rect.y(), rect.width(), offset),
                CellRect::new(rect.x(), rect.y() + offset, rect.width(), rect.height() - offset),
            )
        } else {
            (
                CellRect::new(rect.x(), rect.y(), offset, rect.height()),
                CellRect::new(rect.x() + offset, rect.y(), rect.width() - offset, rect.height()),
            )
        };

        let left = RegionId(self.regions.len());
        self.regions.push(Region::new(first));
        let right = RegionId(self.regions.len());
        self.regions.push(Region::new(second));
        self.regions[id.0].children = Some((left, right));

        debug!(region = id.0, horizontal, offset, "split region");
        true
    }
}

/// Chooses the split orientation. Horizontal splits divide the height.
fn split_horizontally<R>(rect: CellRect, rng: &mut R) -> bool
where
    R: Rng + ?Sized,
{
    let coin = rng.gen_bool(0.5);
    let width = rect.width() as f32;
    let height = rect.height() as f32;
    if width > height && width / height >= SPLIT_ASPECT_BIAS {
        false
    } else if height > width && height / width >= SPLIT_ASPECT_BIAS {
        true
    } else {
        coin
    }
}
